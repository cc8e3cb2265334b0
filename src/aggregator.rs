//! Daily Aggregator (spec.md §4.I). Assembles a day's staff/product
//! breakdown while enforcing Σstaff = Σproduct for unique-customer metrics.

use crate::deposit::{CustomerType, Deposit};
use crate::ids::{ProductId, StaffId};
use crate::money::Money;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BreakdownRow {
    pub ndp: u64,
    pub rdp: u64,
    pub total_forms: u64,
    pub nominal_total: Money,
}

#[derive(Debug, Clone, Default)]
pub struct DailyReport {
    pub staff_breakdown: HashMap<StaffId, BreakdownRow>,
    pub product_breakdown: HashMap<ProductId, BreakdownRow>,
}

impl DailyReport {
    pub fn total_ndp_by_staff(&self) -> u64 {
        self.staff_breakdown.values().map(|r| r.ndp).sum()
    }

    pub fn total_ndp_by_product(&self) -> u64 {
        self.product_breakdown.values().map(|r| r.ndp).sum()
    }

    pub fn total_rdp_by_staff(&self) -> u64 {
        self.staff_breakdown.values().map(|r| r.rdp).sum()
    }

    pub fn total_rdp_by_product(&self) -> u64 {
        self.product_breakdown.values().map(|r| r.rdp).sum()
    }
}

/// Builds the report for one day's deposits, already filtered to the target
/// date (and optionally a single product). `deposits` must be in stable
/// insertion order; a (staff, customer) pair contributes to the NDP bucket
/// xor the RDP bucket at most once, regardless of how many of its deposits
/// that day carried `Ndp`.
pub fn aggregate(deposits: &[Deposit]) -> DailyReport {
    let mut report = DailyReport::default();
    let mut seen_ndp: HashSet<(StaffId, String)> = HashSet::new();
    let mut seen_rdp: HashSet<(StaffId, String)> = HashSet::new();

    for deposit in deposits {
        let staff_row = report.staff_breakdown.entry(deposit.staff_id).or_default();
        staff_row.total_forms += 1;
        staff_row.nominal_total += deposit.nominal;
        let product_row = report.product_breakdown.entry(deposit.product_id).or_default();
        product_row.total_forms += 1;
        product_row.nominal_total += deposit.nominal;

        let key = (deposit.staff_id, deposit.normalized_customer_id());
        let already_counted = seen_ndp.contains(&key) || seen_rdp.contains(&key);
        if already_counted {
            continue;
        }

        match deposit.customer_type {
            CustomerType::Ndp => {
                report.staff_breakdown.get_mut(&deposit.staff_id).unwrap().ndp += 1;
                report.product_breakdown.get_mut(&deposit.product_id).unwrap().ndp += 1;
                seen_ndp.insert(key);
            }
            CustomerType::Rdp => {
                report.staff_breakdown.get_mut(&deposit.staff_id).unwrap().rdp += 1;
                report.product_breakdown.get_mut(&deposit.product_id).unwrap().rdp += 1;
                seen_rdp.insert(key);
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::DepositId;
    use chrono::NaiveDate;

    fn deposit(staff: StaffId, product: ProductId, customer: &str, customer_type: CustomerType, order: u64) -> Deposit {
        Deposit {
            id: DepositId::new(),
            staff_id: staff,
            product_id: product,
            customer_id: customer.to_string(),
            record_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            nominal: Money::from_cents(100),
            notes: String::new(),
            customer_type,
            insertion_order: order,
        }
    }

    #[test]
    fn cross_product_customer_counts_once_for_the_first_product_encountered() {
        let staff = StaffId::new();
        let p1 = ProductId::new();
        let p2 = ProductId::new();
        let deposits = vec![deposit(staff, p1, "C", CustomerType::Ndp, 0), deposit(staff, p2, "C", CustomerType::Ndp, 1)];
        let report = aggregate(&deposits);
        assert_eq!(report.total_ndp_by_staff(), 1);
        assert_eq!(report.total_ndp_by_product(), 1);
        assert_eq!(report.product_breakdown[&p1].ndp, 1);
        assert_eq!(report.product_breakdown.get(&p2).map(|r| r.ndp).unwrap_or(0), 0);
    }

    #[test]
    fn total_forms_is_not_deduplicated() {
        let staff = StaffId::new();
        let product = ProductId::new();
        let deposits = vec![deposit(staff, product, "C", CustomerType::Ndp, 0), deposit(staff, product, "C", CustomerType::Rdp, 1)];
        let report = aggregate(&deposits);
        assert_eq!(report.staff_breakdown[&staff].total_forms, 2);
        assert!(report.staff_breakdown[&staff].total_forms >= report.staff_breakdown[&staff].ndp + report.staff_breakdown[&staff].rdp);
    }

    #[test]
    fn distinct_customers_each_count_independently() {
        let staff = StaffId::new();
        let product = ProductId::new();
        let deposits = vec![deposit(staff, product, "A", CustomerType::Ndp, 0), deposit(staff, product, "B", CustomerType::Ndp, 1)];
        let report = aggregate(&deposits);
        assert_eq!(report.staff_breakdown[&staff].ndp, 2);
        assert_eq!(report.product_breakdown[&product].ndp, 2);
    }
}
