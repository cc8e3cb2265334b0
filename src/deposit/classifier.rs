//! NDP/RDP Classifier (spec.md §4.H). Pure: given the full set of deposits
//! sharing one recompute-key, decides which (if any) is the `Ndp`.

use super::types::{CustomerType, Deposit};
use crate::ids::DepositId;
use std::collections::HashMap;

/// Classifies one recompute-key's deposits per spec.md §4.H:
/// among non-tambahan deposits, the one with the smallest
/// `(record_date, insertion_order)` becomes `Ndp`; everyone else (including
/// every tambahan deposit) becomes `Rdp`. An all-tambahan (or empty)
/// non-tambahan set yields no `Ndp` at all.
pub fn classify(deposits: &[Deposit]) -> HashMap<DepositId, CustomerType> {
    let first_non_tambahan = deposits.iter().filter(|d| !d.is_tambahan()).min_by_key(|d| (d.record_date, d.insertion_order)).map(|d| d.id);

    deposits
        .iter()
        .map(|d| {
            let customer_type = if Some(d.id) == first_non_tambahan { CustomerType::Ndp } else { CustomerType::Rdp };
            (d.id, customer_type)
        })
        .collect()
}
