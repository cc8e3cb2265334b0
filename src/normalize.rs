//! Identifier Normalizer (spec.md §4.A). Pure, no I/O.

use crate::row_data::RowData;
use std::collections::HashSet;

/// `normalize(s) = s.strip().upper()` on non-empty strings; empty/absent
/// values normalize to `None`.
pub fn normalize(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_uppercase()) }
}

/// Returns the set of normalized non-empty values among the given raw
/// identifier slots (e.g. a reservation's `customer_id`/`customer_name`).
pub fn key_set<'a>(raw_values: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    raw_values.into_iter().filter_map(normalize).collect()
}

/// Returns the set of normalized non-empty string values across every entry
/// of a record's row data. No field-name coupling: column labels are
/// irrelevant.
pub fn record_keys(row_data: &RowData) -> HashSet<String> {
    row_data.values().filter_map(normalize).collect()
}

/// A record matches a reservation iff any of its normalized row values
/// intersects any of the reservation's normalized key set (any-value-any-field).
pub fn matches(record_keys: &HashSet<String>, reservation_keys: &HashSet<String>) -> bool {
    !reservation_keys.is_disjoint(record_keys)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_uppercases() {
        assert_eq!(normalize("  bob  "), Some("BOB".to_string()));
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn key_set_drops_empties_and_dedups_via_normalization() {
        let keys = key_set(["  bob ", "BOB", ""]);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains("BOB"));
    }

    #[test]
    fn matches_is_field_agnostic() {
        let mut row = RowData::new();
        row.insert("Username", "bob");
        row.insert("Phone", "0800");
        let rkeys = record_keys(&row);
        let reservation_keys = key_set(["BOB"]);
        assert!(matches(&rkeys, &reservation_keys));
    }

    #[test]
    fn empty_intersection_does_not_match() {
        let mut row = RowData::new();
        row.insert("Username", "alice");
        let rkeys = record_keys(&row);
        let reservation_keys = key_set(["BOB"]);
        assert!(!matches(&rkeys, &reservation_keys));
    }
}
