//! Pending joining dates chosen in the reconciliation dialog.

use std::collections::HashMap;

use chrono::NaiveDate;

/// Joining date per candidate id; `None` means the operator left it unset.
pub type PendingDates = HashMap<String, Option<NaiveDate>>;

/// Reconcile pending dates against a new candidate id list.
///
/// Ids already present keep their value, new ids start unset, and ids that
/// no longer appear are dropped.
pub fn merge_pending_dates<'a, I>(old: &PendingDates, new_ids: I) -> PendingDates
where
    I: IntoIterator<Item = &'a str>,
{
    new_ids
        .into_iter()
        .map(|id| (id.to_string(), old.get(id).copied().flatten()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(2025, 1, d)
    }

    #[test]
    fn test_merge_into_empty() {
        let merged = merge_pending_dates(&PendingDates::new(), ["A", "B"]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["A"], None);
        assert_eq!(merged["B"], None);
    }

    #[test]
    fn test_merge_keeps_existing_selection() {
        let mut old = PendingDates::new();
        old.insert("A".to_string(), date(5));
        old.insert("B".to_string(), None);

        let merged = merge_pending_dates(&old, ["A", "C"]);
        assert_eq!(merged["A"], date(5));
        assert_eq!(merged["C"], None);
    }

    #[test]
    fn test_merge_drops_stale_ids() {
        let mut old = PendingDates::new();
        old.insert("GONE".to_string(), date(9));

        let merged = merge_pending_dates(&old, ["A"]);
        assert!(!merged.contains_key("GONE"));
    }

    #[test]
    fn test_merge_with_no_ids() {
        let mut old = PendingDates::new();
        old.insert("A".to_string(), date(1));

        let merged = merge_pending_dates(&old, std::iter::empty());
        assert!(merged.is_empty());
    }
}
