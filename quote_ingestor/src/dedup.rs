//! Deduplication, ordering, and trailing-window filtering.

use chrono::{Days, NaiveDateTime};
use indexmap::IndexMap;

use crate::models::RawQuote;

/// Result of applying the trailing-day window.
///
/// Callers need to tell "nothing ever parsed" apart from "everything was
/// older than the window" for diagnostics, so the empty cases are distinct
/// variants rather than a bare empty vec.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOutcome {
    /// The input batch was already empty.
    NoInput,
    /// Records were parsed but every one fell outside the window.
    AllFiltered {
        /// How many records existed before filtering.
        parsed: usize,
    },
    /// Records remaining inside the window, still in timestamp order.
    Kept(Vec<RawQuote>),
}

/// Collapse exact duplicates and sort ascending by parsed timestamp.
///
/// The dedup key is the full tuple (date, time, label, buy, sell); the first
/// occurrence wins. The sort is stable, so ties keep their original order.
pub fn dedup_and_sort(records: Vec<RawQuote>) -> Vec<RawQuote> {
    let mut unique: IndexMap<(String, String, String, u64, u64), RawQuote> =
        IndexMap::with_capacity(records.len());
    for r in records {
        let key = (
            r.date.clone(),
            r.time.clone(),
            r.gold_type.clone(),
            r.buy_price.to_bits(),
            r.sell_price.to_bits(),
        );
        unique.entry(key).or_insert(r);
    }

    let mut out: Vec<RawQuote> = unique.into_values().collect();
    out.sort_by_key(|r| r.parsed_timestamp().unwrap_or(NaiveDateTime::MIN));
    out
}

/// Drop records older than `now − days` (closed-open window: `now` included).
pub fn window_filter(records: Vec<RawQuote>, days: u32, now: NaiveDateTime) -> WindowOutcome {
    if records.is_empty() {
        return WindowOutcome::NoInput;
    }
    let parsed = records.len();
    let cutoff = now
        .checked_sub_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDateTime::MIN);

    let kept: Vec<RawQuote> = records
        .into_iter()
        .filter(|r| r.parsed_timestamp().is_some_and(|ts| ts >= cutoff))
        .collect();

    if kept.is_empty() {
        WindowOutcome::AllFiltered { parsed }
    } else {
        WindowOutcome::Kept(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn quote(ts: &str, label: &str, buy: f64) -> RawQuote {
        let (date, time) = ts.split_once('T').unwrap();
        RawQuote {
            date: date.to_string(),
            time: time.to_string(),
            timestamp: ts.to_string(),
            gold_type: label.to_string(),
            buy_price: buy,
            sell_price: 0.0,
        }
    }

    #[test]
    fn exact_duplicates_collapse_first_wins() {
        let a = quote("2024-03-10T09:30:00", "SJC", 1.0);
        let out = dedup_and_sort(vec![a.clone(), a.clone(), a.clone()]);
        assert_eq!(out, vec![a]);
    }

    #[test]
    fn near_duplicates_survive() {
        let a = quote("2024-03-10T09:30:00", "SJC", 1.0);
        let b = quote("2024-03-10T09:30:00", "SJC", 2.0);
        assert_eq!(dedup_and_sort(vec![a, b]).len(), 2);
    }

    #[test]
    fn sorted_ascending_by_timestamp() {
        let a = quote("2024-03-11T00:00:00", "SJC", 1.0);
        let b = quote("2024-03-10T00:00:00", "SJC", 1.0);
        let out = dedup_and_sort(vec![a, b]);
        assert_eq!(out[0].date, "2024-03-10");
        assert_eq!(out[1].date, "2024-03-11");
    }

    #[test]
    fn window_distinguishes_empty_cases() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();

        assert_eq!(window_filter(vec![], 7, now), WindowOutcome::NoInput);

        let old = quote("2024-01-01T00:00:00", "SJC", 1.0);
        assert_eq!(
            window_filter(vec![old.clone()], 7, now),
            WindowOutcome::AllFiltered { parsed: 1 }
        );

        let fresh = quote("2024-03-18T00:00:00", "SJC", 1.0);
        match window_filter(vec![old, fresh.clone()], 7, now) {
            WindowOutcome::Kept(v) => assert_eq!(v, vec![fresh]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let now = NaiveDate::from_ymd_opt(2024, 3, 20)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        // Exactly now − 7 days.
        let edge = quote("2024-03-13T12:00:00", "SJC", 1.0);
        match window_filter(vec![edge.clone()], 7, now) {
            WindowOutcome::Kept(v) => assert_eq!(v, vec![edge]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
