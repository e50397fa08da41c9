//! Gap filler: carry-forward reconstruction of missing calendar dates.
//!
//! Within a keep-window of `K` trailing distinct dates ending at the most
//! recent date present, every missing date gets one synthetic row copying
//! the most recent prior real values, with `+ffill` appended to the carried
//! provenance (at most once; an already-suffixed carry is reused as-is).
//! Real rows are never touched and inserts are insert-if-absent, so repeat
//! runs synthesize nothing.
//!
//! Must run before the retention pruner: the pruner's cutoff counts
//! distinct dates present, and an unfilled series would look shorter than
//! it is.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use diesel::dsl::max;
use diesel::prelude::*;

use crate::models::{UsdVndRow, VnGoldRow, WorldGoldRow};
use crate::schema::{usd_vnd, vn_gold, world_gold};

const DATE_FMT: &str = "%Y-%m-%d";

/// The running carry: numeric fields plus provenance of the newest real row
/// seen so far during the walk.
#[derive(Debug, Clone, PartialEq)]
struct Carry {
    values: Vec<Option<f64>>,
    source: Option<String>,
}

/// Provenance for a synthetic row derived from `prev`.
///
/// Appends `+ffill` exactly once; a carry that is already suffixed (seeded
/// from a synthetic row) passes through unchanged.
fn ffill_source(prev: Option<&str>) -> String {
    match prev {
        Some(s) if s.ends_with("+ffill") => s.to_string(),
        Some(s) if !s.is_empty() => format!("{s}+ffill"),
        _ => "ffill".to_string(),
    }
}

/// Walk `[start, end]` and plan the synthetic rows to insert.
///
/// A real row at a date advances the carry and is left alone; a gap with a
/// live carry yields one synthetic row; a gap with no carry (no prior
/// history at all) stays unfilled. The carry keeps the *real* provenance
/// while walking gaps, so consecutive gaps all derive from the same value.
fn plan_fill(
    start: NaiveDate,
    end: NaiveDate,
    existing: &BTreeMap<NaiveDate, Carry>,
    seed: Option<Carry>,
) -> Vec<(NaiveDate, Vec<Option<f64>>, String)> {
    let mut carry = seed;
    let mut out = Vec::new();
    let mut d = start;
    while d <= end {
        if let Some(real) = existing.get(&d) {
            carry = Some(real.clone());
        } else if let Some(c) = &carry {
            out.push((d, c.values.clone(), ffill_source(c.source.as_deref())));
        }
        let Some(next) = d.succ_opt() else { break };
        d = next;
    }
    out
}

fn window_bounds(max_date: &str, keep_days: u32) -> anyhow::Result<(NaiveDate, NaiveDate)> {
    let end = NaiveDate::parse_from_str(max_date, DATE_FMT)?;
    let start = end
        .checked_sub_days(Days::new(u64::from(keep_days) - 1))
        .unwrap_or(end);
    Ok((start, end))
}

/// Fill missing dates in `world_gold`. Returns rows synthesized.
pub fn fill_world_gold(conn: &mut SqliteConnection, keep_days: u32) -> anyhow::Result<usize> {
    if keep_days == 0 {
        return Ok(0);
    }
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let max_date: Option<String> = world_gold::table
            .select(max(world_gold::date))
            .first(conn)?;
        let Some(max_date) = max_date else {
            return Ok(0);
        };
        let (start, end) = window_bounds(&max_date, keep_days)?;
        let start_str = start.format(DATE_FMT).to_string();

        let rows: Vec<WorldGoldRow> = world_gold::table
            .filter(world_gold::date.ge(&start_str))
            .order(world_gold::date.asc())
            .load(conn)?;
        let mut existing = BTreeMap::new();
        for r in rows {
            let d = NaiveDate::parse_from_str(&r.date, DATE_FMT)?;
            existing.insert(
                d,
                Carry {
                    values: vec![r.open, r.high, r.low, r.close, r.volume],
                    source: r.source,
                },
            );
        }

        let seed = world_gold::table
            .filter(world_gold::date.lt(&start_str))
            .order(world_gold::date.desc())
            .first::<WorldGoldRow>(conn)
            .optional()?
            .map(|r| Carry {
                values: vec![r.open, r.high, r.low, r.close, r.volume],
                source: r.source,
            });

        let mut inserted = 0;
        for (d, vals, src) in plan_fill(start, end, &existing, seed) {
            inserted += diesel::insert_into(world_gold::table)
                .values(&WorldGoldRow {
                    date: d.format(DATE_FMT).to_string(),
                    open: vals[0],
                    high: vals[1],
                    low: vals[2],
                    close: vals[3],
                    volume: vals[4],
                    source: Some(src),
                })
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// Fill missing dates in `usd_vnd`. Returns rows synthesized.
pub fn fill_usd_vnd(conn: &mut SqliteConnection, keep_days: u32) -> anyhow::Result<usize> {
    if keep_days == 0 {
        return Ok(0);
    }
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let max_date: Option<String> = usd_vnd::table.select(max(usd_vnd::date)).first(conn)?;
        let Some(max_date) = max_date else {
            return Ok(0);
        };
        let (start, end) = window_bounds(&max_date, keep_days)?;
        let start_str = start.format(DATE_FMT).to_string();

        let rows: Vec<UsdVndRow> = usd_vnd::table
            .filter(usd_vnd::date.ge(&start_str))
            .order(usd_vnd::date.asc())
            .load(conn)?;
        let mut existing = BTreeMap::new();
        for r in rows {
            let d = NaiveDate::parse_from_str(&r.date, DATE_FMT)?;
            existing.insert(
                d,
                Carry {
                    values: vec![r.rate],
                    source: r.source,
                },
            );
        }

        let seed = usd_vnd::table
            .filter(usd_vnd::date.lt(&start_str))
            .order(usd_vnd::date.desc())
            .first::<UsdVndRow>(conn)
            .optional()?
            .map(|r| Carry {
                values: vec![r.rate],
                source: r.source,
            });

        let mut inserted = 0;
        for (d, vals, src) in plan_fill(start, end, &existing, seed) {
            inserted += diesel::insert_into(usd_vnd::table)
                .values(&UsdVndRow {
                    date: d.format(DATE_FMT).to_string(),
                    rate: vals[0],
                    source: Some(src),
                })
                .on_conflict_do_nothing()
                .execute(conn)?;
        }
        Ok(inserted)
    })
}

/// Fill missing dates in `vn_gold`, independently per brand.
///
/// Synthetic rows get a brand-disjoint timestamp (`T12:00:<brand index>`)
/// so the `(brand, ts)` key never collides across brands filled on the same
/// date. Returns rows synthesized across all brands.
pub fn fill_vn_gold(conn: &mut SqliteConnection, keep_days: u32) -> anyhow::Result<usize> {
    if keep_days == 0 {
        return Ok(0);
    }
    conn.immediate_transaction::<_, anyhow::Error, _>(|conn| {
        let max_date: Option<String> = vn_gold::table.select(max(vn_gold::date)).first(conn)?;
        let Some(max_date) = max_date else {
            return Ok(0);
        };
        let (start, end) = window_bounds(&max_date, keep_days)?;
        let start_str = start.format(DATE_FMT).to_string();
        let end_str = end.format(DATE_FMT).to_string();

        let brands: Vec<String> = vn_gold::table
            .select(vn_gold::brand)
            .distinct()
            .order(vn_gold::brand.asc())
            .load(conn)?;

        let mut inserted = 0;
        for (i, b) in brands.iter().enumerate() {
            // Seed from the newest row at or before the window start.
            let seed = vn_gold::table
                .filter(vn_gold::brand.eq(b).and(vn_gold::date.le(&start_str)))
                .order((vn_gold::date.desc(), vn_gold::ts.desc()))
                .select((vn_gold::buy_price, vn_gold::sell_price, vn_gold::source))
                .first::<(Option<f64>, Option<f64>, Option<String>)>(conn)
                .optional()?
                .map(|(bp, sp, src)| Carry {
                    values: vec![bp, sp],
                    source: src,
                });

            // Latest-by-ts row per date wins for seeding purposes.
            let rows: Vec<(String, Option<f64>, Option<f64>, Option<String>)> = vn_gold::table
                .filter(
                    vn_gold::brand
                        .eq(b)
                        .and(vn_gold::date.ge(&start_str))
                        .and(vn_gold::date.le(&end_str)),
                )
                .order((vn_gold::date.asc(), vn_gold::ts.asc()))
                .select((
                    vn_gold::date,
                    vn_gold::buy_price,
                    vn_gold::sell_price,
                    vn_gold::source,
                ))
                .load(conn)?;
            let mut existing = BTreeMap::new();
            for (d, bp, sp, src) in rows {
                let d = NaiveDate::parse_from_str(&d, DATE_FMT)?;
                existing.insert(
                    d,
                    Carry {
                        values: vec![bp, sp],
                        source: src,
                    },
                );
            }

            for (d, vals, src) in plan_fill(start, end, &existing, seed) {
                // Seconds field caps at 59.
                let synth_ts = format!("{}T12:00:{:02}", d.format(DATE_FMT), i % 60);
                inserted += diesel::insert_into(vn_gold::table)
                    .values(&VnGoldRow {
                        ts: synth_ts,
                        date: d.format(DATE_FMT).to_string(),
                        brand: b.clone(),
                        buy_price: vals[0],
                        sell_price: vals[1],
                        source: Some(src),
                    })
                    .on_conflict_do_nothing()
                    .execute(conn)?;
            }
        }
        Ok(inserted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FMT).unwrap()
    }

    fn carry(v: f64, src: &str) -> Carry {
        Carry {
            values: vec![Some(v)],
            source: Some(src.to_string()),
        }
    }

    #[test]
    fn ffill_suffix_appends_once() {
        assert_eq!(ffill_source(Some("cafef")), "cafef+ffill");
        assert_eq!(ffill_source(Some("cafef+ffill")), "cafef+ffill");
        assert_eq!(ffill_source(Some("")), "ffill");
        assert_eq!(ffill_source(None), "ffill");
    }

    #[test]
    fn plan_fills_interior_gap_from_prior_real_value() {
        let mut existing = BTreeMap::new();
        existing.insert(d("2024-03-01"), carry(10.0, "yfinance"));
        existing.insert(d("2024-03-03"), carry(12.0, "yfinance"));

        let plan = plan_fill(d("2024-03-01"), d("2024-03-03"), &existing, None);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].0, d("2024-03-02"));
        assert_eq!(plan[0].1, vec![Some(10.0)]);
        assert_eq!(plan[0].2, "yfinance+ffill");
    }

    #[test]
    fn leading_gap_without_seed_stays_unfilled() {
        let mut existing = BTreeMap::new();
        existing.insert(d("2024-03-03"), carry(12.0, "yfinance"));

        let plan = plan_fill(d("2024-03-01"), d("2024-03-03"), &existing, None);
        assert!(plan.is_empty());
    }

    #[test]
    fn seed_covers_leading_gap() {
        let existing = BTreeMap::new();
        let plan = plan_fill(
            d("2024-03-01"),
            d("2024-03-02"),
            &existing,
            Some(carry(9.0, "yfinance")),
        );
        assert_eq!(plan.len(), 2);
        // Both gap days derive from the same carried value, suffixed once.
        assert!(plan.iter().all(|(_, v, s)| v == &vec![Some(9.0)] && s == "yfinance+ffill"));
    }

    #[test]
    fn synthetic_seed_does_not_compound_suffix() {
        let existing = BTreeMap::new();
        let plan = plan_fill(
            d("2024-03-01"),
            d("2024-03-01"),
            &existing,
            Some(carry(9.0, "cafef+ffill")),
        );
        assert_eq!(plan[0].2, "cafef+ffill");
    }
}
