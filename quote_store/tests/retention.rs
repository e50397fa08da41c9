mod common;

use diesel::prelude::*;

use common::TestDb;
use quote_store::models::{VnGoldRow, WorldGoldRow};
use quote_store::retention::{prune_vn_gold, prune_world_gold};
use quote_store::schema::{vn_gold, world_gold};

fn world_row(date: &str, close: f64) -> WorldGoldRow {
    WorldGoldRow {
        date: date.to_string(),
        open: None,
        high: None,
        low: None,
        close: Some(close),
        volume: None,
        source: Some("yahoo".to_string()),
    }
}

fn vn_row(ts: &str, brand: &str) -> VnGoldRow {
    VnGoldRow {
        ts: ts.to_string(),
        date: ts[..10].to_string(),
        brand: brand.to_string(),
        buy_price: Some(79.0e6),
        sell_price: Some(81.0e6),
        source: Some("cafef".to_string()),
    }
}

#[test]
fn keeps_last_k_distinct_dates_and_archives_the_rest() {
    let db = TestDb::new();
    let mut conn = db.conn();
    let archive = db.path("archive");

    let rows: Vec<WorldGoldRow> = ["2024-03-01", "2024-03-02", "2024-03-03", "2024-03-04"]
        .iter()
        .map(|d| world_row(d, 2100.0))
        .collect();
    diesel::insert_into(world_gold::table)
        .values(&rows)
        .execute(&mut conn)
        .unwrap();

    let outcome = prune_world_gold(&mut conn, &archive, 2).unwrap();
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.archived, 2);

    let remaining: Vec<String> = world_gold::table
        .select(world_gold::date)
        .order(world_gold::date.asc())
        .load(&mut conn)
        .unwrap();
    assert_eq!(remaining, vec!["2024-03-03", "2024-03-04"]);

    // Archive holds exactly the evicted rows, header + 2 records.
    let path = outcome.archive_path.expect("archive file written");
    assert!(path.starts_with(archive.join("world_gold")));
    let body = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = body.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("date"));
    assert!(lines[1].starts_with("2024-03-01"));
    assert!(lines[2].starts_with("2024-03-02"));
}

#[test]
fn fewer_dates_than_k_is_a_no_op() {
    let db = TestDb::new();
    let mut conn = db.conn();
    let archive = db.path("archive");

    diesel::insert_into(world_gold::table)
        .values(&[world_row("2024-03-01", 2100.0), world_row("2024-03-02", 2110.0)])
        .execute(&mut conn)
        .unwrap();

    let outcome = prune_world_gold(&mut conn, &archive, 10).unwrap();
    assert_eq!(outcome.deleted, 0);
    assert!(outcome.archive_path.is_none());
    assert!(!archive.join("world_gold").exists());
}

#[test]
fn date_counting_ignores_row_multiplicity() {
    let db = TestDb::new();
    let mut conn = db.conn();
    let archive = db.path("archive");

    // Three quotes on the oldest date; still only one distinct date evicted.
    let rows = vec![
        vn_row("2024-03-01T09:00:00", "SJC"),
        vn_row("2024-03-01T12:00:00", "SJC"),
        vn_row("2024-03-01T09:00:00", "PNJ"),
        vn_row("2024-03-02T09:00:00", "SJC"),
        vn_row("2024-03-03T09:00:00", "SJC"),
    ];
    diesel::insert_into(vn_gold::table)
        .values(&rows)
        .execute(&mut conn)
        .unwrap();

    let outcome = prune_vn_gold(&mut conn, &archive, 2).unwrap();
    assert_eq!(outcome.deleted, 3);
    assert_eq!(outcome.archived, 3);

    let dates: Vec<String> = vn_gold::table
        .select(vn_gold::date)
        .distinct()
        .order(vn_gold::date.asc())
        .load(&mut conn)
        .unwrap();
    assert_eq!(dates, vec!["2024-03-02", "2024-03-03"]);
}

#[test]
fn empty_table_prunes_to_nothing() {
    let db = TestDb::new();
    let mut conn = db.conn();
    let archive = db.path("archive");

    let outcome = prune_world_gold(&mut conn, &archive, 5).unwrap();
    assert_eq!(outcome.deleted, 0);
    assert_eq!(outcome.archived, 0);
    assert!(outcome.archive_path.is_none());
}
