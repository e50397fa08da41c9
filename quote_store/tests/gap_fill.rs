mod common;

use diesel::prelude::*;

use common::TestDb;
use quote_store::fill::{fill_vn_gold, fill_world_gold};
use quote_store::models::{VnGoldRow, WorldGoldRow};
use quote_store::schema::{vn_gold, world_gold};

fn world_row(date: &str, close: f64, source: &str) -> WorldGoldRow {
    WorldGoldRow {
        date: date.to_string(),
        open: Some(close - 1.0),
        high: Some(close + 1.0),
        low: Some(close - 2.0),
        close: Some(close),
        volume: Some(100.0),
        source: Some(source.to_string()),
    }
}

fn vn_row(ts: &str, brand: &str, buy: f64, source: &str) -> VnGoldRow {
    VnGoldRow {
        ts: ts.to_string(),
        date: ts[..10].to_string(),
        brand: brand.to_string(),
        buy_price: Some(buy),
        sell_price: Some(buy + 1.5e6),
        source: Some(source.to_string()),
    }
}

fn insert_world(conn: &mut SqliteConnection, rows: &[WorldGoldRow]) {
    diesel::insert_into(world_gold::table)
        .values(rows)
        .execute(conn)
        .unwrap();
}

fn insert_vn(conn: &mut SqliteConnection, rows: &[VnGoldRow]) {
    diesel::insert_into(vn_gold::table)
        .values(rows)
        .execute(conn)
        .unwrap();
}

#[test]
fn interior_gap_gets_one_synthetic_row() {
    let db = TestDb::new();
    let mut conn = db.conn();

    insert_world(
        &mut conn,
        &[
            world_row("2024-03-01", 2100.0, "yahoo"),
            world_row("2024-03-03", 2120.0, "yahoo"),
        ],
    );

    let made = fill_world_gold(&mut conn, 365).unwrap();
    assert_eq!(made, 1);

    let (close, source): (Option<f64>, Option<String>) = world_gold::table
        .filter(world_gold::date.eq("2024-03-02"))
        .select((world_gold::close, world_gold::source))
        .first(&mut conn)
        .unwrap();
    assert_eq!(close, Some(2100.0));
    assert_eq!(source.as_deref(), Some("yahoo+ffill"));

    // The real rows are untouched.
    let real: Option<String> = world_gold::table
        .filter(world_gold::date.eq("2024-03-03"))
        .select(world_gold::source)
        .first(&mut conn)
        .unwrap();
    assert_eq!(real.as_deref(), Some("yahoo"));
}

#[test]
fn second_run_synthesizes_nothing() {
    let db = TestDb::new();
    let mut conn = db.conn();

    insert_world(
        &mut conn,
        &[
            world_row("2024-03-01", 2100.0, "yahoo"),
            world_row("2024-03-05", 2150.0, "yahoo"),
        ],
    );

    assert_eq!(fill_world_gold(&mut conn, 365).unwrap(), 3);
    assert_eq!(fill_world_gold(&mut conn, 365).unwrap(), 0);
}

#[test]
fn leading_gap_without_history_stays_unfilled() {
    let db = TestDb::new();
    let mut conn = db.conn();

    // Window start lands before the first row ever recorded; those dates
    // have no carry and must remain absent.
    insert_world(
        &mut conn,
        &[
            world_row("2024-03-04", 2130.0, "yahoo"),
            world_row("2024-03-05", 2140.0, "yahoo"),
        ],
    );

    assert_eq!(fill_world_gold(&mut conn, 10).unwrap(), 0);
    let n: i64 = world_gold::table
        .select(diesel::dsl::count_star())
        .first(&mut conn)
        .unwrap();
    assert_eq!(n, 2);
}

#[test]
fn ffill_suffix_is_never_compounded() {
    let db = TestDb::new();
    let mut conn = db.conn();

    // A synthetic row from an earlier run seeds the next gap; its suffix
    // must not grow into "+ffill+ffill".
    insert_world(
        &mut conn,
        &[
            world_row("2024-03-01", 2100.0, "yahoo+ffill"),
            world_row("2024-03-03", 2120.0, "yahoo"),
        ],
    );

    fill_world_gold(&mut conn, 365).unwrap();

    let source: Option<String> = world_gold::table
        .filter(world_gold::date.eq("2024-03-02"))
        .select(world_gold::source)
        .first(&mut conn)
        .unwrap();
    assert_eq!(source.as_deref(), Some("yahoo+ffill"));
}

#[test]
fn brands_fill_independently() {
    let db = TestDb::new();
    let mut conn = db.conn();

    insert_vn(
        &mut conn,
        &[
            vn_row("2024-03-01T09:00:00", "SJC", 79.0e6, "cafef"),
            vn_row("2024-03-03T09:00:00", "SJC", 79.4e6, "cafef"),
            vn_row("2024-03-02T09:00:00", "PNJ", 76.0e6, "cafef"),
            vn_row("2024-03-03T09:00:00", "PNJ", 76.2e6, "cafef"),
        ],
    );

    // SJC misses 03-02; PNJ misses 03-01 with no prior history.
    let made = fill_vn_gold(&mut conn, 365).unwrap();
    assert_eq!(made, 1);

    let (buy, source): (Option<f64>, Option<String>) = vn_gold::table
        .filter(vn_gold::brand.eq("SJC").and(vn_gold::date.eq("2024-03-02")))
        .select((vn_gold::buy_price, vn_gold::source))
        .first(&mut conn)
        .unwrap();
    assert_eq!(buy, Some(79.0e6));
    assert_eq!(source.as_deref(), Some("cafef+ffill"));

    let pnj_on_first: i64 = vn_gold::table
        .filter(vn_gold::brand.eq("PNJ").and(vn_gold::date.eq("2024-03-01")))
        .select(diesel::dsl::count_star())
        .first(&mut conn)
        .unwrap();
    assert_eq!(pnj_on_first, 0);
}

#[test]
fn latest_quote_of_the_day_carries_forward() {
    let db = TestDb::new();
    let mut conn = db.conn();

    insert_vn(
        &mut conn,
        &[
            vn_row("2024-03-01T09:00:00", "SJC", 79.0e6, "cafef"),
            vn_row("2024-03-01T16:30:00", "SJC", 79.8e6, "cafef"),
            vn_row("2024-03-03T09:00:00", "SJC", 80.0e6, "cafef"),
        ],
    );

    fill_vn_gold(&mut conn, 365).unwrap();

    let buy: Option<f64> = vn_gold::table
        .filter(vn_gold::brand.eq("SJC").and(vn_gold::date.eq("2024-03-02")))
        .select(vn_gold::buy_price)
        .first(&mut conn)
        .unwrap();
    assert_eq!(buy, Some(79.8e6));
}
