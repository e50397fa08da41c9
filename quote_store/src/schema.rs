//! Diesel table definitions for the quote warehouse.
#![allow(missing_docs)]

diesel::table! {
    /// Daily world-gold OHLCV, one row per calendar date.
    world_gold (date) {
        date -> Text,
        open -> Nullable<Double>,
        high -> Nullable<Double>,
        low -> Nullable<Double>,
        close -> Nullable<Double>,
        volume -> Nullable<Double>,
        source -> Nullable<Text>,
    }
}

diesel::table! {
    /// Daily USD/VND rate, one row per calendar date.
    usd_vnd (date) {
        date -> Text,
        rate -> Nullable<Double>,
        source -> Nullable<Text>,
    }
}

diesel::table! {
    /// Local quotes; multiple rows per day, keyed by (brand, ts).
    vn_gold (brand, ts) {
        ts -> Text,
        date -> Text,
        brand -> Text,
        buy_price -> Nullable<Double>,
        sell_price -> Nullable<Double>,
        source -> Nullable<Text>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(world_gold, usd_vnd, vn_gold);
