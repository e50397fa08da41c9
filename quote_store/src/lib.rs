//! SQLite warehouse for daily gold-price series.
//!
//! Stores three tables (world gold OHLCV, USD/VND rates, local brand
//! quotes) and provides the maintenance pipeline around them: upsert
//! import, forward gap-filling, keep-last-K retention with CSV archiving,
//! and a one-shot orchestrator wiring it all to the ingestion crate.

#![deny(missing_docs)]

pub mod config;
pub mod db;
pub mod fill;
pub mod import;
pub mod models;
pub mod orchestrator;
pub mod retention;
pub mod runlog;
pub mod schema;
