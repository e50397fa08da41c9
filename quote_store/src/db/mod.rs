//! Database utilities: tuned SQLite connections and embedded migrations.
//!
//! [`connection::connect_sqlite`] applies WAL journaling, foreign_keys=ON,
//! and a 5000ms busy_timeout; [`migrate::run`] brings the schema up to date
//! from the migrations embedded in this crate.

pub mod connection;
pub mod migrate;

pub use connection::connect_sqlite;
