//! Upstream quote ingestion: fetch, normalize, deduplicate, snapshot.
//!
//! This crate turns heterogeneous upstream payloads (CafeF Ajax endpoints,
//! Yahoo chart API) into canonical [`models::RawQuote`] records ready for
//! import into the quote store.

pub mod dedup;
pub mod errors;
pub mod models;
pub mod normalize;
pub mod output;
pub mod providers;
pub mod timeparse;
