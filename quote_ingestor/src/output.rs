//! Snapshot output for crawled quotes.
//!
//! Each crawl writes a timestamped JSON + CSV pair under the output
//! directory, plus a stable `<basename>.json` "latest" copy that the store's
//! importer reads. Timestamped files are never overwritten across runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::errors::Error;
use crate::models::RawQuote;

/// Paths produced by one snapshot write.
#[derive(Debug, Clone)]
pub struct SnapshotPaths {
    /// Timestamped CSV file.
    pub csv: PathBuf,
    /// Timestamped JSON file.
    pub json: PathBuf,
    /// Stable latest-copy JSON consumed by the importer.
    pub latest_json: PathBuf,
}

/// Write `records` as a timestamped JSON + CSV snapshot plus a latest copy.
pub fn write_snapshot(
    records: &[RawQuote],
    outdir: &Path,
    basename: &str,
) -> Result<SnapshotPaths, Error> {
    fs::create_dir_all(outdir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");

    let json_path = outdir.join(format!("{basename}_{stamp}.json"));
    let json_body = serde_json::to_string_pretty(records)?;
    fs::write(&json_path, &json_body)?;

    let csv_path = outdir.join(format!("{basename}_{stamp}.csv"));
    write_csv(records, &csv_path)?;

    let latest = outdir.join(format!("{basename}.json"));
    fs::write(&latest, &json_body)?;

    tracing::info!(
        records = records.len(),
        json = %json_path.display(),
        csv = %csv_path.display(),
        latest = %latest.display(),
        "snapshot written"
    );
    Ok(SnapshotPaths {
        csv: csv_path,
        json: json_path,
        latest_json: latest,
    })
}

fn write_csv(records: &[RawQuote], path: &Path) -> Result<(), Error> {
    let mut w = csv::Writer::from_path(path)?;
    w.write_record([
        "Date",
        "Time",
        "Gold Type",
        "Buy Price (VND)",
        "Sell Price (VND)",
        "Timestamp",
    ])?;
    for r in records {
        w.write_record([
            r.date.as_str(),
            r.time.as_str(),
            r.gold_type.as_str(),
            &r.buy_price.to_string(),
            &r.sell_price.to_string(),
            r.timestamp.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
