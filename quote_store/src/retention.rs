//! Retention pruner: keep only the K most recent distinct dates per table,
//! archiving evicted rows to CSV before deleting them.
//!
//! The archive write is flushed and fsynced before the delete is issued. A
//! crash between the two therefore produces the same rows again in the next
//! run's archive file, never a silent loss. Archive files are timestamped
//! per table per run and never appended to or overwritten.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use chrono::Local;
use diesel::prelude::*;
use serde::Serialize;
use thiserror::Error;

use crate::models::{UsdVndRow, VnGoldRow, WorldGoldRow};
use crate::schema::{usd_vnd, vn_gold, world_gold};

/// Failures inside one table's archive-then-delete step.
///
/// Any of these aborts that table's eviction for the run; no delete is ever
/// issued without a matching durable archive.
#[derive(Debug, Error)]
pub enum RetentionError {
    /// Filesystem failure while writing the archive.
    #[error("archive I/O error")]
    Io(#[from] std::io::Error),

    /// CSV serialization failure while writing the archive.
    #[error("archive CSV error")]
    Csv(#[from] csv::Error),

    /// Database failure selecting or deleting the eviction set.
    #[error("database error")]
    Db(#[from] diesel::result::Error),

    /// The delete did not remove exactly the archived rows.
    #[error("archived {archived} rows but deleted {deleted}")]
    CountMismatch {
        /// Rows written to the archive file.
        archived: usize,
        /// Rows the delete statement removed.
        deleted: usize,
    },
}

/// Result of pruning one table.
#[derive(Debug, Clone, Default)]
pub struct PruneOutcome {
    /// Rows written to the archive file (equals `deleted` on success).
    pub archived: usize,
    /// Rows deleted from the table.
    pub deleted: usize,
    /// The archive file, when anything was evicted.
    pub archive_path: Option<PathBuf>,
}

/// Write the eviction set verbatim to a new timestamped CSV and fsync it.
///
/// Header row comes from the row struct's field names (= column names).
fn archive_rows<T: Serialize>(
    rows: &[T],
    archive_dir: &Path,
    table: &str,
) -> Result<PathBuf, RetentionError> {
    let outdir = archive_dir.join(table);
    fs::create_dir_all(&outdir)?;
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = outdir.join(format!("{table}_deleted_{stamp}.csv"));

    let file = File::create(&path)?;
    {
        let mut w = csv::Writer::from_writer(&file);
        for row in rows {
            w.serialize(row)?;
        }
        w.flush()?;
    }
    // Durable before any delete may run.
    file.sync_all()?;

    tracing::info!(table, rows = rows.len(), path = %path.display(), "archived eviction set");
    Ok(path)
}

/// The smallest of the K largest distinct dates, or `None` when the table
/// holds no dates (nothing to evict either way).
fn cutoff_from(mut distinct_desc: Vec<String>) -> Option<String> {
    // Sorted descending; the kept window's minimum is the last entry.
    distinct_desc.pop()
}

fn finish(
    archived: usize,
    deleted: usize,
    path: PathBuf,
    table: &str,
) -> Result<PruneOutcome, RetentionError> {
    if deleted != archived {
        return Err(RetentionError::CountMismatch { archived, deleted });
    }
    tracing::info!(table, deleted, "prune finished");
    Ok(PruneOutcome {
        archived,
        deleted,
        archive_path: Some(path),
    })
}

/// Prune `world_gold` to its `keep_days` most recent distinct dates,
/// archiving evicted rows first. `archived == deleted` is enforced.
pub fn prune_world_gold(
    conn: &mut SqliteConnection,
    archive_dir: &Path,
    keep_days: u32,
) -> Result<PruneOutcome, RetentionError> {
    let distinct: Vec<String> = world_gold::table
        .select(world_gold::date)
        .distinct()
        .order(world_gold::date.desc())
        .limit(i64::from(keep_days))
        .load(conn)?;
    let Some(cutoff) = cutoff_from(distinct) else {
        return Ok(PruneOutcome::default());
    };

    let rows: Vec<WorldGoldRow> = world_gold::table
        .filter(world_gold::date.lt(&cutoff))
        .order(world_gold::date.asc())
        .load(conn)?;
    if rows.is_empty() {
        return Ok(PruneOutcome::default());
    }

    let path = archive_rows(&rows, archive_dir, "world_gold")?;
    let deleted = conn.immediate_transaction(|conn| {
        diesel::delete(world_gold::table.filter(world_gold::date.lt(&cutoff))).execute(conn)
    })?;
    finish(rows.len(), deleted, path, "world_gold")
}

/// Prune `usd_vnd`; see [`prune_world_gold`].
pub fn prune_usd_vnd(
    conn: &mut SqliteConnection,
    archive_dir: &Path,
    keep_days: u32,
) -> Result<PruneOutcome, RetentionError> {
    let distinct: Vec<String> = usd_vnd::table
        .select(usd_vnd::date)
        .distinct()
        .order(usd_vnd::date.desc())
        .limit(i64::from(keep_days))
        .load(conn)?;
    let Some(cutoff) = cutoff_from(distinct) else {
        return Ok(PruneOutcome::default());
    };

    let rows: Vec<UsdVndRow> = usd_vnd::table
        .filter(usd_vnd::date.lt(&cutoff))
        .order(usd_vnd::date.asc())
        .load(conn)?;
    if rows.is_empty() {
        return Ok(PruneOutcome::default());
    }

    let path = archive_rows(&rows, archive_dir, "usd_vnd")?;
    let deleted = conn.immediate_transaction(|conn| {
        diesel::delete(usd_vnd::table.filter(usd_vnd::date.lt(&cutoff))).execute(conn)
    })?;
    finish(rows.len(), deleted, path, "usd_vnd")
}

/// Prune `vn_gold` (many rows per date); see [`prune_world_gold`].
pub fn prune_vn_gold(
    conn: &mut SqliteConnection,
    archive_dir: &Path,
    keep_days: u32,
) -> Result<PruneOutcome, RetentionError> {
    let distinct: Vec<String> = vn_gold::table
        .select(vn_gold::date)
        .distinct()
        .order(vn_gold::date.desc())
        .limit(i64::from(keep_days))
        .load(conn)?;
    let Some(cutoff) = cutoff_from(distinct) else {
        return Ok(PruneOutcome::default());
    };

    let rows: Vec<VnGoldRow> = vn_gold::table
        .filter(vn_gold::date.lt(&cutoff))
        .order((vn_gold::date.asc(), vn_gold::ts.asc()))
        .load(conn)?;
    if rows.is_empty() {
        return Ok(PruneOutcome::default());
    }

    let path = archive_rows(&rows, archive_dir, "vn_gold")?;
    let deleted = conn.immediate_transaction(|conn| {
        diesel::delete(vn_gold::table.filter(vn_gold::date.lt(&cutoff))).execute(conn)
    })?;
    finish(rows.len(), deleted, path, "vn_gold")
}
