//! One-shot pipeline orchestration: ingest → gap-fill → prune.
//!
//! Sources are independent; a failure in one is logged and converted into a
//! step status without blocking the others. The first non-zero step status
//! becomes the run's exit code, but every subsequent step still executes.
//! Gap-fill always runs before prune: the pruner's cutoff counts distinct
//! dates present, so filling afterwards would retain too little.

use std::path::{Path, PathBuf};

use chrono::Utc;
use diesel::SqliteConnection;

use quote_ingestor::dedup::{WindowOutcome, dedup_and_sort, window_filter};
use quote_ingestor::normalize::{NormalizeOptions, normalize_payloads};
use quote_ingestor::output::write_snapshot;
use quote_ingestor::providers::{CafefSource, Source, YahooChart};

use crate::config::PipelineConfig;
use crate::fill::{fill_usd_vnd, fill_vn_gold, fill_world_gold};
use crate::import::{ImportError, load_quotes_json, upsert_fx, upsert_quotes, upsert_world};
use crate::retention::{prune_usd_vnd, prune_vn_gold, prune_world_gold};
use crate::runlog::RunLog;

/// Which ingestion sources to run and where intermediates go.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Ingest world gold + USD/VND via the chart source.
    pub world: bool,
    /// Crawl + import local quotes.
    pub vn: bool,
    /// Override for the crawl window (defaults to retention).
    pub crawler_days: Option<u32>,
    /// Basename for the crawl snapshot files.
    pub basename: String,
    /// Snapshot output directory (defaults to the config's data dir).
    pub outdir: Option<PathBuf>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            world: false,
            vn: false,
            crawler_days: None,
            basename: "vn_raw".to_string(),
            outdir: None,
        }
    }
}

/// Outcome of one pipeline step.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Step name as it appears in the log.
    pub name: &'static str,
    /// 0 on success; the original script's codes otherwise
    /// (1 fetch/import failure, 2 missing/empty input, 3 fill/prune failure).
    pub code: i32,
    /// Human-readable one-line summary.
    pub summary: String,
}

/// Aggregated result of one invocation.
#[derive(Debug)]
pub struct RunOutcome {
    /// First non-zero step code observed, 0 if everything succeeded.
    pub exit_code: i32,
    /// Every executed step, in order.
    pub reports: Vec<StepReport>,
}

impl RunOutcome {
    /// The combined human-readable report printed at the end of a run.
    pub fn combined_report(&self) -> String {
        self.reports
            .iter()
            .map(|r| {
                if r.code == 0 {
                    format!("{}: {}", r.name, r.summary)
                } else {
                    format!("{}: {} (status={})", r.name, r.summary, r.code)
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn record(
    log: &RunLog,
    reports: &mut Vec<StepReport>,
    rc: &mut i32,
    name: &'static str,
    code: i32,
    summary: String,
) {
    if let Err(e) = log.append(&format!("{name}: {summary} (status={code})")) {
        tracing::warn!(error = %e, "failed to append run log");
    }
    if code != 0 {
        tracing::warn!(step = name, code, summary = %summary, "step failed");
        if *rc == 0 {
            *rc = code;
        }
    } else {
        tracing::info!(step = name, summary = %summary, "step finished");
    }
    reports.push(StepReport {
        name,
        code,
        summary,
    });
}

/// Run the full pipeline once.
///
/// Per-source and per-table failures never escape this function as errors;
/// they become step statuses. Only infrastructure failures around the run
/// log bubble up.
pub async fn run(
    conn: &mut SqliteConnection,
    cfg: &PipelineConfig,
    opts: &RunOptions,
) -> anyhow::Result<RunOutcome> {
    if !opts.world && !opts.vn {
        return Ok(RunOutcome {
            exit_code: 0,
            reports: vec![StepReport {
                name: "select",
                code: 0,
                summary: "nothing selected; use world and/or vn".to_string(),
            }],
        });
    }

    let log = RunLog::new(cfg.log_file.clone());
    log.separator()?;
    log.append(&format!(
        "daily_update start (retention={})",
        cfg.retention_days
    ))?;

    let mut rc = 0i32;
    let mut reports = Vec::new();

    // 1) World gold + FX via the chart source.
    if opts.world {
        let (code, summary) = step_world(conn, cfg).await;
        record(&log, &mut reports, &mut rc, "world_ingest", code, summary);
    }

    // 2) Local crawl + import.
    if opts.vn {
        let days = opts.crawler_days.unwrap_or(cfg.retention_days);
        let outdir = opts.outdir.clone().unwrap_or_else(|| cfg.data_dir.clone());
        match step_vn_crawl(cfg, days, &outdir, &opts.basename).await {
            Ok((summary, latest_json)) => {
                record(&log, &mut reports, &mut rc, "vn_crawl", 0, summary);
                let (code, summary) = step_vn_import(conn, &latest_json);
                record(&log, &mut reports, &mut rc, "vn_import", code, summary);
            }
            Err((code, summary)) => {
                record(&log, &mut reports, &mut rc, "vn_crawl", code, summary);
            }
        }
    }

    // 3) Forward-fill, strictly before prune.
    {
        let k = cfg.retention_days;
        let mut code = 0;
        let mut parts = Vec::new();
        match fill_world_gold(conn, k) {
            Ok(n) => parts.push(format!("world_gold={n}")),
            Err(e) => {
                code = 3;
                parts.push(format!("world_gold failed: {e:#}"));
            }
        }
        match fill_usd_vnd(conn, k) {
            Ok(n) => parts.push(format!("usd_vnd={n}")),
            Err(e) => {
                code = 3;
                parts.push(format!("usd_vnd failed: {e:#}"));
            }
        }
        match fill_vn_gold(conn, k) {
            Ok(n) => parts.push(format!("vn_gold={n}")),
            Err(e) => {
                code = 3;
                parts.push(format!("vn_gold failed: {e:#}"));
            }
        }
        record(
            &log,
            &mut reports,
            &mut rc,
            "forward_fill",
            code,
            parts.join(", "),
        );
    }

    // 4) Prune + archive.
    {
        let k = cfg.retention_days;
        let dir = cfg.archive_dir.as_path();
        let mut code = 0;
        let mut parts = Vec::new();
        match prune_world_gold(conn, dir, k) {
            Ok(o) => parts.push(format!("world_gold deleted={}", o.deleted)),
            Err(e) => {
                code = 3;
                parts.push(format!("world_gold failed: {e}"));
            }
        }
        match prune_usd_vnd(conn, dir, k) {
            Ok(o) => parts.push(format!("usd_vnd deleted={}", o.deleted)),
            Err(e) => {
                code = 3;
                parts.push(format!("usd_vnd failed: {e}"));
            }
        }
        match prune_vn_gold(conn, dir, k) {
            Ok(o) => parts.push(format!("vn_gold deleted={}", o.deleted)),
            Err(e) => {
                code = 3;
                parts.push(format!("vn_gold failed: {e}"));
            }
        }
        record(
            &log,
            &mut reports,
            &mut rc,
            "prune_archive",
            code,
            parts.join(", "),
        );
    }

    log.append(&format!("daily_update end (exit={rc})"))?;
    Ok(RunOutcome {
        exit_code: rc,
        reports,
    })
}

async fn step_world(conn: &mut SqliteConnection, cfg: &PipelineConfig) -> (i32, String) {
    let lookback = cfg.retention_days;
    let mut code = 0;
    let mut parts = Vec::new();

    match ingest_chart(conn, "GC=F", lookback, ChartTarget::WorldGold).await {
        Ok(n) => parts.push(format!("world={n}")),
        Err(e) => {
            code = 1;
            parts.push(format!("world fetch failed: {e:#}"));
        }
    }
    match ingest_chart(conn, "VND=X", lookback, ChartTarget::UsdVnd).await {
        Ok(n) => parts.push(format!("fx={n}")),
        Err(e) => {
            code = 1;
            parts.push(format!("fx fetch failed: {e:#}"));
        }
    }
    (code, format!("upsert {}", parts.join(", ")))
}

enum ChartTarget {
    WorldGold,
    UsdVnd,
}

async fn ingest_chart(
    conn: &mut SqliteConnection,
    symbol: &str,
    lookback_days: u32,
    target: ChartTarget,
) -> anyhow::Result<usize> {
    let source = YahooChart::new(symbol, lookback_days)?;
    let bars = source.fetch().await?;
    match target {
        ChartTarget::WorldGold => upsert_world(conn, &bars, "yahoo"),
        ChartTarget::UsdVnd => upsert_fx(conn, &bars, "yahoo"),
    }
}

async fn step_vn_crawl(
    cfg: &PipelineConfig,
    days: u32,
    outdir: &Path,
    basename: &str,
) -> Result<(String, PathBuf), (i32, String)> {
    let source = CafefSource::new().map_err(|e| (1, format!("building crawler failed: {e}")))?;
    let raw = source
        .fetch()
        .await
        .map_err(|e| (1, format!("crawl failed: {e}")))?;
    if raw.is_empty() {
        return Err((2, "no data retrieved from any endpoint".to_string()));
    }

    let norm = NormalizeOptions {
        heuristics: cfg.heuristics.clone(),
    };
    let records = dedup_and_sort(normalize_payloads(&raw, &norm));

    match window_filter(records, days, Utc::now().naive_utc()) {
        WindowOutcome::NoInput => Err((2, "no valid records after parsing".to_string())),
        WindowOutcome::AllFiltered { parsed } => Err((
            2,
            format!("parsed {parsed} records, none within the last {days} days"),
        )),
        WindowOutcome::Kept(kept) => {
            let paths = write_snapshot(&kept, outdir, basename)
                .map_err(|e| (1, format!("snapshot write failed: {e}")))?;
            Ok((
                format!(
                    "crawled {} records -> {}",
                    kept.len(),
                    paths.latest_json.display()
                ),
                paths.latest_json,
            ))
        }
    }
}

fn step_vn_import(conn: &mut SqliteConnection, path: &Path) -> (i32, String) {
    match load_quotes_json(path) {
        Err(ImportError::MissingInput(p)) => (2, format!("missing JSON: {}", p.display())),
        Err(e) => (2, format!("loading quotes failed: {e}")),
        Ok(items) => match upsert_quotes(conn, &items, "cafef") {
            Ok(n) => (0, format!("imported {n} rows (source=cafef)")),
            Err(e) => (1, format!("import failed: {e:#}")),
        },
    }
}
