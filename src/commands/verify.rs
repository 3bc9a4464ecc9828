use anyhow::Result;

use crate::commands::CommandReport;
use crate::ingest::config::load_config;
use crate::ingest::paths::{PathOverrides, resolve_paths};
use crate::ingest::pipeline::{list_merged_csvs, verify_merged_files};

#[derive(Debug, Clone, Default)]
pub struct VerifyOptions {
    pub paths: PathOverrides,
}

/// Re-check the date column of merged CSVs from a previous run without
/// touching the run logs.
pub fn run(opts: &VerifyOptions) -> Result<CommandReport> {
    let paths = resolve_paths(&opts.paths)?;
    let cfg = load_config(&paths.home)?;
    let mut report = CommandReport::new("verify");

    report.detail(format!("extracted_dir={}", paths.extracted_dir.display()));
    if !paths.extracted_dir.is_dir() {
        report.issue("extracted dir does not exist; run `rig-ingest run` first");
        return Ok(report);
    }

    let files = list_merged_csvs(&paths.extracted_dir)?;
    let failed = verify_merged_files(&files, cfg.layout.date_column);

    report.detail(format!("checked={}", files.len()));
    report.detail(format!("failed={}", failed.len()));
    for failure in &failed {
        match &failure.error {
            Some(err) => report.issue(format!("unreadable: {} ({err})", failure.path.display())),
            None => report.issue(format!("date column mismatch: {}", failure.path.display())),
        }
    }

    Ok(report)
}
