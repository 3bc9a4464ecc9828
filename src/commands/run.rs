use anyhow::Result;

use crate::commands::CommandReport;
use crate::ingest::config::load_config;
use crate::ingest::paths::{PathOverrides, resolve_paths};
use crate::ingest::pipeline::run_pipeline;
use crate::ingest::runlog::RunLog;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub paths: PathOverrides,
    pub echo: bool,
}

pub fn run(opts: &RunOptions) -> Result<CommandReport> {
    let paths = resolve_paths(&opts.paths)?;
    let cfg = load_config(&paths.home)?;
    let mut report = CommandReport::new("run");

    report.detail(format!("archives_dir={}", paths.archives_dir.display()));
    report.detail(format!("results_dir={}", paths.results_dir.display()));

    if !paths.archives_dir.is_dir() {
        report.issue(format!(
            "archives dir does not exist: {}",
            paths.archives_dir.display()
        ));
        return Ok(report);
    }

    let log = RunLog::new(&paths.results_dir, opts.echo);
    let summary = run_pipeline(&paths, &cfg, &log)?;

    for archive in &summary.archives {
        report.detail(format!(
            "archive={} date={} members={} lines={}",
            archive.archive.display(),
            archive.date,
            archive.members_processed,
            archive.lines_written
        ));
    }
    report.detail(format!("archives={}", summary.archives.len()));
    report.detail(format!("csv_members_found={}", summary.csv_members_found));
    report.detail(format!(
        "csv_members_processed={}",
        summary.processed_members.len()
    ));
    report.detail(format!("lines.raw={}", summary.raw_lines));
    report.detail(format!("lines.filtered={}", summary.filtered_lines));
    report.detail(format!("lines.merged={}", summary.merged_lines));
    report.detail(format!("lines.combined={}", summary.combined_lines));
    match summary.index_matches {
        Some(matches) => report.detail(format!("index.matches={matches}")),
        None => report.detail(format!(
            "index.skipped=missing ({})",
            paths.index_file.display()
        )),
    }
    for archive in &summary.missing_date_archives {
        report.detail(format!("missing_date={}", archive.display()));
    }
    for member in &summary.error_members {
        report.detail(format!("member_error={member}"));
    }
    report.detail(format!(
        "verify.checked={} verify.failed={}",
        summary.verified_files,
        summary.failed_verification.len()
    ));
    for file in &summary.failed_verification {
        report.detail(format!("verify.failed_file={}", file.display()));
    }
    report.detail(format!("combined_csv={}", paths.combined_csv.display()));
    report.detail(format!("merge_log={}", log.merge_log_path().display()));
    report.detail(format!("error_log={}", log.error_log_path().display()));

    Ok(report)
}
