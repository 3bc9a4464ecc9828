use crate::error::ErrorCode;
use crate::ingest::combine::combine_csv_files;
use crate::ingest::config::IngestConfig;
use crate::ingest::context::RunContext;
use crate::ingest::date::extract_date;
use crate::ingest::date_column::{append_date_column, verify_date_column};
use crate::ingest::index_lookup::rewrite_with_index;
use crate::ingest::paths::IngestPaths;
use crate::ingest::reader::ArchiveKind;
use crate::ingest::runlog::RunLog;
use crate::ingest::walker::{WalkOutcome, merge_archive, merged_csv_path};
use crate::ingest::warn::WarnEvent;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub archives: Vec<WalkOutcome>,
    pub csv_members_found: usize,
    pub processed_members: Vec<String>,
    pub missing_date_archives: Vec<PathBuf>,
    pub error_members: Vec<String>,
    pub raw_lines: usize,
    pub filtered_lines: usize,
    /// Sum of the line counts each archive walk reported.
    pub input_lines: usize,
    pub merged_lines: usize,
    pub combined_lines: usize,
    /// `None` when no index file was present.
    pub index_matches: Option<usize>,
    pub verified_files: usize,
    pub failed_verification: Vec<PathBuf>,
}

/// Supported archives directly inside `dir`, ordered by file name.
pub fn discover_archives(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && ArchiveKind::from_path(&path).is_some() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

/// Merged CSVs left in the extracted directory by an earlier run.
pub fn list_merged_csvs(extracted_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    let entries = fs::read_dir(extracted_dir)
        .with_context(|| format!("failed to read {}", extracted_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn count_lines(path: &Path) -> Result<usize> {
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(raw.split_inclusive('\n').count())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyFailure {
    pub path: PathBuf,
    /// Set when the file could not be read at all.
    pub error: Option<String>,
}

/// Check the date column of every merged CSV and return the ones that fail.
pub fn verify_merged_files(files: &[PathBuf], column: usize) -> Vec<VerifyFailure> {
    let mut failed = Vec::new();
    for file in files {
        match verify_date_column(file, column) {
            Ok(true) => {}
            Ok(false) => failed.push(VerifyFailure {
                path: file.clone(),
                error: None,
            }),
            Err(err) => failed.push(VerifyFailure {
                path: file.clone(),
                error: Some(format!("{err:#}")),
            }),
        }
    }
    failed
}

pub fn log_verification(log: &RunLog, checked: usize, failed: &[PathBuf]) -> Result<()> {
    log.info(&format!(
        "Verification Summary: {checked} files checked. {} files failed verification.",
        failed.len()
    ))?;
    for file in failed {
        log.info(&format!(
            "Error: {} does not have correct date column ({})",
            file.display(),
            extract_date(&file.display().to_string())
        ))?;
    }
    Ok(())
}

/// Run every step once, in order: walk and date-tag each archive, combine,
/// rewrite station names from the index, verify, then report.
pub fn run_pipeline(paths: &IngestPaths, cfg: &IngestConfig, log: &RunLog) -> Result<RunSummary> {
    fs::create_dir_all(&paths.results_dir)
        .with_context(|| format!("failed to create {}", paths.results_dir.display()))?;
    log.reset()?;
    let mut ctx = RunContext::new();
    let mut summary = RunSummary::default();

    fs::create_dir_all(&paths.extracted_dir)
        .with_context(|| format!("failed to create {}", paths.extracted_dir.display()))?;
    let archives = discover_archives(&paths.archives_dir)?;

    let mut merged_files = Vec::with_capacity(archives.len());
    for archive in &archives {
        let merged = merged_csv_path(&paths.extracted_dir, archive);
        let outcome = merge_archive(archive, &merged, cfg, &mut ctx, log)?;
        append_date_column(&merged, cfg.layout.date_column)?;
        summary.input_lines += outcome.lines_written;
        merged_files.push(merged);
        summary.archives.push(outcome);
    }

    for merged in &merged_files {
        summary.merged_lines += count_lines(merged)?;
    }

    summary.combined_lines = combine_csv_files(&merged_files, &paths.combined_csv, log)?;

    if paths.index_file.exists() {
        let matches = rewrite_with_index(&paths.combined_csv, &paths.index_file, &cfg.layout, log)?;
        log.console(&format!(
            "Updated {matches} entries in the combined CSV file based on index file."
        ));
        summary.index_matches = Some(matches);
    } else {
        let index_str = paths.index_file.display().to_string();
        log.warn(WarnEvent {
            code: ErrorCode::E006IndexUnavailable,
            stage: "index-rewrite",
            archive: "",
            member: &index_str,
            reason: "index file not found, column updates skipped",
        });
    }

    for failure in verify_merged_files(&merged_files, cfg.layout.date_column) {
        if let Some(err) = &failure.error {
            log.error(&format!("Error verifying {}: {err}", failure.path.display()))?;
        }
        summary.failed_verification.push(failure.path);
    }
    summary.verified_files = merged_files.len();

    summary.csv_members_found = ctx.csv_members_found;
    summary.raw_lines = ctx.raw_lines;
    summary.filtered_lines = ctx.filtered_lines;
    summary.processed_members = ctx.processed_members;
    summary.missing_date_archives = ctx.missing_date_archives;
    summary.error_members = ctx.error_members.into_iter().collect();

    report(&summary, log)?;
    Ok(summary)
}

fn report(summary: &RunSummary, log: &RunLog) -> Result<()> {
    log.info("Final Summary:")?;
    log.info(&format!(
        "Total raw lines (before filtering): {}",
        summary.raw_lines
    ))?;
    log.info(&format!(
        "Total lines after filtering: {}",
        summary.filtered_lines
    ))?;
    log.info(&format!(
        "Total merged lines (final files): {}",
        summary.merged_lines
    ))?;
    log.info(&format!(
        "Total lines in combined file: {}",
        summary.combined_lines
    ))?;
    log.info(&format!(
        "Total archives processed: {}",
        summary.archives.len()
    ))?;
    log.info(&format!(
        "Total CSV files processed: {}",
        summary.processed_members.len()
    ))?;
    log.info(&format!(
        "Global input lines (sum of filtered lines across archives): {}",
        summary.input_lines
    ))?;

    log.console(&format!(
        "Total CSV files found in compressed files: {}",
        summary.csv_members_found
    ));
    log.console("Processed CSV files:");
    for name in &summary.processed_members {
        log.console(&format!(" - {name}"));
    }
    if summary.missing_date_archives.is_empty() {
        log.console("No archives with missing date info found.");
    } else {
        log.console("Archives with missing date info:");
        for archive in &summary.missing_date_archives {
            log.console(&format!(" - {}", archive.display()));
        }
    }

    log_verification(log, summary.verified_files, &summary.failed_verification)
}
