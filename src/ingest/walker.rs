use crate::error::{ErrorCode, IngestError};
use crate::ingest::config::IngestConfig;
use crate::ingest::context::RunContext;
use crate::ingest::date::{extract_date, is_sentinel};
use crate::ingest::decode::read_member_lines;
use crate::ingest::filter::filter_lines;
use crate::ingest::reader::{ArchiveReader, open_archive};
use crate::ingest::runlog::RunLog;
use crate::ingest::warn::WarnEvent;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct WalkOutcome {
    pub archive: PathBuf,
    pub merged_csv: PathBuf,
    pub date: String,
    pub members_processed: usize,
    pub lines_written: usize,
}

/// Final path component of an entry name, ignoring trailing separators.
pub fn member_base_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

pub fn is_csv_candidate(name: &str, min_name_len: usize) -> bool {
    let base = member_base_name(name);
    base.to_ascii_lowercase().ends_with(".csv") && base.chars().count() > min_name_len
}

/// `extracted/<archive name without its last extension>.csv`
pub fn merged_csv_path(extracted_dir: &Path, archive: &Path) -> PathBuf {
    let stem = archive
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string());
    extracted_dir.join(format!("{stem}.csv"))
}

fn report_unreadable(log: &RunLog, archive: &str, what: &str, err: &anyhow::Error) -> Result<()> {
    log.error(&format!("Error {what} {archive}: {err:#}"))?;
    log.warn(WarnEvent {
        code: ErrorCode::E002ArchiveUnreadable,
        stage: "walk",
        archive,
        member: "",
        reason: &format!("{err:#}"),
    });
    Ok(())
}

fn write_summary(log: &RunLog, outcome: &WalkOutcome) -> Result<()> {
    log.info(&format!(
        "Merged CSV created at: {}; Processed {} CSV files, total {} lines",
        outcome.merged_csv.display(),
        outcome.members_processed,
        outcome.lines_written
    ))
}

/// Walk one archive into its merged CSV. Unreadable members are logged,
/// blacklisted and skipped; only failures writing the merged CSV escape.
pub fn merge_archive(
    archive: &Path,
    merged_csv: &Path,
    cfg: &IngestConfig,
    ctx: &mut RunContext,
    log: &RunLog,
) -> Result<WalkOutcome> {
    let archive_str = archive.display().to_string();
    let date = extract_date(&archive_str);
    if is_sentinel(&date) {
        ctx.missing_date_archives.push(archive.to_path_buf());
        log.warn(WarnEvent {
            code: ErrorCode::E003MissingDate,
            stage: "walk",
            archive: &archive_str,
            member: "",
            reason: "missing date in archive name",
        });
    }

    if let Some(parent) = merged_csv.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(merged_csv)
        .with_context(|| format!("failed to create {}", merged_csv.display()))?;
    let mut out = BufWriter::new(file);

    let mut outcome = WalkOutcome {
        archive: archive.to_path_buf(),
        merged_csv: merged_csv.to_path_buf(),
        date,
        members_processed: 0,
        lines_written: 0,
    };

    match open_archive(archive) {
        Ok(mut reader) => {
            walk_members(reader.as_mut(), &mut out, &mut outcome, cfg, ctx, log)?;
        }
        Err(err) if matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::UnsupportedArchive(_))
        ) =>
        {
            log.info(&format!("Unsupported compressed file: {archive_str}"))?;
        }
        Err(err) => report_unreadable(log, &archive_str, "opening archive", &err)?,
    }

    out.flush()
        .with_context(|| format!("failed to flush {}", merged_csv.display()))?;
    write_summary(log, &outcome)?;
    Ok(outcome)
}

/// Iterate qualifying members of an already opened archive, appending their
/// surviving lines to `out`.
pub fn walk_members<W: Write>(
    reader: &mut dyn ArchiveReader,
    out: &mut W,
    outcome: &mut WalkOutcome,
    cfg: &IngestConfig,
    ctx: &mut RunContext,
    log: &RunLog,
) -> Result<()> {
    let archive_str = reader.path().display().to_string();
    let entries = match reader.list_entries() {
        Ok(entries) => entries,
        Err(err) => {
            let what = format!("listing {} archive", reader.kind());
            report_unreadable(log, &archive_str, &what, &err)?;
            return Ok(());
        }
    };

    {
        let wanted: Vec<&str> = entries
            .iter()
            .filter(|entry| {
                entry.is_file
                    && !ctx.is_blacklisted(&entry.name)
                    && is_csv_candidate(&entry.name, cfg.members.min_name_len)
            })
            .map(|entry| entry.name.as_str())
            .collect();
        if let Err(err) = reader.prefetch(&wanted) {
            let what = format!("reading {} archive", reader.kind());
            report_unreadable(log, &archive_str, &what, &err)?;
            return Ok(());
        }
    }

    for entry in entries {
        if ctx.is_blacklisted(&entry.name) {
            continue;
        }
        if !entry.is_file || !is_csv_candidate(&entry.name, cfg.members.min_name_len) {
            continue;
        }
        ctx.csv_members_found += 1;

        let decoded = match reader
            .open_entry(&entry.name)
            .and_then(|stream| read_member_lines(stream))
        {
            Ok(decoded) => decoded,
            Err(err) => {
                log.error(&format!(
                    "Error processing file {} in {archive_str}: {err:#}",
                    entry.name
                ))?;
                log.warn(WarnEvent {
                    code: ErrorCode::E001MemberUnreadable,
                    stage: "decode",
                    archive: &archive_str,
                    member: &entry.name,
                    reason: &format!("{err:#}"),
                });
                ctx.blacklist(entry.name.clone());
                continue;
            }
        };

        if decoded.had_replacements {
            log.warn(WarnEvent {
                code: ErrorCode::E007LossyDecode,
                stage: "decode",
                archive: &archive_str,
                member: &entry.name,
                reason: &format!("undecodable bytes replaced ({})", decoded.encoding),
            });
        }
        let filtered = filter_lines(decoded.lines, &cfg.filter);
        for dropped in &filtered.dropped {
            log.warn(WarnEvent {
                code: ErrorCode::E004LineDropped,
                stage: "filter",
                archive: &archive_str,
                member: &entry.name,
                reason: &format!(
                    "{} line {}: {}",
                    dropped.reason.as_str(),
                    dropped.line_no,
                    dropped.content
                ),
            });
        }

        for line in &filtered.kept {
            out.write_all(line.as_bytes())
                .with_context(|| format!("failed to write merged lines for {archive_str}"))?;
        }
        ctx.record_member(entry.name, filtered.raw_count, filtered.kept_count());
        outcome.members_processed += 1;
        outcome.lines_written += filtered.kept_count();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{is_csv_candidate, member_base_name, merge_archive, merged_csv_path};
    use crate::ingest::config::IngestConfig;
    use crate::ingest::context::RunContext;
    use crate::ingest::runlog::RunLog;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    #[test]
    fn base_name_ignores_directories() {
        assert_eq!(member_base_name("a/b/station_results_long.csv"), "station_results_long.csv");
        assert_eq!(member_base_name("dir/"), "dir");
        assert_eq!(member_base_name("plain.csv"), "plain.csv");
        assert_eq!(member_base_name("win\\path\\x.csv"), "x.csv");
    }

    #[test]
    fn candidates_need_long_csv_base_names() {
        assert!(is_csv_candidate("nested/longenoughfilename_report.csv", 20));
        assert!(is_csv_candidate("LONGENOUGHFILENAME_REPORT.CSV", 20));
        // exactly 20 characters is not enough
        assert!(!is_csv_candidate("abcdefghijklmnop.csv", 20));
        assert!(is_csv_candidate("abcdefghijklmnopq.csv", 20));
        assert!(!is_csv_candidate("longenoughfilename_report.txt", 20));
        assert!(!is_csv_candidate("a_very_long_directory_name.csv/short.csv", 20));
    }

    #[test]
    fn merged_name_replaces_last_extension() {
        let dir = Path::new("/in/extracted");
        assert_eq!(
            merged_csv_path(dir, Path::new("/in/rig_2024-03-01.zip")),
            Path::new("/in/extracted/rig_2024-03-01.csv")
        );
        assert_eq!(
            merged_csv_path(dir, Path::new("/in/rig_2024-03-01.tar.gz")),
            Path::new("/in/extracted/rig_2024-03-01.tar.csv")
        );
    }

    #[test]
    fn unsupported_suffix_yields_empty_merge_and_run_log_line() {
        let tmp = tempdir().expect("tempdir");
        let log = RunLog::new(&tmp.path().join("results"), false);
        let mut ctx = RunContext::new();
        let archive = tmp.path().join("rig_2024-01-01.rar");
        let merged = tmp.path().join("extracted").join("rig_2024-01-01.csv");

        let outcome = merge_archive(&archive, &merged, &IngestConfig::default(), &mut ctx, &log)
            .expect("merge");
        assert_eq!(outcome.members_processed, 0);
        assert_eq!(fs::read_to_string(&merged).expect("read merged"), "");

        let merge_log = fs::read_to_string(log.merge_log_path()).expect("read merge log");
        assert!(merge_log.contains(&format!("Unsupported compressed file: {}", archive.display())));
        assert!(!log.error_log_path().exists());
    }
}
