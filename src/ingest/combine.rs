use crate::error::ErrorCode;
use crate::ingest::runlog::RunLog;
use crate::ingest::text::split_lines_keep_ends;
use crate::ingest::warn::WarnEvent;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Concatenate `inputs` into `output` in order and return the number of lines
/// written. Unreadable inputs are logged and skipped. Nothing is created when
/// `inputs` is empty.
pub fn combine_csv_files(inputs: &[PathBuf], output: &Path, log: &RunLog) -> Result<usize> {
    if inputs.is_empty() {
        log.console("No CSV files to combine");
        return Ok(0);
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file =
        File::create(output).with_context(|| format!("failed to create {}", output.display()))?;
    let mut out = BufWriter::new(file);

    let mut total_rows = 0usize;
    for input in inputs {
        let raw = match fs::read_to_string(input) {
            Ok(raw) => raw,
            Err(err) => {
                let input_str = input.display().to_string();
                log.error(&format!("Error combining file {input_str}: {err}"))?;
                log.warn(WarnEvent {
                    code: ErrorCode::E005CombineSkipped,
                    stage: "combine",
                    archive: "",
                    member: &input_str,
                    reason: &err.to_string(),
                });
                continue;
            }
        };
        for line in split_lines_keep_ends(&raw) {
            out.write_all(line.as_bytes())
                .with_context(|| format!("failed to write {}", output.display()))?;
            total_rows += 1;
        }
    }
    out.flush()
        .with_context(|| format!("failed to flush {}", output.display()))?;

    log.info(&format!(
        "Combined CSV created at: {}; Total rows: {total_rows}",
        output.display()
    ))?;
    Ok(total_rows)
}
