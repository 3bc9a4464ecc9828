use crate::error::ErrorCode;
use crate::ingest::config::ColumnLayout;
use crate::ingest::runlog::RunLog;
use crate::ingest::text::{split_lines_keep_ends, split_terminator, write_atomic};
use crate::ingest::warn::WarnEvent;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub matches: usize,
    pub misses: usize,
}

/// Parse `key,value` rows. Rows with fewer than two fields are ignored and
/// a repeated key keeps its last value.
pub fn parse_index_table(raw: &str) -> HashMap<String, String> {
    let mut table = HashMap::new();
    for line in raw.lines() {
        let mut fields = line.trim().split(',');
        let (Some(key), Some(value)) = (fields.next(), fields.next()) else {
            continue;
        };
        table.insert(key.trim().to_string(), value.trim().to_string());
    }
    table
}

pub fn load_index_table(path: &Path) -> Result<HashMap<String, String>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    Ok(parse_index_table(&raw))
}

/// Rewrite the station column of one row. Rows too short for a lookup pass
/// through untouched and count as neither hit nor miss.
pub fn rewrite_line(
    line: &str,
    table: &HashMap<String, String>,
    layout: &ColumnLayout,
    outcome: &mut RewriteOutcome,
) -> String {
    let (body, terminator) = split_terminator(line);
    let mut fields: Vec<&str> = body.split(',').collect();
    if fields.len() < layout.lookup_min_fields {
        return line.to_string();
    }
    match table.get(fields[layout.station_column].trim()) {
        Some(value) => {
            fields[layout.station_column] = value.as_str();
            outcome.matches += 1;
        }
        None => outcome.misses += 1,
    }
    let terminator = if terminator.is_empty() { "\n" } else { terminator };
    format!("{}{terminator}", fields.join(","))
}

pub fn rewrite_content(
    raw: &str,
    table: &HashMap<String, String>,
    layout: &ColumnLayout,
) -> (String, RewriteOutcome) {
    let mut outcome = RewriteOutcome::default();
    let rewritten = split_lines_keep_ends(raw)
        .iter()
        .map(|line| rewrite_line(line, table, layout, &mut outcome))
        .collect();
    (rewritten, outcome)
}

fn rewrite_file(
    combined: &Path,
    table: &HashMap<String, String>,
    layout: &ColumnLayout,
) -> Result<RewriteOutcome> {
    let raw = fs::read_to_string(combined)
        .with_context(|| format!("failed to read {}", combined.display()))?;
    let (rewritten, outcome) = rewrite_content(&raw, table, layout);
    write_atomic(combined, &rewritten)?;
    Ok(outcome)
}

/// Replace station identifiers in the combined CSV using the index file and
/// return the number of rows rewritten. Any failure leaves the combined file
/// untouched and yields zero.
pub fn rewrite_with_index(
    combined: &Path,
    index: &Path,
    layout: &ColumnLayout,
    log: &RunLog,
) -> Result<usize> {
    let table = match load_index_table(index) {
        Ok(table) => table,
        Err(err) => {
            log.error(&format!(
                "Error reading index file {}: {err:#}",
                index.display()
            ))?;
            log.warn(WarnEvent {
                code: ErrorCode::E006IndexUnavailable,
                stage: "index-rewrite",
                archive: "",
                member: &index.display().to_string(),
                reason: &format!("{err:#}"),
            });
            return Ok(0);
        }
    };

    let outcome = match rewrite_file(combined, &table, layout) {
        Ok(outcome) => outcome,
        Err(err) => {
            log.error(&format!(
                "Error updating combined CSV {} with index data: {err:#}",
                combined.display()
            ))?;
            return Ok(0);
        }
    };

    log.info(&format!(
        "Column updates complete. Matched {} entries from index file. No matches for {} entries.",
        outcome.matches, outcome.misses
    ))?;
    Ok(outcome.matches)
}
