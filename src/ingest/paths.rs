use crate::ingest::runlog::{ERROR_LOG_NAME, MERGE_LOG_NAME};
use anyhow::{Context, Result};
use std::env;
use std::path::{Path, PathBuf};

pub const COMBINED_CSV_NAME: &str = "combined_results.csv";
pub const EXTRACTED_DIR_NAME: &str = "extracted";

#[derive(Debug, Clone)]
pub struct IngestPaths {
    pub home: PathBuf,
    pub archives_dir: PathBuf,
    pub extracted_dir: PathBuf,
    pub results_dir: PathBuf,
    pub combined_csv: PathBuf,
    pub merge_log: PathBuf,
    pub error_log: PathBuf,
    pub index_file: PathBuf,
}

/// Command-line values that take precedence over the environment.
#[derive(Debug, Clone, Default)]
pub struct PathOverrides {
    pub archives_dir: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub index_file: Option<PathBuf>,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_home() -> Result<PathBuf> {
    let cwd = env::current_dir().context("current directory could not be resolved")?;
    Ok(env_or_default_path("RIG_INGEST_HOME", cwd))
}

impl IngestPaths {
    pub fn from_dirs(home: &Path, archives_dir: PathBuf, results_dir: PathBuf, index_file: PathBuf) -> Self {
        Self {
            home: home.to_path_buf(),
            extracted_dir: archives_dir.join(EXTRACTED_DIR_NAME),
            combined_csv: results_dir.join(COMBINED_CSV_NAME),
            merge_log: results_dir.join(MERGE_LOG_NAME),
            error_log: results_dir.join(ERROR_LOG_NAME),
            archives_dir,
            results_dir,
            index_file,
        }
    }
}

pub fn resolve_paths(overrides: &PathOverrides) -> Result<IngestPaths> {
    let home = resolve_home()?;

    let archives_dir = overrides
        .archives_dir
        .clone()
        .unwrap_or_else(|| env_or_default_path("RIG_INGEST_ARCHIVES_DIR", home.join("logs")));
    let results_dir = overrides
        .results_dir
        .clone()
        .unwrap_or_else(|| env_or_default_path("RIG_INGEST_RESULTS_DIR", home.join("results")));
    let index_file = overrides.index_file.clone().unwrap_or_else(|| {
        env_or_default_path(
            "RIG_INGEST_INDEX_FILE",
            home.join("assets").join("index_rigs.csv"),
        )
    });

    Ok(IngestPaths::from_dirs(&home, archives_dir, results_dir, index_file))
}

#[cfg(test)]
mod tests {
    use super::IngestPaths;
    use std::path::{Path, PathBuf};

    #[test]
    fn derived_paths_hang_off_their_roots() {
        let paths = IngestPaths::from_dirs(
            Path::new("/work"),
            PathBuf::from("/work/logs"),
            PathBuf::from("/work/results"),
            PathBuf::from("/work/assets/index_rigs.csv"),
        );
        assert_eq!(paths.extracted_dir, Path::new("/work/logs/extracted"));
        assert_eq!(paths.combined_csv, Path::new("/work/results/combined_results.csv"));
        assert_eq!(paths.merge_log, Path::new("/work/results/merge_log.txt"));
        assert_eq!(paths.error_log, Path::new("/work/results/error_log.txt"));
    }
}
