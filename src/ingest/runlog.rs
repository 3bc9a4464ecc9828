use crate::ingest::warn::{self, WarnEvent};
use anyhow::{Context, Result};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub const MERGE_LOG_NAME: &str = "merge_log.txt";
pub const ERROR_LOG_NAME: &str = "error_log.txt";

/// The two text logs of a run plus their console echo.
#[derive(Debug, Clone)]
pub struct RunLog {
    merge_log: PathBuf,
    error_log: PathBuf,
    echo: bool,
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    file.write_all(format!("{line}\n").as_bytes())
        .with_context(|| format!("failed to append to {}", path.display()))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err).with_context(|| format!("failed to remove {}", path.display())),
    }
}

impl RunLog {
    pub fn new(results_dir: &Path, echo: bool) -> Self {
        Self {
            merge_log: results_dir.join(MERGE_LOG_NAME),
            error_log: results_dir.join(ERROR_LOG_NAME),
            echo,
        }
    }

    pub fn merge_log_path(&self) -> &Path {
        &self.merge_log
    }

    pub fn error_log_path(&self) -> &Path {
        &self.error_log
    }

    /// Drop logs left by a previous run and stamp the new one.
    pub fn reset(&self) -> Result<()> {
        remove_if_present(&self.merge_log)?;
        remove_if_present(&self.error_log)?;
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        append_line(&self.merge_log, &format!("Run started at {stamp}"))
    }

    pub fn info(&self, msg: &str) -> Result<()> {
        if self.echo {
            println!("{msg}");
        }
        append_line(&self.merge_log, msg)
    }

    pub fn error(&self, msg: &str) -> Result<()> {
        if self.echo {
            eprintln!("{msg}");
        }
        append_line(&self.error_log, msg)
    }

    /// Console-only diagnostic.
    pub fn warn(&self, event: WarnEvent<'_>) {
        if self.echo {
            warn::emit(event);
        }
    }

    pub fn console(&self, msg: &str) {
        if self.echo {
            println!("{msg}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::RunLog;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn reset_truncates_previous_logs() {
        let tmp = tempdir().expect("tempdir");
        let log = RunLog::new(tmp.path(), false);
        log.info("first run").expect("info");
        log.error("first error").expect("error");

        log.reset().expect("reset");
        let merge = fs::read_to_string(log.merge_log_path()).expect("read merge log");
        assert!(merge.starts_with("Run started at "));
        assert!(!merge.contains("first run"));
        assert!(!log.error_log_path().exists());
    }

    #[test]
    fn info_and_error_go_to_separate_files() {
        let tmp = tempdir().expect("tempdir");
        let log = RunLog::new(&tmp.path().join("results"), false);
        log.info("merged").expect("info");
        log.error("broken").expect("error");
        assert_eq!(
            fs::read_to_string(log.merge_log_path()).expect("merge"),
            "merged\n"
        );
        assert_eq!(
            fs::read_to_string(log.error_log_path()).expect("error"),
            "broken\n"
        );
    }
}
