use anyhow::Result;
use std::env;

use crate::commands::CommandReport;
use crate::ingest::config::{load_config, resolve_config_path};
use crate::ingest::paths::{PathOverrides, resolve_paths};

include!(concat!(env!("OUT_DIR"), "/rig_ingest_env_allowlist.rs"));

fn paths_report(overrides: &PathOverrides) -> Result<CommandReport> {
    let paths = resolve_paths(overrides)?;
    let mut report = CommandReport::new("status");

    report.detail(format!("home={}", paths.home.display()));
    for (name, path) in [
        ("archives_dir", &paths.archives_dir),
        ("extracted_dir", &paths.extracted_dir),
        ("results_dir", &paths.results_dir),
        ("combined_csv", &paths.combined_csv),
        ("merge_log", &paths.merge_log),
        ("error_log", &paths.error_log),
        ("index_file", &paths.index_file),
    ] {
        let state = if path.exists() { "ok" } else { "missing" };
        report.detail(format!("{name}={} ({state})", path.display()));
    }

    if !paths.archives_dir.is_dir() {
        report.issue(format!(
            "missing archives dir ({}); set RIG_INGEST_ARCHIVES_DIR or --archives-dir",
            paths.archives_dir.display()
        ));
    }
    Ok(report)
}

fn config_report(overrides: &PathOverrides) -> Result<CommandReport> {
    let paths = resolve_paths(overrides)?;
    let mut report = CommandReport::new("status");
    let config_path = resolve_config_path(&paths.home);
    report.detail(format!(
        "config_file={} ({})",
        config_path.display(),
        if config_path.exists() { "ok" } else { "defaults" }
    ));

    match load_config(&paths.home) {
        Ok(cfg) => {
            report.detail(format!("members.min_name_len={}", cfg.members.min_name_len));
            report.detail(format!("filter.min_field_count={}", cfg.filter.min_field_count));
            report.detail(format!("layout.date_column={}", cfg.layout.date_column));
            report.detail(format!("layout.station_column={}", cfg.layout.station_column));
            report.detail(format!(
                "layout.lookup_min_fields={}",
                cfg.layout.lookup_min_fields
            ));
        }
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }
    Ok(report)
}

pub fn run(overrides: &PathOverrides) -> Result<CommandReport> {
    let mut report = paths_report(overrides)?;
    report.merge(config_report(overrides)?);

    for key in GENERATED_RIG_INGEST_ENV_ALLOWLIST {
        if env::var_os(key).is_some() {
            report.detail(format!("env.{key}=set"));
        }
    }
    report.detail(format!("build_id={}", env!("BUILD_UUID")));
    Ok(report)
}
