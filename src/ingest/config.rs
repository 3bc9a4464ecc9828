use crate::error::IngestError;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberRules {
    /// Base names must be strictly longer than this many characters.
    pub min_name_len: usize,
}

impl Default for MemberRules {
    fn default() -> Self {
        Self { min_name_len: 20 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRules {
    pub min_field_count: usize,
}

impl Default for FilterRules {
    fn default() -> Self {
        Self { min_field_count: 6 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub date_column: usize,
    pub station_column: usize,
    pub lookup_min_fields: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            date_column: 8,
            station_column: 5,
            lookup_min_fields: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IngestConfig {
    pub members: MemberRules,
    pub filter: FilterRules,
    pub layout: ColumnLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialIngestConfig {
    members: Option<MemberRules>,
    filter: Option<FilterRules>,
    layout: Option<ColumnLayout>,
}

fn env_or_usize(var: &str, fallback: usize) -> usize {
    match env::var(var) {
        Ok(v) => v.trim().parse::<usize>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

pub fn validate(cfg: &IngestConfig) -> Result<()> {
    if cfg.filter.min_field_count == 0 {
        return Err(anyhow!(IngestError::InvalidConfig(
            "filter.min_field_count must be >= 1".to_string()
        )));
    }
    if cfg.layout.date_column == 0 {
        return Err(anyhow!(IngestError::InvalidConfig(
            "layout.date_column must be >= 1".to_string()
        )));
    }
    if cfg.layout.station_column >= cfg.layout.lookup_min_fields {
        return Err(anyhow!(IngestError::InvalidConfig(
            "layout.station_column must be < layout.lookup_min_fields".to_string()
        )));
    }
    Ok(())
}

pub fn resolve_config_path(home: &Path) -> PathBuf {
    match env::var("RIG_INGEST_CONFIG_PATH") {
        Ok(custom) if !custom.trim().is_empty() => PathBuf::from(custom.trim()),
        _ => home.join("rig_ingest.toml"),
    }
}

fn merge_file_config(base: &mut IngestConfig, path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(path)
        .map_err(|err| IngestError::InvalidConfig(format!("{}: {err}", path.display())))?;
    let parsed: PartialIngestConfig = toml::from_str(&raw)
        .map_err(|err| IngestError::InvalidConfig(format!("{}: {err}", path.display())))?;
    if let Some(members) = parsed.members {
        base.members = members;
    }
    if let Some(filter) = parsed.filter {
        base.filter = filter;
    }
    if let Some(layout) = parsed.layout {
        base.layout = layout;
    }
    Ok(())
}

pub fn load_config(home: &Path) -> Result<IngestConfig> {
    let mut cfg = IngestConfig::default();
    merge_file_config(&mut cfg, &resolve_config_path(home))?;

    cfg.members.min_name_len = env_or_usize("RIG_INGEST_MIN_NAME_LEN", cfg.members.min_name_len);
    cfg.filter.min_field_count =
        env_or_usize("RIG_INGEST_MIN_FIELD_COUNT", cfg.filter.min_field_count);
    cfg.layout.date_column = env_or_usize("RIG_INGEST_DATE_COLUMN", cfg.layout.date_column);
    cfg.layout.station_column =
        env_or_usize("RIG_INGEST_STATION_COLUMN", cfg.layout.station_column);
    cfg.layout.lookup_min_fields =
        env_or_usize("RIG_INGEST_LOOKUP_MIN_FIELDS", cfg.layout.lookup_min_fields);

    validate(&cfg)?;
    Ok(cfg)
}
