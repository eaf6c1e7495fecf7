//! Config file read/write with backup rotation.

use crate::schema::CardScanConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 3;

/// Resolve the config directory.
/// Priority: `CARDSCAN_CONFIG_DIR` env > `~/.cardscan/` > `./.cardscan`.
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("CARDSCAN_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|home| home.join(".cardscan"))
        .unwrap_or_else(|| PathBuf::from(".cardscan"))
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the raw config tree from disk, before env substitution.
///
/// A missing or empty file yields an empty object so that every section
/// falls back to its defaults.
pub async fn load_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(match value {
        Value::Null => Value::Object(Default::default()),
        other => other,
    })
}

/// Write config to disk via a temp file and rename, keeping rolling backups
/// of the previous file.
pub async fn write_config(config: &CardScanConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }

    if path.exists() {
        rotate_backups(path).await;
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .await
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// config.yaml.bak.1 → .bak.2 → ... → .bak.N, then copy current to .bak.1.
async fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = path.with_extension(format!("yaml.bak.{i}"));
        let new = path.with_extension(format!("yaml.bak.{}", i + 1));
        if old.exists() {
            if let Err(e) = fs::rename(&old, &new).await {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = path.with_extension("yaml.bak.1");
    if let Err(e) = fs::copy(path, &bak).await {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_load_round_trips_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());

        let mut config = CardScanConfig::default();
        config.camera.jpeg_quality = 75;
        write_config(&config, &path).await.unwrap();

        let value = load_config(&path).await.unwrap();
        assert_eq!(value["camera"]["jpegQuality"], 75);
        assert!(value["inference"].get("apiKey").is_none());
    }

    #[tokio::test]
    async fn second_write_keeps_a_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        let config = CardScanConfig::default();

        write_config(&config, &path).await.unwrap();
        write_config(&config, &path).await.unwrap();

        assert!(path.with_extension("yaml.bak.1").exists());
    }

    #[tokio::test]
    async fn empty_file_is_an_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_file_path(dir.path());
        tokio::fs::write(&path, "").await.unwrap();

        let value = load_config(&path).await.unwrap();
        assert!(value.as_object().is_some_and(|m| m.is_empty()));
    }
}
