//! `cardscan config`: show the effective config or write a default one.

use std::path::Path;

use anyhow::{bail, Result};
use cardscan_config::{collect_redacted_paths, redact, write_config, CardScanConfig};

use crate::terminal_output::{note_info, note_success};

pub fn show(config: &CardScanConfig) -> Result<()> {
    let value = serde_json::to_value(config)?;
    let masked = collect_redacted_paths(&value);
    print!("{}", serde_yaml::to_string(&redact(&value))?);
    if !masked.is_empty() {
        note_info(&format!("Masked: {}", masked.join(", ")));
    }
    Ok(())
}

pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite it", path.display());
    }
    write_config(&CardScanConfig::default(), path).await?;
    note_success(&format!("Wrote default config to {}", path.display()));
    note_info("Set inference.apiKey and submission.webhookUrl, or export CARDSCAN_API_KEY and CARDSCAN_WEBHOOK_URL");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        init(&path, false).await.unwrap();
        assert!(path.exists());
        assert!(init(&path, false).await.is_err());
        init(&path, true).await.unwrap();
    }
}
