//! `cardscan-config` — runtime configuration for the card scanner.
//!
//! Provides:
//! - Typed config schema (inference service, camera, submission webhook, logging)
//! - YAML read/write with backup rotation
//! - `${ENV_VAR}` substitution and environment overrides for secrets
//! - Default normalization and validation
//! - Redaction for safe display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, write_config};
pub use redact::{collect_redacted_paths, redact};
pub use schema::{
    CameraBackendKind, CameraConfig, CardScanConfig, InferenceConfig, LoggingConfig,
    SubmissionConfig,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use std::path::Path;

/// Load a config file, substitute `${VAR}` references, apply environment
/// overrides and defaults, then validate.
///
/// Validation problems do not fail the load: the report is handed back so the
/// caller can log it once logging is set up, and commands that need a given
/// value (e.g. the API key) check for it themselves.
pub async fn load_and_prepare(path: &Path) -> Result<(CardScanConfig, ValidationReport)> {
    let value = load_config(path).await?;

    let value = resolve_env_vars(&value).context("Failed to resolve env vars in config")?;

    let config: CardScanConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let config = apply_env_overrides(config, &std::env::vars().collect());
    let config = apply_all_defaults(config);

    let report = validate(&config);
    Ok((config, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, _) = load_and_prepare(&dir.path().join("config.yaml")).await.unwrap();
        assert_eq!(config.inference.api_version, "v1");
        assert_eq!(config.camera.jpeg_quality, 90);
    }

    #[tokio::test]
    async fn validation_problems_come_back_with_the_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "camera:\n  backend: file\n").unwrap();

        let (config, report) = load_and_prepare(&path).await.unwrap();
        assert_eq!(config.camera.backend, CameraBackendKind::File);
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.path == "camera.stillPath"));
    }
}
