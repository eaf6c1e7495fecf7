//! Config validation with path-qualified messages.

use crate::schema::{CameraBackendKind, CardScanConfig};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Emit every warning and error through `tracing`.
    pub fn log(&self) {
        for warning in &self.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return every error and warning found.
pub fn validate(config: &CardScanConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_inference(config, &mut report);
    validate_camera(config, &mut report);
    validate_submission(config, &mut report);
    report
}

fn validate_inference(config: &CardScanConfig, report: &mut ValidationReport) {
    let inference = &config.inference;
    if inference.api_key.is_none() {
        report.error(
            "inference.apiKey",
            "No API key configured; set it in the file or via CARDSCAN_API_KEY",
        );
    }
    if !is_http_url(&inference.base_url) {
        report.error("inference.baseUrl", "Base URL must start with http:// or https://");
    }
    if inference.candidate_models.is_empty() && inference.catalog_families.is_empty() {
        report.error(
            "inference.candidateModels",
            "No candidate models and no catalog families; extraction can never pick a model",
        );
    } else if inference.candidate_models.is_empty() {
        report.warn(
            "inference.candidateModels",
            "Empty ladder; every extraction will query the model catalog first",
        );
    }
    if inference.request_timeout_secs == 0 {
        report.error("inference.requestTimeoutSecs", "Timeout must be greater than zero");
    }
}

fn validate_camera(config: &CardScanConfig, report: &mut ValidationReport) {
    let camera = &config.camera;
    if !(1..=100).contains(&camera.jpeg_quality) {
        report.error("camera.jpegQuality", "JPEG quality must be between 1 and 100");
    }
    if camera.ready_timeout_secs == 0 {
        report.error("camera.readyTimeoutSecs", "Timeout must be greater than zero");
    }
    if camera.backend == CameraBackendKind::File && camera.still_path.is_none() {
        report.error("camera.stillPath", "The file backend needs an image path");
    }
}

fn validate_submission(config: &CardScanConfig, report: &mut ValidationReport) {
    match config.submission.webhook_url.as_deref() {
        None => report.warn(
            "submission.webhookUrl",
            "No webhook configured; results can be reviewed but not saved",
        ),
        Some(url) if !is_http_url(url) => report.error(
            "submission.webhookUrl",
            "Webhook URL must start with http:// or https://",
        ),
        Some(_) => {}
    }
    if config.submission.timeout_secs == 0 {
        report.error("submission.timeoutSecs", "Timeout must be greater than zero");
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}
