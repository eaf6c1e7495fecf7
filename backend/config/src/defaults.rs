//! Default values and post-load normalization.

use crate::schema::CardScanConfig;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_API_VERSION: &str = "v1";

/// Fixed fallback ladder, most preferred first.
pub const DEFAULT_CANDIDATE_MODELS: &[&str] = &[
    "gemini-1.5-flash",
    "gemini-1.5-pro",
    "gemini-1.5",
    "gemini-1.0",
    "models/text-bison-001",
];

/// Model families accepted from the live catalog.
pub const DEFAULT_CATALOG_FAMILIES: &[&str] = &["gemini", "bison", "t5", "ul2"];

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_REAR_DEVICE: &str = "/dev/video0";
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_SUBMISSION_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: CardScanConfig) -> CardScanConfig {
    let config = apply_inference_defaults(config);
    let config = apply_camera_defaults(config);
    apply_logging_defaults(config)
}

/// Blank strings count as unset; trailing slashes are dropped from the base URL.
fn apply_inference_defaults(mut config: CardScanConfig) -> CardScanConfig {
    let inference = &mut config.inference;
    if inference.api_key.as_deref().is_some_and(|k| k.trim().is_empty()) {
        inference.api_key = None;
    }
    if inference.base_url.trim().is_empty() {
        inference.base_url = DEFAULT_BASE_URL.to_string();
    }
    inference.base_url = inference.base_url.trim_end_matches('/').to_string();
    if inference.api_version.trim().is_empty() {
        inference.api_version = DEFAULT_API_VERSION.to_string();
    }
    inference.candidate_models.retain(|m| !m.trim().is_empty());
    inference.catalog_families.retain(|f| !f.trim().is_empty());

    if config
        .submission
        .webhook_url
        .as_deref()
        .is_some_and(|u| u.trim().is_empty())
    {
        config.submission.webhook_url = None;
    }
    config
}

fn apply_camera_defaults(mut config: CardScanConfig) -> CardScanConfig {
    if config.camera.rear_device.trim().is_empty() {
        config.camera.rear_device = DEFAULT_REAR_DEVICE.to_string();
    }
    if config.camera.jpeg_quality == 0 {
        config.camera.jpeg_quality = DEFAULT_JPEG_QUALITY;
    }
    config
}

fn apply_logging_defaults(mut config: CardScanConfig) -> CardScanConfig {
    if config.logging.level.trim().is_empty() {
        config.logging.level = DEFAULT_LOG_LEVEL.to_string();
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_reset() {
        let mut config = CardScanConfig::default();
        config.inference.api_key = Some("  ".into());
        config.inference.base_url = "https://proxy.local/".into();
        config.inference.candidate_models = vec!["".into(), "gemini-2.0-flash".into()];
        config.submission.webhook_url = Some(String::new());
        config.camera.jpeg_quality = 0;
        config.logging.level = String::new();

        let config = apply_all_defaults(config);
        assert!(config.inference.api_key.is_none());
        assert_eq!(config.inference.base_url, "https://proxy.local");
        assert_eq!(config.inference.candidate_models, vec!["gemini-2.0-flash"]);
        assert!(config.submission.webhook_url.is_none());
        assert_eq!(config.camera.jpeg_quality, DEFAULT_JPEG_QUALITY);
        assert_eq!(config.logging.level, "info");
    }
}
