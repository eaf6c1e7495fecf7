//! Configuration schema, deserialized from camelCase YAML.
//!
//! Every section carries container-level `#[serde(default)]`, so a partial
//! file only overrides the keys it names.

use std::path::PathBuf;

use cardscan_core::{FacingMode, SubmissionMode};
use serde::{Deserialize, Serialize};

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CardScanConfig {
    pub inference: InferenceConfig,
    pub camera: CameraConfig,
    pub submission: SubmissionConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Inference service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InferenceConfig {
    /// Service credential. Secret: never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub base_url: String,
    pub api_version: String,
    /// Fixed fallback ladder, most preferred first.
    pub candidate_models: Vec<String>,
    /// Name fragments used to filter the live catalog when the ladder is exhausted.
    pub catalog_families: Vec<String>,
    pub request_timeout_secs: u64,
    /// Enforce field normalization locally after parsing.
    pub normalize: bool,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: defaults::DEFAULT_BASE_URL.to_string(),
            api_version: defaults::DEFAULT_API_VERSION.to_string(),
            candidate_models: defaults::DEFAULT_CANDIDATE_MODELS
                .iter()
                .map(|m| m.to_string())
                .collect(),
            catalog_families: defaults::DEFAULT_CATALOG_FAMILIES
                .iter()
                .map(|f| f.to_string())
                .collect(),
            request_timeout_secs: defaults::DEFAULT_REQUEST_TIMEOUT_SECS,
            normalize: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Camera
// ---------------------------------------------------------------------------

/// Which capture implementation to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraBackendKind {
    /// Video4Linux2 device (requires the `v4l2` feature).
    V4l2,
    /// Serve a still image file as if it were a live stream.
    File,
    /// Generated test pattern.
    Synthetic,
}

impl Default for CameraBackendKind {
    /// The real device when this build can drive it, else the test pattern.
    fn default() -> Self {
        if cfg!(feature = "v4l2") {
            Self::V4l2
        } else {
            Self::Synthetic
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraConfig {
    pub backend: CameraBackendKind,
    pub facing: FacingMode,
    pub rear_device: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub front_device: Option<String>,
    /// Bound on waiting for frame dimensions before a capture gives up.
    pub ready_timeout_secs: u64,
    /// JPEG quality, 1..=100.
    pub jpeg_quality: u8,
    /// Image served by the `file` backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub still_path: Option<PathBuf>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackendKind::default(),
            facing: FacingMode::Rear,
            rear_device: defaults::DEFAULT_REAR_DEVICE.to_string(),
            front_device: None,
            ready_timeout_secs: defaults::DEFAULT_READY_TIMEOUT_SECS,
            jpeg_quality: defaults::DEFAULT_JPEG_QUALITY,
            still_path: None,
        }
    }
}

impl CameraConfig {
    /// Device path for a facing preference; falls back to the rear device
    /// when no front device is configured.
    pub fn device_for(&self, facing: FacingMode) -> &str {
        match facing {
            FacingMode::Front => self.front_device.as_deref().unwrap_or(&self.rear_device),
            FacingMode::Rear => &self.rear_device,
        }
    }
}

// ---------------------------------------------------------------------------
// Submission webhook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SubmissionConfig {
    /// Spreadsheet webhook. Secret: never logged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,
    pub mode: SubmissionMode,
    pub timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            mode: SubmissionMode::default(),
            timeout_secs: defaults::DEFAULT_SUBMISSION_TIMEOUT_SECS,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling NDJSON logs; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    /// Emit console output as JSON instead of human-readable lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_other_defaults() {
        let yaml = r#"
inference:
  apiKey: abc
  candidateModels: [gemini-2.0-flash]
camera:
  backend: file
  stillPath: /tmp/card.jpg
submission:
  mode: confirmed
"#;
        let config: CardScanConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.inference.api_key.as_deref(), Some("abc"));
        assert_eq!(config.inference.candidate_models, vec!["gemini-2.0-flash"]);
        assert_eq!(config.inference.api_version, "v1");
        assert_eq!(config.camera.backend, CameraBackendKind::File);
        assert_eq!(config.camera.jpeg_quality, 90);
        assert_eq!(config.submission.mode, SubmissionMode::Confirmed);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    #[cfg(not(feature = "v4l2"))]
    fn builds_without_v4l2_default_to_synthetic_camera() {
        let config: CardScanConfig = serde_yaml::from_str("logging:\n  level: debug\n").unwrap();
        assert_eq!(config.camera.backend, CameraBackendKind::Synthetic);
    }

    #[test]
    #[cfg(feature = "v4l2")]
    fn builds_with_v4l2_default_to_the_device() {
        assert_eq!(CardScanConfig::default().camera.backend, CameraBackendKind::V4l2);
    }

    #[test]
    fn front_device_falls_back_to_rear() {
        let mut camera = CameraConfig::default();
        assert_eq!(camera.device_for(FacingMode::Front), "/dev/video0");
        camera.front_device = Some("/dev/video2".into());
        assert_eq!(camera.device_for(FacingMode::Front), "/dev/video2");
        assert_eq!(camera.device_for(FacingMode::Rear), "/dev/video0");
    }

    #[test]
    fn default_ladder_matches_known_models() {
        let inference = InferenceConfig::default();
        assert_eq!(inference.candidate_models.first().map(String::as_str), Some("gemini-1.5-flash"));
        assert!(inference.candidate_models.contains(&"models/text-bison-001".to_string()));
        assert_eq!(inference.catalog_families, vec!["gemini", "bison", "t5", "ul2"]);
    }
}
