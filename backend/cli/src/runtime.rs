//! Builds the pipeline components from the loaded config.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use cardscan_channels::{WebhookConfig, WebhookSink};
use cardscan_config::{CameraBackendKind, CardScanConfig};
use cardscan_core::{FacingMode, InferenceService, SubmissionSink};
use cardscan_media::backends::{FileBackend, SyntheticBackend};
use cardscan_media::{CameraBackend, CameraSessionManager, FrameCapturer};
use cardscan_scanner::Scanner;
use cardscan_understanding::{ExtractionClient, GeminiClient};

/// Frame size reported by the synthetic camera.
const SYNTHETIC_SIZE: (u32, u32) = (1280, 800);

pub fn inference_service(config: &CardScanConfig) -> Result<Arc<dyn InferenceService>> {
    let inference = &config.inference;
    let Some(api_key) = inference.api_key.as_deref().filter(|k| !k.trim().is_empty()) else {
        bail!("No API key configured. Set CARDSCAN_API_KEY or inference.apiKey in the config file.");
    };
    let client = GeminiClient::new(
        api_key,
        &inference.base_url,
        &inference.api_version,
        Duration::from_secs(inference.request_timeout_secs),
    )?;
    Ok(Arc::new(client))
}

pub fn extraction_client(config: &CardScanConfig) -> Result<ExtractionClient> {
    let inference = &config.inference;
    Ok(ExtractionClient::new(
        inference_service(config)?,
        inference.candidate_models.clone(),
        inference.catalog_families.clone(),
    )
    .with_normalization(inference.normalize))
}

pub fn frame_capturer(config: &CardScanConfig) -> FrameCapturer {
    FrameCapturer::new(
        Duration::from_secs(config.camera.ready_timeout_secs),
        config.camera.jpeg_quality,
    )
}

pub fn camera_backend(config: &CardScanConfig) -> Result<Arc<dyn CameraBackend>> {
    let camera = &config.camera;
    match camera.backend {
        CameraBackendKind::File => {
            let path = camera
                .still_path
                .clone()
                .context("camera.stillPath is required for the file backend")?;
            Ok(Arc::new(FileBackend::new(path)))
        }
        CameraBackendKind::Synthetic => {
            Ok(Arc::new(SyntheticBackend::new(SYNTHETIC_SIZE.0, SYNTHETIC_SIZE.1)))
        }
        CameraBackendKind::V4l2 => v4l2_backend(config),
    }
}

#[cfg(feature = "v4l2")]
fn v4l2_backend(config: &CardScanConfig) -> Result<Arc<dyn CameraBackend>> {
    use cardscan_media::backends::V4l2Backend;
    Ok(Arc::new(V4l2Backend::new(
        config.camera.device_for(FacingMode::Rear),
        config.camera.front_device.clone(),
    )))
}

#[cfg(not(feature = "v4l2"))]
fn v4l2_backend(_config: &CardScanConfig) -> Result<Arc<dyn CameraBackend>> {
    bail!("this build has no V4L2 support; rebuild with `--features v4l2` or set camera.backend to `file`")
}

/// `None` when no webhook is configured.
pub fn submission_sink(config: &CardScanConfig) -> Result<Option<Arc<dyn SubmissionSink>>> {
    let submission = &config.submission;
    let Some(url) = submission.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) else {
        return Ok(None);
    };
    let sink = WebhookSink::new(WebhookConfig {
        url: url.to_string(),
        mode: submission.mode,
        timeout: Duration::from_secs(submission.timeout_secs),
    })?;
    Ok(Some(Arc::new(sink)))
}

pub fn scanner(config: &CardScanConfig, facing: FacingMode) -> Result<Scanner> {
    let mut scanner = Scanner::new(
        CameraSessionManager::new(camera_backend(config)?),
        frame_capturer(config),
        extraction_client(config)?,
    )
    .with_facing(facing);
    if let Some(sink) = submission_sink(config)? {
        scanner = scanner.with_sink(sink);
    }
    Ok(scanner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_reported() {
        let config = CardScanConfig::default();
        let err = inference_service(&config).err().unwrap();
        assert!(err.to_string().contains("CARDSCAN_API_KEY"));
    }

    #[test]
    fn default_camera_backend_is_usable_in_this_build() {
        let backend = camera_backend(&CardScanConfig::default()).unwrap();
        let expected = if cfg!(feature = "v4l2") { "v4l2" } else { "synthetic" };
        assert_eq!(backend.name(), expected);
    }

    #[test]
    fn file_backend_needs_a_path() {
        let mut config = CardScanConfig::default();
        config.camera.backend = CameraBackendKind::File;
        assert!(camera_backend(&config).is_err());

        config.camera.still_path = Some("card.jpg".into());
        assert_eq!(camera_backend(&config).unwrap().name(), "file");
    }

    #[test]
    fn blank_webhook_means_no_sink() {
        let mut config = CardScanConfig::default();
        config.submission.webhook_url = Some("  ".into());
        assert!(submission_sink(&config).unwrap().is_none());

        config.submission.webhook_url = Some("https://hooks.example.com/cards".into());
        assert!(submission_sink(&config).unwrap().is_some());
    }
}
