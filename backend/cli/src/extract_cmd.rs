//! `cardscan extract`: run the extraction pipeline on an image file.

use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use cardscan_config::CardScanConfig;
use cardscan_core::{FacingMode, SubmissionOutcome, SubmissionRecord};
use cardscan_media::backends::FileBackend;
use cardscan_media::{detect_mime_type, is_supported_image, sniff_image_mime, CameraSessionManager};
use tracing::info;
use uuid::Uuid;

use crate::runtime;
use crate::terminal_output::{note_success, render_fields, render_model_used};

pub async fn run(config: &CardScanConfig, image: &Path, save: bool, json: bool) -> Result<()> {
    let bytes = tokio::fs::read(image)
        .await
        .with_context(|| format!("Failed to read {}", image.display()))?;
    let mime = sniff_image_mime(&bytes).unwrap_or_else(|| detect_mime_type(image));
    if !is_supported_image(mime) {
        bail!("{}: unsupported image type {mime}; use a JPEG or PNG file", image.display());
    }

    // The file goes through the same capture path as a camera frame, so the
    // service always receives a JPEG at the configured quality.
    let mut camera = CameraSessionManager::new(Arc::new(FileBackend::new(image)));
    let session = camera.open(FacingMode::Rear).await?;
    let still = runtime::frame_capturer(config).capture(session).await?;
    info!(width = still.width, height = still.height, source = %mime, "Prepared still");

    let extractor = runtime::extraction_client(config)?;
    let scan_id = Uuid::new_v4().to_string();
    let result = extractor.extract(&scan_id, &still).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", render_model_used(&result.model_used));
        print!("{}", render_fields(&result.fields));
    }

    if save {
        let sink = runtime::submission_sink(config)?
            .context("No webhook URL configured. Set CARDSCAN_WEBHOOK_URL or submission.webhookUrl.")?;
        match sink.submit(&SubmissionRecord::new(result.fields)).await? {
            SubmissionOutcome::Accepted { status } => note_success(&format!("Saved (webhook answered {status})")),
            SubmissionOutcome::Unconfirmed => {
                note_success("Sent to webhook (delivery is not confirmed in fire-and-forget mode)")
            }
        }
    }

    Ok(())
}
