//! Still capture from a live camera session.

use std::io::Cursor;
use std::time::Duration;

use bytes::Bytes;
use cardscan_core::{ScanError, StillImage};
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, RgbImage};
use tracing::{debug, warn};

use crate::camera::CameraSession;

pub const JPEG_MIME: &str = "image/jpeg";

/// Freezes the current frame of a session into a JPEG still.
#[derive(Debug, Clone)]
pub struct FrameCapturer {
    ready_timeout: Duration,
    jpeg_quality: u8,
}

impl FrameCapturer {
    pub fn new(ready_timeout: Duration, jpeg_quality: u8) -> Self {
        Self {
            ready_timeout,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn ready_timeout(&self) -> Duration {
        self.ready_timeout
    }

    /// Capture one still at the stream's reported resolution.
    ///
    /// The session is closed afterwards whether or not the capture
    /// succeeded.
    pub async fn capture(&self, session: &mut CameraSession) -> Result<StillImage, ScanError> {
        let result = self.capture_inner(session).await;
        session.close();
        if let Err(e) = &result {
            warn!(device = %session.device(), error = %e, "Capture failed");
        }
        result
    }

    async fn capture_inner(&self, session: &mut CameraSession) -> Result<StillImage, ScanError> {
        let dims = if session.is_ready() {
            session.dimensions()
        } else {
            debug!(device = %session.device(), "Waiting for stream metadata");
            session.wait_ready(self.ready_timeout).await?
        };

        let frame = session.current_frame().await?;
        let source = frame.to_rgb_image()?;

        // Draw onto a surface of the reported size; any part the frame does
        // not cover stays black.
        let mut canvas = RgbImage::new(dims.width, dims.height);
        imageops::replace(&mut canvas, &source, 0, 0);

        let data = encode_jpeg(&canvas, self.jpeg_quality)?;
        debug!(
            width = dims.width,
            height = dims.height,
            bytes = data.len(),
            "Encoded still"
        );
        Ok(StillImage::new(Bytes::from(data), JPEG_MIME, dims.width, dims.height))
    }
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, ScanError> {
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
        .encode_image(image)
        .map_err(|e| ScanError::Capture(format!("JPEG encoding failed: {e}")))?;
    Ok(buf.into_inner())
}
