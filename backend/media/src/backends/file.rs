//! Serves a still image file as a camera stream.
//!
//! The whole "stream" is one decoded frame, so the session is ready as soon
//! as it opens.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use cardscan_core::{DeviceError, FacingMode};
use tokio::sync::watch;
use tracing::debug;

use crate::camera::{CameraBackend, FrameDimensions, VideoStream};
use crate::frame::VideoFrame;

pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CameraBackend for FileBackend {
    fn name(&self) -> &str {
        "file"
    }

    async fn open(&self, _facing: FacingMode) -> Result<Box<dyn VideoStream>, DeviceError> {
        let device = self.path.display().to_string();
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DeviceError::from_io(&device, &e))?;
        let image = image::load_from_memory(&bytes)
            .map_err(|e| DeviceError::Unsupported(format!("{device}: {e}")))?
            .to_rgb8();

        let frame = VideoFrame::from_rgb(image);
        debug!(device = %device, width = frame.width, height = frame.height, "Loaded still frame");

        let (tx, _rx) = watch::channel(FrameDimensions::new(frame.width, frame.height));
        Ok(Box::new(FileStream {
            device,
            frame: Some(frame),
            tx: Arc::new(tx),
        }))
    }
}

struct FileStream {
    device: String,
    frame: Option<VideoFrame>,
    tx: Arc<watch::Sender<FrameDimensions>>,
}

#[async_trait]
impl VideoStream for FileStream {
    fn device(&self) -> &str {
        &self.device
    }

    fn dimensions(&self) -> watch::Receiver<FrameDimensions> {
        self.tx.subscribe()
    }

    async fn current_frame(&mut self) -> Result<VideoFrame, DeviceError> {
        self.frame
            .clone()
            .ok_or_else(|| DeviceError::Io(format!("{} is stopped", self.device)))
    }

    fn stop(&mut self) {
        self.frame = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    #[tokio::test]
    async fn opens_ready_with_image_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("card.png");
        RgbImage::new(40, 25).save(&path).unwrap();

        let mut stream = FileBackend::new(&path).open(FacingMode::Rear).await.unwrap();
        assert_eq!(*stream.dimensions().borrow(), FrameDimensions::new(40, 25));

        let frame = stream.current_frame().await.unwrap();
        assert_eq!((frame.width, frame.height), (40, 25));

        stream.stop();
        stream.stop();
        assert!(stream.current_frame().await.is_err());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = FileBackend::new("/nonexistent/card.jpg")
            .open(FacingMode::Rear)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DeviceError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_image_is_unsupported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"not an image").unwrap();

        let err = FileBackend::new(&path).open(FacingMode::Rear).await.err().unwrap();
        assert!(matches!(err, DeviceError::Unsupported(_)));
    }
}
