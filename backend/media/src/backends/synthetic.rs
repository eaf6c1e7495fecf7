//! Generated test-pattern camera.
//!
//! Reports its dimensions after a configurable delay, which makes it useful
//! for exercising the ready/timeout path without hardware.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cardscan_core::{DeviceError, FacingMode};
use image::{Rgb, RgbImage};
use tokio::sync::watch;

use crate::camera::{CameraBackend, FrameDimensions, VideoStream};
use crate::frame::VideoFrame;

pub struct SyntheticBackend {
    width: u32,
    height: u32,
    ready_delay: Duration,
    live: Arc<AtomicUsize>,
}

impl SyntheticBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ready_delay: Duration::ZERO,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_ready_delay(mut self, delay: Duration) -> Self {
        self.ready_delay = delay;
        self
    }

    /// Streams opened and not yet stopped.
    pub fn live_streams(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraBackend for SyntheticBackend {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, DeviceError> {
        let (tx, _rx) = watch::channel(FrameDimensions::default());
        let tx = Arc::new(tx);
        let dims = FrameDimensions::new(self.width, self.height);

        if self.ready_delay.is_zero() {
            tx.send_replace(dims);
        } else {
            let tx = Arc::clone(&tx);
            let delay = self.ready_delay;
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                tx.send_replace(dims);
            });
        }

        self.live.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            device: format!("synthetic:{facing}"),
            width: self.width,
            height: self.height,
            tx,
            stopped: AtomicBool::new(false),
            live: Arc::clone(&self.live),
        }))
    }
}

struct SyntheticStream {
    device: String,
    width: u32,
    height: u32,
    tx: Arc<watch::Sender<FrameDimensions>>,
    stopped: AtomicBool,
    live: Arc<AtomicUsize>,
}

#[async_trait]
impl VideoStream for SyntheticStream {
    fn device(&self) -> &str {
        &self.device
    }

    fn dimensions(&self) -> watch::Receiver<FrameDimensions> {
        self.tx.subscribe()
    }

    async fn current_frame(&mut self) -> Result<VideoFrame, DeviceError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(DeviceError::Io(format!("{} is stopped", self.device)));
        }
        if !self.tx.borrow().is_loaded() {
            return Err(DeviceError::Io(format!("{} has no frame yet", self.device)));
        }
        let (w, h) = (self.width, self.height);
        let pattern = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 255 / w.max(1)) as u8, (y * 255 / h.max(1)) as u8, 128])
        });
        Ok(VideoFrame::from_rgb(pattern))
    }

    fn stop(&mut self) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.stop();
    }
}
