//! Video4Linux2 capture.
//!
//! Frames are pulled on a dedicated thread through a memory-mapped stream;
//! the latest one is kept for capture. Dimensions are published once the
//! first frame arrives, which is this backend's "metadata loaded" moment.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use async_trait::async_trait;
use cardscan_core::{DeviceError, FacingMode};
use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::camera::{CameraBackend, FrameDimensions, VideoStream};
use crate::frame::{PixelFormat, VideoFrame};

const BUFFER_COUNT: u32 = 4;

pub struct V4l2Backend {
    rear_device: String,
    front_device: Option<String>,
}

impl V4l2Backend {
    pub fn new(rear_device: impl Into<String>, front_device: Option<String>) -> Self {
        Self {
            rear_device: rear_device.into(),
            front_device,
        }
    }

    fn device_for(&self, facing: FacingMode) -> &str {
        match facing {
            FacingMode::Front => self.front_device.as_deref().unwrap_or(&self.rear_device),
            FacingMode::Rear => &self.rear_device,
        }
    }
}

#[async_trait]
impl CameraBackend for V4l2Backend {
    fn name(&self) -> &str {
        "v4l2"
    }

    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, DeviceError> {
        let path = self.device_for(facing).to_string();
        if !Path::new(&path).exists() {
            return Err(DeviceError::NotFound(path));
        }

        let (dims_tx, _dims_rx) = watch::channel(FrameDimensions::default());
        let dims_tx = Arc::new(dims_tx);
        let latest = Arc::new(Mutex::new(None));
        let stop = Arc::new(AtomicBool::new(false));
        let (started_tx, started_rx) = oneshot::channel();

        let worker = CaptureWorker {
            path: path.clone(),
            dims_tx: Arc::clone(&dims_tx),
            latest: Arc::clone(&latest),
            stop: Arc::clone(&stop),
        };
        thread::Builder::new()
            .name("cardscan-v4l2".into())
            .spawn(move || worker.run(started_tx))
            .map_err(|e| DeviceError::Io(format!("{path}: failed to spawn capture thread: {e}")))?;

        started_rx
            .await
            .map_err(|_| DeviceError::Io(format!("{path}: capture thread exited during setup")))??;

        info!(device = %path, "V4L2 stream started");
        Ok(Box::new(V4l2Stream {
            device: path,
            dims_tx,
            latest,
            stop,
        }))
    }
}

struct CaptureWorker {
    path: String,
    dims_tx: Arc<watch::Sender<FrameDimensions>>,
    latest: Arc<Mutex<Option<VideoFrame>>>,
    stop: Arc<AtomicBool>,
}

impl CaptureWorker {
    fn run(self, started: oneshot::Sender<Result<(), DeviceError>>) {
        let (device, format) = match self.configure() {
            Ok(ok) => ok,
            Err(e) => {
                let _ = started.send(Err(e));
                return;
            }
        };
        let mut stream = match MmapStream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT) {
            Ok(s) => s,
            Err(e) => {
                let _ = started.send(Err(DeviceError::from_io(&self.path, &e)));
                return;
            }
        };
        let _ = started.send(Ok(()));

        while !self.stop.load(Ordering::SeqCst) {
            let (buf, meta) = match stream.next() {
                Ok(next) => next,
                Err(e) => {
                    warn!(device = %self.path, error = %e, "V4L2 dequeue failed; stopping stream");
                    break;
                }
            };
            let used = (meta.bytesused as usize).min(buf.len());
            let frame = VideoFrame::new(format.0, format.1, format.2, buf[..used].to_vec());
            if let Ok(mut slot) = self.latest.lock() {
                *slot = Some(frame);
            }
            if !self.dims_tx.borrow().is_loaded() {
                self.dims_tx.send_replace(FrameDimensions::new(format.0, format.1));
            }
        }

        debug!(device = %self.path, "V4L2 capture thread exiting");
    }

    /// Prefer uncompressed YUYV, fall back to MJPEG.
    fn configure(&self) -> Result<(Device, (u32, u32, PixelFormat)), DeviceError> {
        let device = Device::with_path(&self.path).map_err(|e| DeviceError::from_io(&self.path, &e))?;
        let current = device
            .format()
            .map_err(|e| DeviceError::from_io(&self.path, &e))?;

        for (fourcc, pixel_format) in [(b"YUYV", PixelFormat::Yuyv), (b"MJPG", PixelFormat::Mjpeg)] {
            let mut wanted = current.clone();
            wanted.fourcc = FourCC::new(fourcc);
            match device.set_format(&wanted) {
                Ok(actual) if actual.fourcc == wanted.fourcc => {
                    debug!(
                        device = %self.path,
                        width = actual.width,
                        height = actual.height,
                        format = %pixel_format,
                        "Negotiated V4L2 format"
                    );
                    return Ok((device, (actual.width, actual.height, pixel_format)));
                }
                Ok(_) => continue,
                Err(e) => debug!(device = %self.path, error = %e, "Format rejected"),
            }
        }
        Err(DeviceError::Unsupported(self.path.clone()))
    }
}

struct V4l2Stream {
    device: String,
    dims_tx: Arc<watch::Sender<FrameDimensions>>,
    latest: Arc<Mutex<Option<VideoFrame>>>,
    stop: Arc<AtomicBool>,
}

#[async_trait]
impl VideoStream for V4l2Stream {
    fn device(&self) -> &str {
        &self.device
    }

    fn dimensions(&self) -> watch::Receiver<FrameDimensions> {
        self.dims_tx.subscribe()
    }

    async fn current_frame(&mut self) -> Result<VideoFrame, DeviceError> {
        if self.stop.load(Ordering::SeqCst) {
            return Err(DeviceError::Io(format!("{} is stopped", self.device)));
        }
        self.latest
            .lock()
            .map_err(|_| DeviceError::Io(format!("{}: frame buffer poisoned", self.device)))?
            .clone()
            .ok_or_else(|| DeviceError::Io(format!("{} has no frame yet", self.device)))
    }

    /// The device handle is released by the capture thread once it sees the flag.
    fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

impl Drop for V4l2Stream {
    fn drop(&mut self) {
        self.stop();
    }
}
