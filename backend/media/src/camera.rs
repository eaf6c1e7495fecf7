//! Camera session management.
//!
//! Backends hand out [`VideoStream`]s; a [`CameraSession`] wraps one stream
//! together with its readiness signal, and the [`CameraSessionManager`]
//! guarantees at most one session is live at a time.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cardscan_core::{DeviceError, FacingMode, ScanError};
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use crate::frame::VideoFrame;

/// Reported size of the stream. `0x0` means metadata has not loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameDimensions {
    pub width: u32,
    pub height: u32,
}

impl FrameDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_loaded(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

/// A live video stream handed out by a backend.
#[async_trait]
pub trait VideoStream: Send {
    /// Human-readable device description.
    fn device(&self) -> &str;

    /// Watch channel carrying the stream's dimensions; starts at `0x0` and is
    /// updated once metadata is available.
    fn dimensions(&self) -> watch::Receiver<FrameDimensions>;

    /// The frame currently being shown.
    async fn current_frame(&mut self) -> Result<VideoFrame, DeviceError>;

    /// Stop all tracks and release the device. Must be idempotent.
    fn stop(&mut self);
}

/// Platform media layer: opens streams for a facing preference.
#[async_trait]
pub trait CameraBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn open(&self, facing: FacingMode) -> Result<Box<dyn VideoStream>, DeviceError>;
}

/// An open camera stream. Dropping the session closes it.
pub struct CameraSession {
    id: Uuid,
    facing: FacingMode,
    device: String,
    stream: Option<Box<dyn VideoStream>>,
    dims: watch::Receiver<FrameDimensions>,
}

impl CameraSession {
    pub fn new(stream: Box<dyn VideoStream>, facing: FacingMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            facing,
            device: stream.device().to_string(),
            dims: stream.dimensions(),
            stream: Some(stream),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    pub fn device(&self) -> &str {
        &self.device
    }

    /// Whether the stream has not been stopped.
    pub fn is_live(&self) -> bool {
        self.stream.is_some()
    }

    /// Whether frame dimensions are known, i.e. a capture can proceed without waiting.
    pub fn is_ready(&self) -> bool {
        self.is_live() && self.dims.borrow().is_loaded()
    }

    pub fn dimensions(&self) -> FrameDimensions {
        *self.dims.borrow()
    }

    /// Suspend until the stream reports non-zero dimensions, bounded by `timeout`.
    pub async fn wait_ready(&mut self, timeout: Duration) -> Result<FrameDimensions, ScanError> {
        if !self.is_live() {
            return Err(ScanError::Capture("camera session is closed".into()));
        }
        match tokio::time::timeout(timeout, self.dims.wait_for(FrameDimensions::is_loaded)).await {
            Ok(Ok(dims)) => Ok(*dims),
            Ok(Err(_)) => Err(DeviceError::Io(format!(
                "{} stopped before reporting frame dimensions",
                self.device
            ))
            .into()),
            Err(_) => Err(ScanError::CaptureTimeout(timeout)),
        }
    }

    pub async fn current_frame(&mut self) -> Result<VideoFrame, ScanError> {
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ScanError::Capture("camera session is closed".into()))?;
        Ok(stream.current_frame().await?)
    }

    /// Stop the stream. Returns `false` if it was already closed.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                info!(session = %self.id, device = %self.device, "Camera closed");
                true
            }
            None => false,
        }
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

/// Exclusive owner of the camera. Opening while a session is live closes
/// the previous one first.
pub struct CameraSessionManager {
    backend: Arc<dyn CameraBackend>,
    session: Option<CameraSession>,
}

impl CameraSessionManager {
    pub fn new(backend: Arc<dyn CameraBackend>) -> Self {
        Self { backend, session: None }
    }

    pub async fn open(&mut self, facing: FacingMode) -> Result<&mut CameraSession, ScanError> {
        if self.close() {
            debug!("Closed previous camera session before reopening");
        }

        let stream = self.backend.open(facing).await?;
        let session = CameraSession::new(stream, facing);
        info!(
            session = %session.id(),
            backend = self.backend.name(),
            device = %session.device(),
            facing = %facing,
            "Camera opened"
        );
        Ok(self.session.insert(session))
    }

    pub fn is_open(&self) -> bool {
        self.session.as_ref().is_some_and(CameraSession::is_live)
    }

    pub fn session(&self) -> Option<&CameraSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut CameraSession> {
        self.session.as_mut()
    }

    /// Close and drop the current session. Idempotent; returns whether a
    /// live stream was actually stopped.
    pub fn close(&mut self) -> bool {
        self.session.take().is_some_and(|mut s| s.close())
    }
}

impl Drop for CameraSessionManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::SyntheticBackend;

    fn manager(delay: Duration) -> CameraSessionManager {
        CameraSessionManager::new(Arc::new(SyntheticBackend::new(64, 48).with_ready_delay(delay)))
    }

    #[tokio::test]
    async fn close_twice_is_a_no_op() {
        let mut mgr = manager(Duration::ZERO);
        mgr.open(FacingMode::Rear).await.unwrap();
        assert!(mgr.is_open());

        assert!(mgr.close());
        assert!(!mgr.close());
        assert!(!mgr.is_open());
        assert!(mgr.session().is_none());
    }

    #[tokio::test]
    async fn session_close_is_idempotent() {
        let mut mgr = manager(Duration::ZERO);
        let session = mgr.open(FacingMode::Rear).await.unwrap();
        assert!(session.close());
        assert!(!session.close());
        assert!(!session.is_live());
        assert!(!session.is_ready());
    }

    #[tokio::test]
    async fn reopening_replaces_the_live_session() {
        let backend = Arc::new(SyntheticBackend::new(64, 48));
        let mut mgr = CameraSessionManager::new(backend.clone());

        let first = mgr.open(FacingMode::Rear).await.unwrap().id();
        let second = mgr.open(FacingMode::Front).await.unwrap().id();

        assert_ne!(first, second);
        assert_eq!(backend.live_streams(), 1);
        assert_eq!(mgr.session().unwrap().facing(), FacingMode::Front);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ready_suspends_until_metadata() {
        let mut mgr = manager(Duration::from_millis(300));
        let session = mgr.open(FacingMode::Rear).await.unwrap();
        assert!(!session.is_ready());
        assert_eq!(session.dimensions(), FrameDimensions::default());

        let dims = session.wait_ready(Duration::from_secs(5)).await.unwrap();
        assert_eq!(dims, FrameDimensions::new(64, 48));
        assert!(session.is_ready());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_ready_times_out() {
        let mut mgr = manager(Duration::from_secs(60));
        let session = mgr.open(FacingMode::Rear).await.unwrap();
        let err = session.wait_ready(Duration::from_secs(2)).await.unwrap_err();
        assert!(matches!(err, ScanError::CaptureTimeout(d) if d == Duration::from_secs(2)));
    }

    #[tokio::test]
    async fn dropping_manager_releases_device() {
        let backend = Arc::new(SyntheticBackend::new(16, 16));
        {
            let mut mgr = CameraSessionManager::new(backend.clone());
            mgr.open(FacingMode::Rear).await.unwrap();
            assert_eq!(backend.live_streams(), 1);
        }
        assert_eq!(backend.live_streams(), 0);
    }
}
