//! The scan orchestrator.
//!
//! Drives one card at a time through `idle -> cameraOpen -> reviewing ->
//! idle`. The camera is closed on every path out of `cameraOpen`. State is
//! published on a watch channel so a front end can render progress while an
//! operation is suspended.

use std::sync::Arc;

use cardscan_core::{
    ExtractionResult, FacingMode, ScanError, SubmissionOutcome, SubmissionRecord, SubmissionSink,
};
use cardscan_logging::{ScanEvent, ScanEventLogger};
use cardscan_media::{CameraSessionManager, FrameCapturer, FrameDimensions};
use cardscan_understanding::ExtractionClient;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::{ScanPhase, ScanState};

pub struct Scanner {
    camera: CameraSessionManager,
    capturer: FrameCapturer,
    extractor: ExtractionClient,
    sink: Option<Arc<dyn SubmissionSink>>,
    facing: FacingMode,
    scan_id: String,
    state: watch::Sender<ScanState>,
}

impl Scanner {
    pub fn new(camera: CameraSessionManager, capturer: FrameCapturer, extractor: ExtractionClient) -> Self {
        let (state, _) = watch::channel(ScanState::default());
        Self {
            camera,
            capturer,
            extractor,
            sink: None,
            facing: FacingMode::default(),
            scan_id: Uuid::new_v4().to_string(),
            state,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn SubmissionSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_facing(mut self, facing: FacingMode) -> Self {
        self.facing = facing;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ScanState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ScanState {
        self.state.borrow().clone()
    }

    pub fn phase(&self) -> ScanPhase {
        self.state.borrow().phase
    }

    /// Correlation id carried by this scan's events.
    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }

    fn update(&self, f: impl FnOnce(&mut ScanState)) {
        self.state.send_modify(f);
    }

    // ---- camera ----

    /// Open the camera. A live session is closed before the new one opens.
    pub async fn open_camera(&mut self) -> Result<(), ScanError> {
        if self.phase() == ScanPhase::Reviewing {
            return Err(ScanError::Capture(
                "a card is still under review; start a new scan first".into(),
            ));
        }

        self.scan_id = Uuid::new_v4().to_string();
        self.update(|s| {
            s.camera_error = None;
            s.camera_opening = true;
            s.camera_ready = false;
        });

        let opened = self
            .camera
            .open(self.facing)
            .await
            .map(|session| (session.device().to_string(), session.is_ready()));

        match opened {
            Ok((device, ready)) => {
                ScanEventLogger::log(
                    &self.scan_id,
                    ScanEvent::CameraOpened { device, facing: self.facing.to_string() },
                );
                self.update(|s| {
                    s.camera_opening = false;
                    s.camera_ready = ready;
                    s.phase = ScanPhase::CameraOpen;
                });
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Camera open failed");
                let message = camera_error_message(&e);
                self.update(|s| {
                    s.camera_opening = false;
                    s.phase = ScanPhase::Idle;
                    s.camera_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Wait for the open session to report its frame size. On timeout the
    /// camera is closed.
    pub async fn wait_until_ready(&mut self) -> Result<FrameDimensions, ScanError> {
        let timeout = self.capturer.ready_timeout();
        let session = self
            .camera
            .session_mut()
            .ok_or_else(|| ScanError::Capture("camera is not open".into()))?;

        match session.wait_ready(timeout).await {
            Ok(dims) => {
                self.update(|s| s.camera_ready = true);
                Ok(dims)
            }
            Err(e) => {
                self.close_camera();
                let message = camera_error_message(&e);
                self.update(|s| s.camera_error = Some(message));
                Err(e)
            }
        }
    }

    /// Stop the camera if it is open. Idempotent.
    pub fn close_camera(&mut self) -> bool {
        let device = self.camera.session().map(|s| s.device().to_string());
        let closed = self.camera.close();
        // The capturer stops the stream itself, so log whenever a session existed.
        if let Some(device) = device {
            ScanEventLogger::log(&self.scan_id, ScanEvent::CameraClosed { device });
        }
        self.update(|s| {
            s.camera_ready = false;
            if s.phase == ScanPhase::CameraOpen {
                s.phase = ScanPhase::Idle;
            }
        });
        closed
    }

    // ---- capture and extraction ----

    /// Capture a still, close the camera, and extract the card fields.
    ///
    /// Once a still exists the scan is in review, even if extraction fails;
    /// the failure is kept as the extraction error.
    pub async fn capture(&mut self) -> Result<ExtractionResult, ScanError> {
        if self.phase() != ScanPhase::CameraOpen {
            return Err(ScanError::Capture("camera is not open".into()));
        }
        let session = self
            .camera
            .session_mut()
            .ok_or_else(|| ScanError::Capture("camera is not open".into()))?;

        let captured = self.capturer.capture(session).await;
        self.close_camera();

        let image = match captured {
            Ok(image) => image,
            Err(e) => {
                let message = camera_error_message(&e);
                self.update(|s| s.camera_error = Some(message));
                return Err(e);
            }
        };

        ScanEventLogger::log(
            &self.scan_id,
            ScanEvent::FrameCaptured { width: image.width, height: image.height, bytes: image.data.len() },
        );
        self.update(|s| {
            s.image = Some(image);
            s.result = None;
            s.phase = ScanPhase::Reviewing;
        });

        self.run_extraction().await
    }

    /// Run extraction again on the still under review.
    pub async fn retry_extraction(&mut self) -> Result<ExtractionResult, ScanError> {
        if self.phase() != ScanPhase::Reviewing {
            return Err(ScanError::Capture("no card under review".into()));
        }
        self.run_extraction().await
    }

    async fn run_extraction(&mut self) -> Result<ExtractionResult, ScanError> {
        let image = self
            .state
            .borrow()
            .image
            .clone()
            .ok_or_else(|| ScanError::Capture("no captured image".into()))?;

        self.update(|s| {
            s.extracting = true;
            s.extraction_error = None;
            s.model_used = None;
            s.result = None;
        });

        match self.extractor.extract(&self.scan_id, &image).await {
            Ok(result) => {
                info!(model = %result.model_used, "Card extracted");
                let shown = result.clone();
                self.update(|s| {
                    s.extracting = false;
                    s.model_used = Some(shown.model_used.clone());
                    s.result = Some(shown);
                });
                Ok(result)
            }
            Err(e) => {
                let message = e.to_string();
                self.update(|s| {
                    s.extracting = false;
                    s.extraction_error = Some(message);
                });
                Err(e)
            }
        }
    }

    // ---- review ----

    /// Submit the reviewed result.
    ///
    /// Any accepted or unconfirmed hand-off ends the scan. A confirmed-mode
    /// rejection keeps the card in review so the save can be retried.
    pub async fn save(&mut self) -> Result<SubmissionOutcome, ScanError> {
        let result = {
            let state = self.state.borrow();
            match (&state.phase, &state.result) {
                (ScanPhase::Reviewing, Some(result)) => result.clone(),
                _ => return Err(ScanError::Submission("nothing to save".into())),
            }
        };
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| ScanError::Config("no webhook URL configured".into()))?;

        let record = SubmissionRecord::new(result.fields);
        self.update(|s| {
            s.saving = true;
            s.submission_error = None;
        });

        match sink.submit(&record).await {
            Ok(outcome) => {
                let (mode, confirmed) = match outcome {
                    SubmissionOutcome::Unconfirmed => ("fireAndForget", false),
                    SubmissionOutcome::Accepted { .. } => ("confirmed", true),
                };
                ScanEventLogger::log(
                    &self.scan_id,
                    ScanEvent::RecordSubmitted { mode: mode.to_string(), confirmed },
                );
                self.update(|s| {
                    s.saving = false;
                    s.image = None;
                    s.result = None;
                    s.phase = ScanPhase::Idle;
                });
                Ok(outcome)
            }
            Err(e) => {
                ScanEventLogger::log(&self.scan_id, ScanEvent::SubmissionFailed { error: e.to_string() });
                let message = e.to_string();
                self.update(|s| {
                    s.saving = false;
                    s.submission_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Discard the current card and return to idle.
    pub fn scan_new(&mut self) {
        self.close_camera();
        self.update(|s| {
            s.image = None;
            s.result = None;
            s.phase = ScanPhase::Idle;
        });
        debug!("Ready for a new card");
    }

    pub fn dismiss_camera_error(&mut self) {
        self.update(|s| s.camera_error = None);
    }

    pub fn dismiss_extraction_error(&mut self) {
        self.update(|s| s.extraction_error = None);
    }

    pub fn dismiss_submission_error(&mut self) {
        self.update(|s| s.submission_error = None);
    }

    /// Release the camera before the process exits.
    pub fn shutdown(&mut self) {
        if self.close_camera() {
            info!("Camera released on shutdown");
        }
    }
}

fn camera_error_message(err: &ScanError) -> String {
    match err {
        ScanError::Device(device) => format!("{err}\n{}", device.hint()),
        _ => err.to_string(),
    }
}
