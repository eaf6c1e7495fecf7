//! Scan Event Logger
//!
//! Lifecycle events of a scan (camera, capture, model attempts, submission)
//! emitted as JSON on the `scan_events` tracing target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanEvent {
    CameraOpened { device: String, facing: String },
    CameraClosed { device: String },
    FrameCaptured { width: u32, height: u32, bytes: usize },
    ModelAttemptFailed { model: String, error: String },
    ModelSucceeded { model: String, failed_before: usize },
    ExtractionFailed { error: String },
    RecordSubmitted { mode: String, confirmed: bool },
    SubmissionFailed { error: String },
}

impl ScanEvent {
    fn redacted(self) -> Self {
        match self {
            ScanEvent::ModelAttemptFailed { model, error } => ScanEvent::ModelAttemptFailed {
                model,
                error: redact_sensitive_data(&error),
            },
            ScanEvent::ExtractionFailed { error } => ScanEvent::ExtractionFailed {
                error: redact_sensitive_data(&error),
            },
            ScanEvent::SubmissionFailed { error } => ScanEvent::SubmissionFailed {
                error: redact_sensitive_data(&error),
            },
            other => other,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanEventEntry {
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: ScanEvent,
}

impl ScanEventEntry {
    pub fn new(session_id: &str, event: ScanEvent) -> Self {
        Self {
            session_id: session_id.to_string(),
            timestamp: Utc::now(),
            event: event.redacted(),
        }
    }
}

pub struct ScanEventLogger;

impl ScanEventLogger {
    /// Redact and emit one event.
    pub fn log(session_id: &str, event: ScanEvent) {
        let entry = ScanEventEntry::new(session_id, event);
        let json = serde_json::to_string(&entry).unwrap_or_default();
        info!(target: "scan_events", event = %json, "Scan event");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_text_is_redacted_before_logging() {
        let entry = ScanEventEntry::new(
            "s1",
            ScanEvent::ModelAttemptFailed {
                model: "gemini-1.0".into(),
                error: "401 for ?key=AIzaSyLeakedLeakedLeakedLeaked00".into(),
            },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "model_attempt_failed");
        assert!(!json["event"]["error"].as_str().unwrap().contains("AIzaSy"));
    }
}
