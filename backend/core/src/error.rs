use std::time::Duration;

use thiserror::Error;

/// Failures acquiring or driving a capture device.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeviceError {
    #[error("permission denied for camera {0}")]
    PermissionDenied(String),

    #[error("no camera found at {0}")]
    NotFound(String),

    #[error("camera {0} is busy")]
    Busy(String),

    #[error("camera {0} does not support a usable format")]
    Unsupported(String),

    #[error("camera I/O error: {0}")]
    Io(String),
}

impl DeviceError {
    /// Map an OS-level error from opening `device` onto the device taxonomy.
    pub fn from_io(device: &str, err: &std::io::Error) -> Self {
        use std::io::ErrorKind;
        match err.kind() {
            ErrorKind::PermissionDenied => Self::PermissionDenied(device.to_string()),
            ErrorKind::NotFound => Self::NotFound(device.to_string()),
            _ => match err.raw_os_error() {
                // EBUSY
                Some(16) => Self::Busy(device.to_string()),
                _ => Self::Io(format!("{device}: {err}")),
            },
        }
    }

    /// Short remediation hint shown next to the error.
    pub fn hint(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "Grant access to the video device (e.g. add the user to the `video` group)",
            Self::NotFound(_) => "Check that a camera is connected and the configured device path is correct",
            Self::Busy(_) => "Close other applications using the camera and try again",
            Self::Unsupported(_) => "Pick another camera or backend in the config",
            Self::Io(_) => "Retry opening the camera",
        }
    }
}

/// A single inference call that did not produce a usable reply.
///
/// Recovered locally by the fallback ladder; never surfaced on its own.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct TransportError {
    /// HTTP status when the service answered at all.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }

    /// Build from a non-success reply, preferring the service's structured
    /// `error.message` over the raw body.
    pub fn from_status(status: u16, raw_body: &str) -> Self {
        let structured = serde_json::from_str::<serde_json::Value>(raw_body)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(str::to_string));
        let message = structured.unwrap_or_else(|| format!("HTTP {status} - {raw_body}"));
        Self { status: Some(status), message }
    }
}

/// User-facing error taxonomy for the capture-and-extract pipeline.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("camera error: {0}")]
    Device(#[from] DeviceError),

    #[error(
        "No supported model worked. Tried: {}. List the models available for your API key with `cardscan models`.",
        .attempted.join(", ")
    )]
    NoModelAvailable { attempted: Vec<String> },

    #[error("inference response format changed or contained no candidate text: {0}")]
    MalformedResponse(String),

    #[error("could not parse JSON from model output. Raw: {excerpt}")]
    UnparsableExtraction { excerpt: String },

    #[error("camera did not report frame dimensions within {0:?}")]
    CaptureTimeout(Duration),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
