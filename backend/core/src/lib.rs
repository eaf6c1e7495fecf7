pub mod error;
pub mod traits;
pub mod types;

pub use error::{DeviceError, ScanError, TransportError};
pub use traits::{InferenceService, ModelDescriptor, SubmissionSink};
pub use types::{
    CardFields, ExtractionRequest, ExtractionResult, FacingMode, StillImage, SubmissionMode,
    SubmissionOutcome, SubmissionRecord, FIELD_NAMES,
};
