use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{ScanError, TransportError};
use crate::types::{ExtractionRequest, SubmissionOutcome, SubmissionRecord};

/// Entry returned by the service's model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// A multimodal inference endpoint keyed by model identifier.
///
/// Implementations make exactly one network call per method invocation and
/// never retry on their own; fallback across models is the caller's job.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Service name for logs (e.g. "gemini").
    fn name(&self) -> &str;

    /// Run one generation against `model` and return the decoded JSON reply.
    async fn generate(
        &self,
        model: &str,
        request: &ExtractionRequest,
    ) -> Result<serde_json::Value, TransportError>;

    /// Query the model catalog for the configured credential.
    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, TransportError>;
}

/// Destination for finished records.
#[async_trait]
pub trait SubmissionSink: Send + Sync {
    fn name(&self) -> &str;

    async fn submit(&self, record: &SubmissionRecord) -> Result<SubmissionOutcome, ScanError>;
}
