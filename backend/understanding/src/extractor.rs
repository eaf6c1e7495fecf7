use std::sync::Arc;

use cardscan_core::{ExtractionResult, InferenceService, ScanError, StillImage};
use cardscan_logging::{ScanEvent, ScanEventLogger};
use tracing::warn;

use crate::ladder::{FallbackLadder, LadderOutcome};
use crate::parse::{normalize_fields, parse_fields, reply_text};
use crate::prompt::build_request;

/// Runs one still image through the fallback ladder and parses the reply.
pub struct ExtractionClient {
    service: Arc<dyn InferenceService>,
    candidates: Vec<String>,
    families: Vec<String>,
    normalize: bool,
}

impl ExtractionClient {
    pub fn new(service: Arc<dyn InferenceService>, candidates: Vec<String>, families: Vec<String>) -> Self {
        Self {
            service,
            candidates,
            families,
            normalize: true,
        }
    }

    /// Toggle local post-parse normalization (on by default).
    pub fn with_normalization(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Extract card fields from `image`. `session_id` tags the scan events.
    pub async fn extract(&self, session_id: &str, image: &StillImage) -> Result<ExtractionResult, ScanError> {
        let request = build_request(image.clone());
        let outcome = FallbackLadder::new(self.service.as_ref(), &self.candidates, &self.families)
            .run(&request)
            .await;

        for f in outcome.failures() {
            ScanEventLogger::log(
                session_id,
                ScanEvent::ModelAttemptFailed { model: f.model.clone(), error: f.error.to_string() },
            );
        }

        let (model, reply, failures) = match outcome {
            LadderOutcome::Succeeded { model, reply, failures } => (model, reply, failures),
            LadderOutcome::Exhausted { failures } => {
                let attempted = failures.into_iter().map(|f| f.model).collect();
                return Err(self.fail(session_id, ScanError::NoModelAvailable { attempted }));
            }
        };

        ScanEventLogger::log(
            session_id,
            ScanEvent::ModelSucceeded { model: model.clone(), failed_before: failures.len() },
        );

        let text = reply_text(&reply).map_err(|e| self.fail(session_id, e))?;
        let mut fields = parse_fields(text).map_err(|e| self.fail(session_id, e))?;
        if self.normalize {
            fields = normalize_fields(fields);
        }

        Ok(ExtractionResult {
            fields,
            model_used: model,
            failed_attempts: failures.into_iter().map(|f| f.model).collect(),
        })
    }

    fn fail(&self, session_id: &str, err: ScanError) -> ScanError {
        warn!(service = self.service.name(), error = %err, "Extraction failed");
        ScanEventLogger::log(session_id, ScanEvent::ExtractionFailed { error: err.to_string() });
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::tests::{request, FakeService};

    const FENCED: &str = "```json\n{\"name\":\"A\",\"email\":\"B@X.com\",\"mobile\":\"\",\"website\":\"\",\"address\":\"\"}\n```";

    fn client(service: Arc<FakeService>, candidates: &[&str]) -> ExtractionClient {
        ExtractionClient::new(
            service,
            candidates.iter().map(|s| s.to_string()).collect(),
            vec!["gemini".into(), "bison".into()],
        )
    }

    fn image() -> StillImage {
        request().image
    }

    #[tokio::test]
    async fn fenced_reply_yields_normalized_fields() {
        let service = Arc::new(FakeService::new().answering_text("gemini-1.5-flash", FENCED));
        let result = client(service, &["gemini-1.5-flash"]).extract("t", &image()).await.unwrap();

        assert_eq!(result.fields.name, "A");
        assert_eq!(result.fields.email, "b@x.com");
        assert_eq!(result.fields.website, "");
        assert_eq!(result.model_used, "gemini-1.5-flash");
        assert!(result.failed_attempts.is_empty());
    }

    #[tokio::test]
    async fn normalization_can_be_disabled() {
        let service = Arc::new(FakeService::new().answering_text("m", FENCED));
        let result = client(service, &["m"])
            .with_normalization(false)
            .extract("t", &image())
            .await
            .unwrap();
        assert_eq!(result.fields.email, "B@X.com");
    }

    #[tokio::test]
    async fn catalog_model_is_recorded_as_used() {
        let service = Arc::new(
            FakeService::new()
                .with_catalog(&["models/embedding-001", "models/gemini-pro-vision"])
                .answering_text("models/gemini-pro-vision", r#"{"name":"Ada"}"#),
        );
        let result = client(service.clone(), &["gemini-1.5-flash", "models/text-bison-001"])
            .extract("t", &image())
            .await
            .unwrap();

        assert_eq!(result.model_used, "models/gemini-pro-vision");
        assert_eq!(result.failed_attempts, vec!["gemini-1.5-flash", "models/text-bison-001"]);
        assert_eq!(
            service.calls(),
            vec!["gemini-1.5-flash", "models/text-bison-001", "models/gemini-pro-vision"]
        );
    }

    #[tokio::test]
    async fn exhaustion_reports_attempts_in_order() {
        let service = Arc::new(FakeService::new().with_catalog(&["models/gemini-1.5-flash", "models/chat-bison-001"]));
        let err = client(service, &["gemini-1.5-flash", "gemini-1.0"])
            .extract("t", &image())
            .await
            .unwrap_err();

        match err {
            ScanError::NoModelAvailable { attempted } => {
                assert_eq!(attempted, vec!["gemini-1.5-flash", "gemini-1.0", "models/chat-bison-001"]);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn reply_without_text_is_malformed() {
        let service = Arc::new(FakeService::new().answering("m", serde_json::json!({ "candidates": [] })));
        let err = client(service, &["m"]).extract("t", &image()).await.unwrap_err();
        assert!(matches!(err, ScanError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn prose_reply_is_unparsable_with_excerpt() {
        let prose = format!("Sure! Here is the card: {}", "x".repeat(1000));
        let service = Arc::new(FakeService::new().answering_text("m", &prose));
        let err = client(service, &["m"]).extract("t", &image()).await.unwrap_err();

        match err {
            ScanError::UnparsableExtraction { excerpt } => {
                assert!(excerpt.chars().count() <= 500);
                assert!(excerpt.starts_with("Sure! Here is the card"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
