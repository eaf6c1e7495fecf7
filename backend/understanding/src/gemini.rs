//! Gemini `generateContent` client.
//!
//! One HTTP call per method, no retries. The API key travels as the `key`
//! query parameter and is stripped from every error before it leaves this
//! module.

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use cardscan_core::{ExtractionRequest, InferenceService, ModelDescriptor, TransportError};
use serde::Deserialize;
use tracing::debug;

use crate::ladder::strip_models_prefix;

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_version: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct CatalogReply {
    #[serde(default)]
    models: Vec<ModelDescriptor>,
}

impl GeminiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: &str,
        api_version: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.api_version, path)
    }

    fn request_body(request: &ExtractionRequest) -> serde_json::Value {
        serde_json::json!({
            "contents": [{
                "parts": [
                    { "text": request.instruction },
                    {
                        "inline_data": {
                            "mime_type": request.image.mime_type,
                            "data": STANDARD.encode(&request.image.data),
                        }
                    }
                ]
            }]
        })
    }

    /// Send and read the body, mapping non-success statuses through the
    /// service's structured error when present.
    async fn read_reply(&self, req: reqwest::RequestBuilder) -> Result<serde_json::Value, TransportError> {
        let resp = req
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| TransportError::network(e.without_url().to_string()))?;
        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| TransportError::network(e.without_url().to_string()))?;

        if !status.is_success() {
            return Err(TransportError::from_status(status.as_u16(), &raw));
        }
        serde_json::from_str(&raw).map_err(|e| TransportError {
            status: Some(status.as_u16()),
            message: format!("reply was not JSON: {e}"),
        })
    }
}

#[async_trait]
impl InferenceService for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(
        &self,
        model: &str,
        request: &ExtractionRequest,
    ) -> Result<serde_json::Value, TransportError> {
        let path = format!("models/{}:generateContent", strip_models_prefix(model));
        debug!(model = %model, bytes = request.image.data.len(), "Calling generateContent");
        let req = self
            .http
            .post(self.endpoint(&path))
            .json(&Self::request_body(request));
        self.read_reply(req).await
    }

    async fn list_models(&self) -> Result<Vec<ModelDescriptor>, TransportError> {
        debug!("Listing models");
        let reply = self.read_reply(self.http.get(self.endpoint("models"))).await?;
        serde_json::from_value::<CatalogReply>(reply)
            .map(|c| c.models)
            .map_err(|e| TransportError::network(format!("unexpected catalog shape: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Json, Path, Query, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use cardscan_core::StillImage;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Seen {
        paths: Vec<String>,
        keys: Vec<String>,
        bodies: Vec<serde_json::Value>,
    }

    type Shared = Arc<Mutex<Seen>>;

    async fn generate(
        State(seen): State<Shared>,
        Path(rest): Path<String>,
        Query(q): Query<HashMap<String, String>>,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, String) {
        let mut s = seen.lock().unwrap();
        s.paths.push(rest.clone());
        s.keys.push(q.get("key").cloned().unwrap_or_default());
        s.bodies.push(body);
        match rest.as_str() {
            "gemini-ok:generateContent" => (
                StatusCode::OK,
                r#"{"candidates":[{"content":{"parts":[{"text":"{}"}]}}]}"#.into(),
            ),
            "gemini-plain:generateContent" => (StatusCode::BAD_GATEWAY, "upstream down".into()),
            _ => (
                StatusCode::NOT_FOUND,
                r#"{"error":{"code":404,"message":"model not found"}}"#.into(),
            ),
        }
    }

    async fn catalog() -> &'static str {
        r#"{"models":[{"name":"models/gemini-pro","displayName":"Gemini Pro"},{"name":"models/embedding-001"}]}"#
    }

    async fn spawn_service() -> (String, Shared) {
        let seen: Shared = Arc::default();
        let app = Router::new()
            .route("/v1/models", get(catalog))
            .route("/v1/models/*rest", post(generate))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), seen)
    }

    fn request() -> ExtractionRequest {
        ExtractionRequest {
            instruction: "read the card".into(),
            image: StillImage::new(bytes::Bytes::from_static(b"\xFF\xD8\xFFjpeg"), "image/jpeg", 2, 2),
        }
    }

    fn client(base: &str) -> GeminiClient {
        GeminiClient::new("test-key", base, "v1", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn posts_instruction_and_inline_image() {
        let (base, seen) = spawn_service().await;
        let reply = client(&base).generate("models/gemini-ok", &request()).await.unwrap();
        assert_eq!(reply["candidates"][0]["content"]["parts"][0]["text"], "{}");

        let s = seen.lock().unwrap();
        assert_eq!(s.paths, vec!["gemini-ok:generateContent"]);
        assert_eq!(s.keys, vec!["test-key"]);
        let parts = &s.bodies[0]["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "read the card");
        assert_eq!(parts[1]["inline_data"]["mime_type"], "image/jpeg");
        assert_eq!(parts[1]["inline_data"]["data"], STANDARD.encode(b"\xFF\xD8\xFFjpeg"));
    }

    #[tokio::test]
    async fn structured_error_message_is_surfaced() {
        let (base, _) = spawn_service().await;
        let err = client(&base).generate("gemini-1.0", &request()).await.unwrap_err();
        assert_eq!(err.status, Some(404));
        assert_eq!(err.message, "model not found");
    }

    #[tokio::test]
    async fn raw_body_is_used_when_error_is_unstructured() {
        let (base, _) = spawn_service().await;
        let err = client(&base).generate("gemini-plain", &request()).await.unwrap_err();
        assert_eq!(err.message, "HTTP 502 - upstream down");
    }

    #[tokio::test]
    async fn lists_catalog_entries() {
        let (base, _) = spawn_service().await;
        let models = client(&base).list_models().await.unwrap();
        let names: Vec<_> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["models/gemini-pro", "models/embedding-001"]);
        assert_eq!(models[0].display_name.as_deref(), Some("Gemini Pro"));
    }

    #[tokio::test]
    async fn network_errors_do_not_leak_the_key() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = GeminiClient::new("secret-key-123", &format!("http://{addr}"), "v1", Duration::from_secs(2)).unwrap();
        let err = client.generate("gemini-ok", &request()).await.unwrap_err();
        assert_eq!(err.status, None);
        assert!(!err.message.contains("secret-key-123"));
    }
}
