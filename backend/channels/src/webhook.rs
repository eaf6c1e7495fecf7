/// Webhook sink: POSTs each record as a flat JSON object.
///
/// In fire-and-forget mode the reply is never read, so the caller cannot
/// tell a stored record from a rejected one. Confirmed mode reads the status
/// and turns non-success replies into errors.
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use cardscan_core::{ScanError, SubmissionMode, SubmissionOutcome, SubmissionRecord, SubmissionSink};
use cardscan_logging::redact_sensitive_data;
use reqwest::Client;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub url: String,
    pub mode: SubmissionMode,
    pub timeout: Duration,
}

pub struct WebhookSink {
    config: WebhookConfig,
    http: Client,
}

impl WebhookSink {
    pub fn new(config: WebhookConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("failed to build webhook HTTP client")?;
        Ok(Self { config, http })
    }

    pub fn mode(&self) -> SubmissionMode {
        self.config.mode
    }

    async fn send_confirmed(&self, record: &SubmissionRecord) -> Result<SubmissionOutcome, ScanError> {
        let resp = self
            .http
            .post(&self.config.url)
            .json(record)
            .send()
            .await
            .map_err(|e| ScanError::Submission(e.without_url().to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ScanError::Submission(format!(
                "webhook answered HTTP {} - {}",
                status.as_u16(),
                redact_sensitive_data(body.trim())
            )));
        }
        info!(status = status.as_u16(), "Webhook accepted record");
        Ok(SubmissionOutcome::Accepted { status: status.as_u16() })
    }

    async fn send_unconfirmed(&self, record: &SubmissionRecord) -> SubmissionOutcome {
        match self.http.post(&self.config.url).json(record).send().await {
            Ok(_) => debug!("Webhook request sent; reply ignored"),
            Err(e) => warn!(error = %e.without_url(), "Webhook request failed; not surfaced in fire-and-forget mode"),
        }
        SubmissionOutcome::Unconfirmed
    }
}

#[async_trait]
impl SubmissionSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn submit(&self, record: &SubmissionRecord) -> Result<SubmissionOutcome, ScanError> {
        match self.config.mode {
            SubmissionMode::FireAndForget => Ok(self.send_unconfirmed(record).await),
            SubmissionMode::Confirmed => self.send_confirmed(record).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Json, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use cardscan_core::CardFields;
    use chrono::{TimeZone, Utc};
    use std::sync::{Arc, Mutex};

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    async fn spawn_webhook(status: StatusCode) -> (String, Received) {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(
                "/hook",
                post(move |State(r): State<Received>, Json(body): Json<serde_json::Value>| async move {
                    r.lock().unwrap().push(body);
                    (status, "stored")
                }),
            )
            .with_state(received.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}/hook"), received)
    }

    fn sink(url: String, mode: SubmissionMode) -> WebhookSink {
        WebhookSink::new(WebhookConfig { url, mode, timeout: Duration::from_secs(5) }).unwrap()
    }

    fn record() -> SubmissionRecord {
        let fields = CardFields {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            website: "https://example.com".into(),
            ..Default::default()
        };
        SubmissionRecord::at(fields, Utc.with_ymd_and_hms(2024, 3, 9, 8, 0, 0).unwrap())
    }

    #[tokio::test]
    async fn posts_flat_record_with_timestamp() {
        let (url, received) = spawn_webhook(StatusCode::OK).await;
        let outcome = sink(url, SubmissionMode::Confirmed).submit(&record()).await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Accepted { status: 200 });

        let bodies = received.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        assert_eq!(bodies[0]["name"], "Ada Lovelace");
        assert_eq!(bodies[0]["mobile"], "");
        assert_eq!(bodies[0]["timestamp"], "2024-03-09T08:00:00.000Z");
    }

    #[tokio::test]
    async fn confirmed_mode_surfaces_rejections() {
        let (url, _) = spawn_webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
        let err = sink(url, SubmissionMode::Confirmed).submit(&record()).await.unwrap_err();
        match err {
            ScanError::Submission(msg) => assert!(msg.contains("500"), "{msg}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn fire_and_forget_hides_rejections() {
        let (url, received) = spawn_webhook(StatusCode::INTERNAL_SERVER_ERROR).await;
        let outcome = sink(url, SubmissionMode::FireAndForget).submit(&record()).await.unwrap();
        assert_eq!(outcome, SubmissionOutcome::Unconfirmed);
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn fire_and_forget_swallows_network_errors() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let outcome = sink(format!("http://{addr}/hook"), SubmissionMode::FireAndForget)
            .submit(&record())
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Unconfirmed);
    }
}
