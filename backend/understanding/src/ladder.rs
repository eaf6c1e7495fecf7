//! Model fallback ladder.
//!
//! Fixed candidates are tried first, in order. If none answers, the service
//! catalog is queried, filtered by family name, and walked the same way.
//! Attempts are strictly sequential: the next call is issued only after the
//! previous one has concluded.

use std::collections::HashSet;

use cardscan_core::{ExtractionRequest, InferenceService, ModelDescriptor, TransportError};
use tracing::{debug, info, warn};

/// Catalog entries carry a `models/` prefix; the call path must not.
pub fn strip_models_prefix(id: &str) -> &str {
    id.strip_prefix("models/").unwrap_or(id)
}

/// Catalog names matching any family (case-insensitive substring), in
/// catalog order.
pub fn filter_catalog(models: &[ModelDescriptor], families: &[String]) -> Vec<String> {
    let families: Vec<String> = families
        .iter()
        .map(|f| f.trim().to_lowercase())
        .filter(|f| !f.is_empty())
        .collect();
    models
        .iter()
        .map(|m| m.name.trim())
        .filter(|name| !name.is_empty())
        .filter(|name| {
            let lower = name.to_lowercase();
            families.iter().any(|f| lower.contains(f.as_str()))
        })
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub model: String,
    pub error: TransportError,
}

#[derive(Debug)]
pub enum LadderOutcome {
    Succeeded {
        /// Candidate as listed (prefix kept).
        model: String,
        reply: serde_json::Value,
        failures: Vec<FailedAttempt>,
    },
    Exhausted {
        failures: Vec<FailedAttempt>,
    },
}

impl LadderOutcome {
    pub fn failures(&self) -> &[FailedAttempt] {
        match self {
            LadderOutcome::Succeeded { failures, .. } | LadderOutcome::Exhausted { failures } => failures,
        }
    }

    /// Every candidate that was actually called and failed, in order.
    pub fn attempted(&self) -> Vec<String> {
        self.failures().iter().map(|f| f.model.clone()).collect()
    }
}

pub struct FallbackLadder<'a> {
    service: &'a dyn InferenceService,
    candidates: &'a [String],
    families: &'a [String],
}

/// Accumulates failures and the normalized ids already called.
#[derive(Default)]
struct AttemptLog {
    failures: Vec<FailedAttempt>,
    called: HashSet<String>,
}

impl<'a> FallbackLadder<'a> {
    pub fn new(service: &'a dyn InferenceService, candidates: &'a [String], families: &'a [String]) -> Self {
        Self { service, candidates, families }
    }

    pub async fn run(&self, request: &ExtractionRequest) -> LadderOutcome {
        let mut log = AttemptLog::default();

        if let Some((model, reply)) = self.walk(self.candidates, request, &mut log).await {
            return LadderOutcome::Succeeded { model, reply, failures: log.failures };
        }

        let discovered = self.discover().await;
        if let Some((model, reply)) = self.walk(&discovered, request, &mut log).await {
            return LadderOutcome::Succeeded { model, reply, failures: log.failures };
        }

        LadderOutcome::Exhausted { failures: log.failures }
    }

    async fn walk(
        &self,
        candidates: &[String],
        request: &ExtractionRequest,
        log: &mut AttemptLog,
    ) -> Option<(String, serde_json::Value)> {
        for candidate in candidates {
            let normalized = strip_models_prefix(candidate).to_string();
            if !log.called.insert(normalized) {
                debug!(model = %candidate, "Skipping candidate already attempted");
                continue;
            }

            match self.service.generate(candidate, request).await {
                Ok(reply) => {
                    info!(
                        service = self.service.name(),
                        model = %candidate,
                        failed_before = log.failures.len(),
                        "Model answered"
                    );
                    return Some((candidate.clone(), reply));
                }
                Err(error) => {
                    warn!(
                        model = %candidate,
                        attempt = log.failures.len() + 1,
                        error = %error,
                        "Model candidate failed"
                    );
                    log.failures.push(FailedAttempt { model: candidate.clone(), error });
                }
            }
        }
        None
    }

    /// Catalog failures are treated as an empty catalog.
    async fn discover(&self) -> Vec<String> {
        if self.families.is_empty() {
            return Vec::new();
        }
        match self.service.list_models().await {
            Ok(models) => {
                let found = filter_catalog(&models, self.families);
                info!(listed = models.len(), matching = found.len(), "Queried model catalog");
                found
            }
            Err(e) => {
                warn!(error = %e, "Model catalog query failed");
                Vec::new()
            }
        }
    }
}
