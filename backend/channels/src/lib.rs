//! Submission channels for finished card records.

pub mod webhook;

pub use webhook::{WebhookConfig, WebhookSink};
