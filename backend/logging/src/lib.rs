//! Structured logging for cardscan.
//!
//! Console and rolling NDJSON output, secret redaction, and scan lifecycle events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{ScanEvent, ScanEventEntry, ScanEventLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
