//! Extraction Client.
//!
//! Sends a captured card image to a multimodal inference service, walks the
//! model fallback ladder until one candidate answers, and turns the reply
//! text into [`CardFields`](cardscan_core::CardFields).

pub mod extractor;
pub mod gemini;
pub mod ladder;
pub mod parse;
pub mod prompt;

pub use extractor::ExtractionClient;
pub use gemini::GeminiClient;
pub use ladder::{filter_catalog, strip_models_prefix, FailedAttempt, FallbackLadder, LadderOutcome};
pub use parse::{normalize_fields, parse_fields, reply_text, strip_code_fences, EXCERPT_CHARS};
pub use prompt::{build_request, EXTRACTION_PROMPT};
