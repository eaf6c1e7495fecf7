use cardscan_core::{ExtractionRequest, StillImage};

/// Fixed instruction sent with every card image.
pub const EXTRACTION_PROMPT: &str = r#"Extract only this JSON from the business card (no extra text, no markdown):

{
  "name": "",
  "email": "",
  "mobile": "",
  "website": "",
  "address": ""
}

Rules:
- Return only valid JSON
- mobile with country code
- email lowercase
- add https:// to website if missing
- empty string if not found"#;

pub fn build_request(image: StillImage) -> ExtractionRequest {
    ExtractionRequest {
        instruction: EXTRACTION_PROMPT.to_string(),
        image,
    }
}
