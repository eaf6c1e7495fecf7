//! Turning the service reply into card fields.

use cardscan_core::{CardFields, ScanError, FIELD_NAMES};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Maximum length of the raw-text excerpt carried by parse errors.
pub const EXCERPT_CHARS: usize = 500;

static SCHEME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").unwrap());

/// Text of the first part of the first candidate.
pub fn reply_text(reply: &Value) -> Result<&str, ScanError> {
    reply
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| {
            let shape = match reply.get("candidates") {
                None => "reply has no candidates",
                Some(Value::Array(c)) if c.is_empty() => "candidate list is empty",
                Some(_) => "first candidate has no text part",
            };
            ScanError::MalformedResponse(shape.to_string())
        })
}

/// Remove markdown code-fence markers wherever they appear.
pub fn strip_code_fences(text: &str) -> String {
    text.trim().replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the reply text as a JSON object of card fields.
///
/// Missing or `null` keys become empty strings; numbers and booleans are
/// stringified. Anything that is not a JSON object is unparsable.
pub fn parse_fields(raw: &str) -> Result<CardFields, ScanError> {
    let unparsable = || ScanError::UnparsableExtraction { excerpt: excerpt(raw) };
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&cleaned).map_err(|_| unparsable())?;
    let object = value.as_object().ok_or_else(unparsable)?;

    let mut fields = CardFields::default();
    for key in FIELD_NAMES {
        let text = match object.get(key) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => other.to_string(),
        };
        if let Some(slot) = fields.get_mut(key) {
            *slot = text;
        }
    }
    Ok(fields)
}

/// Apply the normalization rules the prompt asks the service for.
pub fn normalize_fields(mut fields: CardFields) -> CardFields {
    for key in FIELD_NAMES {
        if let Some(value) = fields.get_mut(key) {
            *value = value.trim().to_string();
        }
    }
    fields.email = fields.email.to_lowercase();
    if !fields.website.is_empty() && !SCHEME_RE.is_match(&fields.website) {
        fields.website = format!("https://{}", fields.website);
    }
    fields
}

fn excerpt(raw: &str) -> String {
    raw.chars().take(EXCERPT_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reads_first_candidate_text() {
        let reply = json!({ "candidates": [{ "content": { "parts": [{ "text": "hi" }, { "text": "no" }] } }] });
        assert_eq!(reply_text(&reply).unwrap(), "hi");
    }

    #[test]
    fn missing_text_is_malformed() {
        for reply in [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{ "content": { "parts": [{ "inline_data": {} }] } }] }),
            json!({ "candidates": [{ "finishReason": "SAFETY" }] }),
        ] {
            assert!(matches!(reply_text(&reply), Err(ScanError::MalformedResponse(_))), "{reply}");
        }
    }

    #[test]
    fn blank_text_is_malformed_not_unparsable() {
        for text in ["", "  \n\t "] {
            let reply = json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] });
            assert!(matches!(reply_text(&reply), Err(ScanError::MalformedResponse(_))), "{text:?}");
        }
    }

    #[test]
    fn fences_are_removed() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  ```\n{}\n```  "), "{}");
        assert_eq!(strip_code_fences("{}"), "{}");
    }

    #[test]
    fn fenced_reply_parses_and_normalizes() {
        let raw = "```json\n{\"name\":\"A\",\"email\":\"B@X.com\",\"mobile\":\"\",\"website\":\"\",\"address\":\"\"}\n```";
        let fields = normalize_fields(parse_fields(raw).unwrap());
        assert_eq!(
            fields,
            CardFields {
                name: "A".into(),
                email: "b@x.com".into(),
                ..Default::default()
            }
        );
    }

    #[test]
    fn lenient_field_conversion() {
        let fields = parse_fields(r#"{"name":"Ada","mobile":4412345,"website":null,"extra":"x"}"#).unwrap();
        assert_eq!(fields.name, "Ada");
        assert_eq!(fields.mobile, "4412345");
        assert_eq!(fields.website, "");
        assert_eq!(fields.email, "");
        assert_eq!(fields.address, "");
    }

    #[test]
    fn non_object_json_is_unparsable() {
        assert!(matches!(parse_fields("[1,2]"), Err(ScanError::UnparsableExtraction { .. })));
        assert!(matches!(parse_fields("\"text\""), Err(ScanError::UnparsableExtraction { .. })));
    }

    #[test]
    fn unparsable_excerpt_is_capped() {
        let raw = "ü".repeat(800);
        match parse_fields(&raw) {
            Err(ScanError::UnparsableExtraction { excerpt }) => {
                assert_eq!(excerpt.chars().count(), EXCERPT_CHARS);
                assert!(raw.starts_with(&excerpt));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn website_gains_scheme_only_when_missing() {
        let mut fields = CardFields {
            website: " example.com ".into(),
            ..Default::default()
        };
        fields = normalize_fields(fields);
        assert_eq!(fields.website, "https://example.com");

        fields.website = "http://example.com".into();
        assert_eq!(normalize_fields(fields.clone()).website, "http://example.com");

        fields.website = String::new();
        assert_eq!(normalize_fields(fields).website, "");
    }

    #[test]
    fn mobile_is_only_trimmed() {
        let fields = normalize_fields(CardFields {
            mobile: "  555 0100 ".into(),
            ..Default::default()
        });
        assert_eq!(fields.mobile, "555 0100");
    }
}
