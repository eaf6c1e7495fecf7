use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// The five fields extracted from every card, in display order.
pub const FIELD_NAMES: [&str; 5] = ["name", "email", "mobile", "website", "address"];

/// Which physical camera to prefer when several are present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacingMode {
    /// Back camera on phones ("environment").
    #[default]
    Rear,
    /// Selfie camera ("user").
    Front,
}

impl fmt::Display for FacingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FacingMode::Rear => write!(f, "rear"),
            FacingMode::Front => write!(f, "front"),
        }
    }
}

/// An encoded raster snapshot taken from a live video source. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillImage {
    pub data: Bytes,
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub captured_at: DateTime<Utc>,
}

impl StillImage {
    pub fn new(data: impl Into<Bytes>, mime_type: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
            width,
            height,
            captured_at: Utc::now(),
        }
    }
}

/// Encoded image plus the fixed instruction describing the target schema.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub instruction: String,
    pub image: StillImage,
}

/// Contact fields read off a card. Every field is always present; unknown
/// values are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub mobile: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub address: String,
}

impl CardFields {
    pub fn get_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "name" => Some(&mut self.name),
            "email" => Some(&mut self.email),
            "mobile" => Some(&mut self.mobile),
            "website" => Some(&mut self.website),
            "address" => Some(&mut self.address),
            _ => None,
        }
    }

    /// `(field, value)` pairs in [`FIELD_NAMES`] order.
    pub fn entries(&self) -> [(&'static str, &str); 5] {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("mobile", &self.mobile),
            ("website", &self.website),
            ("address", &self.address),
        ]
    }
}

/// Outcome of a successful extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub fields: CardFields,
    /// Candidate identifier that produced the reply, as listed.
    pub model_used: String,
    /// Candidates that failed before `model_used` succeeded, in attempt order.
    pub failed_attempts: Vec<String>,
}

/// What gets posted to the persistence webhook: the card fields flattened
/// next to an ISO-8601 timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionRecord {
    #[serde(flatten)]
    pub fields: CardFields,
    #[serde(serialize_with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl SubmissionRecord {
    pub fn new(fields: CardFields) -> Self {
        Self::at(fields, Utc::now())
    }

    pub fn at(fields: CardFields, timestamp: DateTime<Utc>) -> Self {
        Self { fields, timestamp }
    }
}

fn iso_millis<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// How a record is handed to the webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionMode {
    /// Send and never read the response. The caller cannot tell success from failure.
    #[default]
    FireAndForget,
    /// Await the response and surface non-success statuses as errors.
    Confirmed,
}

/// What the caller learns after handing a record to a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// Sent without reading the response; success and failure look the same.
    Unconfirmed,
    /// The webhook answered with a success status.
    Accepted { status: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn missing_fields_deserialize_as_empty() {
        let fields: CardFields = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(fields.name, "Ada");
        assert_eq!(fields.email, "");
        assert_eq!(fields.address, "");
    }

    #[test]
    fn submission_record_is_flat_with_iso_timestamp() {
        let fields = CardFields {
            name: "Ada".into(),
            email: "ada@example.com".into(),
            ..Default::default()
        };
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap();
        let value = serde_json::to_value(SubmissionRecord::at(fields, ts)).unwrap();
        assert_eq!(value["name"], "Ada");
        assert_eq!(value["email"], "ada@example.com");
        assert_eq!(value["mobile"], "");
        assert_eq!(value["timestamp"], "2024-05-01T12:30:00.000Z");
    }

    #[test]
    fn entries_follow_field_order() {
        let fields = CardFields::default();
        let keys: Vec<_> = fields.entries().iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, FIELD_NAMES);
    }
}
