//! Config redaction: mask secrets before a config is printed or logged.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Keys whose string values are always secrets.
static SENSITIVE_KEYS: &[&str] = &[
    "apiKey",
    "api_key",
    "webhookUrl",
    "webhook_url",
    "token",
    "secret",
    "password",
];

/// Credentials embedded in otherwise harmless strings, such as `?key=` in a URL.
static INLINE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([?&](?:key|token)=)[^&\s]+").unwrap());

/// Redact a config tree, replacing secret values with a short hint + `***`.
pub fn redact(value: &Value) -> Value {
    redact_recursive(value, "")
}

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn redact_string(s: &str, key: &str) -> Value {
    if is_sensitive_key(key) && !s.is_empty() {
        let hint: String = s.chars().take(4).collect();
        if s.chars().count() > 4 {
            return Value::String(format!("{hint}***"));
        }
        return Value::String("***".to_string());
    }
    Value::String(INLINE_KEY.replace_all(s, "${1}***").into_owned())
}

fn redact_recursive(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) => redact_string(s, key),
        Value::Array(arr) => Value::Array(arr.iter().map(|v| redact_recursive(v, key)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), redact_recursive(v, k)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Field paths that [`redact`] would mask.
pub fn collect_redacted_paths(value: &Value) -> Vec<String> {
    let mut paths = Vec::new();
    collect_paths_recursive(value, "", &mut paths);
    paths
}

fn collect_paths_recursive(value: &Value, path: &str, out: &mut Vec<String>) {
    match value {
        Value::String(s) if !s.is_empty() => {
            let key = path.rsplit('.').next().unwrap_or("");
            if is_sensitive_key(key) || INLINE_KEY.is_match(s) {
                out.push(path.to_string());
            }
        }
        Value::Array(arr) => {
            for (i, v) in arr.iter().enumerate() {
                collect_paths_recursive(v, &format!("{path}[{i}]"), out);
            }
        }
        Value::Object(map) => {
            for (k, v) in map {
                let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                collect_paths_recursive(v, &child, out);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn masks_api_key_and_webhook() {
        let v = json!({
            "inference": { "apiKey": "AIzaSyExampleExample" },
            "submission": { "webhookUrl": "https://script.google.com/macros/s/abc/exec" }
        });
        let r = redact(&v);
        assert_eq!(r["inference"]["apiKey"], "AIza***");
        assert_eq!(r["submission"]["webhookUrl"], "http***");
    }

    #[test]
    fn masks_inline_query_key() {
        let v = json!({ "note": "https://host/v1/models?key=AIzaSecret&alt=json" });
        let r = redact(&v);
        assert_eq!(r["note"], "https://host/v1/models?key=***&alt=json");
    }

    #[test]
    fn leaves_plain_values() {
        let v = json!({ "logging": { "level": "debug" }, "camera": { "jpegQuality": 90 } });
        assert_eq!(redact(&v), v);
    }

    #[test]
    fn reports_redacted_paths() {
        let v = json!({ "inference": { "apiKey": "abc", "baseUrl": "https://x" } });
        assert_eq!(collect_redacted_paths(&v), vec!["inference.apiKey"]);
    }
}
