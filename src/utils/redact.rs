use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const REDACTED: &str = "[REDACTED]";

const SENSITIVE_KEYS: &[&str] = &[
    "authorization",
    "bearer_token",
    "bearertoken",
    "access_key",
    "accesskey",
    "password",
];

static INLINE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (
            Regex::new(r"\b(Bearer)\s+([A-Za-z0-9._~+/=-]{6,})").expect("bearer redaction regex"),
            "$1 [REDACTED]",
        ),
        (
            Regex::new(r"\blmb_[A-Za-z0-9._~+/=-]{6,}").expect("lm token redaction regex"),
            REDACTED,
        ),
        (
            Regex::new(r#"\b(token|access[_-]?key|password)\b\s*([:=])\s*([^\s"'&]+)"#)
                .expect("inline redaction regex"),
            "$1$2[REDACTED]",
        ),
    ]
});

pub fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        return false;
    }
    SENSITIVE_KEYS.contains(&normalized.as_str()) || normalized.ends_with("token")
}

pub fn redact_text(value: &str) -> String {
    let mut out = value.to_string();
    for (re, replacement) in INLINE_PATTERNS.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *replacement).to_string();
        }
    }
    out
}

/// Replaces values under sensitive keys and scrubs token-shaped text anywhere
/// else in the tree.
pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::String(text) => Value::String(redact_text(text)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, entry)| {
                    let redacted = if is_sensitive_key(key) && !entry.is_null() {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(entry)
                    };
                    (key.clone(), redacted)
                })
                .collect(),
        ),
        _ => value.clone(),
    }
}
