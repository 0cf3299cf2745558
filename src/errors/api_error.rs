use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt;

use crate::constants::limits::ERROR_BODY_PREVIEW_BYTES;
use crate::utils::text::truncate_utf8_prefix;

/// A non-2xx response, normalized so callers never see raw HTTP status objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub http_status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<Value>,
    pub path: String,
    pub duration_ms: u64,
}

impl ApiError {
    pub fn new(http_status: u16, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_status,
            error_code: None,
            error_message: message.into(),
            error_detail: None,
            path: path.into(),
            duration_ms: 0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Builds the error from a raw response body. Every field of the body is
    /// optional; a body that is not JSON at all becomes the detail text.
    pub fn from_response(
        http_status: u16,
        reason: Option<&str>,
        body: &str,
        path: &str,
        duration_ms: u64,
    ) -> Self {
        let fallback = reason
            .filter(|r| !r.is_empty())
            .map(|r| r.to_string())
            .unwrap_or_else(|| format!("HTTP {}", http_status));
        let mut err = ApiError::new(http_status, fallback, path).with_duration_ms(duration_ms);

        let trimmed = body.trim();
        if trimmed.is_empty() {
            return err;
        }
        let parsed = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => map,
            _ => {
                err.error_detail = Some(Value::String(truncate_utf8_prefix(
                    trimmed,
                    ERROR_BODY_PREVIEW_BYTES,
                )));
                return err;
            }
        };

        if let Some(message) = parsed
            .get("errorMessage")
            .or_else(|| parsed.get("errmsg"))
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            err.error_message = message.to_string();
        }
        err.error_code = parsed
            .get("errorCode")
            .or_else(|| parsed.get("status"))
            .and_then(render_code);
        err.error_detail = parsed.get("errorDetail").filter(|v| !v.is_null()).cloned();
        err
    }

    pub fn is_not_found(&self) -> bool {
        self.http_status == 404
    }

    pub fn is_rate_limited(&self) -> bool {
        self.http_status == 429
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.http_status)
    }
}

fn render_code(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Number(num) => Some(num.to_string()),
        _ => None,
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "API request {} failed ({}",
            self.path, self.http_status
        )?;
        if let Some(code) = &self.error_code {
            write!(f, ", code {}", code)?;
        }
        write!(f, "): {}", self.error_message)
    }
}

impl Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::ApiError;

    #[test]
    fn from_response_reads_v3_error_body() {
        let body = r#"{"errorMessage":"Device not found","errorCode":1404,"errorDetail":null}"#;
        let err = ApiError::from_response(404, Some("Not Found"), body, "/device/devices/9", 12);
        assert_eq!(err.http_status, 404);
        assert_eq!(err.error_code.as_deref(), Some("1404"));
        assert_eq!(err.error_message, "Device not found");
        assert!(err.error_detail.is_none());
        assert_eq!(err.duration_ms, 12);
        assert!(err.is_not_found());
    }

    #[test]
    fn from_response_tolerates_missing_fields() {
        let err = ApiError::from_response(503, Some("Service Unavailable"), "{}", "/x", 0);
        assert_eq!(err.error_message, "Service Unavailable");
        assert!(err.error_code.is_none());
        assert!(err.is_server_error());
    }

    #[test]
    fn from_response_keeps_non_json_body_as_detail() {
        let err = ApiError::from_response(502, None, "<html>bad gateway</html>", "/x", 0);
        assert_eq!(err.error_message, "HTTP 502");
        assert_eq!(
            err.error_detail,
            Some(serde_json::Value::String("<html>bad gateway</html>".to_string()))
        );
    }

    #[test]
    fn from_response_accepts_legacy_fields() {
        let body = r#"{"status":1007,"errmsg":"Rate limit exceeded"}"#;
        let err = ApiError::from_response(429, None, body, "/alert/alerts", 3);
        assert_eq!(err.error_code.as_deref(), Some("1007"));
        assert_eq!(err.error_message, "Rate limit exceeded");
        assert!(err.is_rate_limited());
    }
}
