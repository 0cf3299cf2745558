use serde::Serialize;

use super::ApiError;

pub type AccessResult<T> = Result<T, AccessError>;

/// Every failure that can cross the access-layer boundary.
#[derive(Debug, Clone, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccessError {
    #[error("request to {path} timed out after {elapsed_ms}ms (limit {timeout_ms}ms)")]
    Timeout {
        path: String,
        elapsed_ms: u64,
        timeout_ms: u64,
    },

    #[error("{0}")]
    #[serde(rename = "api_error")]
    Api(ApiError),

    #[error("unexpected list response from {path}: missing or invalid '{missing}'")]
    ResponseShape { path: String, missing: String },

    #[error("network error calling {path}: {message}")]
    Network { path: String, message: String },

    #[error("could not decode response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("pagination of {path} stopped after {fetched} items (limit {limit})")]
    PaginationLimit {
        path: String,
        fetched: usize,
        limit: usize,
    },

    #[error("pagination of {path} stopped after {pages} pages and {fetched} items (page limit {limit})")]
    PageLimit {
        path: String,
        pages: usize,
        fetched: usize,
        limit: usize,
    },

    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("configuration error: {message}")]
    Config {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        hint: Option<String>,
    },
}

impl AccessError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            hint: None,
        }
    }

    /// Attaches an operator-facing hint; only configuration errors carry one.
    pub fn with_hint(mut self, text: impl Into<String>) -> Self {
        if let AccessError::Config { hint, .. } = &mut self {
            *hint = Some(text.into());
        }
        self
    }

    pub fn response_shape(path: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::ResponseShape {
            path: path.into(),
            missing: missing.into(),
        }
    }

    pub fn network(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AccessError::Timeout { .. } => "timeout",
            AccessError::Api(_) => "api_error",
            AccessError::ResponseShape { .. } => "response_shape",
            AccessError::Network { .. } => "network",
            AccessError::Decode { .. } => "decode",
            AccessError::PaginationLimit { .. } => "pagination_limit",
            AccessError::PageLimit { .. } => "page_limit",
            AccessError::InvalidRequest { .. } => "invalid_request",
            AccessError::Config { .. } => "config",
        }
    }

    /// Whether a caller-side retry could plausibly succeed. Nothing in this
    /// crate retries on its own.
    pub fn retryable(&self) -> bool {
        match self {
            AccessError::Timeout { .. } | AccessError::Network { .. } => true,
            AccessError::Api(api) => api.is_rate_limited() || api.is_server_error(),
            _ => false,
        }
    }

    pub fn api(&self) -> Option<&ApiError> {
        match self {
            AccessError::Api(api) => Some(api),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, AccessError::Timeout { .. })
    }
}

impl From<ApiError> for AccessError {
    fn from(err: ApiError) -> Self {
        AccessError::Api(err)
    }
}
