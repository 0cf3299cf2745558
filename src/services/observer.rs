use crate::errors::AccessError;
use crate::services::logger::Logger;
use crate::services::rate_limit::RateLimitInfo;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// One phase of a request's lifecycle. Every request emits `Start` followed by
/// exactly one of the other three.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum RequestEvent {
    Start {
        request_id: Uuid,
        method: String,
        path: String,
        url: String,
    },
    Success {
        request_id: Uuid,
        method: String,
        path: String,
        status: u16,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate_limit: Option<RateLimitInfo>,
    },
    Error {
        request_id: Uuid,
        method: String,
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
        duration_ms: u64,
        error: AccessError,
        #[serde(skip_serializing_if = "Option::is_none")]
        rate_limit: Option<RateLimitInfo>,
    },
    Timeout {
        request_id: Uuid,
        method: String,
        path: String,
        elapsed_ms: u64,
        timeout_ms: u64,
    },
}

impl RequestEvent {
    pub fn request_id(&self) -> Uuid {
        match self {
            RequestEvent::Start { request_id, .. }
            | RequestEvent::Success { request_id, .. }
            | RequestEvent::Error { request_id, .. }
            | RequestEvent::Timeout { request_id, .. } => *request_id,
        }
    }

    pub fn phase(&self) -> &'static str {
        match self {
            RequestEvent::Start { .. } => "start",
            RequestEvent::Success { .. } => "success",
            RequestEvent::Error { .. } => "error",
            RequestEvent::Timeout { .. } => "timeout",
        }
    }
}

/// Receives request lifecycle events. Called inline on the request path, so
/// implementations must not block.
pub trait RequestObserver: Send + Sync {
    fn on_event(&self, event: &RequestEvent);
}

#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl ObserverSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, observer: Arc<dyn RequestObserver>) {
        self.observers.push(observer);
    }

    pub fn emit(&self, event: &RequestEvent) {
        for observer in &self.observers {
            observer.on_event(event);
        }
    }
}

/// Writes request events to a [`Logger`]: starts and successes at debug,
/// failures at warn.
pub struct LoggingObserver {
    logger: Logger,
}

impl LoggingObserver {
    pub fn new(logger: &Logger) -> Self {
        Self {
            logger: logger.child("http"),
        }
    }
}

impl RequestObserver for LoggingObserver {
    fn on_event(&self, event: &RequestEvent) {
        let meta = serde_json::to_value(event).unwrap_or(serde_json::Value::Null);
        match event {
            RequestEvent::Start { .. } => self.logger.debug("API request", Some(&meta)),
            RequestEvent::Success { .. } => self.logger.debug("API response", Some(&meta)),
            RequestEvent::Error { .. } => self.logger.warn("API request failed", Some(&meta)),
            RequestEvent::Timeout { .. } => self.logger.warn("API request timed out", Some(&meta)),
        }
    }
}
