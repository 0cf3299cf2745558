use crate::constants::headers::{API_VERSION, API_VERSION_HEADER};
use crate::constants::network::USER_AGENT;
use crate::errors::{AccessError, AccessResult, ApiError};
use crate::services::config::ClientConfig;
use crate::services::logger::Logger;
use crate::services::observer::{ObserverSet, RequestEvent};
use crate::services::rate_limit::{self, RateLimitInfo, RateLimitTracker};
use crate::services::request::RequestDescriptor;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::error::Error as _;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;
use uuid::Uuid;

struct RawResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

/// Identity of one in-flight call, carried into every lifecycle event.
struct CallContext<'a> {
    request_id: Uuid,
    method: &'a str,
    path: &'a str,
    bucket: &'a str,
}

/// Issues authenticated API calls. Cheap to clone; clones share the HTTP
/// connection pool, the rate-limit tracker and the observers.
#[derive(Clone)]
pub struct RequestExecutor {
    logger: Logger,
    client: Client,
    base_url: Url,
    auth_header: HeaderValue,
    default_timeout: Duration,
    rate_limits: Arc<RateLimitTracker>,
    observers: ObserverSet,
}

impl RequestExecutor {
    pub fn new(
        config: &ClientConfig,
        logger: &Logger,
        rate_limits: Arc<RateLimitTracker>,
        observers: ObserverSet,
    ) -> AccessResult<Self> {
        config.validate()?;
        let mut auth_header =
            HeaderValue::from_str(&format!("Bearer {}", config.bearer_token.trim())).map_err(
                |_| AccessError::config("bearer token contains characters not allowed in headers"),
            )?;
        auth_header.set_sensitive(true);
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| AccessError::config(format!("Failed to build HTTP client: {}", err)))?;
        Ok(Self {
            logger: logger.child("executor"),
            client,
            base_url: config.api_base_url()?,
            auth_header,
            default_timeout: config.timeout(),
            rate_limits,
            observers,
        })
    }

    pub fn rate_limits(&self) -> &Arc<RateLimitTracker> {
        &self.rate_limits
    }

    /// Base URL + resolved path + every non-null query parameter. Values get
    /// standard form encoding only; filters arrive already escaped.
    pub fn build_url(&self, path: &str, descriptor: &RequestDescriptor) -> AccessResult<Url> {
        let raw = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw)
            .map_err(|_| AccessError::invalid_request(format!("Invalid request path '{}'", path)))?;
        let query = descriptor.query_ref();
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.present() {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    pub async fn execute(&self, descriptor: &RequestDescriptor) -> AccessResult<Value> {
        let path = descriptor.resolved_path()?;
        let url = self.build_url(&path, descriptor)?;
        let timeout = descriptor
            .timeout_override()
            .unwrap_or(self.default_timeout);
        let timeout_ms = timeout.as_millis() as u64;
        let call = CallContext {
            request_id: Uuid::new_v4(),
            method: descriptor.method().as_str(),
            path: &path,
            bucket: descriptor.bucket_name(),
        };

        self.observers.emit(&RequestEvent::Start {
            request_id: call.request_id,
            method: call.method.to_string(),
            path: path.clone(),
            url: url.to_string(),
        });

        let started = Instant::now();
        // Dropping the send future on expiry aborts the in-flight request.
        let outcome = tokio::time::timeout(timeout, self.send(descriptor, url)).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Err(_) => Err(self.timed_out(&call, duration_ms, timeout_ms)),
            Ok(Err(err)) if err.is_timeout() => Err(self.timed_out(&call, duration_ms, timeout_ms)),
            Ok(Err(err)) => {
                let error = AccessError::network(&path, describe_reqwest_error(&err));
                self.emit_error(&call, None, duration_ms, &error, None);
                Err(error)
            }
            Ok(Ok(raw)) => self.finish(&call, raw, duration_ms),
        }
    }

    async fn send(
        &self,
        descriptor: &RequestDescriptor,
        url: Url,
    ) -> Result<RawResponse, reqwest::Error> {
        let mut request = self
            .client
            .request(descriptor.method().clone(), url)
            .header(AUTHORIZATION, self.auth_header.clone())
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(API_VERSION_HEADER, API_VERSION);
        if let Some(body) = descriptor.body_ref() {
            request = request
                .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.to_string());
        }
        let response = request.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;
        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }

    fn finish(&self, call: &CallContext<'_>, raw: RawResponse, duration_ms: u64) -> AccessResult<Value> {
        let status = raw.status.as_u16();
        let rate_limited = raw.status == StatusCode::TOO_MANY_REQUESTS;
        let rate_limit = if raw.status.is_success() || rate_limited {
            let info = rate_limit::extract(&raw.headers);
            if let Some(info) = &info {
                self.rate_limits.update(call.bucket, info.clone());
            }
            info
        } else {
            None
        };

        if !raw.status.is_success() {
            if rate_limited {
                self.logger.warn(
                    "Rate limit exceeded",
                    Some(&serde_json::json!({
                        "request_id": call.request_id,
                        "path": call.path,
                        "bucket": call.bucket,
                        "rate_limit": rate_limit,
                    })),
                );
            }
            let error = AccessError::Api(ApiError::from_response(
                status,
                raw.status.canonical_reason(),
                &raw.body,
                call.path,
                duration_ms,
            ));
            self.emit_error(call, Some(status), duration_ms, &error, rate_limit);
            return Err(error);
        }

        let value = if raw.body.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str::<Value>(&raw.body) {
                Ok(value) => value,
                Err(err) => {
                    let error = AccessError::Decode {
                        path: call.path.to_string(),
                        message: err.to_string(),
                    };
                    self.emit_error(call, Some(status), duration_ms, &error, rate_limit);
                    return Err(error);
                }
            }
        };

        self.observers.emit(&RequestEvent::Success {
            request_id: call.request_id,
            method: call.method.to_string(),
            path: call.path.to_string(),
            status,
            duration_ms,
            rate_limit,
        });
        Ok(value)
    }

    fn timed_out(&self, call: &CallContext<'_>, elapsed_ms: u64, timeout_ms: u64) -> AccessError {
        self.observers.emit(&RequestEvent::Timeout {
            request_id: call.request_id,
            method: call.method.to_string(),
            path: call.path.to_string(),
            elapsed_ms,
            timeout_ms,
        });
        AccessError::Timeout {
            path: call.path.to_string(),
            elapsed_ms,
            timeout_ms,
        }
    }

    fn emit_error(
        &self,
        call: &CallContext<'_>,
        status: Option<u16>,
        duration_ms: u64,
        error: &AccessError,
        rate_limit: Option<RateLimitInfo>,
    ) {
        self.observers.emit(&RequestEvent::Error {
            request_id: call.request_id,
            method: call.method.to_string(),
            path: call.path.to_string(),
            status,
            duration_ms,
            error: error.clone(),
            rate_limit,
        });
    }
}

/// reqwest's top-level message hides the cause ("error sending request");
/// append the source chain so "connection refused" and DNS failures show up.
fn describe_reqwest_error(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
