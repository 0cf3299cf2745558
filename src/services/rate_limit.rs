use crate::constants::headers::{RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_WINDOW};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Quota state reported by the platform for one operation class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitInfo {
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub window_secs: Option<u64>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    pub fn exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Reads the quota headers from a response. `None` when none of them is
/// present or parseable.
pub fn extract(headers: &HeaderMap) -> Option<RateLimitInfo> {
    extract_at(headers, Utc::now())
}

pub fn extract_at(headers: &HeaderMap, now: DateTime<Utc>) -> Option<RateLimitInfo> {
    let limit = header_u64(headers, RATE_LIMIT_LIMIT);
    let remaining = header_u64(headers, RATE_LIMIT_REMAINING);
    let window_secs = header_u64(headers, RATE_LIMIT_WINDOW);
    if limit.is_none() && remaining.is_none() && window_secs.is_none() {
        return None;
    }
    let reset_at = window_secs
        .and_then(|secs| i64::try_from(secs).ok())
        .and_then(|secs| now.checked_add_signed(Duration::seconds(secs)));
    Some(RateLimitInfo {
        limit,
        remaining,
        window_secs,
        reset_at,
    })
}

/// Per-client quota view. Each bucket holds only the latest report; updates
/// replace, never merge.
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    buckets: DashMap<String, RateLimitInfo>,
}

impl RateLimitTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, bucket: &str, info: RateLimitInfo) {
        self.buckets.insert(bucket.to_string(), info);
    }

    pub fn get(&self, bucket: &str) -> Option<RateLimitInfo> {
        self.buckets.get(bucket).map(|entry| entry.value().clone())
    }

    pub fn snapshot(&self) -> BTreeMap<String, RateLimitInfo> {
        self.buckets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }
}
