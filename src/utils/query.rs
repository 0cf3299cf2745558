use crate::constants::pagination::{ALL_FIELDS, MAX_PAGE_SIZE};
use crate::utils::filter;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Query parameters for one request. `None` values are dropped when the URL is
/// built, so callers can pass optional arguments straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams(BTreeMap<String, Option<String>>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) -> &mut Self {
        self.0.insert(key.into(), Some(value.to_string()));
        self
    }

    pub fn set_opt<V: ToString>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self {
        self.0.insert(key.into(), value.map(|v| v.to_string()));
        self
    }

    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_deref())
    }

    /// Later entries win.
    pub fn merged(&self, other: &QueryParams) -> QueryParams {
        let mut out = self.clone();
        for (key, value) in &other.0 {
            out.0.insert(key.clone(), value.clone());
        }
        out
    }

    pub fn present(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

impl<K: Into<String>, V: ToString> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut out = QueryParams::new();
        for (k, v) in iter {
            out.set(k, v);
        }
        out
    }
}

/// Caller-facing options for list endpoints, before they become wire
/// parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub fields: Option<String>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub offset: Option<u64>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl ListQuery {
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn fields(mut self, fields: impl Into<String>) -> Self {
        self.fields = Some(fields.into());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Everything except `size`/`offset`, which the paginator drives itself.
    /// This is where the filter gets formatted, exactly once.
    pub fn base_params(&self) -> QueryParams {
        let mut params: QueryParams = self.extra.iter().collect();
        params.set_opt(
            "filter",
            self.filter
                .as_deref()
                .map(filter::format)
                .filter(|f| !f.is_empty()),
        );
        params.set_opt("fields", self.fields.as_deref().and_then(normalize_fields));
        params
    }

    /// Parameters for a single-page request; `default_size` applies when the
    /// query has no `size` of its own.
    pub fn page_params(&self, default_size: u32) -> QueryParams {
        let mut params = self.base_params();
        params.set("size", page_size(Some(self.size.unwrap_or(default_size))));
        params.set("offset", self.offset.unwrap_or(0));
        params
    }
}

/// Drops empty entries; returns `None` when nothing is left or when the list
/// asks for all fields, which the API expresses by omitting the parameter.
pub fn normalize_fields(fields: &str) -> Option<String> {
    let parts: Vec<&str> = fields
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() || parts.contains(&ALL_FIELDS) {
        return None;
    }
    Some(parts.join(","))
}

/// Clamps a requested page size to what the API accepts; `None` asks for the
/// largest page.
pub fn page_size(requested: Option<u32>) -> u32 {
    requested.unwrap_or(MAX_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
