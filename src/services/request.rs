use crate::constants::rate_limit::DEFAULT_BUCKET;
use crate::errors::AccessResult;
use crate::utils::query::QueryParams;
use crate::utils::template::resolve_path;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Everything needed to issue one API call. Built fresh per call and never
/// mutated once handed to the executor.
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    method: Method,
    path_template: String,
    path_params: Vec<(String, String)>,
    body: Option<Value>,
    query: QueryParams,
    timeout: Option<Duration>,
    bucket: String,
}

impl RequestDescriptor {
    pub fn new(method: Method, path_template: impl Into<String>) -> Self {
        Self {
            method,
            path_template: path_template.into(),
            path_params: Vec::new(),
            body: None,
            query: QueryParams::new(),
            timeout: None,
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }

    pub fn get(path_template: impl Into<String>) -> Self {
        Self::new(Method::GET, path_template)
    }

    pub fn post(path_template: impl Into<String>) -> Self {
        Self::new(Method::POST, path_template)
    }

    pub fn patch(path_template: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path_template)
    }

    pub fn put(path_template: impl Into<String>) -> Self {
        Self::new(Method::PUT, path_template)
    }

    pub fn delete(path_template: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path_template)
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.path_params.push((name.into(), value.to_string()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.set(key, value);
        self
    }

    pub fn query_params(mut self, params: QueryParams) -> Self {
        self.query = self.query.merged(&params);
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Rate-limit bucket the response headers are recorded under.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn resolved_path(&self) -> AccessResult<String> {
        resolve_path(&self.path_template, &self.path_params)
    }

    pub fn query_ref(&self) -> &QueryParams {
        &self.query
    }

    pub fn body_ref(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }
}
