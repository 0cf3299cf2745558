use crate::constants::network::{
    DEFAULT_API_ROOT, DEFAULT_DOMAIN, TIMEOUT_API_REQUEST_MS, UI_ROOT,
};
use crate::constants::pagination::{DEFAULT_PAGE_SIZE, MAX_ITEMS, MAX_PAGE_SIZE};
use crate::errors::{AccessError, AccessResult};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Connection settings for one platform tenant.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Tenant name, the `{company}` in `https://{company}.logicmonitor.com`.
    pub company: Option<String>,
    pub bearer_token: String,
    pub domain: String,
    pub api_root: String,
    /// Full API base URL; wins over `company`/`domain`/`api_root`.
    pub base_url: Option<String>,
    pub ui_base_url: Option<String>,
    pub timeout_ms: u64,
    pub page_size: u32,
    pub max_items: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            company: None,
            bearer_token: String::new(),
            domain: DEFAULT_DOMAIN.to_string(),
            api_root: DEFAULT_API_ROOT.to_string(),
            base_url: None,
            ui_base_url: None,
            timeout_ms: TIMEOUT_API_REQUEST_MS,
            page_size: DEFAULT_PAGE_SIZE,
            max_items: MAX_ITEMS,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("company", &self.company)
            .field("bearer_token", &"[REDACTED]")
            .field("domain", &self.domain)
            .field("api_root", &self.api_root)
            .field("base_url", &self.base_url)
            .field("ui_base_url", &self.ui_base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field("page_size", &self.page_size)
            .field("max_items", &self.max_items)
            .finish()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_number<T: std::str::FromStr>(key: &str) -> AccessResult<Option<T>> {
    match env_string(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<T>()
            .map(Some)
            .map_err(|_| AccessError::config(format!("{} must be a positive integer", key))),
    }
}

impl ClientConfig {
    pub fn new(company: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            company: Some(company.into()),
            bearer_token: bearer_token.into(),
            ..Self::default()
        }
    }

    /// Reads `LM_COMPANY`, `LM_BEARER_TOKEN`, `LM_DOMAIN`, `LM_API_ROOT`,
    /// `LM_BASE_URL`, `LM_UI_BASE_URL`, `LM_TIMEOUT_MS`, `LM_PAGE_SIZE` and
    /// `LM_MAX_ITEMS`.
    pub fn from_env() -> AccessResult<Self> {
        let mut config = ClientConfig {
            company: env_string("LM_COMPANY"),
            bearer_token: env_string("LM_BEARER_TOKEN").unwrap_or_default(),
            base_url: env_string("LM_BASE_URL"),
            ui_base_url: env_string("LM_UI_BASE_URL"),
            ..ClientConfig::default()
        };
        if let Some(domain) = env_string("LM_DOMAIN") {
            config.domain = domain;
        }
        if let Some(api_root) = env_string("LM_API_ROOT") {
            config.api_root = api_root;
        }
        if let Some(timeout_ms) = env_number("LM_TIMEOUT_MS")? {
            config.timeout_ms = timeout_ms;
        }
        if let Some(page_size) = env_number("LM_PAGE_SIZE")? {
            config.page_size = page_size;
        }
        if let Some(max_items) = env_number("LM_MAX_ITEMS")? {
            config.max_items = max_items;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn validate(&self) -> AccessResult<()> {
        if self.bearer_token.trim().is_empty() {
            return Err(AccessError::config("bearer token is required")
                .with_hint("Set LM_BEARER_TOKEN to an API bearer token."));
        }
        if self.company.is_none() && self.base_url.is_none() {
            return Err(AccessError::config("company or base_url is required")
                .with_hint("Set LM_COMPANY (the tenant name) or LM_BASE_URL."));
        }
        if self.timeout_ms == 0 {
            return Err(AccessError::config("timeout_ms must be greater than zero"));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AccessError::config(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if self.max_items == 0 {
            return Err(AccessError::config("max_items must be greater than zero"));
        }
        self.api_base_url().map(|_| ())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn api_base_url(&self) -> AccessResult<Url> {
        let raw = match (&self.base_url, &self.company) {
            (Some(base), _) => base.trim().to_string(),
            (None, Some(company)) => format!(
                "https://{}.{}/{}",
                company.trim(),
                self.domain.trim().trim_matches('.'),
                self.api_root.trim().trim_matches('/')
            ),
            (None, None) => return Err(AccessError::config("company or base_url is required")),
        };
        parse_http_url(&raw)
    }

    /// Root for UI deep links, e.g. `https://acme.logicmonitor.com/santaba/uiv4`.
    pub fn ui_base_url(&self) -> AccessResult<String> {
        if let Some(ui) = &self.ui_base_url {
            return Ok(parse_http_url(ui)?.as_str().trim_end_matches('/').to_string());
        }
        let origin = match &self.company {
            Some(company) if self.base_url.is_none() => {
                format!("https://{}.{}", company.trim(), self.domain.trim().trim_matches('.'))
            }
            _ => self.api_base_url()?.origin().ascii_serialization(),
        };
        Ok(format!("{}/{}", origin, UI_ROOT))
    }
}

fn parse_http_url(raw: &str) -> AccessResult<Url> {
    let url = Url::parse(raw)
        .map_err(|_| AccessError::config(format!("Invalid URL '{}'", raw)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(AccessError::config("Only http/https URLs are supported"));
    }
    Ok(url)
}
