pub mod network {
    pub const DEFAULT_DOMAIN: &str = "logicmonitor.com";
    pub const DEFAULT_API_ROOT: &str = "santaba/rest";
    pub const UI_ROOT: &str = "santaba/uiv4";
    pub const TIMEOUT_API_REQUEST_MS: u64 = 30_000;
    pub const USER_AGENT: &str = concat!("lm-access/", env!("CARGO_PKG_VERSION"));
}

pub mod headers {
    pub const API_VERSION_HEADER: &str = "X-Version";
    pub const API_VERSION: &str = "3";
    pub const RATE_LIMIT_LIMIT: &str = "x-rate-limit-limit";
    pub const RATE_LIMIT_REMAINING: &str = "x-rate-limit-remaining";
    pub const RATE_LIMIT_WINDOW: &str = "x-rate-limit-window";
}

pub mod pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 50;
    pub const MAX_PAGE_SIZE: u32 = 1_000;
    pub const MAX_ITEMS: usize = 100_000;
    pub const MAX_PAGES: usize = 10_000;
    pub const ALL_FIELDS: &str = "*";
}

pub mod rate_limit {
    pub const DEFAULT_BUCKET: &str = "api-request";
}

pub mod links {
    pub const MAX_GROUP_DEPTH: usize = 32;
    /// Parent id the platform reports for its root groups.
    pub const ROOT_PARENT_ID: i64 = 0;
}

pub mod limits {
    pub const ERROR_BODY_PREVIEW_BYTES: usize = 2_048;
}
