//! Access layer for the LogicMonitor REST API: authenticated requests,
//! offset pagination, rate-limit tracking, filter escaping and UI deep links.

pub mod cli;
pub mod client;
pub mod constants;
pub mod errors;
pub mod services;
pub mod utils;

pub use client::{LmClient, LmClientBuilder};
pub use errors::{AccessError, AccessResult, ApiError};
pub use services::config::ClientConfig;
pub use services::deep_link::{DeepLink, EntityFamily, EntityFetcher, EntityRef};
pub use services::paginator::{ListResponse, PageOptions};
pub use services::rate_limit::{RateLimitInfo, RateLimitTracker};
pub use services::request::RequestDescriptor;
pub use utils::query::{ListQuery, QueryParams};
