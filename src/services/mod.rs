pub mod config;
pub mod deep_link;
pub mod executor;
pub mod logger;
pub mod observer;
pub mod paginator;
pub mod rate_limit;
pub mod request;
