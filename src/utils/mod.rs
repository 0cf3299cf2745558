pub mod filter;
pub mod query;
pub mod redact;
pub mod template;
pub mod text;
