mod access_error;
mod api_error;

pub use access_error::{AccessError, AccessResult};
pub use api_error::ApiError;
