pub mod auth;
pub mod security_filter;

pub use auth::{CurrentUser, MaybeUser};
pub use security_filter::security_filter;
