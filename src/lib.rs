pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod properties;
pub mod router;
pub mod security;
pub mod view;

pub use error::{ConfigError, WardenError};
pub use router::{WardenState, warden_router};
