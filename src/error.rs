use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use std::num::ParseIntError;
use thiserror::Error as ThisError;
use tracing::error;

/// Startup configuration failures. None of these are recoverable; the process
/// refuses to start in a half-configured state.
#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("configuration source error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("missing required property `{key}`")]
    Missing { key: &'static str },

    #[error("property `{key}` must be a non-negative integer, got `{value}`: {source}")]
    InvalidInteger {
        key: &'static str,
        value: String,
        #[source]
        source: ParseIntError,
    },

    #[error("property `{key}` must be `true` or `false`, got `{value}`")]
    InvalidBoolean { key: &'static str, value: String },

    #[error("cannot register JDBC driver `{driver}`: {reason}")]
    DriverRegistration { driver: String, reason: String },

    #[error("invalid connection pool bounds: {0}")]
    PoolBounds(String),

    #[error("invalid `server.cookieKey`: {0}")]
    CookieKey(String),

    #[error("`server.sessionTimeout` of {seconds}s exceeds the {max}s maximum")]
    SessionTimeout { seconds: u64, max: u64 },

    #[error("invalid `server.listen` address `{0}`")]
    ListenAddr(String),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Figment(Box::new(e))
    }
}

#[derive(Debug, ThisError)]
pub enum WardenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    DatabaseError(#[from] SqlxError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template `{path}` for view `{view}` could not be read: {source}")]
    Template {
        view: String,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl IntoResponse for WardenError {
    fn into_response(self) -> axum::response::Response {
        error!(error = %self, "request failed");
        let (status, error_body) = match self {
            WardenError::Template { view, .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "TEMPLATE_MISSING".to_string(),
                    message: format!("View `{view}` could not be rendered."),
                },
            ),
            WardenError::DatabaseError(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiErrorBody {
                    code: "STORE_UNAVAILABLE".to_string(),
                    message: "The user store is unavailable.".to_string(),
                },
            ),
            WardenError::Config(_) | WardenError::Io(_) | WardenError::Json(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                },
            ),
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
