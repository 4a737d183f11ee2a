use std::sync::Arc;
use thiserror::Error as ThisError;
use tracing::{error, info, warn};

use crate::security::password::DelegatingPasswordEncoder;
use crate::security::principal::Principal;
use crate::security::user_details::UserDetailsService;

/// Why a login attempt was refused. The browser sees the same redirect for
/// every variant.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum AuthenticationError {
    /// Unknown username or wrong password; deliberately indistinguishable.
    #[error("bad credentials")]
    BadCredentials,

    #[error("user account is disabled")]
    Disabled,

    #[error("authentication service unavailable: {0}")]
    ServiceUnavailable(String),
}

/// Checks submitted credentials against the configured user store.
#[derive(Clone)]
pub struct AuthenticationManager {
    users: Arc<dyn UserDetailsService>,
    encoder: DelegatingPasswordEncoder,
}

impl AuthenticationManager {
    pub fn new(users: Arc<dyn UserDetailsService>) -> Self {
        Self {
            users,
            encoder: DelegatingPasswordEncoder::new(),
        }
    }

    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Principal, AuthenticationError> {
        let details = match self.users.load_user_by_username(username).await {
            Ok(details) => details,
            Err(e) => {
                error!(username, error = %e, "user lookup failed");
                return Err(AuthenticationError::ServiceUnavailable(e.to_string()));
            }
        };

        let Some(details) = details else {
            self.encoder.verify_dummy(password).await;
            warn!(username, "authentication failed: bad credentials");
            return Err(AuthenticationError::BadCredentials);
        };

        if !self.encoder.verify(password, &details.password).await {
            warn!(username, "authentication failed: bad credentials");
            return Err(AuthenticationError::BadCredentials);
        }

        // checked after the password so a disabled account is not revealed to guessers
        if !details.enabled {
            warn!(username, "authentication failed: account disabled");
            return Err(AuthenticationError::Disabled);
        }

        let principal = Principal::new(details.username, details.authorities);
        info!(
            username = %principal.username,
            roles = ?principal.roles(),
            "authentication succeeded"
        );
        Ok(principal)
    }
}
