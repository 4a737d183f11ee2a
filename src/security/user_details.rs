use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};

use crate::error::WardenError;
use crate::security::principal::role_authority;

/// A stored credential record together with its granted authorities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDetails {
    pub username: String,
    /// Encoded password, e.g. `{bcrypt}$2a$10$...` or `{noop}secret`.
    pub password: String,
    pub enabled: bool,
    pub authorities: BTreeSet<String>,
}

impl UserDetails {
    pub fn with_roles(
        username: impl Into<String>,
        password: impl Into<String>,
        roles: &[&str],
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            enabled: true,
            authorities: roles.iter().map(|r| role_authority(r)).collect(),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Credential lookup: `Ok(None)` means "not found".
#[async_trait]
pub trait UserDetailsService: Send + Sync {
    async fn load_user_by_username(&self, username: &str)
    -> Result<Option<UserDetails>, WardenError>;
}

/// Fixed user set held in memory, for tests and local demos.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDetailsService {
    users: HashMap<String, UserDetails>,
}

impl InMemoryUserDetailsService {
    pub fn new(users: impl IntoIterator<Item = UserDetails>) -> Self {
        Self {
            users: users
                .into_iter()
                .map(|u| (u.username.clone(), u))
                .collect(),
        }
    }
}

#[async_trait]
impl UserDetailsService for InMemoryUserDetailsService {
    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserDetails>, WardenError> {
        Ok(self
            .users
            .get(username)
            .filter(|u| !u.authorities.is_empty())
            .cloned())
    }
}
