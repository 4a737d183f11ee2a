use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Authorities backing a role check carry this prefix.
pub const ROLE_PREFIX: &str = "ROLE_";

/// An authenticated identity: username plus granted authorities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub authorities: BTreeSet<String>,
    pub authenticated_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(username: impl Into<String>, authorities: BTreeSet<String>) -> Self {
        Self {
            username: username.into(),
            authorities,
            authenticated_at: Utc::now(),
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// `has_role("MANAGER")` checks the `ROLE_MANAGER` authority.
    pub fn has_role(&self, role: &str) -> bool {
        self.has_authority(&role_authority(role))
    }

    /// Role names with the prefix stripped, in sorted order.
    pub fn roles(&self) -> Vec<&str> {
        self.authorities
            .iter()
            .filter_map(|a| a.strip_prefix(ROLE_PREFIX))
            .collect()
    }
}

pub fn role_authority(role: &str) -> String {
    if role.starts_with(ROLE_PREFIX) {
        role.to_string()
    } else {
        format!("{ROLE_PREFIX}{role}")
    }
}
