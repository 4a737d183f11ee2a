use async_trait::async_trait;
use std::collections::BTreeSet;
use tracing::debug;

use crate::db::models::{AuthorityRow, UserRow};
use crate::db::pool::DataSource;
use crate::db::schema::{AUTHORITIES_BY_USERNAME, USER_BY_USERNAME};
use crate::error::WardenError;
use crate::security::user_details::{UserDetails, UserDetailsService};

/// Read-only user lookup against the `users` / `authorities` tables.
#[derive(Clone)]
pub struct JdbcUserDetailsService {
    source: DataSource,
}

impl JdbcUserDetailsService {
    pub fn new(source: DataSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    async fn fetch_user(&self, username: &str) -> Result<Option<UserRow>, WardenError> {
        let row = match &self.source {
            DataSource::Sqlite(pool) => {
                sqlx::query_as::<_, UserRow>(USER_BY_USERNAME)
                    .bind(username)
                    .fetch_optional(pool)
                    .await?
            }
            DataSource::Postgres(pool) => {
                sqlx::query_as::<_, UserRow>(USER_BY_USERNAME)
                    .bind(username)
                    .fetch_optional(pool)
                    .await?
            }
        };
        Ok(row)
    }

    async fn fetch_authorities(&self, username: &str) -> Result<Vec<AuthorityRow>, WardenError> {
        let rows = match &self.source {
            DataSource::Sqlite(pool) => {
                sqlx::query_as::<_, AuthorityRow>(AUTHORITIES_BY_USERNAME)
                    .bind(username)
                    .fetch_all(pool)
                    .await?
            }
            DataSource::Postgres(pool) => {
                sqlx::query_as::<_, AuthorityRow>(AUTHORITIES_BY_USERNAME)
                    .bind(username)
                    .fetch_all(pool)
                    .await?
            }
        };
        Ok(rows)
    }
}

#[async_trait]
impl UserDetailsService for JdbcUserDetailsService {
    async fn load_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<UserDetails>, WardenError> {
        let Some(user) = self.fetch_user(username).await? else {
            return Ok(None);
        };

        let authorities: BTreeSet<String> = self
            .fetch_authorities(&user.username)
            .await?
            .into_iter()
            .map(|row| row.authority)
            .collect();

        // a user without any granted authority cannot be authenticated
        if authorities.is_empty() {
            debug!(username = %user.username, "user has no authorities; treating as unknown");
            return Ok(None);
        }

        Ok(Some(UserDetails {
            username: user.username,
            password: user.password,
            enabled: user.enabled,
            authorities,
        }))
    }
}
