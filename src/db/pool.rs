use crate::config::{JdbcSettings, PoolSettings};
use crate::db::schema::SECURITY_SCHEMA;
use crate::error::{ConfigError, WardenError};
use sqlx::pool::PoolOptions;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{Database, Pool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Backends a `jdbc.driver` identifier can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverKind {
    Sqlite,
    Postgres,
}

impl DriverKind {
    pub fn from_identifier(driver: &str) -> Result<Self, ConfigError> {
        match driver.trim() {
            "org.sqlite.JDBC" | "sqlite" => Ok(DriverKind::Sqlite),
            "org.postgresql.Driver" | "postgres" | "postgresql" => Ok(DriverKind::Postgres),
            other => Err(ConfigError::DriverRegistration {
                driver: other.to_string(),
                reason: "no such driver is available".to_string(),
            }),
        }
    }

    fn accepts_scheme(self, scheme: &str) -> bool {
        match self {
            DriverKind::Sqlite => scheme == "sqlite",
            DriverKind::Postgres => matches!(scheme, "postgres" | "postgresql"),
        }
    }
}

/// Validated pool bounds ready to apply to a sqlx pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolBounds {
    pub initial: u32,
    pub min: u32,
    pub max: u32,
    pub idle_timeout: Option<Duration>,
}

impl PoolBounds {
    pub fn from_settings(settings: &PoolSettings) -> Result<Self, ConfigError> {
        let PoolSettings {
            initial_pool_size,
            min_pool_size,
            max_pool_size,
            max_idle_time,
        } = *settings;

        if max_pool_size == 0 {
            return Err(ConfigError::PoolBounds(
                "maxPoolSize must be at least 1".to_string(),
            ));
        }
        if min_pool_size > max_pool_size {
            return Err(ConfigError::PoolBounds(format!(
                "minPoolSize ({min_pool_size}) exceeds maxPoolSize ({max_pool_size})"
            )));
        }

        let initial = initial_pool_size.clamp(min_pool_size, max_pool_size);
        if initial != initial_pool_size {
            warn!(
                requested = initial_pool_size,
                effective = initial,
                "initialPoolSize outside [minPoolSize, maxPoolSize]; clamped"
            );
        }

        Ok(Self {
            initial,
            min: min_pool_size,
            max: max_pool_size,
            idle_timeout: (max_idle_time > 0).then(|| Duration::from_secs(max_idle_time)),
        })
    }

    fn apply<DB: Database>(&self, opts: PoolOptions<DB>) -> PoolOptions<DB> {
        opts.min_connections(self.min)
            .max_connections(self.max)
            .idle_timeout(self.idle_timeout)
    }
}

/// The security data source: a live connection pool shared by every request.
#[derive(Clone, Debug)]
pub enum DataSource {
    Sqlite(SqlitePool),
    Postgres(PgPool),
}

impl DataSource {
    /// Register the driver, build the pool and open `initialPoolSize`
    /// connections up front.
    pub async fn provision(
        jdbc: &JdbcSettings,
        settings: &PoolSettings,
    ) -> Result<Self, WardenError> {
        let driver = DriverKind::from_identifier(&jdbc.driver)?;
        let url = strip_jdbc_prefix(&jdbc.url);
        let scheme = url.split_once(':').map(|(s, _)| s).unwrap_or_default();
        if !driver.accepts_scheme(scheme) {
            return Err(ConfigError::DriverRegistration {
                driver: jdbc.driver.clone(),
                reason: format!("driver does not accept `{scheme}` URLs"),
            }
            .into());
        }

        let bounds = PoolBounds::from_settings(settings)?;

        info!(jdbc_url = %redact_url(&jdbc.url), "resolved security data source url");
        info!(jdbc_user = %jdbc.user, "resolved security data source user");

        let source = match driver {
            DriverKind::Sqlite => {
                debug!("sqlite driver ignores jdbc.user and jdbc.password");
                let opts = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
                let pool = bounds
                    .apply(SqlitePoolOptions::new())
                    .connect_with(opts)
                    .await?;
                warm_up(&pool, bounds.initial).await?;
                DataSource::Sqlite(pool)
            }
            DriverKind::Postgres => {
                let mut opts = PgConnectOptions::from_str(url)?;
                if !jdbc.user.is_empty() {
                    opts = opts.username(&jdbc.user);
                }
                if !jdbc.password.is_empty() {
                    opts = opts.password(&jdbc.password);
                }
                let pool = bounds
                    .apply(PgPoolOptions::new())
                    .connect_with(opts)
                    .await?;
                warm_up(&pool, bounds.initial).await?;
                DataSource::Postgres(pool)
            }
        };

        info!(
            driver = ?driver,
            initial = bounds.initial,
            min = bounds.min,
            max = bounds.max,
            idle_timeout_secs = bounds.idle_timeout.map(|d| d.as_secs()).unwrap_or(0),
            "security data source ready"
        );
        Ok(source)
    }

    pub fn driver(&self) -> DriverKind {
        match self {
            DataSource::Sqlite(_) => DriverKind::Sqlite,
            DataSource::Postgres(_) => DriverKind::Postgres,
        }
    }

    /// Connections currently open, idle or checked out.
    pub fn size(&self) -> u32 {
        match self {
            DataSource::Sqlite(pool) => pool.size(),
            DataSource::Postgres(pool) => pool.size(),
        }
    }

    pub async fn close(&self) {
        match self {
            DataSource::Sqlite(pool) => pool.close().await,
            DataSource::Postgres(pool) => pool.close().await,
        }
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), WardenError> {
        // one statement per query; neither driver takes a script through `query`
        for stmt in SECURITY_SCHEMA.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            match self {
                DataSource::Sqlite(pool) => {
                    sqlx::query(s).execute(pool).await?;
                }
                DataSource::Postgres(pool) => {
                    sqlx::query(s).execute(pool).await?;
                }
            }
        }
        Ok(())
    }
}

async fn warm_up<DB: Database>(pool: &Pool<DB>, initial: u32) -> Result<(), sqlx::Error> {
    let mut held = Vec::with_capacity(initial as usize);
    for _ in 0..initial {
        held.push(pool.acquire().await?);
    }
    debug!(opened = held.len(), "connection pool warmed up");
    Ok(())
}

fn strip_jdbc_prefix(url: &str) -> &str {
    let url = url.trim();
    url.strip_prefix("jdbc:").unwrap_or(url)
}

/// Render a connection URL for logs with any embedded password masked.
pub fn redact_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let has_prefix = trimmed.starts_with("jdbc:");
    let Ok(mut url) = Url::parse(strip_jdbc_prefix(trimmed)) else {
        return "<unparseable url>".to_string();
    };

    if url.password().is_some() {
        let _ = url.set_password(Some("***"));
    }

    if url.query().is_some() {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                if k.eq_ignore_ascii_case("password") {
                    (k.into_owned(), "***".to_string())
                } else {
                    (k.into_owned(), v.into_owned())
                }
            })
            .collect();
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }

    if has_prefix {
        format!("jdbc:{url}")
    } else {
        url.to_string()
    }
}
