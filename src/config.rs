//! Startup configuration.
//!
//! Values are layered with figment: built-in defaults, then the `.properties`
//! file, then `WARDEN_`-prefixed environment variables. The raw layer is
//! resolved once into an [`AppConfig`] that is passed by reference to every
//! component that needs it.

use base64::Engine;
use figment::{Figment, providers::Serialized};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::properties::{PropertiesFile, StringEnv};

pub const PROPERTIES_ENV: &str = "WARDEN_PROPERTIES";
pub const DEFAULT_PROPERTIES_PATH: &str = "config/persistence.properties";

/// Minimum cookie key length accepted by the private cookie jar.
const COOKIE_KEY_MIN_LEN: usize = 64;

/// Longest accepted session lifetime (one year).
pub const MAX_SESSION_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

/// A property value as it arrives from any provider. Files and environment
/// variables yield text; the built-in defaults carry typed scalars.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl PropValue {
    fn as_text(&self) -> String {
        match self {
            PropValue::Int(i) => i.to_string(),
            PropValue::Float(f) => f.to_string(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for PropValue {
    fn from(s: &str) -> Self {
        PropValue::Text(s.to_string())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfig {
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub view: RawView,
    #[serde(default)]
    pub jdbc: RawJdbc,
    #[serde(default)]
    pub connection: RawConnection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawServer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loglevel: Option<PropValue>,
    #[serde(
        rename = "cookieKey",
        alias = "cookiekey",
        skip_serializing_if = "Option::is_none"
    )]
    pub cookie_key: Option<PropValue>,
    #[serde(
        rename = "insecureCookie",
        alias = "insecurecookie",
        skip_serializing_if = "Option::is_none"
    )]
    pub insecure_cookie: Option<PropValue>,
    #[serde(
        rename = "sessionTimeout",
        alias = "sessiontimeout",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_timeout: Option<PropValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PropValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawJdbc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub driver: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PropValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<PropValue>,
    #[serde(
        rename = "initSchema",
        alias = "initschema",
        skip_serializing_if = "Option::is_none"
    )]
    pub init_schema: Option<PropValue>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConnection {
    #[serde(default)]
    pub pool: RawPool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawPool {
    #[serde(
        rename = "initialPoolSize",
        alias = "initialpoolsize",
        skip_serializing_if = "Option::is_none"
    )]
    pub initial_pool_size: Option<PropValue>,
    #[serde(
        rename = "minPoolSize",
        alias = "minpoolsize",
        skip_serializing_if = "Option::is_none"
    )]
    pub min_pool_size: Option<PropValue>,
    #[serde(
        rename = "maxPoolSize",
        alias = "maxpoolsize",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_pool_size: Option<PropValue>,
    #[serde(
        rename = "maxIdleTime",
        alias = "maxidletime",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_idle_time: Option<PropValue>,
}

impl RawConfig {
    /// Built-in defaults for everything outside the `jdbc.*` and
    /// `connection.pool.*` contract.
    pub fn defaults() -> Self {
        Self {
            server: RawServer {
                listen: Some("0.0.0.0:8080".into()),
                loglevel: Some("info".into()),
                cookie_key: None,
                insecure_cookie: Some(PropValue::Bool(false)),
                session_timeout: Some(PropValue::Int(1800)),
            },
            view: RawView {
                prefix: Some("/WEB-INF/view/".into()),
                suffix: Some(".jsp".into()),
                root: Some("webapp".into()),
            },
            jdbc: RawJdbc {
                init_schema: Some(PropValue::Bool(false)),
                ..RawJdbc::default()
            },
            connection: RawConnection::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub view: ViewSettings,
    pub jdbc: JdbcSettings,
    pub pool: PoolSettings,
}

#[derive(Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
    pub loglevel: String,
    /// Decoded private-cookie key; `None` means a fresh key per process.
    pub cookie_key: Option<Vec<u8>>,
    pub insecure_cookie: bool,
    pub session_timeout: Duration,
}

impl fmt::Debug for ServerSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSettings")
            .field("listen", &self.listen)
            .field("loglevel", &self.loglevel)
            .field("cookie_key", &self.cookie_key.as_ref().map(|_| "<redacted>"))
            .field("insecure_cookie", &self.insecure_cookie)
            .field("session_timeout", &self.session_timeout)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSettings {
    pub prefix: String,
    pub suffix: String,
    pub root: PathBuf,
}

#[derive(Clone)]
pub struct JdbcSettings {
    pub driver: String,
    pub url: String,
    pub user: String,
    pub password: String,
    pub init_schema: bool,
}

impl fmt::Debug for JdbcSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JdbcSettings")
            .field("driver", &self.driver)
            .field("url", &crate::db::pool::redact_url(&self.url))
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("init_schema", &self.init_schema)
            .finish()
    }
}

/// Connection pool sizing as read from `connection.pool.*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub initial_pool_size: u32,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
    /// Seconds; `0` keeps idle connections forever.
    pub max_idle_time: u64,
}

/// Resolve the properties file path from `WARDEN_PROPERTIES`.
pub fn properties_path() -> PathBuf {
    std::env::var_os(PROPERTIES_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROPERTIES_PATH))
}

/// The layered configuration sources, lowest priority first.
pub fn figment(properties: &Path) -> Figment {
    Figment::from(Serialized::defaults(RawConfig::defaults()))
        .merge(PropertiesFile::file(properties))
        .merge(StringEnv::prefixed("WARDEN_"))
}

pub fn load(properties: &Path) -> Result<AppConfig, ConfigError> {
    AppConfig::from_figment(&figment(properties))
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let raw: RawConfig = figment.extract()?;
        Self::resolve(raw)
    }

    pub fn resolve(raw: RawConfig) -> Result<Self, ConfigError> {
        let listen_text = required_text(raw.server.listen.as_ref(), "server.listen")?;
        let listen = listen_text
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::ListenAddr(listen_text.clone()))?;

        let cookie_key = raw
            .server
            .cookie_key
            .as_ref()
            .map(|v| decode_cookie_key(&v.as_text()))
            .transpose()?;

        let session_timeout =
            required_u64(raw.server.session_timeout.as_ref(), "server.sessionTimeout")?;
        if session_timeout > MAX_SESSION_TIMEOUT_SECS {
            return Err(ConfigError::SessionTimeout {
                seconds: session_timeout,
                max: MAX_SESSION_TIMEOUT_SECS,
            });
        }

        let server = ServerSettings {
            listen,
            loglevel: required_text(raw.server.loglevel.as_ref(), "server.loglevel")?,
            cookie_key,
            insecure_cookie: required_bool(
                raw.server.insecure_cookie.as_ref(),
                "server.insecureCookie",
            )?,
            session_timeout: Duration::from_secs(session_timeout),
        };

        let view = ViewSettings {
            prefix: required_text(raw.view.prefix.as_ref(), "view.prefix")?,
            suffix: required_text(raw.view.suffix.as_ref(), "view.suffix")?,
            root: PathBuf::from(required_text(raw.view.root.as_ref(), "view.root")?),
        };

        let jdbc = JdbcSettings {
            driver: required_text(raw.jdbc.driver.as_ref(), "jdbc.driver")?,
            url: required_text(raw.jdbc.url.as_ref(), "jdbc.url")?,
            user: required_text(raw.jdbc.user.as_ref(), "jdbc.user")?,
            password: required_text(raw.jdbc.password.as_ref(), "jdbc.password")?,
            init_schema: required_bool(raw.jdbc.init_schema.as_ref(), "jdbc.initSchema")?,
        };

        let p = &raw.connection.pool;
        let pool = PoolSettings {
            initial_pool_size: required_u32(
                p.initial_pool_size.as_ref(),
                "connection.pool.initialPoolSize",
            )?,
            min_pool_size: required_u32(p.min_pool_size.as_ref(), "connection.pool.minPoolSize")?,
            max_pool_size: required_u32(p.max_pool_size.as_ref(), "connection.pool.maxPoolSize")?,
            max_idle_time: required_u64(p.max_idle_time.as_ref(), "connection.pool.maxIdleTime")?,
        };

        Ok(Self {
            server,
            view,
            jdbc,
            pool,
        })
    }
}

fn required_text(value: Option<&PropValue>, key: &'static str) -> Result<String, ConfigError> {
    value
        .map(PropValue::as_text)
        .ok_or(ConfigError::Missing { key })
}

fn required_u32(value: Option<&PropValue>, key: &'static str) -> Result<u32, ConfigError> {
    let text = required_text(value, key)?;
    text.trim()
        .parse::<u32>()
        .map_err(|source| ConfigError::InvalidInteger {
            key,
            value: text.clone(),
            source,
        })
}

fn required_u64(value: Option<&PropValue>, key: &'static str) -> Result<u64, ConfigError> {
    let text = required_text(value, key)?;
    text.trim()
        .parse::<u64>()
        .map_err(|source| ConfigError::InvalidInteger {
            key,
            value: text.clone(),
            source,
        })
}

fn required_bool(value: Option<&PropValue>, key: &'static str) -> Result<bool, ConfigError> {
    match value {
        Some(PropValue::Bool(b)) => Ok(*b),
        Some(other) => {
            let text = other.as_text();
            match text.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(ConfigError::InvalidBoolean { key, value: text }),
            }
        }
        None => Err(ConfigError::Missing { key }),
    }
}

fn decode_cookie_key(encoded: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ConfigError::CookieKey(e.to_string()))?;
    if bytes.len() < COOKIE_KEY_MIN_LEN {
        return Err(ConfigError::CookieKey(format!(
            "decoded key is {} bytes, need at least {COOKIE_KEY_MIN_LEN}",
            bytes.len()
        )));
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL_PROPERTIES: &str = "\
jdbc.driver=org.sqlite.JDBC
jdbc.url=jdbc:sqlite:warden-test.db
jdbc.user=springstudent
jdbc.password=springstudent
connection.pool.initialPoolSize=5
connection.pool.minPoolSize=5
connection.pool.maxPoolSize=20
connection.pool.maxIdleTime=300
";

    fn from_properties(text: &str) -> Result<AppConfig, ConfigError> {
        let figment =
            Figment::from(Serialized::defaults(RawConfig::defaults())).merge(PropertiesFile::string(text));
        AppConfig::from_figment(&figment)
    }

    #[test]
    fn resolves_contract_properties() {
        let cfg = from_properties(POOL_PROPERTIES).expect("valid configuration");
        assert_eq!(cfg.jdbc.driver, "org.sqlite.JDBC");
        assert_eq!(cfg.jdbc.url, "jdbc:sqlite:warden-test.db");
        assert_eq!(cfg.jdbc.user, "springstudent");
        assert_eq!(cfg.jdbc.password, "springstudent");
        assert_eq!(
            cfg.pool,
            PoolSettings {
                initial_pool_size: 5,
                min_pool_size: 5,
                max_pool_size: 20,
                max_idle_time: 300,
            }
        );
    }

    #[test]
    fn defaults_fill_everything_else() {
        let cfg = from_properties(POOL_PROPERTIES).expect("valid configuration");
        assert_eq!(cfg.server.listen, "0.0.0.0:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.server.session_timeout, Duration::from_secs(1800));
        assert!(!cfg.server.insecure_cookie);
        assert!(cfg.server.cookie_key.is_none());
        assert_eq!(cfg.view.prefix, "/WEB-INF/view/");
        assert_eq!(cfg.view.suffix, ".jsp");
        assert!(!cfg.jdbc.init_schema);
    }

    #[test]
    fn non_numeric_pool_size_is_fatal() {
        let text = POOL_PROPERTIES.replace("maxPoolSize=20", "maxPoolSize=twenty");
        let err = from_properties(&text).expect_err("non-numeric maxPoolSize must fail");
        match err {
            ConfigError::InvalidInteger { key, value, .. } => {
                assert_eq!(key, "connection.pool.maxPoolSize");
                assert_eq!(value, "twenty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn negative_pool_size_is_rejected() {
        let text = POOL_PROPERTIES.replace("minPoolSize=5", "minPoolSize=-1");
        assert!(matches!(
            from_properties(&text),
            Err(ConfigError::InvalidInteger {
                key: "connection.pool.minPoolSize",
                ..
            })
        ));
    }

    #[test]
    fn missing_required_property_is_fatal() {
        let text = POOL_PROPERTIES.replace("jdbc.user=springstudent\n", "");
        assert!(matches!(
            from_properties(&text),
            Err(ConfigError::Missing { key: "jdbc.user" })
        ));
    }

    #[test]
    fn short_cookie_key_is_rejected() {
        let text = format!("{POOL_PROPERTIES}server.cookieKey=c2hvcnQ=\n");
        assert!(matches!(
            from_properties(&text),
            Err(ConfigError::CookieKey(_))
        ));
    }

    #[test]
    fn oversized_session_timeout_is_rejected() {
        let text = format!("{POOL_PROPERTIES}server.sessionTimeout=10000000000000\n");
        assert!(matches!(
            from_properties(&text),
            Err(ConfigError::SessionTimeout {
                seconds: 10_000_000_000_000,
                max: MAX_SESSION_TIMEOUT_SECS,
            })
        ));
        let text = format!("{POOL_PROPERTIES}server.sessionTimeout={MAX_SESSION_TIMEOUT_SECS}\n");
        assert_eq!(
            from_properties(&text).expect("one year is accepted").server.session_timeout,
            Duration::from_secs(MAX_SESSION_TIMEOUT_SECS)
        );
    }

    #[test]
    fn env_overrides_keep_leading_zeros() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("persistence.properties", POOL_PROPERTIES)?;
            jail.set_env("WARDEN_JDBC__PASSWORD", "007");
            jail.set_env("WARDEN_JDBC__USER", "1.50");
            jail.set_env("WARDEN_CONNECTION__POOL__MAXPOOLSIZE", "30");

            let cfg = load(Path::new("persistence.properties")).map_err(|e| e.to_string())?;
            assert_eq!(cfg.jdbc.password, "007");
            assert_eq!(cfg.jdbc.user, "1.50");
            assert_eq!(cfg.pool.max_pool_size, 30);
            Ok(())
        });
    }

    #[test]
    fn password_never_appears_in_debug_output() {
        let cfg = from_properties(POOL_PROPERTIES).expect("valid configuration");
        let rendered = format!("{:?}", cfg.jdbc);
        assert!(!rendered.contains("password: \"springstudent\""));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn boolean_properties_accept_text() {
        let text = format!("{POOL_PROPERTIES}server.insecureCookie=TRUE\njdbc.initSchema=yes\n");
        assert!(matches!(
            from_properties(&text),
            Err(ConfigError::InvalidBoolean {
                key: "jdbc.initSchema",
                ..
            })
        ));
        let text = format!("{POOL_PROPERTIES}server.insecureCookie=TRUE\n");
        assert!(from_properties(&text).expect("valid").server.insecure_cookie);
    }
}
