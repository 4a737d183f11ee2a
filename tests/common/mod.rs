#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use figment::{Figment, providers::Serialized};
use std::{
    path::PathBuf,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tower::ServiceExt;
use warden::config::{AppConfig, RawConfig};
use warden::db::{DataSource, JdbcUserDetailsService};
use warden::properties::PropertiesFile;
use warden::security::DelegatingPasswordEncoder;

pub const PASSWORD: &str = "test123";

/// A throwaway SQLite file, removed on drop.
pub struct TempDb {
    pub path: PathBuf,
}

impl TempDb {
    pub fn new(tag: &str) -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before UNIX_EPOCH")
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!(
            "warden-{tag}-{}-{}.sqlite",
            std::process::id(),
            nanos
        ));
        Self { path }
    }

    pub fn jdbc_url(&self) -> String {
        format!("jdbc:sqlite:{}", self.path.display())
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

pub fn properties(db: &TempDb, max_pool_size: &str) -> String {
    format!(
        "jdbc.driver=org.sqlite.JDBC\n\
         jdbc.url={}\n\
         jdbc.user=springstudent\n\
         jdbc.password=springstudent\n\
         jdbc.initSchema=true\n\
         connection.pool.initialPoolSize=5\n\
         connection.pool.minPoolSize=5\n\
         connection.pool.maxPoolSize={max_pool_size}\n\
         connection.pool.maxIdleTime=300\n\
         server.insecureCookie=true\n\
         view.root={}\n",
        db.jdbc_url(),
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("webapp")
            .display()
    )
}

pub fn config_from(text: &str) -> Result<AppConfig, warden::ConfigError> {
    let figment =
        Figment::from(Serialized::defaults(RawConfig::defaults())).merge(PropertiesFile::string(text));
    AppConfig::from_figment(&figment)
}

async fn insert_user(pool: &sqlx::SqlitePool, username: &str, password: &str, enabled: bool, roles: &[&str]) {
    sqlx::query("INSERT INTO users (username, password, enabled) VALUES (?, ?, ?)")
        .bind(username)
        .bind(password)
        .bind(enabled)
        .execute(pool)
        .await
        .expect("insert user");
    for role in roles {
        sqlx::query("INSERT INTO authorities (username, authority) VALUES (?, ?)")
            .bind(username)
            .bind(format!("ROLE_{role}"))
            .execute(pool)
            .await
            .expect("insert authority");
    }
}

/// john: EMPLOYEE, mary: EMPLOYEE+MANAGER, susan: EMPLOYEE+ADMIN,
/// tom: disabled EMPLOYEE. All share [`PASSWORD`].
pub async fn seed(source: &DataSource) {
    let DataSource::Sqlite(pool) = source else {
        panic!("tests seed SQLite only");
    };
    let encoder = DelegatingPasswordEncoder::new();
    let bcrypt = encoder.encode(PASSWORD, 4).expect("hash");
    let noop = format!("{{noop}}{PASSWORD}");

    insert_user(pool, "john", &noop, true, &["EMPLOYEE"]).await;
    insert_user(pool, "mary", &bcrypt, true, &["EMPLOYEE", "MANAGER"]).await;
    insert_user(pool, "susan", &bcrypt, true, &["EMPLOYEE", "ADMIN"]).await;
    insert_user(pool, "tom", &bcrypt, false, &["EMPLOYEE"]).await;
}

pub struct TestApp {
    pub app: Router,
    pub source: DataSource,
    _db: TempDb,
}

pub async fn spawn_app() -> TestApp {
    let db = TempDb::new("flow");
    let cfg = config_from(&properties(&db, "20")).expect("valid configuration");
    let source = DataSource::provision(&cfg.jdbc, &cfg.pool)
        .await
        .expect("pool provisions");
    source.init_schema().await.expect("schema");
    seed(&source).await;

    let users = Arc::new(JdbcUserDetailsService::new(source.clone()));
    let state = warden::WardenState::new(&cfg, users);
    TestApp {
        app: warden::warden_router(state),
        source,
        _db: db,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.app
            .clone()
            .oneshot(builder.body(Body::empty()).expect("failed to build request"))
            .await
            .expect("request failed")
    }

    pub async fn post_login(&self, username: &str, password: &str) -> Response<Body> {
        let form = format!("username={username}&password={password}");
        self.app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/authenticateTheUser")
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(form))
                    .expect("failed to build request"),
            )
            .await
            .expect("request failed")
    }

    /// Log in and return the `name=value` session cookie.
    pub async fn login(&self, username: &str) -> String {
        let resp = self.post_login(username, PASSWORD).await;
        assert_eq!(location(&resp), Some("/"), "{username} should log in");
        session_cookie(&resp).expect("login sets a session cookie")
    }
}

pub fn location(resp: &Response<Body>) -> Option<&str> {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
}

pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("WARDEN_SESSION=") && !v.starts_with("WARDEN_SESSION=;"))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

pub async fn body_text(resp: Response<Body>) -> String {
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    String::from_utf8(body.to_vec()).expect("response body was not utf-8")
}
