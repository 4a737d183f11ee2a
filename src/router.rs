use axum::{
    Router,
    extract::FromRef,
    middleware::from_fn_with_state,
    routing::get,
};
use axum_extra::extract::cookie::Key;
use std::sync::Arc;
use tracing::warn;

use crate::config::AppConfig;
use crate::handlers::{login, pages};
use crate::middleware::security_filter;
use crate::security::session::SessionSettings;
use crate::security::{AuthenticationManager, AuthorizationPolicy, FormLogin, UserDetailsService};
use crate::view::ViewRenderer;

/// Shared application state
#[derive(Clone)]
pub struct WardenState {
    inner: Arc<WardenStateInner>,
    cookie_key: Key,
}

struct WardenStateInner {
    policy: AuthorizationPolicy,
    authentication: AuthenticationManager,
    views: ViewRenderer,
    form_login: FormLogin,
    session: SessionSettings,
}

impl WardenState {
    pub fn new(cfg: &AppConfig, users: Arc<dyn UserDetailsService>) -> Self {
        let form_login = FormLogin::default();
        let cookie_key = match cfg.server.cookie_key.as_deref() {
            Some(bytes) => Key::from(bytes),
            None => {
                warn!("server.cookieKey not set; sessions will not survive a restart");
                Key::generate()
            }
        };

        Self {
            inner: Arc::new(WardenStateInner {
                policy: AuthorizationPolicy::demo(&form_login),
                authentication: AuthenticationManager::new(users),
                views: ViewRenderer::new(&cfg.view),
                form_login,
                session: SessionSettings {
                    timeout: cfg.server.session_timeout,
                    secure: !cfg.server.insecure_cookie,
                },
            }),
            cookie_key,
        }
    }

    pub fn policy(&self) -> &AuthorizationPolicy {
        &self.inner.policy
    }

    pub fn authentication(&self) -> &AuthenticationManager {
        &self.inner.authentication
    }

    pub fn views(&self) -> &ViewRenderer {
        &self.inner.views
    }

    pub fn form_login(&self) -> &FormLogin {
        &self.inner.form_login
    }

    pub fn session(&self) -> &SessionSettings {
        &self.inner.session
    }
}

impl FromRef<WardenState> for Key {
    fn from_ref(state: &WardenState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<WardenState> for FormLogin {
    fn from_ref(state: &WardenState) -> Self {
        state.inner.form_login.clone()
    }
}

pub fn warden_router(state: WardenState) -> Router {
    let form_login = state.form_login().clone();

    Router::new()
        .route("/", get(pages::home))
        .route("/leaders", get(pages::leaders))
        .route("/systems", get(pages::systems))
        .route(&form_login.access_denied_page, get(pages::access_denied))
        .route(&form_login.login_page, get(login::show_login_page))
        .route(
            &form_login.login_processing_url,
            axum::routing::post(login::authenticate),
        )
        .route(
            &form_login.logout_url,
            get(login::logout).post(login::logout),
        )
        .fallback(pages::not_found)
        .layer(from_fn_with_state(state.clone(), security_filter))
        .with_state(state)
}
