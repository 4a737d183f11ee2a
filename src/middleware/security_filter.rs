use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use tracing::{debug, warn};

use crate::router::WardenState;
use crate::security::{Decision, session};

/// Gate every request through the authorization policy.
pub async fn security_filter(
    State(state): State<WardenState>,
    jar: PrivateCookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    // expired or tampered sessions count as anonymous
    let principal = session::current_principal(&jar);
    let path = req.uri().path().to_owned();
    let form_login = state.form_login();

    match state.policy().evaluate(&path, principal.as_ref()) {
        Decision::Allow => {
            if let Some(principal) = principal {
                req.extensions_mut().insert(principal);
            }
            next.run(req).await
        }
        Decision::RequireLogin => {
            debug!(path = %path, "anonymous request needs login");
            Redirect::to(&form_login.login_page).into_response()
        }
        Decision::Deny => {
            warn!(
                path = %path,
                username = %principal.as_ref().map(|p| p.username.as_str()).unwrap_or_default(),
                "access denied"
            );
            Redirect::to(&form_login.access_denied_page).into_response()
        }
    }
}
