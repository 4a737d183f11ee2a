use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::PrivateCookieJar;
use serde::Deserialize;
use tracing::info;

use crate::middleware::MaybeUser;
use crate::security::session;
use crate::{WardenError, router::WardenState};

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub error: Option<String>,
    pub logout: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// GET /showMyLoginPage
pub async fn show_login_page(
    State(state): State<WardenState>,
    Query(query): Query<LoginPageQuery>,
) -> Result<Html<String>, WardenError> {
    let message = if query.error.is_some() {
        "Sorry! You entered invalid username/password."
    } else if query.logout.is_some() {
        "You have been logged out."
    } else {
        ""
    };
    state
        .views()
        .render("login-form", &[("message", message.to_string())])
        .await
}

/// POST /authenticateTheUser
pub async fn authenticate(
    State(state): State<WardenState>,
    jar: PrivateCookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, WardenError> {
    let form_login = state.form_login();
    match state
        .authentication()
        .authenticate(&form.username, &form.password)
        .await
    {
        Ok(principal) => {
            let jar = session::start(jar, principal, state.session())?;
            Ok((jar, Redirect::to(&form_login.default_success_url)).into_response())
        }
        // every failure looks the same from the outside
        Err(_) => Ok((
            session::end(jar),
            Redirect::to(&form_login.failure_url()),
        )
            .into_response()),
    }
}

/// GET|POST /logout
pub async fn logout(
    State(state): State<WardenState>,
    MaybeUser(user): MaybeUser,
    jar: PrivateCookieJar,
) -> Response {
    if let Some(user) = user {
        info!(username = %user.username, "logged out");
    }
    (
        session::end(jar),
        Redirect::to(&state.form_login().logout_success_url()),
    )
        .into_response()
}
