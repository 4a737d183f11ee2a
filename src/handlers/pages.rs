use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};

use crate::middleware::CurrentUser;
use crate::{WardenError, router::WardenState};

fn user_model(user: &CurrentUser) -> Vec<(&'static str, String)> {
    vec![
        ("username", user.0.username.clone()),
        ("roles", user.0.roles().join(", ")),
    ]
}

/// GET / (EMPLOYEE)
pub async fn home(
    State(state): State<WardenState>,
    user: CurrentUser,
) -> Result<Html<String>, WardenError> {
    state.views().render("home", &user_model(&user)).await
}

/// GET /leaders (MANAGER)
pub async fn leaders(
    State(state): State<WardenState>,
    user: CurrentUser,
) -> Result<Html<String>, WardenError> {
    state.views().render("leaders", &user_model(&user)).await
}

/// GET /systems (ADMIN)
pub async fn systems(
    State(state): State<WardenState>,
    user: CurrentUser,
) -> Result<Html<String>, WardenError> {
    state.views().render("systems", &user_model(&user)).await
}

pub async fn access_denied(
    State(state): State<WardenState>,
) -> Result<impl IntoResponse, WardenError> {
    let page = state.views().render("access-denied", &[]).await?;
    Ok((StatusCode::FORBIDDEN, page))
}

pub async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
