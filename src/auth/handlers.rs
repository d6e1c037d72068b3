use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    routing::{get, post},
    Form, Json, Router,
};
use tracing::{info, instrument};

use crate::{
    auth::{
        dto::{LoginForm, ProfileUploadRequest, RegisterRequest, TokenResponse},
        extractors::CurrentUser,
        repo_types::User,
        services,
    },
    error::{AppError, AppResult},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login/access-token", post(login))
        .route("/register", post(register))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile))
        .route("/profile/upload", post(upload_profile))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> AppResult<Json<TokenResponse>> {
    let Form(form) = form?;
    let user = services::authenticate(state.users.as_ref(), form.username.trim(), &form.password)
        .await?;

    let access_token = state
        .tokens
        .issue_access(&user.username)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(username = %user.username, "user logged in");
    Ok(Json(TokenResponse::bearer(
        access_token,
        state.tokens.access_ttl().whole_seconds(),
    )))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<Json<&'static str>> {
    let Json(payload) = payload?;
    services::register(state.users.as_ref(), payload).await?;
    Ok(Json("SUCCESS"))
}

#[instrument(skip_all)]
pub async fn get_profile(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

#[instrument(skip_all)]
pub async fn upload_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    payload: Result<Json<ProfileUploadRequest>, JsonRejection>,
) -> AppResult<Json<User>> {
    let Json(payload) = payload?;
    let updated = services::update_profile(state.users.as_ref(), &user, payload).await?;
    info!(username = %updated.username, "profile updated");
    Ok(Json(updated))
}
