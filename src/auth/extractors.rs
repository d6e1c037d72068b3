use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;

use super::{jwt::TokenService, repo::UserStore, repo_types::User};
use crate::{
    error::{AppError, AppResult},
    state::AppState,
};

/// Resolves a bearer token to an enabled user. Store failures propagate as
/// they are; everything else is `Unauthorized`.
pub async fn resolve(tokens: &TokenService, users: &dyn UserStore, bearer: &str) -> AppResult<User> {
    let subject = tokens.validate(bearer).map_err(|e| {
        warn!(error = %e, expired = e.is_expired(), "token rejected");
        AppError::unauthorized("Invalid or expired token")
    })?;

    let Some(user) = users.find(&subject).await? else {
        warn!(%subject, "token subject does not exist");
        return Err(AppError::unauthorized("Could not validate credentials"));
    };

    if user.disabled {
        warn!(%subject, "disabled account presented a token");
        return Err(AppError::unauthorized("Inactive user"));
    }

    Ok(user)
}

/// `Ok(None)` when there is no Authorization header at all.
fn bearer_token(parts: &Parts) -> AppResult<Option<String>> {
    let Some(header) = parts.headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid Authorization header"))?;

    // Expect "Bearer <token>", scheme case-insensitive
    let (scheme, token) = value
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Invalid Authorization header"))?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AppError::unauthorized("Invalid auth scheme"));
    }
    Ok(Some(token.to_owned()))
}

/// The authenticated, enabled user behind the request's bearer token.
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?
            .ok_or_else(|| AppError::unauthorized("Not authenticated"))?;
        let user = resolve(&state.tokens, state.users.as_ref(), &token).await?;
        Ok(CurrentUser(user))
    }
}

/// Like `CurrentUser`, but a request without an Authorization header is let
/// through as `None`. A header that is present must still be valid.
pub struct MaybeUser(pub Option<User>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts)? {
            None => Ok(MaybeUser(None)),
            Some(token) => {
                let user = resolve(&state.tokens, state.users.as_ref(), &token).await?;
                Ok(MaybeUser(Some(user)))
            }
        }
    }
}
