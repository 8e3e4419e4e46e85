use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{AuthContext, AuthError, TokenType};
use crate::error::AppError;
use crate::state::AppState;

/// Handler-side access to the caller placed in extensions by `require_auth`.
pub struct AuthUser(pub AuthContext);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .copied()
            .map(AuthUser)
            .ok_or(AppError::Auth(AuthError::MissingCredentials))
    }
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let ctx = resolve_bearer(&state, req.headers()).await?;
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}

/// Maps the `Authorization` header to an active user, or the reason it can't.
pub async fn resolve_bearer(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<AuthContext, AppError> {
    let token = bearer_token(headers)?;
    let user_id = state.tokens.verify(token, TokenType::Access)?;

    match state.users.find_by_id(user_id).await? {
        Some(user) if user.is_active => Ok(AuthContext { user_id: user.id }),
        _ => {
            tracing::debug!(%user_id, "token subject is missing or inactive");
            Err(AuthError::UserNotFound.into())
        }
    }
}

/// A missing header or another scheme means no credentials were offered.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidToken)?;

    let mut parts = value.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Ok(token),
        (Some("Bearer"), _, _) => Err(AuthError::InvalidToken),
        _ => Err(AuthError::MissingCredentials),
    }
}
