use axum::{
    extract::{rejection::JsonRejection, Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::{AuthError, TokenType};
use crate::error::{AppError, StoreError, ValidationErrors};
use crate::state::AppState;

const USERNAME_MAX_CHARS: usize = 150;
const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: Option<String>,
}

#[derive(Serialize)]
pub struct RefreshResponse {
    pub access: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub username: String,
    pub date_joined: DateTime<Utc>,
}

impl CredentialsRequest {
    /// The username is trimmed; the password is taken verbatim.
    fn validate(self) -> Result<(String, String), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let username = non_blank(
            self.username.map(|u| u.trim().to_string()),
            "username",
            &mut errors,
        );
        let password = non_blank(self.password, "password", &mut errors);

        match (username, password) {
            (Some(u), Some(p)) => errors.finish((u, p)),
            _ => Err(errors),
        }
    }
}

fn non_blank(
    value: Option<String>,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<String> {
    match value {
        None => {
            errors.add(field, "This field is required.");
            None
        }
        Some(v) if v.is_empty() => {
            errors.add(field, "This field may not be blank.");
            None
        }
        Some(v) => Some(v),
    }
}

fn credentials<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// Exchange username and password for an access/refresh pair
pub async fn obtain_token(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (username, password) = credentials(body)?.validate()?;

    let user = match state.users.find_by_username(&username).await? {
        Some(user) => user,
        None => {
            tracing::debug!(%username, "login for unknown user");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    if !user.is_active || !verify_password(&password, &user.password_hash) {
        tracing::debug!(user_id = %user.id, "login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }

    let pair = state.tokens.issue_pair(user.id)?;
    tracing::info!(user_id = %user.id, "issued token pair");

    Ok(Json(pair))
}

/// Exchange a refresh token for a new access token
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<RefreshRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let refresh = match credentials(body)?.refresh {
        Some(token) if !token.trim().is_empty() => token,
        Some(_) => {
            let mut errors = ValidationErrors::new();
            errors.add("refresh", "This field may not be blank.");
            return Err(errors.into());
        }
        None => {
            let mut errors = ValidationErrors::new();
            errors.add("refresh", "This field is required.");
            return Err(errors.into());
        }
    };

    let user_id = state.tokens.verify(&refresh, TokenType::Refresh)?;

    match state.users.find_by_id(user_id).await? {
        Some(user) if user.is_active => {}
        _ => return Err(AuthError::InvalidRefreshToken.into()),
    }

    let access = state.tokens.issue(user_id, TokenType::Access)?;
    Ok(Json(RefreshResponse { access }))
}

pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let (username, password) = credentials(body)?.validate()?;

    let mut errors = ValidationErrors::new();
    if username.chars().count() > USERNAME_MAX_CHARS {
        errors.add(
            "username",
            format!("Ensure this field has no more than {} characters.", USERNAME_MAX_CHARS),
        );
    }
    if password.chars().count() < PASSWORD_MIN_CHARS {
        errors.add(
            "password",
            format!("Ensure this field has at least {} characters.", PASSWORD_MIN_CHARS),
        );
    }
    errors.finish(())?;

    let password_hash = hash_password(&password)?;

    match state.users.create(&username, &password_hash).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "user registered");
            Ok((
                StatusCode::CREATED,
                Json(RegisterResponse {
                    id: user.id,
                    username: user.username,
                    date_joined: user.date_joined,
                }),
            ))
        }
        Err(StoreError::Duplicate(_)) => {
            let mut errors = ValidationErrors::new();
            errors.add("username", "A user with that username already exists.");
            Err(errors.into())
        }
        Err(e) => Err(e.into()),
    }
}
