use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::json;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::auth::AuthError;

/// A single message attached to one input field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Field-level validation failures, serialized as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    #[cfg(test)]
    pub fn messages_for(&self, field: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|e| e.field == field)
            .map(|e| e.message.as_str())
            .collect()
    }

    /// Hands back `value` when nothing was recorded.
    pub fn finish<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for err in &self.0 {
            grouped.entry(err.field).or_default().push(&err.message);
        }

        let mut map = serializer.serialize_map(Some(grouped.len()))?;
        for (field, messages) in grouped {
            map.serialize_entry(field, &messages)?;
        }
        map.end()
    }
}

/// Storage failures surfaced by `TaskStore` and `UserStore` implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0}")]
    Duplicate(&'static str),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("not found")]
    NotFound,

    #[error("invalid page")]
    InvalidPage,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Validation(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
            AppError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "detail": detail }))).into_response()
            }
            AppError::Auth(err) => auth_response(err),
            AppError::NotFound => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not found." }))).into_response()
            }
            AppError::InvalidPage => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": "Invalid page." }))).into_response()
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "storage failure");
                server_error()
            }
        }
    }
}

fn auth_response(err: AuthError) -> Response {
    let body = match err {
        AuthError::MissingCredentials => {
            json!({ "detail": "Authentication credentials were not provided." })
        }
        AuthError::InvalidToken => json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid",
        }),
        AuthError::InvalidRefreshToken => json!({
            "detail": "Token is invalid or expired",
            "code": "token_not_valid",
        }),
        AuthError::UserNotFound => json!({
            "detail": "User not found",
            "code": "user_not_found",
        }),
        AuthError::InvalidCredentials => {
            json!({ "detail": "No active account found with the given credentials" })
        }
        AuthError::Encode(_) | AuthError::Hash(_) => {
            tracing::error!(error = %err, "credential processing failed");
            return server_error();
        }
    };

    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, r#"Bearer realm="api""#)],
        Json(body),
    )
        .into_response()
}

fn server_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "A server error occurred." })),
    )
        .into_response()
}
