pub mod password;
pub mod tokens;
pub mod users;

use thiserror::Error;
use uuid::Uuid;

pub use tokens::{TokenKeys, TokenType};
pub use users::{PgUserStore, UserStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authentication credentials were not provided")]
    MissingCredentials,

    #[error("bearer token is not a valid access token")]
    InvalidToken,

    #[error("refresh token is invalid or expired")]
    InvalidRefreshToken,

    #[error("token subject does not resolve to an active user")]
    UserNotFound,

    #[error("no active account found with the given credentials")]
    InvalidCredentials,

    #[error("token encoding failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// The authenticated caller of a request, resolved from its bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
}
