//! Session authentication against the hosted auth provider.
//!
//! Sessions are HS256 JWTs signed with the project's JWT secret. Browsers
//! carry them in the provider's `sb-<project>-auth-token` cookie; API
//! clients may send them as a bearer token instead.

pub(crate) mod cookies;
mod provider;
pub(crate) mod routes;
mod session;

use thiserror::Error;
use uuid::Uuid;

pub use provider::{AuthProviderClient, ProviderSession};
pub use session::SessionVerifier;

#[cfg(test)]
pub(crate) use session::tests as session_tests;

/// The signed-in user, inserted into request extensions by
/// [`crate::middleware::require_session`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid session token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("session subject is not a user id: {0}")]
    InvalidSubject(String),

    #[error("auth provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth provider error ({status}): {message}")]
    Provider { status: u16, message: String },
}
