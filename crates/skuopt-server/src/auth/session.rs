use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use uuid::Uuid;

use super::{AuthError, AuthUser};

const SESSION_AUDIENCE: &str = "authenticated";

#[derive(Debug, Deserialize)]
struct SessionClaims {
    sub: String,
    #[serde(default)]
    email: Option<String>,
}

/// Verifies session JWTs issued by the auth provider.
#[derive(Clone)]
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for SessionVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionVerifier").finish_non_exhaustive()
    }
}

impl SessionVerifier {
    #[must_use]
    pub fn new(jwt_secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[SESSION_AUDIENCE]);
        Self {
            key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Checks signature, expiry and audience, and returns the user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] when validation fails, or
    /// [`AuthError::InvalidSubject`] when `sub` is not a UUID.
    pub fn verify(&self, token: &str) -> Result<AuthUser, AuthError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation)?;
        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| AuthError::InvalidSubject(data.claims.sub.clone()))?;
        let email = data.claims.email.filter(|e| !e.trim().is_empty());
        Ok(AuthUser { id, email })
    }
}
