//! Client for the hosted auth provider's token endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::AuthError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session returned by a successful code exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: ProviderUser,
}

#[derive(Debug, Serialize)]
struct PkceExchange<'a> {
    auth_code: &'a str,
    code_verifier: &'a str,
}

/// Exchanges OAuth/magic-link codes for sessions.
#[derive(Debug, Clone)]
pub struct AuthProviderClient {
    client: Client,
    token_url: String,
    anon_key: String,
}

impl AuthProviderClient {
    /// # Errors
    ///
    /// Returns [`AuthError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: &str) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            token_url: format!("{}/auth/v1/token", base_url.trim_end_matches('/')),
            anon_key: anon_key.to_owned(),
        })
    }

    /// Trades a PKCE authorization code for a session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Http`] on network failure or an unreadable body.
    /// - [`AuthError::Provider`] when the provider rejects the code.
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<ProviderSession, AuthError> {
        let response = self
            .client
            .post(&self.token_url)
            .query(&[("grant_type", "pkce")])
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(&PkceExchange {
                auth_code,
                code_verifier,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message: provider_message(&body),
            });
        }

        Ok(response.json::<ProviderSession>().await?)
    }
}

fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(Value::as_str).map(ToOwned::to_owned))
        })
        .unwrap_or_else(|| body.trim().to_owned())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn exchanges_code_for_session() {
        let server = MockServer::start().await;
        let user_id = Uuid::new_v4();

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "pkce"))
            .and(header("apikey", "anon-key"))
            .and(body_json(json!({"auth_code": "code-1", "code_verifier": "verifier-1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "aaa.bbb.ccc",
                "refresh_token": "refresh",
                "token_type": "bearer",
                "expires_in": 3600,
                "expires_at": 1_900_000_000,
                "user": {"id": user_id, "email": "ana@example.com", "role": "authenticated"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AuthProviderClient::new(&format!("{}/", server.uri()), "anon-key").unwrap();
        let session = client
            .exchange_code("code-1", "verifier-1")
            .await
            .expect("exchange should succeed");

        assert_eq!(session.access_token, "aaa.bbb.ccc");
        assert_eq!(session.user.id, user_id);
        assert_eq!(session.user.email.as_deref(), Some("ana@example.com"));
    }

    #[tokio::test]
    async fn rejected_code_reports_provider_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid auth code"
            })))
            .mount(&server)
            .await;

        let client = AuthProviderClient::new(&server.uri(), "anon-key").unwrap();
        let err = client.exchange_code("bad", "verifier").await.unwrap_err();

        match err {
            AuthError::Provider { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid auth code");
            }
            other => panic!("expected provider error, got {other:?}"),
        }
    }
}
