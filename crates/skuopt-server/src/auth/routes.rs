//! Browser-facing auth endpoints: the OAuth/magic-link callback and sign-out.

use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use serde_json::json;

use super::{cookies, AuthError, ProviderSession};
use crate::api::AppState;

const DEFAULT_NEXT: &str = "/dashboard";
const AUTH_ERROR_REDIRECT: &str = "/login?error=auth-code-error";

#[derive(Debug, Deserialize)]
pub(crate) struct CallbackParams {
    code: Option<String>,
    next: Option<String>,
}

/// Only same-origin relative paths are followed after sign-in.
fn sanitize_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_NEXT,
    }
}

fn secure_cookies(state: &AppState) -> bool {
    state.config.public_app_url.starts_with("https://")
}

fn redirect_with_cookies(target: &str, cookies: Vec<HeaderValue>) -> Response {
    let mut response = Redirect::temporary(target).into_response();
    for cookie in cookies {
        response.headers_mut().append(SET_COOKIE, cookie);
    }
    response
}

async fn exchange(
    state: &AppState,
    headers: &HeaderMap,
    code: &str,
) -> Result<ProviderSession, AuthError> {
    let verifier = cookies::code_verifier(headers, &state.config.session_cookie).unwrap_or_default();
    state.provider.exchange_code(code, &verifier).await
}

/// Exchanges the authorization code, opens the profile, and sets the
/// session cookie before forwarding to `next`.
pub(crate) async fn callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CallbackParams>,
) -> Response {
    let next = sanitize_next(params.next.as_deref()).to_owned();
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return Redirect::temporary(AUTH_ERROR_REDIRECT).into_response();
    };

    let session = match exchange(&state, &headers, &code).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "auth callback: code exchange failed");
            return Redirect::temporary(AUTH_ERROR_REDIRECT).into_response();
        }
    };

    if let Err(e) =
        skuopt_db::profiles::ensure_profile(&state.pool, session.user.id, session.user.email.as_deref())
            .await
    {
        tracing::error!(user_id = %session.user.id, error = %e, "auth callback: profile upsert failed");
        return Redirect::temporary(AUTH_ERROR_REDIRECT).into_response();
    }

    tracing::info!(user_id = %session.user.id, "auth callback: session established");

    let secure = secure_cookies(&state);
    let stored = json!({
        "access_token": session.access_token,
        "refresh_token": session.refresh_token,
        "token_type": session.token_type,
        "expires_in": session.expires_in,
        "expires_at": session.expires_at,
        "user": { "id": session.user.id, "email": session.user.email },
    });
    let mut set = cookies::session_cookie_headers(&state.config.session_cookie, &stored, secure);
    set.extend(cookies::expired_cookie(
        &cookies::verifier_cookie_name(&state.config.session_cookie),
        secure,
    ));

    redirect_with_cookies(&next, set)
}

/// Clears every session cookie and returns to the login page.
pub(crate) async fn signout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cleared =
        cookies::clear_session_headers(&headers, &state.config.session_cookie, secure_cookies(&state));
    redirect_with_cookies("/login", cleared)
}
