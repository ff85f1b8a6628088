use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::{ApiError, AppState};
use crate::auth::{cookies, AuthUser};

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

#[derive(Debug, Clone)]
struct RateLimitWindow {
    started_at: Instant,
    count: usize,
}

/// Fixed-window limiter for the protected routes, one window per user.
///
/// Requests without an [`AuthUser`] share a single anonymous window.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    windows: Arc<Mutex<HashMap<Option<Uuid>, RateLimitWindow>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `key`; `false` once its budget is spent.
    async fn admit(&self, key: Option<Uuid>) -> bool {
        let now = Instant::now();
        let mut windows = self.windows.lock().await;
        windows.retain(|_, w| now.duration_since(w.started_at) < self.window);

        let window = windows.entry(key).or_insert(RateLimitWindow {
            started_at: now,
            count: 0,
        });
        if window.count >= self.max_requests {
            return false;
        }
        window.count += 1;
        true
    }
}

fn request_id_of(req: &Request) -> String {
    req.extensions()
        .get::<RequestId>()
        .map_or_else(String::new, |id| id.0.clone())
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// The session token from a bearer header, falling back to the session cookie.
fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers.get(AUTHORIZATION)) {
        return Some(token.to_owned());
    }
    cookies::session_cookie_value(headers)
        .as_deref()
        .and_then(cookies::access_token_from_cookie)
}

fn signed_in_user(state: &AppState, headers: &HeaderMap) -> Option<AuthUser> {
    let token = session_token(headers)?;
    state
        .sessions
        .verify(&token)
        .map_err(|e| tracing::debug!(error = %e, "session rejected"))
        .ok()
}

/// Middleware resolving the signed-in user into an [`AuthUser`] extension.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let user = signed_in_user(&state, req.headers());
    match user {
        Some(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        None => ApiError::new(
            request_id_of(&req),
            "unauthorized",
            "missing or invalid session",
        )
        .into_response(),
    }
}

/// Session state for page requests, read from the session cookie only.
/// Without any session cookie the visitor is signed out without verifying
/// anything.
fn page_session(state: &AppState, headers: &HeaderMap) -> bool {
    if !cookies::has_session_cookie(headers) {
        return false;
    }
    cookies::session_cookie_value(headers)
        .as_deref()
        .and_then(cookies::access_token_from_cookie)
        .is_some_and(|token| state.sessions.verify(&token).is_ok())
}

/// Redirects page requests according to session state.
///
/// `/dashboard/*` requires a session, `/` forwards to the right landing
/// page, and `/login` bounces signed-in users to the dashboard. API and
/// auth routes pass through untouched.
pub async fn page_guard(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let guarded = path == "/" || path == "/login" || path.starts_with("/dashboard");
    if !guarded {
        return next.run(req).await;
    }

    let signed_in = page_session(&state, req.headers());

    if path == "/" {
        let target = if signed_in { "/dashboard" } else { "/login" };
        return Redirect::temporary(target).into_response();
    }
    if path.starts_with("/dashboard") && !signed_in {
        return Redirect::temporary("/login").into_response();
    }
    if path == "/login" && signed_in {
        return Redirect::temporary("/dashboard").into_response();
    }

    next.run(req).await
}

/// Middleware enforcing a fixed request-per-window limit per signed-in user.
///
/// Runs inside [`require_session`] so rejected requests spend no budget.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let key = req.extensions().get::<AuthUser>().map(|user| user.id);

    if !rate_limit.admit(key).await {
        tracing::warn!(user_id = ?key, "rate limit exceeded");
        return ApiError::new(request_id_of(&req), "rate_limited", "rate limit exceeded")
            .into_response();
    }

    next.run(req).await
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use super::*;
    use crate::api::test_support::{
        bearer, lazy_pool, session_token as signed_token, test_config, test_state,
        SESSION_COOKIE,
    };

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    fn guarded_app() -> Router {
        let state = test_state(
            lazy_pool(),
            test_config("http://127.0.0.1:1", "http://127.0.0.1:1"),
        );
        Router::new()
            .route("/", get(|| async { "home" }))
            .route("/login", get(|| async { "login" }))
            .route("/dashboard/history", get(|| async { "history" }))
            .route("/api/v1/plans", get(|| async { "plans" }))
            .layer(axum::middleware::from_fn_with_state(state, page_guard))
    }

    async fn visit(uri: &str, cookie: Option<String>) -> (StatusCode, Option<String>) {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = guarded_app()
            .oneshot(builder.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToOwned::to_owned);
        (response.status(), location)
    }

    fn session_cookie() -> String {
        format!(
            "{SESSION_COOKIE}={}",
            signed_token(Uuid::new_v4(), "ana@example.com")
        )
    }

    #[tokio::test]
    async fn dashboard_without_session_redirects_to_login() {
        let (status, location) = visit("/dashboard/history", None).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn dashboard_with_forged_cookie_redirects_to_login() {
        let cookie = format!("{SESSION_COOKIE}=aaa.bbb.ccc");
        let (status, location) = visit("/dashboard/history", Some(cookie)).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/login"));
    }

    #[tokio::test]
    async fn dashboard_with_session_passes() {
        let (status, _) = visit("/dashboard/history", Some(session_cookie())).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn dashboard_with_chunked_session_cookie_passes() {
        let token = signed_token(Uuid::new_v4(), "ana@example.com");
        let (head, tail) = token.split_at(token.len() / 2);
        let cookie = format!("{SESSION_COOKIE}.1={tail}; {SESSION_COOKIE}.0={head}");
        let (status, _) = visit("/dashboard/history", Some(cookie)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn bearer_without_session_cookie_is_signed_out_for_pages() {
        let mut builder = HttpRequest::builder().uri("/dashboard/history");
        builder = builder.header(header::AUTHORIZATION, bearer(Uuid::new_v4(), "ana@example.com"));
        let response = guarded_app()
            .oneshot(builder.body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn root_forwards_by_session_state() {
        let (_, anonymous) = visit("/", None).await;
        assert_eq!(anonymous.as_deref(), Some("/login"));
        let (_, signed_in) = visit("/", Some(session_cookie())).await;
        assert_eq!(signed_in.as_deref(), Some("/dashboard"));
    }

    #[tokio::test]
    async fn login_bounces_signed_in_users() {
        let (status, location) = visit("/login", Some(session_cookie())).await;
        assert_eq!(status, StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location.as_deref(), Some("/dashboard"));
        let (status, _) = visit("/login", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_are_not_redirected() {
        let (status, _) = visit("/api/v1/plans", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn rate_limit_rejects_after_budget() {
        let app = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(
                RateLimitState::new(1, Duration::from_secs(60)),
                enforce_rate_limit,
            ));

        let first = app
            .clone()
            .oneshot(HttpRequest::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .oneshot(HttpRequest::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn rate_limit_windows_are_per_user() {
        let state = test_state(
            lazy_pool(),
            test_config("http://127.0.0.1:1", "http://127.0.0.1:1"),
        );
        let app = Router::new().route("/", get(|| async { "ok" })).layer(
            tower::ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(state, require_session))
                .layer(axum::middleware::from_fn_with_state(
                    RateLimitState::new(1, Duration::from_secs(60)),
                    enforce_rate_limit,
                )),
        );
        let call = |user_id: Uuid| {
            app.clone().oneshot(
                HttpRequest::get("/")
                    .header(header::AUTHORIZATION, bearer(user_id, "ana@example.com"))
                    .body(Body::empty())
                    .expect("request"),
            )
        };

        let ana = Uuid::new_v4();
        assert_eq!(call(ana).await.expect("response").status(), StatusCode::OK);
        assert_eq!(
            call(ana).await.expect("response").status(),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            call(Uuid::new_v4()).await.expect("response").status(),
            StatusCode::OK
        );
    }

    #[tokio::test]
    async fn expired_windows_are_pruned() {
        let limiter = RateLimitState::new(1, Duration::from_millis(20));
        assert!(limiter.admit(None).await);
        assert!(!limiter.admit(None).await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(limiter.admit(Some(Uuid::new_v4())).await);
        assert_eq!(limiter.windows.lock().await.len(), 1);
        assert!(limiter.admit(None).await);
    }

    #[tokio::test]
    async fn bearer_session_reaches_handler() {
        let state = test_state(
            lazy_pool(),
            test_config("http://127.0.0.1:1", "http://127.0.0.1:1"),
        );
        let user_id = Uuid::new_v4();
        let app = Router::new()
            .route(
                "/whoami",
                get(|axum::Extension(user): axum::Extension<AuthUser>| async move {
                    user.id.to_string()
                }),
            )
            .layer(axum::middleware::from_fn_with_state(state, require_session));

        let response = app
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(header::AUTHORIZATION, bearer(user_id, "ana@example.com"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(body, user_id.to_string().as_bytes());
    }
}
