mod account;
mod catalog;
mod extract;
mod generate;
mod generations;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use skuopt_core::AppConfig;
use skuopt_llm::ChatClient;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::auth::{routes as auth_routes, AuthProviderClient, SessionVerifier};
use crate::middleware::{
    enforce_rate_limit, page_guard, request_id, require_session, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    pub llm: ChatClient,
    pub sessions: SessionVerifier,
    pub provider: AuthProviderClient,
}

impl AppState {
    /// Wires the model and auth clients from configuration.
    ///
    /// # Errors
    ///
    /// Fails when an HTTP client cannot be built or a base URL is invalid.
    pub fn from_config(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<Self> {
        let llm = ChatClient::from_app_config(&config)?;
        let sessions = SessionVerifier::new(&config.supabase_jwt_secret);
        let provider = AuthProviderClient::new(&config.supabase_url, &config.supabase_anon_key)?;
        Ok(Self {
            pool,
            config,
            llm,
            sessions,
            provider,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(crate) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(crate) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "insufficient_credits" => StatusCode::FORBIDDEN,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> Option<i64> {
    limit.map(|l| l.clamp(1, 500))
}

pub(super) fn map_db_error(request_id: String, error: &skuopt_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
        .expose_headers([header::CONTENT_DISPOSITION])
}

fn protected_router(state: AppState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/me", get(account::me))
        .route("/api/v1/generate", post(generate::generate))
        .route("/api/v1/extract", post(extract::extract))
        .route("/api/v1/generations", get(generations::list_generations))
        .route("/api/v1/generations/{id}", get(generations::get_generation))
        .route(
            "/api/v1/generations/{id}/pdf",
            get(generations::download_generation_pdf),
        )
        .route(
            "/api/v1/exports/generations.csv",
            get(generations::export_generations_csv),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(state, require_session))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
}

pub fn build_app(state: AppState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/plans", get(catalog::list_plans))
        .route("/api/v1/referral", get(catalog::referral));

    let auth = Router::new()
        .route("/auth/callback", get(auth_routes::callback))
        .route("/auth/signout", post(auth_routes::signout));

    let mut router = Router::new()
        .merge(public_routes)
        .merge(auth)
        .merge(protected_router(state.clone(), rate_limit));

    router = match &state.config.static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router.fallback(not_found),
    };

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id))
                .layer(DefaultBodyLimit::max(state.config.max_body_bytes))
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    page_guard,
                )),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match skuopt_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

async fn not_found(Extension(req_id): Extension<RequestId>) -> ApiError {
    ApiError::new(req_id.0, "not_found", "no route matches this path")
}

pub fn rate_limit_state(config: &AppConfig) -> RateLimitState {
    RateLimitState::new(config.rate_limit_per_minute, Duration::from_secs(60))
}


#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    use uuid::Uuid;

    use super::test_support::{bearer, get, json_body, lazy_pool, test_config, test_state};
    use super::*;

    fn app() -> Router {
        let state = test_state(
            lazy_pool(),
            test_config("http://127.0.0.1:1", "http://127.0.0.1:1"),
        );
        let rate_limit = rate_limit_state(&state.config);
        build_app(state, rate_limit)
    }

    #[test]
    fn normalize_limit_bounds_explicit_values() {
        assert_eq!(normalize_limit(None), None);
        assert_eq!(normalize_limit(Some(0)), Some(1));
        assert_eq!(normalize_limit(Some(10_000)), Some(500));
        assert_eq!(normalize_limit(Some(25)), Some(25));
    }

    #[test]
    fn api_error_codes_map_to_statuses() {
        let status = |code: &str| ApiError::new("req-1", code, "x").into_response().status();
        assert_eq!(status("validation_error"), StatusCode::BAD_REQUEST);
        assert_eq!(status("unauthorized"), StatusCode::UNAUTHORIZED);
        assert_eq!(status("insufficient_credits"), StatusCode::FORBIDDEN);
        assert_eq!(status("not_found"), StatusCode::NOT_FOUND);
        assert_eq!(status("rate_limited"), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(status("llm_error"), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn protected_routes_require_a_session() {
        let response = app()
            .oneshot(get("/api/v1/generations"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key("x-request-id"));
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
    }

    fn empty_extract(user_id: Uuid) -> Request<Body> {
        Request::post("/api/v1/extract")
            .header(header::AUTHORIZATION, bearer(user_id, "ana@example.com"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .expect("request")
    }

    #[tokio::test]
    async fn rate_limit_budget_is_per_user() {
        let mut config = test_config("http://127.0.0.1:1", "http://127.0.0.1:1");
        config.rate_limit_per_minute = 3;
        let state = test_state(lazy_pool(), config);
        let rate_limit = rate_limit_state(&state.config);
        let app = build_app(state, rate_limit);

        for _ in 0..3 {
            let anonymous = app
                .clone()
                .oneshot(get("/api/v1/me"))
                .await
                .expect("response");
            assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);
        }

        let ana = Uuid::new_v4();
        for _ in 0..3 {
            let response = app
                .clone()
                .oneshot(empty_extract(ana))
                .await
                .expect("response");
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
        let limited = app
            .clone()
            .oneshot(empty_extract(ana))
            .await
            .expect("response");
        assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
        let json = json_body(limited).await;
        assert_eq!(json["error"]["code"], "rate_limited");

        let other = app
            .oneshot(empty_extract(Uuid::new_v4()))
            .await
            .expect("response");
        assert_eq!(other.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn request_id_is_echoed() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/api/v1/plans")
                    .header("x-request-id", "req-abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-request-id"], "req-abc");
        let json = json_body(response).await;
        assert_eq!(json["meta"]["request_id"], "req-abc");
    }

    #[tokio::test]
    async fn unknown_api_path_is_not_found() {
        let response = app()
            .oneshot(get("/api/v1/nope"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn health_reports_database_ok(pool: sqlx::PgPool) {
        let state = test_state(pool, test_config("http://127.0.0.1:1", "http://127.0.0.1:1"));
        let rate_limit = rate_limit_state(&state.config);
        let response = build_app(state, rate_limit)
            .oneshot(get("/api/v1/health"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["database"], "ok");
    }
}
