//! `POST /api/v1/generate`: the credit-gated listing pipeline.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde::Serialize;
use skuopt_core::{is_exempt_email, Listing, ProductInput};
use skuopt_db::{generations::NewGeneration, DbError};

use super::{map_db_error, ApiError, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::middleware::RequestId;

const INSUFFICIENT_CREDITS: &str = "Insufficient credits. Please upgrade your plan.";

#[derive(Debug, Serialize)]
pub(super) struct GenerationItem {
    generation_id: i64,
    /// `None` for exempt users and unlimited plans.
    credits_remaining: Option<i32>,
    listing: Listing,
}

pub(super) async fn generate(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<ProductInput>, JsonRejection>,
) -> Result<Json<ApiResponse<GenerationItem>>, ApiError> {
    let Json(input) = body.map_err(|e| {
        ApiError::new(req_id.0.clone(), "bad_request", e.body_text())
    })?;
    let input = input
        .validate()
        .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e.to_string()))?;

    let profile = skuopt_db::profiles::get_profile(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "Profile not found"))?;

    let email = user.email.as_deref().or(profile.email.as_deref());
    let exempt = is_exempt_email(email, &state.config.exempt_email_domains);
    let charge = !exempt && !profile.plan().is_unlimited();

    if charge && profile.credits <= 0 {
        return Err(ApiError::new(
            req_id.0,
            "insufficient_credits",
            INSUFFICIENT_CREDITS,
        ));
    }

    let listing = skuopt_llm::generate_listing(&state.llm, &input)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "listing generation failed");
            match e {
                skuopt_llm::LlmError::InvalidListing(_) => ApiError::new(
                    req_id.0.clone(),
                    "invalid_listing",
                    "Generated content was not a valid listing",
                ),
                _ => ApiError::new(req_id.0.clone(), "llm_error", "Failed to generate content"),
            }
        })?;

    let content = serde_json::to_value(&listing).map_err(|e| {
        tracing::error!(error = %e, "listing serialization failed");
        ApiError::new(req_id.0.clone(), "internal_error", "Failed to save generation")
    })?;
    let settings = input.settings();
    let generation = NewGeneration {
        product_name: &input.product_name,
        content: &content,
        settings: &settings,
        // A zero score means the model gave none.
        score_ia: listing.score.filter(|score| *score > 0).map(i16::from),
    };

    let recorded = skuopt_db::generations::record_generation(&state.pool, user.id, &generation, charge)
        .await
        .map_err(|e| match e {
            DbError::InsufficientCredits => {
                ApiError::new(req_id.0.clone(), "insufficient_credits", INSUFFICIENT_CREDITS)
            }
            other => map_db_error(req_id.0.clone(), &other),
        })?;

    tracing::info!(
        user_id = %user.id,
        generation_id = recorded.row.id,
        charged = charge,
        credits_remaining = ?recorded.credits_remaining,
        "listing generated"
    );

    let item = GenerationItem {
        generation_id: recorded.row.id,
        credits_remaining: recorded.credits_remaining,
        listing,
    };
    Ok(Json(ApiResponse::new(item, req_id.0)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use serde_json::{json, Value};
    use skuopt_core::Plan;
    use tower::ServiceExt;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::test_support::{bearer, completion, json_body, test_config, test_state};
    use crate::api::{build_app, rate_limit_state};

    fn body() -> Value {
        json!({
            "productName": "Botella Hydra",
            "features": "Acero inoxidable, 750ml",
            "category": "Hogar",
            "channel": "marketplace",
            "tone": "profesional"
        })
    }

    async fn llm_returning(listing: &Value) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion(listing)))
            .mount(&server)
            .await;
        server
    }

    async fn post_generate(
        pool: sqlx::PgPool,
        llm_url: &str,
        user_id: Uuid,
        email: &str,
        body: &Value,
    ) -> Response {
        let state = test_state(pool, test_config(llm_url, "http://127.0.0.1:1"));
        let rate_limit = rate_limit_state(&state.config);
        build_app(state, rate_limit)
            .oneshot(
                Request::post("/api/v1/generate")
                    .header(header::AUTHORIZATION, bearer(user_id, email))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    async fn history_len(pool: &sqlx::PgPool, user_id: Uuid) -> usize {
        skuopt_db::generations::list_generations(pool, user_id, None)
            .await
            .unwrap()
            .len()
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn generation_charges_one_credit(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("ana@example.com"))
            .await
            .unwrap();
        let llm = llm_returning(&json!({"seoTitle": "Botella Térmica Hydra", "score": 92})).await;

        let response = post_generate(pool.clone(), &llm.uri(), user_id, "ana@example.com", &body()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["data"]["credits_remaining"], 19);
        assert_eq!(json["data"]["listing"]["seoTitle"], "Botella Térmica Hydra");
        assert_eq!(json["data"]["listing"]["score"], 92);

        let rows = skuopt_db::generations::list_generations(&pool, user_id, None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].score_ia, Some(92));
        assert_eq!(rows[0].settings["channel"], "marketplace");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn zero_score_is_stored_as_missing(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("ana@example.com"))
            .await
            .unwrap();
        let llm = llm_returning(&json!({"seoTitle": "Botella", "score": 0})).await;

        let response = post_generate(pool.clone(), &llm.uri(), user_id, "ana@example.com", &body()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let rows = skuopt_db::generations::list_generations(&pool, user_id, None)
            .await
            .unwrap();
        assert_eq!(rows[0].score_ia, None);
        let record = rows[0].clone().into_record();
        assert_eq!(record.displayed_score(), None);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_fields_are_rejected_before_profile_lookup(pool: sqlx::PgPool) {
        let response = post_generate(
            pool,
            "http://127.0.0.1:1",
            Uuid::new_v4(),
            "ana@example.com",
            &json!({"productName": "Botella"}),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = json_body(response).await;
        assert_eq!(json["error"]["message"], "Missing required fields");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn missing_profile_is_not_found(pool: sqlx::PgPool) {
        let response =
            post_generate(pool, "http://127.0.0.1:1", Uuid::new_v4(), "ana@example.com", &body()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = json_body(response).await;
        assert_eq!(json["error"]["message"], "Profile not found");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn empty_balance_is_forbidden_without_calling_model(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("ana@example.com"))
            .await
            .unwrap();
        skuopt_db::profiles::grant_credits(&pool, user_id, -20)
            .await
            .unwrap();

        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&llm)
            .await;

        let response = post_generate(pool.clone(), &llm.uri(), user_id, "ana@example.com", &body()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let json = json_body(response).await;
        assert_eq!(
            json["error"]["message"],
            "Insufficient credits. Please upgrade your plan."
        );
        assert_eq!(history_len(&pool, user_id).await, 0);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn exempt_users_are_not_charged(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("staff@uhuragroup.com"))
            .await
            .unwrap();
        skuopt_db::profiles::grant_credits(&pool, user_id, -20)
            .await
            .unwrap();
        let llm = llm_returning(&json!({"seoTitle": "Botella"})).await;

        let response =
            post_generate(pool.clone(), &llm.uri(), user_id, "staff@uhuragroup.com", &body()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert!(json["data"]["credits_remaining"].is_null());

        let profile = skuopt_db::profiles::get_profile(&pool, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.credits, 0);
        assert_eq!(history_len(&pool, user_id).await, 1);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn unlimited_plan_is_not_charged(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("ana@example.com"))
            .await
            .unwrap();
        skuopt_db::profiles::set_plan(&pool, user_id, Plan::Enterprise)
            .await
            .unwrap();
        let llm = llm_returning(&json!({"seoTitle": "Botella"})).await;

        let response = post_generate(pool, &llm.uri(), user_id, "ana@example.com", &body()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn model_failure_keeps_the_credit(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("ana@example.com"))
            .await
            .unwrap();
        let llm = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": {"message": "bad"}})))
            .mount(&llm)
            .await;

        let response = post_generate(pool.clone(), &llm.uri(), user_id, "ana@example.com", &body()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = json_body(response).await;
        assert_eq!(json["error"]["message"], "Failed to generate content");

        let profile = skuopt_db::profiles::get_profile(&pool, user_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(profile.credits, 20);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn listing_without_title_is_a_server_error(pool: sqlx::PgPool) {
        let user_id = Uuid::new_v4();
        skuopt_db::profiles::ensure_profile(&pool, user_id, Some("ana@example.com"))
            .await
            .unwrap();
        let llm = llm_returning(&json!({"shortDescription": "sin título"})).await;

        let response = post_generate(pool.clone(), &llm.uri(), user_id, "ana@example.com", &body()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(history_len(&pool, user_id).await, 0);
    }
}
