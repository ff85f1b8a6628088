use axum::{
    extract::{Extension, State},
    Json,
};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Serialize;
use skuopt_core::{Plan, TRIAL_DAYS};

use super::{ApiResponse, AppState};
use crate::middleware::RequestId;

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Serialize)]
pub(super) struct PlanItem {
    id: Plan,
    monthly_credits: Option<i32>,
    unlimited: bool,
    monthly_price_usd: u32,
    tagline: &'static str,
    trial_days: i64,
}

impl From<Plan> for PlanItem {
    fn from(plan: Plan) -> Self {
        Self {
            id: plan,
            monthly_credits: plan.monthly_credits(),
            unlimited: plan.is_unlimited(),
            monthly_price_usd: plan.monthly_price_usd(),
            tagline: plan.tagline(),
            trial_days: TRIAL_DAYS,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ReferralLinks {
    whatsapp: String,
    linkedin: String,
    x: String,
}

#[derive(Debug, Serialize)]
pub(super) struct ReferralItem {
    app_url: String,
    message: String,
    links: ReferralLinks,
}

fn share_message(app_url: &str) -> String {
    format!(
        "Si vendes online, esto te puede interesar.\n\n\
         Estoy usando una herramienta que genera automáticamente fichas de producto \
         optimizadas para Google, para aparecer en IA como GPT y para marketplaces \
         como Mercado Libre.\n\n\
         Me ha ahorrado horas de trabajo.\n\n\
         👉 {app_url}"
    )
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, URI_COMPONENT).to_string()
}

fn referral_item(app_url: &str) -> ReferralItem {
    let message = share_message(app_url);
    let links = ReferralLinks {
        whatsapp: format!("https://wa.me/?text={}", encode(&message)),
        linkedin: format!(
            "https://www.linkedin.com/sharing/share-offsite/?url={}",
            encode(app_url)
        ),
        x: format!("https://twitter.com/intent/tweet?text={}", encode(&message)),
    };
    ReferralItem {
        app_url: app_url.to_owned(),
        message,
        links,
    }
}

pub(super) async fn list_plans(
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<PlanItem>>> {
    let plans = Plan::ALL.into_iter().map(PlanItem::from).collect();
    Json(ApiResponse::new(plans, req_id.0))
}

pub(super) async fn referral(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<ReferralItem>> {
    let item = referral_item(state.config.public_app_url.trim_end_matches('/'));
    Json(ApiResponse::new(item, req_id.0))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use super::*;
    use crate::api::test_support::{get, json_body, lazy_pool, test_config, test_state};
    use crate::api::{build_app, rate_limit_state};

    #[test]
    fn encodes_like_uri_component() {
        assert_eq!(encode("a b&c=d"), "a%20b%26c%3Dd");
        assert_eq!(encode("(ok)!*'~"), "(ok)!*'~");
        assert_eq!(encode("👉"), "%F0%9F%91%89");
    }

    #[test]
    fn referral_links_embed_the_message() {
        let item = referral_item("https://skuoptimizer.ai");
        assert!(item.message.ends_with("👉 https://skuoptimizer.ai"));
        assert!(item
            .links
            .whatsapp
            .starts_with("https://wa.me/?text=Si%20vendes%20online"));
        assert_eq!(
            item.links.linkedin,
            "https://www.linkedin.com/sharing/share-offsite/?url=https%3A%2F%2Fskuoptimizer.ai"
        );
        assert!(item.links.x.contains("%0A%0AMe%20ha%20ahorrado"));
    }

    #[tokio::test]
    async fn plans_endpoint_lists_catalog() {
        let state = test_state(
            lazy_pool(),
            test_config("http://127.0.0.1:1", "http://127.0.0.1:1"),
        );
        let rate_limit = rate_limit_state(&state.config);
        let response = build_app(state, rate_limit)
            .oneshot(get("/api/v1/plans"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        let plans = json["data"].as_array().expect("array");
        assert_eq!(plans.len(), 3);
        assert_eq!(plans[0]["id"], "lite");
        assert_eq!(plans[0]["monthly_credits"], 20);
        assert_eq!(plans[2]["unlimited"], true);
        assert!(plans[2]["monthly_credits"].is_null());
        assert_eq!(plans[1]["trial_days"], 8);
    }
}
