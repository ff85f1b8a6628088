use axum::{
    extract::{Extension, State},
    Json,
};
use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use skuopt_core::{is_exempt_email, Plan};
use uuid::Uuid;

use super::{map_db_error, ApiError, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::middleware::RequestId;

#[derive(Debug, Serialize)]
pub(super) struct AccountItem {
    user_id: Uuid,
    email: Option<String>,
    plan: Plan,
    credits: i32,
    unlimited: bool,
    exempt: bool,
    in_trial: bool,
    trial_ends_at: Option<DateTime<Utc>>,
    generations_this_month: i64,
}

/// Midnight UTC on the first day of `now`'s month.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map_or(now, |d| d.and_utc())
}

pub(super) async fn me(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ApiResponse<AccountItem>>, ApiError> {
    let profile = skuopt_db::profiles::get_profile(&state.pool, user.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "Profile not found"))?;

    let now = Utc::now();
    let generations_this_month =
        skuopt_db::generations::count_generations_since(&state.pool, user.id, month_start(now))
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let email = profile.email.clone().or(user.email);
    let plan = profile.plan();
    let item = AccountItem {
        user_id: profile.id,
        exempt: is_exempt_email(email.as_deref(), &state.config.exempt_email_domains),
        email,
        plan,
        credits: profile.credits,
        unlimited: plan.is_unlimited(),
        in_trial: profile.in_trial(now),
        trial_ends_at: profile.trial_ends_at,
        generations_this_month,
    };

    Ok(Json(ApiResponse::new(item, req_id.0)))
}
