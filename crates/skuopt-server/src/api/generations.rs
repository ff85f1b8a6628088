use axum::{
    extract::{rejection::PathRejection, Extension, Path, Query, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use skuopt_core::{GenerationRecord, GenerationSettings, ScoreBand};

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct GenerationsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct GenerationItem {
    id: i64,
    product_name: String,
    created_at: DateTime<Utc>,
    settings: GenerationSettings,
    content: Value,
    score: Option<f64>,
    score_band: Option<ScoreBand>,
}

impl From<GenerationRecord> for GenerationItem {
    fn from(record: GenerationRecord) -> Self {
        let score = record.displayed_score();
        Self {
            content: record.normalized_content(),
            score,
            score_band: ScoreBand::from_score(score),
            id: record.id,
            product_name: record.product_name,
            created_at: record.created_at,
            settings: record.settings,
        }
    }
}

/// `attachment` disposition with an ASCII fallback and the UTF-8 name.
fn attachment(filename: &str) -> HeaderValue {
    let ascii: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_graphic() && c != '"' && c != '\\' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let encoded = utf8_percent_encode(filename, NON_ALPHANUMERIC);
    HeaderValue::from_str(&format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}"
    ))
    .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn download(content_type: &'static str, filename: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static(content_type)),
            (header::CONTENT_DISPOSITION, attachment(filename)),
        ],
        bytes,
    )
        .into_response()
}

fn generation_id(req_id: &str, id: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    id.map(|Path(id)| id)
        .map_err(|e| ApiError::new(req_id, "bad_request", e.body_text()))
}

async fn load_generation(
    state: &AppState,
    req_id: &str,
    user: &AuthUser,
    id: i64,
) -> Result<GenerationRecord, ApiError> {
    skuopt_db::generations::get_generation(&state.pool, user.id, id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .map(skuopt_db::GenerationRow::into_record)
        .ok_or_else(|| ApiError::new(req_id, "not_found", format!("generation {id} not found")))
}

pub(super) async fn list_generations(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    Query(params): Query<GenerationsQuery>,
) -> Result<Json<ApiResponse<Vec<GenerationItem>>>, ApiError> {
    let rows = skuopt_db::generations::list_generations(
        &state.pool,
        user.id,
        normalize_limit(params.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let items = rows
        .into_iter()
        .map(|row| GenerationItem::from(row.into_record()))
        .collect();
    Ok(Json(ApiResponse::new(items, req_id.0)))
}

pub(super) async fn get_generation(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<ApiResponse<GenerationItem>>, ApiError> {
    let id = generation_id(&req_id.0, id)?;
    let record = load_generation(&state, &req_id.0, &user, id).await?;
    Ok(Json(ApiResponse::new(GenerationItem::from(record), req_id.0)))
}

pub(super) async fn download_generation_pdf(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Response, ApiError> {
    let id = generation_id(&req_id.0, id)?;
    let record = load_generation(&state, &req_id.0, &user, id).await?;
    let bytes = skuopt_docs::render_listing_pdf(&record).map_err(|e| {
        tracing::error!(generation_id = id, error = %e, "pdf render failed");
        ApiError::new(req_id.0.clone(), "internal_error", "failed to render PDF")
    })?;

    let filename = skuopt_docs::listing_pdf_filename(&record.product_name);
    Ok(download("application/pdf", &filename, bytes))
}

pub(super) async fn export_generations_csv(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, ApiError> {
    let records: Vec<GenerationRecord> =
        skuopt_db::generations::list_generations(&state.pool, user.id, None)
            .await
            .map_err(|e| map_db_error(req_id.0.clone(), &e))?
            .into_iter()
            .map(skuopt_db::GenerationRow::into_record)
            .collect();

    let bytes = skuopt_docs::history_csv(&records).map_err(|e| {
        tracing::error!(error = %e, "csv export failed");
        ApiError::new(req_id.0.clone(), "internal_error", "failed to export history")
    })?;

    tracing::info!(user_id = %user.id, rows = records.len(), "history exported");
    Ok(download(
        "text/csv; charset=utf-8",
        skuopt_docs::HISTORY_CSV_FILENAME,
        bytes,
    ))
}
