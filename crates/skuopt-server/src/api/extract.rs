//! `POST /api/v1/extract`: product attributes from text, an image, or a PDF.

use axum::{
    extract::{rejection::JsonRejection, Extension, State},
    Json,
};
use serde::Deserialize;
use skuopt_core::{ExtractedAttributes, Extraction};
use skuopt_docs::DocsError;
use skuopt_llm::ExtractionSource;

use super::{ApiError, ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::middleware::RequestId;

const PDF_UNREADABLE: &str = "Error al leer el PDF. Asegúrate de que no esté corrupto.";
const PDF_EMPTY: &str = "El PDF no contiene texto legible.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(super) struct ExtractRequest {
    text: Option<String>,
    /// A `data:` URL holding an image or a PDF.
    image: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Picks what the model reads. PDF text wins over typed text, which wins
/// over an image. An unusable file only matters when there is no text.
fn source_for(request: ExtractRequest, req_id: &str) -> Result<ExtractionSource, ApiError> {
    let text = non_empty(request.text);
    let Some(image) = non_empty(request.image) else {
        return text
            .map(ExtractionSource::Text)
            .ok_or_else(|| ApiError::new(req_id, "validation_error", "Missing text or image"));
    };

    let data_url = skuopt_docs::parse_data_url(&image);
    if let Some(pdf) = data_url.as_ref().ok().filter(|url| url.is_pdf()) {
        return match skuopt_docs::pdf_text(&pdf.bytes) {
            Ok(pdf_text) => Ok(ExtractionSource::Text(pdf_text)),
            Err(DocsError::EmptyPdf) => Err(ApiError::new(req_id, "bad_request", PDF_EMPTY)),
            Err(e) => {
                tracing::warn!(error = %e, "extract: unreadable PDF");
                Err(ApiError::new(req_id, "bad_request", PDF_UNREADABLE))
            }
        };
    }

    if let Some(text) = text {
        return Ok(ExtractionSource::Text(text));
    }
    let data_url = data_url.map_err(|_| ApiError::new(req_id, "bad_request", "Invalid file"))?;
    if !data_url.is_image() {
        return Err(ApiError::new(
            req_id,
            "bad_request",
            "Only images and PDF files are supported",
        ));
    }
    Ok(ExtractionSource::Image(image))
}

pub(super) async fn extract(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(user): Extension<AuthUser>,
    body: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ExtractedAttributes>>, ApiError> {
    let Json(request) =
        body.map_err(|e| ApiError::new(req_id.0.clone(), "bad_request", e.body_text()))?;
    let source = source_for(request, &req_id.0)?;
    let kind = match &source {
        ExtractionSource::Text(_) => "text",
        ExtractionSource::Image(_) => "image",
    };

    let extraction = skuopt_llm::extract_attributes(&state.llm, source)
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user.id, error = %e, "attribute extraction failed");
            ApiError::new(
                req_id.0.clone(),
                "llm_error",
                "Error interno al procesar la solicitud.",
            )
        })?;

    match extraction {
        Extraction::Product(attributes) => {
            tracing::info!(user_id = %user.id, source = kind, "attributes extracted");
            Ok(Json(ApiResponse::new(attributes, req_id.0)))
        }
        Extraction::Rejected { reason } => {
            tracing::info!(user_id = %user.id, source = kind, "extraction rejected input");
            Err(ApiError::new(req_id.0, "bad_request", reason))
        }
    }
}
