//! End-to-end checks across the document helpers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde_json::json;
use skuopt_core::{GenerationRecord, GenerationSettings};
use skuopt_docs::{parse_data_url, pdf_text, render_listing_pdf, DocsError};

fn record() -> GenerationRecord {
    GenerationRecord {
        id: 12,
        product_name: "Botella Hydra".to_string(),
        created_at: Utc::now(),
        settings: GenerationSettings::default(),
        content: json!({
            "seoTitle": "Botella Hydra 750ml",
            "shortDescription": "Mantiene el frio 24 horas."
        }),
        score_ia: None,
    }
}

#[test]
fn rendered_sheet_text_can_be_read_back() {
    let pdf = render_listing_pdf(&record()).expect("render should succeed");

    let text = pdf_text(&pdf).expect("text extraction should succeed");
    assert!(text.contains("Botella Hydra"), "extracted: {text}");
    assert!(text.contains("Mantiene el frio"), "extracted: {text}");
}

#[test]
fn uploaded_pdf_data_url_round_trips() {
    let pdf = render_listing_pdf(&record()).expect("render should succeed");
    let url = format!("data:application/pdf;base64,{}", STANDARD.encode(&pdf));

    let decoded = parse_data_url(&url).expect("data URL should parse");
    assert!(decoded.is_pdf());
    assert_eq!(decoded.bytes, pdf);
}

#[test]
fn non_pdf_bytes_are_rejected() {
    let err = pdf_text(b"%PDF-1.4 truncated").unwrap_err();
    assert!(matches!(err, DocsError::Pdf(_)));
}
