//! Structured attributes pulled out of a label, spec sheet or description.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const DEFAULT_REJECTION: &str = "El archivo no parece ser un producto válido.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedAttributes {
    pub brand: Option<String>,
    pub model: Option<String>,
    pub presentation: Option<String>,
    pub material: Option<String>,
    pub main_use: Option<String>,
    pub benefits: Vec<String>,
    pub certification: Option<String>,
}

/// Outcome of an extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Product(ExtractedAttributes),
    Rejected { reason: String },
}

impl Extraction {
    /// Interprets the model's JSON verdict.
    ///
    /// Only an explicit `"isValidProduct": false` counts as a rejection.
    /// Fields of the wrong type are dropped instead of failing the request.
    #[must_use]
    pub fn from_model_output(value: &Value) -> Self {
        if value.get("isValidProduct").and_then(Value::as_bool) == Some(false) {
            let reason = value
                .get("rejectionReason")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DEFAULT_REJECTION)
                .to_string();
            return Extraction::Rejected { reason };
        }

        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
        };
        let benefits = match value.get("benefits") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
            _ => Vec::new(),
        };

        Extraction::Product(ExtractedAttributes {
            brand: text("brand"),
            model: text("model"),
            presentation: text("presentation"),
            material: text("material"),
            main_use: text("mainUse"),
            benefits,
            certification: text("certification"),
        })
    }
}
