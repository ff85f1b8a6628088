//! The product listing produced by the model, plus helpers for reading
//! listings back out of stored generation content.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::CoreError;

const MAX_VISUAL_PACK_ITEMS: usize = 5;
const MAX_BENEFIT_BULLETS: usize = 3;
const MAX_TRUST_SEALS: usize = 4;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    #[serde(default, alias = "question")]
    pub q: String,
    #[serde(default, alias = "answer")]
    pub a: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualCopy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headline: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subheadline: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seals: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualPackItem {
    #[serde(default)]
    pub id: u8,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub visual: String,
    #[serde(default)]
    pub copy: VisualCopy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Listing {
    pub seo_title: String,
    pub short_description: String,
    pub long_description: String,
    pub bullets: Vec<String>,
    pub aeo_snippet: String,
    pub meta_description: String,
    pub faq: Vec<FaqEntry>,
    pub ai_recommendation: String,
    pub score: Option<u8>,
    pub image_alt: Vec<String>,
    pub visual_pack: Vec<VisualPackItem>,
    pub input_recommendations: Vec<String>,
}

impl Listing {
    /// Validates and normalizes the JSON object returned by the model.
    ///
    /// `null` fields fall back to their defaults, the readiness score is
    /// clamped to `0..=100`, and the visual pack is cut down to the five
    /// images (three benefit bullets, four seals) the layout has room for.
    ///
    /// # Errors
    ///
    /// - [`CoreError::NotAnObject`] if `value` is not a JSON object.
    /// - [`CoreError::MalformedListing`] if a field has the wrong shape.
    /// - [`CoreError::MissingSeoTitle`] if `seoTitle` is absent or blank.
    pub fn from_model_output(value: Value) -> Result<Self, CoreError> {
        let Value::Object(mut obj) = value else {
            return Err(CoreError::NotAnObject);
        };
        obj.retain(|_, v| !v.is_null());
        let score = obj.remove("score").and_then(|v| parse_score(&v));

        let mut listing: Listing =
            serde_json::from_value(Value::Object(obj)).map_err(CoreError::MalformedListing)?;

        if listing.seo_title.trim().is_empty() {
            return Err(CoreError::MissingSeoTitle);
        }

        listing.score = score;
        listing.visual_pack.truncate(MAX_VISUAL_PACK_ITEMS);
        for item in &mut listing.visual_pack {
            item.copy.bullets.truncate(MAX_BENEFIT_BULLETS);
            item.copy.seals.truncate(MAX_TRUST_SEALS);
        }

        Ok(listing)
    }
}

/// Accepts integer, float or numeric-string scores; anything else is dropped.
fn parse_score(value: &Value) -> Option<u8> {
    let raw = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    if !raw.is_finite() {
        return None;
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let clamped = raw.round().clamp(0.0, 100.0) as u8;
    Some(clamped)
}

/// Snake-case keys written by older releases and their current names.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("seo_title", "seoTitle"),
    ("short_description", "shortDescription"),
    ("long_description", "longDescription"),
    ("bullet_points", "bullets"),
    ("image_alt", "imageAlt"),
    ("meta_description", "metaDescription"),
    ("aeo_snippet", "aeoSnippet"),
    ("ai_recommendation", "aiRecommendation"),
    ("score_ia", "score"),
];

/// Copies legacy snake-case fields onto their camelCase names when the
/// camelCase field is missing or empty. Non-object content becomes `{}`.
#[must_use]
pub fn normalize_content(content: &Value) -> Value {
    let Value::Object(obj) = content else {
        return Value::Object(Map::new());
    };
    let mut normalized = obj.clone();
    for (legacy, current) in LEGACY_KEYS {
        let Some(value) = obj.get(*legacy).filter(|v| is_present(v)) else {
            continue;
        };
        if !obj.get(*current).is_some_and(is_present) {
            normalized.insert((*current).to_string(), value.clone());
        }
    }
    Value::Object(normalized)
}

/// Mirrors the falsy check used when rendering stored content: null, empty
/// strings, zero and `false` count as absent.
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplaySection {
    pub key: &'static str,
    pub label: &'static str,
}

/// Section order used by every export format.
pub const DISPLAY_SECTIONS: [DisplaySection; 10] = [
    DisplaySection { key: "seoTitle", label: "Título SEO" },
    DisplaySection { key: "shortDescription", label: "Descripción Corta" },
    DisplaySection { key: "longDescription", label: "Descripción Larga" },
    DisplaySection { key: "bullets", label: "Bullet Points" },
    DisplaySection { key: "faq", label: "Preguntas Frecuentes (FAQ)" },
    DisplaySection { key: "imageAlt", label: "Alt Text de Imágenes" },
    DisplaySection { key: "metaDescription", label: "Meta Descripción" },
    DisplaySection { key: "aeoSnippet", label: "Snippet AEO / GEO" },
    DisplaySection { key: "aiRecommendation", label: "Recomendación de IA" },
    DisplaySection { key: "score", label: "Score" },
];

/// A display section's value, shaped for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionValue {
    Text(String),
    List(Vec<String>),
    Faq(Vec<FaqEntry>),
    Object(Value),
}

/// Reads one section out of normalized content. Absent values yield `None`.
#[must_use]
pub fn section_value(content: &Value, key: &str) -> Option<SectionValue> {
    let value = content.get(key).filter(|v| is_present(v))?;
    let section = match value {
        Value::Array(items) if key == "faq" => SectionValue::Faq(
            items
                .iter()
                .map(|item| serde_json::from_value(item.clone()).unwrap_or_default())
                .collect(),
        ),
        Value::Array(items) => SectionValue::List(items.iter().map(value_to_text).collect()),
        Value::Object(_) => SectionValue::Object(value.clone()),
        other => SectionValue::Text(value_to_text(other)),
    };
    Some(section)
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
