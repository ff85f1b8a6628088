//! Stored generations as seen by history views and exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::listing::normalize_content;

/// Input settings persisted with each generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

/// One stored generation, independent of the storage layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRecord {
    pub id: i64,
    pub product_name: String,
    pub created_at: DateTime<Utc>,
    pub settings: GenerationSettings,
    pub content: Value,
    pub score_ia: Option<i16>,
}

impl GenerationRecord {
    /// Content with legacy keys mapped onto current names.
    #[must_use]
    pub fn normalized_content(&self) -> Value {
        normalize_content(&self.content)
    }

    /// The stored score, falling back to the score inside the content.
    #[must_use]
    pub fn displayed_score(&self) -> Option<f64> {
        if let Some(score) = self.score_ia {
            return Some(f64::from(score));
        }
        self.normalized_content()
            .get("score")
            .and_then(Value::as_f64)
            .filter(|s| *s != 0.0)
    }
}

/// Coarse quality band shown next to a readiness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    #[must_use]
    pub fn from_score(score: Option<f64>) -> Option<Self> {
        let score = score?;
        Some(if score >= 90.0 {
            ScoreBand::High
        } else if score >= 75.0 {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        })
    }
}
