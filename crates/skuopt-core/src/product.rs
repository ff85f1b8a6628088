//! Product attributes submitted for listing generation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::history::GenerationSettings;
use crate::CoreError;

/// Sales channel the listing is written for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    #[default]
    Ecommerce,
    Marketplace,
}

impl Channel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Ecommerce => "ecommerce",
            Channel::Marketplace => "marketplace",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body of the generation endpoint.
///
/// Only `product_name` and `features` are required; the structured fields
/// feed the prompt and are reported as "not specified" when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    pub product_name: String,
    #[serde(default)]
    pub features: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub channel: Channel,
    #[serde(default)]
    pub tone: String,
    #[serde(rename = "type", default)]
    pub product_type: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub presentation: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub main_use: Option<String>,
    #[serde(default)]
    pub benefits: Vec<String>,
    #[serde(default)]
    pub certification: Option<String>,
}

impl ProductInput {
    /// Checks the required fields and trims the product name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::MissingRequiredFields`] when `productName` or
    /// `features` is blank.
    pub fn validate(mut self) -> Result<Self, CoreError> {
        self.product_name = self.product_name.trim().to_string();
        if self.product_name.is_empty() || self.features.trim().is_empty() {
            return Err(CoreError::MissingRequiredFields);
        }
        self.benefits.retain(|b| !b.trim().is_empty());
        Ok(self)
    }

    /// Settings stored alongside the generation record.
    #[must_use]
    pub fn settings(&self) -> GenerationSettings {
        GenerationSettings {
            category: self.category.clone(),
            channel: Some(self.channel.as_str().to_string()),
            tone: Some(self.tone.clone()),
        }
    }
}
