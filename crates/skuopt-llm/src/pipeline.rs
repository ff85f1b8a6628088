//! The two model calls behind the product: listing generation and
//! attribute extraction.

use skuopt_core::prompts::{
    build_extraction_text_prompt, build_generation_prompt, EXTRACTION_IMAGE_INSTRUCTION,
    EXTRACTION_SYSTEM_PROMPT, GENERATION_SYSTEM_PROMPT,
};
use skuopt_core::{Extraction, Listing, ProductInput};

use crate::client::ChatClient;
use crate::error::LlmError;
use crate::types::{ChatMessage, ContentPart, ImageUrl};

/// What the extractor reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Free text, including text already pulled out of a PDF.
    Text(String),
    /// A `data:` URL holding the image.
    Image(String),
}

/// Generates a marketplace-ready listing for `input`.
///
/// # Errors
///
/// Propagates [`ChatClient::complete_json`] errors, and returns
/// [`LlmError::InvalidListing`] when the completion lacks a title.
pub async fn generate_listing(
    client: &ChatClient,
    input: &ProductInput,
) -> Result<Listing, LlmError> {
    let messages = [
        ChatMessage::system(GENERATION_SYSTEM_PROMPT),
        ChatMessage::user(build_generation_prompt(input)),
    ];

    let value = client.complete_json(&messages).await?;
    let listing = Listing::from_model_output(value)?;
    tracing::debug!(
        product = %input.product_name,
        score = ?listing.score,
        "listing generated"
    );
    Ok(listing)
}

/// Extracts product attributes from text or an image.
///
/// # Errors
///
/// Propagates [`ChatClient::complete_json`] errors.
pub async fn extract_attributes(
    client: &ChatClient,
    source: ExtractionSource,
) -> Result<Extraction, LlmError> {
    let user = match source {
        ExtractionSource::Text(text) => ChatMessage::user(build_extraction_text_prompt(&text)),
        ExtractionSource::Image(url) => ChatMessage::user_parts(vec![
            ContentPart::Text {
                text: EXTRACTION_IMAGE_INSTRUCTION.to_owned(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl { url },
            },
        ]),
    };
    let messages = [ChatMessage::system(EXTRACTION_SYSTEM_PROMPT), user];

    let value = client.complete_json(&messages).await?;
    Ok(Extraction::from_model_output(&value))
}
