//! OpenAI-compatible chat completion client and the two model calls the
//! product uses: listing generation and attribute extraction.

mod client;
mod error;
mod pipeline;
mod retry;
mod types;

pub use client::ChatClient;
pub use error::LlmError;
pub use pipeline::{extract_attributes, generate_listing, ExtractionSource};
pub use types::{ChatMessage, ContentPart, ImageUrl, MessageContent, Role};
