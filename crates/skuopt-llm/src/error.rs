use thiserror::Error;

/// Errors returned by the chat completion client.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-2xx status.
    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The first choice carried no content.
    #[error("model returned an empty completion")]
    EmptyCompletion,

    /// A response body or completion could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// The completion parsed as JSON but is not a usable listing.
    #[error("unusable listing: {0}")]
    InvalidListing(#[from] skuopt_core::CoreError),
}
