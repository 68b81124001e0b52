use thiserror::Error;

/// Errors returned by the Gemini client.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status or an `{"error": ...}` body.
    #[error("Gemini API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// The response envelope could not be deserialized.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The model's text was valid JSON of the wrong shape.
    #[error("unexpected payload for {context}: {reason}")]
    UnexpectedPayload { context: String, reason: String },

    /// Neither JSON parsing nor the pattern fallback found any pincode.
    #[error("no parseable pincodes in model response")]
    UnparseablePincodes,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
