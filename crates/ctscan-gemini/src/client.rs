//! HTTP client for the Gemini `generateContent` endpoint.
//!
//! Wraps `reqwest` with API-key handling, error-envelope detection, and the
//! two discovery queries. No retries are attempted: callers decide what a
//! failed query means for their pipeline.

use std::time::Duration;

use ctscan_core::{AppConfig, LocationCoords, ScanCenter};
use reqwest::{Client, Url};

use crate::error::GeminiError;
use crate::parse::{parse_centers, parse_pincodes};
use crate::prompts::{centers_request, pincode_request};
use crate::types::{
    ApiErrorBody, ApiErrorEnvelope, GenerateContentRequest, GenerateContentResponse,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for the Gemini REST API.
///
/// Use [`GeminiClient::new`] for production or [`GeminiClient::with_base_url`]
/// to point at a mock server in tests.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: Url,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("api_key", &"[redacted]")
            .field("model", &self.model)
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Creates a client pointed at the production Gemini API.
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, GeminiError> {
        Self::with_base_url(api_key, model, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client from the application configuration.
    ///
    /// # Errors
    ///
    /// See [`GeminiClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, GeminiError> {
        Self::with_base_url(
            &config.gemini_api_key,
            &config.gemini_model,
            config.request_timeout_secs,
            &config.user_agent,
            &config.gemini_base_url,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`GeminiError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeminiError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, GeminiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeminiError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            model: model.to_owned(),
            base_url,
        })
    }

    /// Ask for every pincode of `city`.
    ///
    /// # Errors
    ///
    /// - [`GeminiError::UnparseablePincodes`] if the answer holds no codes
    ///   in any readable form.
    /// - Any transport or API error from [`GeminiClient::generate_text`].
    pub async fn find_pincodes(&self, city: &str) -> Result<Vec<String>, GeminiError> {
        let text = self.generate_text(&pincode_request(city)).await?;
        let pincodes = parse_pincodes(&text)?;
        tracing::debug!(city, count = pincodes.len(), "resolved pincodes");
        Ok(pincodes)
    }

    /// Ask for CT-scan centers in `pincode`, optionally biased to `location`.
    ///
    /// # Errors
    ///
    /// Any transport or API error, or a payload that is not a JSON array.
    pub async fn find_scan_centers(
        &self,
        pincode: &str,
        city: &str,
        location: Option<LocationCoords>,
    ) -> Result<Vec<ScanCenter>, GeminiError> {
        let text = self
            .generate_text(&centers_request(pincode, city, location))
            .await?;
        let centers = parse_centers(&text, &format!("centers(pincode={pincode})"))?;
        tracing::debug!(city, pincode, count = centers.len(), "found scan centers");
        Ok(centers)
    }

    /// Sends one `generateContent` call and returns the first candidate's text.
    ///
    /// # Errors
    ///
    /// - [`GeminiError::Http`] on network failure.
    /// - [`GeminiError::Api`] on a non-2xx status or an error envelope.
    /// - [`GeminiError::Deserialize`] if the body is not a response envelope.
    pub async fn generate_text(
        &self,
        request: &GenerateContentRequest,
    ) -> Result<String, GeminiError> {
        let url = self.generate_url()?;
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let envelope = Self::api_error(&body);

        if !status.is_success() {
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message: envelope
                    .as_ref()
                    .map(ApiErrorBody::describe)
                    .unwrap_or_else(|| format!("unexpected HTTP status {status}")),
            });
        }

        // An error envelope can arrive with a 2xx status.
        if let Some(err) = envelope {
            return Err(GeminiError::Api {
                status: err.status_code().unwrap_or(status.as_u16()),
                message: err.describe(),
            });
        }

        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| GeminiError::Deserialize {
                context: format!("generateContent(model={})", self.model),
                source: e,
            })?;

        if parsed.candidates.is_empty() {
            tracing::warn!(model = %self.model, "generateContent returned no candidates");
        }

        let text = parsed.text();
        if text.is_empty() {
            if let Some(reason) = parsed.finish_reason() {
                tracing::warn!(model = %self.model, finish_reason = reason, "candidate has no text");
            }
        }
        Ok(text)
    }

    /// `{base}/v1beta/models/{model}:generateContent`.
    fn generate_url(&self) -> Result<Url, GeminiError> {
        let path = format!("v1beta/models/{}:generateContent", self.model);
        self.base_url
            .join(&path)
            .map_err(|e| GeminiError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })
    }

    /// Parses `body` as an error envelope, if it is one.
    fn api_error(body: &str) -> Option<ApiErrorBody> {
        serde_json::from_str::<ApiErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.error)
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
