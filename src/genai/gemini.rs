//! Gemini `generateContent` client.
//!
//! Thin HTTP wrapper around `POST {base}/models/{model}:generateContent`.
//! Pure parsing in `parse_response` for testability.

use std::time::Duration;

use super::config::GenTimeouts;
use super::types::{GenError, GenerateRequest, GenerateResponse, ImageModel};

const API_KEY_HEADER: &str = "x-goog-api-key";

// =============================================================================
// CLIENT
// =============================================================================

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`GenError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(api_key: String, base_url: String, timeouts: GenTimeouts) -> Result<Self, GenError> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if let Some(secs) = timeouts.request_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| GenError::HttpClientBuild(e.to_string()))?;
        let base_url = base_url.trim_end_matches('/').to_string();
        Ok(Self { http, api_key, base_url })
    }

    /// # Errors
    ///
    /// Returns [`GenError::ApiRequest`] on transport failure,
    /// [`GenError::ApiResponse`] on a non-200 status and
    /// [`GenError::ApiParse`] on a malformed body.
    pub async fn generate(&self, model: ImageModel, request: &GenerateRequest) -> Result<GenerateResponse, GenError> {
        let url = endpoint(&self.base_url, model);
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GenError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| GenError::ApiRequest(e.to_string()))?;

        if status != 200 {
            return Err(GenError::ApiResponse { status, body: text });
        }

        parse_response(&text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

fn endpoint(base_url: &str, model: ImageModel) -> String {
    format!("{base_url}/models/{}:generateContent", model.as_str())
}

fn parse_response(json: &str) -> Result<GenerateResponse, GenError> {
    serde_json::from_str(json).map_err(|e| GenError::ApiParse(e.to_string()))
}

#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;
