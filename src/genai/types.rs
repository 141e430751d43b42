//! Generation types — wire format, model ids and errors.
//!
//! The request and response shapes follow the `generateContent` REST API:
//! a list of contents, each an ordered list of parts, where a part carries
//! either text or inline base64 data with a media type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by generation client operations.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The provider returned a non-success HTTP status. The body is kept in
    /// the message because providers put their human-readable reason there.
    #[error("API response error: status {status}: {body}")]
    ApiResponse { status: u16, body: String },

    /// The provider response body could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl GenError {
    /// Stable machine-readable code, used as a log field.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// MODEL
// =============================================================================

/// The image-capable models the studio can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageModel {
    /// Fast default model.
    #[default]
    #[serde(rename = "gemini-2.5-flash-image")]
    Flash,
    /// Higher-quality preview model; typically needs a paid key.
    #[serde(rename = "gemini-3-pro-image-preview")]
    ProPreview,
}

impl ImageModel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flash => "gemini-2.5-flash-image",
            Self::ProPreview => "gemini-3-pro-image-preview",
        }
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageModel {
    type Err = GenError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "gemini-2.5-flash-image" | "flash" => Ok(Self::Flash),
            "gemini-3-pro-image-preview" | "pro" => Ok(Self::ProPreview),
            other => Err(GenError::ConfigParse(format!(
                "unknown image model '{other}' (expected 'gemini-2.5-flash-image' or 'gemini-3-pro-image-preview')"
            ))),
        }
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

/// Base64 bytes tagged with a media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    #[serde(alias = "mime_type")]
    pub mime_type: String,
    pub data: String,
}

/// One fragment of a content: text, inline data, or (for unknown part kinds)
/// neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "inline_data")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), inline_data: None }
    }

    #[must_use]
    pub fn inline(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self { text: None, inline_data: Some(InlineData { mime_type: mime_type.into(), data: data.into() }) }
    }
}

/// An ordered sequence of parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

impl GenerateRequest {
    /// A single-content request: the image first, then the instruction text.
    #[must_use]
    pub fn image_edit(mime_type: &str, base64_image: String, instruction: String) -> Self {
        Self { contents: vec![Content { role: None, parts: vec![Part::inline(mime_type, base64_image), Part::text(instruction)] }] }
    }
}

/// One alternative result from the provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Response body of `generateContent`. Missing collections decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// The first inline image in candidate order, then part order.
    ///
    /// Scanning stops at the first hit; text parts and later candidates are
    /// ignored. Inline parts with an empty payload do not count as images.
    #[must_use]
    pub fn first_inline_image(&self) -> Option<&InlineData> {
        self.candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.inline_data.as_ref())
            .find(|inline| !inline.data.is_empty())
    }

    /// All text parts joined with newlines, for logging refusals.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .candidates
            .iter()
            .filter_map(|candidate| candidate.content.as_ref())
            .flat_map(|content| content.parts.iter())
            .filter_map(|part| part.text.as_deref())
            .collect();
        if texts.is_empty() { None } else { Some(texts.join("\n")) }
    }
}

// =============================================================================
// IMAGE GENERATOR TRAIT
// =============================================================================

/// Provider-neutral async trait for image generation. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Send one unary generation request.
    ///
    /// # Errors
    ///
    /// Returns a [`GenError`] if the request fails or the response is malformed.
    async fn generate(&self, model: ImageModel, request: &GenerateRequest) -> Result<GenerateResponse, GenError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
