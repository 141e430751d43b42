//! Submission errors and the message shown to the user.

use crate::canvas::SurfaceError;
use crate::genai::types::GenError;

/// Shown when an error carries no usable text.
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Provider wording for a key that does not belong to a usable project.
const CREDENTIAL_NOT_FOUND_HINT: &str = "entity was not found";

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// The prompt was empty or whitespace.
    #[error("prompt is empty")]
    EmptyPrompt,

    /// Another submission has not finished yet.
    #[error("a submission is already in flight")]
    AlreadyInFlight,

    /// Flattening the canvas to an encoded image failed.
    #[error("could not encode canvas: {0}")]
    Encoding(#[source] SurfaceError),

    /// The generation call was rejected (transport, status or body).
    #[error("{0}")]
    Api(#[from] GenError),

    /// The call succeeded but no candidate carried an image.
    #[error("Sorry, the image could not be generated. Please try again.")]
    NoImageProduced,
}

impl SubmitError {
    /// Whether this failure is shown to the user as an error notice.
    /// Rejections of the submit action itself are not.
    #[must_use]
    pub fn is_surfaced(&self) -> bool {
        matches!(self, Self::Encoding(_) | Self::Api(_) | Self::NoImageProduced)
    }

    /// Stable machine-readable code, used as a log field. API failures
    /// report the underlying client code.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyPrompt => "E_EMPTY_PROMPT",
            Self::AlreadyInFlight => "E_ALREADY_IN_FLIGHT",
            Self::Encoding(_) => "E_ENCODING",
            Self::Api(e) => e.error_code(),
            Self::NoImageProduced => "E_NO_IMAGE",
        }
    }

    /// Heuristic: the provider's "not found" wording on an API failure
    /// usually means the selected key cannot be used.
    #[must_use]
    pub fn credential_likely_invalid(&self) -> bool {
        matches!(self, Self::Api(_)) && self.to_string().contains(CREDENTIAL_NOT_FOUND_HINT)
    }

    /// Human-readable message for the error notice.
    #[must_use]
    pub fn display_message(&self) -> String {
        extract_error_message(&self.to_string())
    }
}

/// Pull `error.message` out of a provider JSON error embedded in `raw`.
///
/// Falls back to the raw text when there is no parsable `{"error": ...}`
/// object or it has no message, and to [`GENERIC_ERROR_MESSAGE`] when the
/// text is blank.
#[must_use]
pub fn extract_error_message(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return GENERIC_ERROR_MESSAGE.to_string();
    }
    embedded_error_message(trimmed).unwrap_or_else(|| trimmed.to_string())
}

fn embedded_error_message(raw: &str) -> Option<String> {
    let end = raw.rfind('}')?;
    let start = raw
        .match_indices('{')
        .map(|(i, _)| i)
        .find(|&i| i < end && raw[i + 1..].trim_start().starts_with("\"error\""))?;

    let value: serde_json::Value = match serde_json::from_str(&raw[start..=end]) {
        Ok(value) => value,
        Err(_) => return None,
    };
    let message = value.get("error")?.get("message")?.as_str()?.trim();
    if message.is_empty() { None } else { Some(message.to_string()) }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
