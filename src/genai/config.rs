//! Generation client configuration parsed from environment variables.

use super::types::{GenError, ImageModel};

pub const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenTimeouts {
    /// Whole-request timeout. `None` lets a generation run to completion.
    pub request_secs: Option<u64>,
    pub connect_secs: u64,
}

impl Default for GenTimeouts {
    fn default() -> Self {
        Self { request_secs: None, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenConfig {
    /// Name of the environment variable the key was read from.
    pub api_key_env: String,
    pub api_key: String,
    pub model: ImageModel,
    pub base_url: String,
    pub timeouts: GenTimeouts,
}

impl GenConfig {
    /// Build typed generation config from environment variables.
    ///
    /// Optional:
    /// - `GEN_API_KEY_ENV`: names the env var holding the key (default `GEMINI_API_KEY`)
    /// - `GEN_MODEL`: `gemini-2.5-flash-image` (default) or `gemini-3-pro-image-preview`
    /// - `GEN_BASE_URL`: default Generative Language API base URL
    /// - `GEN_REQUEST_TIMEOUT_SECS`: unset or `0` means no request timeout
    /// - `GEN_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`GenError::MissingApiKey`] when the key variable is unset or
    /// empty and [`GenError::ConfigParse`] for an unknown model.
    pub fn from_env() -> Result<Self, GenError> {
        let api_key_env = env_opt("GEN_API_KEY_ENV").unwrap_or_else(|| DEFAULT_API_KEY_ENV.to_string());
        let api_key = env_opt(&api_key_env)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| GenError::MissingApiKey { var: api_key_env.clone() })?;

        let model = match env_opt("GEN_MODEL") {
            Some(raw) => raw.parse()?,
            None => ImageModel::default(),
        };
        let base_url = env_opt("GEN_BASE_URL")
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let timeouts = GenTimeouts {
            request_secs: env_parse_u64("GEN_REQUEST_TIMEOUT_SECS").filter(|secs| *secs > 0),
            connect_secs: env_parse_u64("GEN_CONNECT_TIMEOUT_SECS").unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_key_env, api_key, model, base_url, timeouts })
    }
}

fn env_opt(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(value) => Some(value),
        Err(_) => None,
    }
}

fn env_parse_u64(key: &str) -> Option<u64> {
    let raw = env_opt(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring non-numeric setting");
            None
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
