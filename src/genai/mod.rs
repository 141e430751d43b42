//! GenAI — image-editing generation client.
//!
//! DESIGN
//! ======
//! Configured from environment variables by [`GenClient::from_env`]. The
//! [`ImageGenerator`] trait is the seam the studio depends on, so the HTTP
//! client can be swapped for a mock in tests.

pub mod config;
pub mod gemini;
pub mod types;

use config::GenConfig;
pub use types::ImageGenerator;
use types::{GenError, GenerateRequest, GenerateResponse, ImageModel};

// =============================================================================
// CLIENT
// =============================================================================

/// Concrete generation client backed by the Gemini REST API.
pub struct GenClient {
    inner: gemini::GeminiClient,
    model: ImageModel,
}

impl GenClient {
    /// Build a client from environment variables (see [`GenConfig::from_env`]).
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, GenError> {
        let config = GenConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build a client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: GenConfig) -> Result<Self, GenError> {
        let inner = gemini::GeminiClient::new(config.api_key, config.base_url, config.timeouts)?;
        Ok(Self { inner, model: config.model })
    }

    /// The configured default model.
    #[must_use]
    pub fn model(&self) -> ImageModel {
        self.model
    }
}

#[async_trait::async_trait]
impl ImageGenerator for GenClient {
    async fn generate(&self, model: ImageModel, request: &GenerateRequest) -> Result<GenerateResponse, GenError> {
        self.inner.generate(model, request).await
    }
}
