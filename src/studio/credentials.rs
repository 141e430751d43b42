//! Credential capability supplied by the host.
//!
//! A host may or may not be able to tell whether a usable API key is
//! selected. When it can, it implements [`CredentialProvider`]; the studio
//! treats the provider as optional and never assumes it exists.

use tracing::info;

#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether a usable credential is currently selected.
    async fn has_selected_key(&self) -> bool;

    /// Ask the host to let the user pick a credential.
    async fn open_selector(&self);
}

/// Credentials taken from an environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredentials {
    var: String,
}

impl EnvCredentials {
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    #[must_use]
    pub fn var(&self) -> &str {
        &self.var
    }
}

#[async_trait::async_trait]
impl CredentialProvider for EnvCredentials {
    async fn has_selected_key(&self) -> bool {
        std::env::var(&self.var).is_ok_and(|key| !key.trim().is_empty())
    }

    async fn open_selector(&self) {
        info!(var = %self.var, "credentials: export the API key in this variable (or a .env file) and retry");
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
