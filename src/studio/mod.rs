//! Studio — the drawing surface wired to the generation pipeline.
//!
//! DESIGN
//! ======
//! `Studio` owns the canvas, the generation client, the usage counter and the
//! credential banner state. A submission flattens the canvas under a short
//! lock, releases it, and awaits one unary generation call, so the user can
//! keep drawing while a request is outstanding. On success the first returned
//! image becomes the new background and the usage counter goes up by one. On
//! failure the extracted message is stored as an error notice until the user
//! dismisses it.
//!
//! Single-flight is enforced here rather than left to the host: a second
//! `submit` while one is running is rejected. The in-flight flag is released
//! by a drop guard on every path, including a cancelled future.

pub mod credentials;
pub mod error;
pub mod usage;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::canvas::letterbox::Placement;
use crate::canvas::{Canvas, SurfaceError};
use crate::genai::ImageGenerator;
use crate::genai::types::{GenerateRequest, ImageModel};
use credentials::CredentialProvider;
use error::SubmitError;
use usage::UsageCounter;

/// Appended to every prompt so edits keep the sketch's look.
pub const STYLE_INSTRUCTION: &str = "Keep the same minimal line drawing style.";

/// The instruction text sent alongside the sketch.
#[must_use]
pub fn build_instruction(prompt: &str) -> String {
    format!("{prompt}. {STYLE_INSTRUCTION}")
}

// =============================================================================
// TYPES
// =============================================================================

/// Observable state of the submission pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitPhase {
    Idle,
    Submitting,
    /// A failure notice is waiting to be dismissed.
    Error,
}

/// Contents of the error modal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    pub message: String,
}

/// Result of a submit call that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// An image came back and was handed to the canvas. `placement` is `None`
    /// when the payload could not be decoded.
    Generated { mime_type: String, placement: Option<Placement> },
    /// The canvas was not mounted; nothing was sent.
    Skipped,
}

/// Clears the in-flight flag when dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
            Some(Self(flag))
        } else {
            None
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Lock a std mutex, recovering the data from a poisoned lock.
fn lock<T>(mutex: &std::sync::Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// RESULT APPLICATION
// =============================================================================

/// Decode a base64 image payload and make it the canvas background.
///
/// Decode failures are logged and leave the previous background in place;
/// they are not pipeline errors.
pub fn apply_generated(canvas: &mut Canvas, payload: &str) -> Option<Placement> {
    match canvas.set_background_base64(payload) {
        Ok(placement) => placement,
        Err(e) => {
            warn!(error = %e, payload_len = payload.len(), "studio: generated image could not be decoded");
            None
        }
    }
}

// =============================================================================
// STUDIO
// =============================================================================

pub struct Studio {
    canvas: Arc<Mutex<Canvas>>,
    generator: Arc<dyn ImageGenerator>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    usage: std::sync::Mutex<UsageCounter>,
    model: std::sync::Mutex<ImageModel>,
    notice: std::sync::Mutex<Option<ErrorNotice>>,
    in_flight: AtomicBool,
    has_credential: AtomicBool,
}

impl Studio {
    #[must_use]
    pub fn new(generator: Arc<dyn ImageGenerator>, usage: UsageCounter) -> Self {
        Self {
            canvas: Arc::new(Mutex::new(Canvas::new())),
            generator,
            credentials: None,
            usage: std::sync::Mutex::new(usage),
            model: std::sync::Mutex::new(ImageModel::default()),
            notice: std::sync::Mutex::new(None),
            in_flight: AtomicBool::new(false),
            has_credential: AtomicBool::new(true),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    #[must_use]
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = Arc::new(Mutex::new(canvas));
        self
    }

    /// Shared handle to the canvas for input handling.
    #[must_use]
    pub fn canvas(&self) -> Arc<Mutex<Canvas>> {
        Arc::clone(&self.canvas)
    }

    /// Initialize the drawing context.
    pub async fn mount(&self) {
        self.canvas.lock().await.initialize();
    }

    // -------------------------------------------------------------------------
    // Model / usage
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn model(&self) -> ImageModel {
        *lock(&self.model)
    }

    pub fn select_model(&self, model: ImageModel) {
        *lock(&self.model) = model;
        info!(%model, "studio: model selected");
    }

    #[must_use]
    pub fn usage_count(&self) -> u64 {
        lock(&self.usage).count()
    }

    #[must_use]
    pub fn usage_progress(&self) -> u64 {
        lock(&self.usage).progress_percent()
    }

    pub fn reset_usage(&self) {
        lock(&self.usage).reset();
    }

    // -------------------------------------------------------------------------
    // Pipeline state
    // -------------------------------------------------------------------------

    #[must_use]
    pub fn phase(&self) -> SubmitPhase {
        if self.in_flight.load(Ordering::Acquire) {
            SubmitPhase::Submitting
        } else if lock(&self.notice).is_some() {
            SubmitPhase::Error
        } else {
            SubmitPhase::Idle
        }
    }

    #[must_use]
    pub fn error_notice(&self) -> Option<ErrorNotice> {
        lock(&self.notice).clone()
    }

    pub fn dismiss_error(&self) {
        *lock(&self.notice) = None;
    }

    // -------------------------------------------------------------------------
    // Credentials
    // -------------------------------------------------------------------------

    /// Whether the "select a credential" banner should be shown.
    #[must_use]
    pub fn needs_credential(&self) -> bool {
        !self.has_credential.load(Ordering::Acquire)
    }

    /// Ask the provider, if any, whether a key is selected.
    pub async fn check_credentials(&self) {
        if let Some(provider) = &self.credentials {
            let has_key = provider.has_selected_key().await;
            self.has_credential.store(has_key, Ordering::Release);
            info!(has_key, "studio: credential check");
        }
    }

    /// Open the provider's selector and assume the user picked a key.
    pub async fn select_credential(&self) {
        if let Some(provider) = &self.credentials {
            provider.open_selector().await;
            self.has_credential.store(true, Ordering::Release);
        }
    }

    // -------------------------------------------------------------------------
    // Canvas actions
    // -------------------------------------------------------------------------

    /// Replace the background with an uploaded image.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Decode`] when the bytes are not an image.
    pub async fn load_background(&self, bytes: &[u8]) -> Result<Option<Placement>, SurfaceError> {
        self.canvas.lock().await.set_background(bytes)
    }

    pub async fn clear(&self) {
        self.canvas.lock().await.clear();
    }

    // -------------------------------------------------------------------------
    // Submission
    // -------------------------------------------------------------------------

    /// Send the current sketch and `prompt` for generation.
    ///
    /// # Errors
    ///
    /// [`SubmitError::EmptyPrompt`] and [`SubmitError::AlreadyInFlight`]
    /// reject the call without changing state. Every other error has also
    /// been recorded as the current [`ErrorNotice`].
    pub async fn submit(&self, prompt: &str) -> Result<SubmitOutcome, SubmitError> {
        if prompt.trim().is_empty() {
            return Err(SubmitError::EmptyPrompt);
        }
        let Some(_flight) = InFlight::acquire(&self.in_flight) else {
            warn!("studio: submit rejected, request already in flight");
            return Err(SubmitError::AlreadyInFlight);
        };
        // A new attempt supersedes the previous failure.
        self.dismiss_error();

        let snapshot = {
            let canvas = self.canvas.lock().await;
            if !canvas.is_mounted() {
                return Ok(SubmitOutcome::Skipped);
            }
            canvas.flatten_to_image()
        };

        match self.run(snapshot, prompt).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                if e.is_surfaced() {
                    self.record_failure(&e);
                }
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        snapshot: Result<crate::canvas::Snapshot, SurfaceError>,
        prompt: &str,
    ) -> Result<SubmitOutcome, SubmitError> {
        let snapshot = snapshot.map_err(SubmitError::Encoding)?;
        let model = self.model();
        let request = GenerateRequest::image_edit(snapshot.mime_type(), snapshot.to_base64(), build_instruction(prompt));

        info!(%model, prompt_len = prompt.len(), image_bytes = snapshot.png.len(), "studio: submitting");
        let response = self.generator.generate(model, &request).await?;

        let Some(image) = response.first_inline_image() else {
            warn!(candidates = response.candidates.len(), text = ?response.text(), "studio: response carried no image");
            return Err(SubmitError::NoImageProduced);
        };

        let placement = {
            let mut canvas = self.canvas.lock().await;
            apply_generated(&mut canvas, &image.data)
        };
        lock(&self.usage).increment();
        info!(%model, mime_type = %image.mime_type, usage = self.usage_count(), "studio: image applied");

        Ok(SubmitOutcome::Generated { mime_type: image.mime_type.clone(), placement })
    }

    fn record_failure(&self, e: &SubmitError) {
        if e.credential_likely_invalid() {
            self.has_credential.store(false, Ordering::Release);
        }
        let message = e.display_message();
        error!(error = %e, code = e.error_code(), %message, "studio: submission failed");
        *lock(&self.notice) = Some(ErrorNotice { message });
    }
}
