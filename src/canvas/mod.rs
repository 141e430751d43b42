//! Canvas surface — raster buffer, pen, background and flattening.
//!
//! DESIGN
//! ======
//! The surface is a fixed-resolution RGBA buffer that is opaque white
//! wherever nothing has been drawn. Ink is rasterized the moment a pointer
//! moves; there are no retained stroke objects and no undo. An optional
//! background image is letterboxed beneath the ink; replacing it re-renders
//! the surface from scratch.
//!
//! The drawing context only exists after [`Canvas::initialize`]. Until then
//! every drawing operation is a silent no-op, mirroring a host whose canvas
//! element has not mounted yet.

pub mod color;
pub mod letterbox;
pub mod raster;
pub mod viewport;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::{debug, info};

use color::PenColor;
use letterbox::Placement;
use viewport::{Point, PointerSample, Viewport};

/// Logical buffer width.
pub const CANVAS_WIDTH: u32 = 1280;
/// Logical buffer height.
pub const CANVAS_HEIGHT: u32 = 720;
/// Fixed pen width in buffer pixels.
pub const PEN_WIDTH: f64 = 5.0;
/// Media type of flattened snapshots.
pub const SNAPSHOT_MIME: &str = "image/png";

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("drawing context unavailable")]
    ContextUnavailable,
    #[error("image decode failed: {0}")]
    Decode(#[source] image::ImageError),
    #[error("image encode failed: {0}")]
    Encode(#[source] image::ImageError),
    #[error("invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("export failed: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// An encoded, fully opaque copy of the surface. Owns its bytes; later
/// drawing never affects it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Snapshot {
    #[must_use]
    pub fn mime_type(&self) -> &'static str {
        SNAPSHOT_MIME
    }

    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.png)
    }
}

// =============================================================================
// CANVAS
// =============================================================================

pub struct Canvas {
    width: u32,
    height: u32,
    /// Raster buffer; `None` until the context is initialized.
    buffer: Option<RgbaImage>,
    background: Option<RgbaImage>,
    pen: PenColor,
    /// Last buffer-space point of the active stroke.
    cursor: Option<Point>,
}

impl Canvas {
    /// An unmounted canvas of the default 1280x720 size.
    #[must_use]
    pub fn new() -> Self {
        Self::with_size(CANVAS_WIDTH, CANVAS_HEIGHT)
    }

    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self { width, height, buffer: None, background: None, pen: PenColor::default(), cursor: None }
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.buffer.is_some()
    }

    #[must_use]
    pub fn has_background(&self) -> bool {
        self.background.is_some()
    }

    #[must_use]
    pub fn is_drawing(&self) -> bool {
        self.cursor.is_some()
    }

    #[must_use]
    pub fn pen_color(&self) -> PenColor {
        self.pen
    }

    /// Read-only view of the live buffer.
    #[must_use]
    pub fn buffer(&self) -> Option<&RgbaImage> {
        self.buffer.as_ref()
    }

    /// Create the drawing context (if needed) and fill it with opaque white.
    pub fn initialize(&mut self) {
        let buffer = self
            .buffer
            .get_or_insert_with(|| RgbaImage::new(self.width, self.height));
        raster::fill(buffer, WHITE);
        debug!(width = self.width, height = self.height, "canvas: initialized");
    }

    /// Set the pen from a hex string. Returns `false` and leaves the pen
    /// unchanged when the string is not a valid color.
    pub fn set_pen_color(&mut self, hex: &str) -> bool {
        match PenColor::from_hex(hex) {
            Some(pen) => {
                self.pen = pen;
                true
            }
            None => false,
        }
    }

    // -------------------------------------------------------------------------
    // Background
    // -------------------------------------------------------------------------

    /// Decode encoded image bytes and make them the background.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::Decode`] when the bytes are not a supported
    /// image; the previous background is kept in that case.
    pub fn set_background(&mut self, bytes: &[u8]) -> Result<Option<Placement>, SurfaceError> {
        let decoded = image::load_from_memory(bytes).map_err(SurfaceError::Decode)?;
        Ok(self.set_background_image(decoded))
    }

    /// Decode a base64 payload and make it the background.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidBase64`] or [`SurfaceError::Decode`].
    pub fn set_background_base64(&mut self, payload: &str) -> Result<Option<Placement>, SurfaceError> {
        let bytes = BASE64.decode(payload.trim())?;
        self.set_background(&bytes)
    }

    /// Store an already decoded image and re-render. Returns where the image
    /// was drawn, or `None` when there is no context or the image is empty.
    pub fn set_background_image(&mut self, image: DynamicImage) -> Option<Placement> {
        self.background = Some(image.into_rgba8());
        self.render_background()
    }

    /// Clear to white, then letterbox the background into the buffer.
    fn render_background(&mut self) -> Option<Placement> {
        let buffer = self.buffer.as_mut()?;
        raster::fill(buffer, WHITE);
        let background = self.background.as_ref()?;

        let placement = letterbox::fit(background.width(), background.height(), self.width, self.height)?;
        let (x, y, w, h) = placement.pixel_rect();
        let scaled = imageops::resize(background, w, h, FilterType::Triangle);
        imageops::overlay(buffer, &scaled, x, y);
        info!(
            src_width = background.width(),
            src_height = background.height(),
            x,
            y,
            width = w,
            height = h,
            "canvas: background rendered"
        );
        Some(placement)
    }

    // -------------------------------------------------------------------------
    // Strokes
    // -------------------------------------------------------------------------

    fn to_buffer(&self, sample: &PointerSample, viewport: &Viewport) -> Option<Point> {
        let client = sample.client_point()?;
        Some(viewport.to_buffer(client, self.width, self.height))
    }

    /// Start a stroke at the sample position. Draws nothing by itself.
    pub fn begin_stroke(&mut self, sample: &PointerSample, viewport: &Viewport) {
        if self.buffer.is_none() {
            return;
        }
        if let Some(point) = self.to_buffer(sample, viewport) {
            self.cursor = Some(point);
        }
    }

    /// Extend the active stroke to the sample position, rasterizing the new
    /// segment immediately. Ignored when no stroke is active.
    pub fn extend_stroke(&mut self, sample: &PointerSample, viewport: &Viewport) {
        let Some(from) = self.cursor else {
            return;
        };
        let Some(to) = self.to_buffer(sample, viewport) else {
            return;
        };
        let color = self.pen.rgba();
        let Some(buffer) = self.buffer.as_mut() else {
            return;
        };
        raster::stroke_segment(buffer, from, to, PEN_WIDTH, color);
        self.cursor = Some(to);
    }

    /// Finish the active stroke (pointer up or pointer leaving the surface).
    pub fn end_stroke(&mut self) {
        self.cursor = None;
    }

    // -------------------------------------------------------------------------
    // Reset / export
    // -------------------------------------------------------------------------

    /// Reset to blank white and discard the background image.
    pub fn clear(&mut self) {
        self.background = None;
        self.cursor = None;
        if let Some(buffer) = self.buffer.as_mut() {
            raster::fill(buffer, WHITE);
        }
    }

    /// Composite the live buffer over white and encode it as PNG.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::ContextUnavailable`] before initialization and
    /// [`SurfaceError::Encode`] if PNG encoding fails.
    pub fn flatten_to_image(&self) -> Result<Snapshot, SurfaceError> {
        let buffer = self.buffer.as_ref().ok_or(SurfaceError::ContextUnavailable)?;
        let mut flat = RgbaImage::from_pixel(self.width, self.height, WHITE);
        imageops::overlay(&mut flat, buffer, 0, 0);

        let mut png = Vec::new();
        flat.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(SurfaceError::Encode)?;
        Ok(Snapshot { png, width: self.width, height: self.height })
    }

    /// Write the flattened canvas to `dir` as `gemini-drawing-<millis>.png`.
    ///
    /// # Errors
    ///
    /// Propagates flatten errors and filesystem failures.
    pub fn export_png(&self, dir: &Path) -> Result<PathBuf, SurfaceError> {
        let snapshot = self.flatten_to_image()?;
        let path = dir.join(export_file_name(time::OffsetDateTime::now_utc()));
        std::fs::write(&path, &snapshot.png)?;
        info!(path = %path.display(), bytes = snapshot.png.len(), "canvas: exported");
        Ok(path)
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new()
    }
}

/// Export file name carrying the capture time in Unix milliseconds.
#[must_use]
pub fn export_file_name(at: time::OffsetDateTime) -> String {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    format!("gemini-drawing-{millis}.png")
}
