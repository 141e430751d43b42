//! Sketch scripts — recorded pointer input replayed onto a canvas.
//!
//! A script is a JSON document listing strokes in client coordinates plus the
//! viewport they were captured against:
//!
//! ```json
//! {
//!   "viewport": { "left": 0, "top": 0, "width": 640, "height": 360 },
//!   "strokes": [
//!     { "color": "#ff0000", "points": [[10, 10], [200, 40]] },
//!     { "points": [[5, 300], [600, 300]], "touch": true }
//!   ]
//! }
//! ```
//!
//! Without a viewport the points are taken as buffer coordinates.

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::canvas::Canvas;
use crate::canvas::viewport::{PointerSample, Viewport};

#[derive(Debug, thiserror::Error)]
pub enum SketchError {
    #[error("sketch read failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("sketch parse failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("stroke {index}: invalid color '{color}'")]
    InvalidColor { index: usize, color: String },
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScriptStroke {
    /// Pen color for this stroke; the current pen is kept when absent.
    #[serde(default)]
    pub color: Option<String>,
    pub points: Vec<[f64; 2]>,
    /// Deliver the points as touch events instead of mouse events.
    #[serde(default)]
    pub touch: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SketchScript {
    #[serde(default)]
    pub viewport: Option<Viewport>,
    #[serde(default)]
    pub strokes: Vec<ScriptStroke>,
}

impl SketchScript {
    /// # Errors
    ///
    /// Returns [`SketchError::Json`] for malformed input.
    pub fn from_json(raw: &str) -> Result<Self, SketchError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// # Errors
    ///
    /// Returns [`SketchError::Io`] or [`SketchError::Json`].
    pub fn load(path: &Path) -> Result<Self, SketchError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Feed every stroke through the canvas pointer handlers. Returns the
    /// number of strokes replayed.
    ///
    /// # Errors
    ///
    /// Returns [`SketchError::InvalidColor`] on the first stroke whose color
    /// does not parse; earlier strokes stay drawn.
    pub fn replay(&self, canvas: &mut Canvas) -> Result<usize, SketchError> {
        let viewport = self
            .viewport
            .unwrap_or_else(|| Viewport::identity(canvas.width(), canvas.height()));

        for (index, stroke) in self.strokes.iter().enumerate() {
            if let Some(color) = &stroke.color {
                if !canvas.set_pen_color(color) {
                    return Err(SketchError::InvalidColor { index, color: color.clone() });
                }
            }
            let sample = |[x, y]: [f64; 2]| {
                if stroke.touch { PointerSample::touch(x, y) } else { PointerSample::mouse(x, y) }
            };
            let mut points = stroke.points.iter().copied();
            if let Some(first) = points.next() {
                canvas.begin_stroke(&sample(first), &viewport);
            }
            for point in points {
                canvas.extend_stroke(&sample(point), &viewport);
            }
            canvas.end_stroke();
            debug!(index, points = stroke.points.len(), "sketch: stroke replayed");
        }
        Ok(self.strokes.len())
    }
}

#[cfg(test)]
#[path = "sketch_test.rs"]
mod tests;
