//! Sketch-to-image studio: a white drawing canvas whose contents are sent,
//! with a text instruction, to an image-editing model, and replaced by the
//! image the model returns.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`canvas`] | Raster surface: strokes, background letterboxing, flattening, export |
//! | [`genai`] | Generation client, wire types and environment config |
//! | [`studio`] | Submission pipeline, error notices, credentials and usage counter |
//! | [`sketch`] | JSON stroke scripts replayed through the canvas input handlers |

pub mod canvas;
pub mod genai;
pub mod sketch;
pub mod studio;
