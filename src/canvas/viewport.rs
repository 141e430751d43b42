//! Screen-to-buffer coordinate translation.
//!
//! The raster buffer has a fixed logical resolution, but the host renders it
//! at whatever size the layout gives it. Pointer events arrive in screen
//! (client) pixels and must be scaled by `buffer_size / rendered_size` after
//! subtracting the rendered rectangle's origin.

#[cfg(test)]
#[path = "viewport_test.rs"]
mod viewport_test;

/// A point in either screen or buffer space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen rectangle the canvas is rendered into, in client pixels.
#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    #[must_use]
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }

    /// A viewport that renders the buffer 1:1 at the origin.
    #[must_use]
    pub fn identity(buffer_width: u32, buffer_height: u32) -> Self {
        Self::new(0.0, 0.0, f64::from(buffer_width), f64::from(buffer_height))
    }

    /// Convert a client-space point to buffer coordinates.
    ///
    /// A degenerate (zero or negative) rendered size is treated as 1:1 so a
    /// collapsed layout never produces infinities.
    #[must_use]
    pub fn to_buffer(&self, client: Point, buffer_width: u32, buffer_height: u32) -> Point {
        let scale_x = if self.width > 0.0 { f64::from(buffer_width) / self.width } else { 1.0 };
        let scale_y = if self.height > 0.0 { f64::from(buffer_height) / self.height } else { 1.0 };
        Point { x: (client.x - self.left) * scale_x, y: (client.y - self.top) * scale_y }
    }
}

/// A raw pointer event: mouse position or the active touch list.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerSample {
    Mouse { client: Point },
    Touch { touches: Vec<Point> },
}

impl PointerSample {
    #[must_use]
    pub fn mouse(x: f64, y: f64) -> Self {
        Self::Mouse { client: Point::new(x, y) }
    }

    #[must_use]
    pub fn touch(x: f64, y: f64) -> Self {
        Self::Touch { touches: vec![Point::new(x, y)] }
    }

    /// Client position of the sample. Touch events use the first touch;
    /// an empty touch list has no position.
    #[must_use]
    pub fn client_point(&self) -> Option<Point> {
        match self {
            Self::Mouse { client } => Some(*client),
            Self::Touch { touches } => touches.first().copied(),
        }
    }
}
