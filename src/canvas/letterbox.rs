//! Aspect-preserving fit of an image inside a target box.

#[cfg(test)]
#[path = "letterbox_test.rs"]
mod letterbox_test;

/// Where a source image lands inside the target box, in buffer pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    /// Integer pixel rectangle `(x, y, width, height)` for compositing.
    ///
    /// Width and height are at least 1 so a sliver never vanishes entirely.
    #[must_use]
    pub fn pixel_rect(&self) -> (i64, i64, u32, u32) {
        (
            self.x.round() as i64,
            self.y.round() as i64,
            self.width.round().max(1.0) as u32,
            self.height.round().max(1.0) as u32,
        )
    }
}

/// Scale `(src_w, src_h)` to fit inside `(box_w, box_h)` without cropping.
///
/// Wider-than-box sources span the full width and are centered vertically;
/// otherwise they span the full height and are centered horizontally.
/// Returns `None` for empty sources or boxes.
#[must_use]
pub fn fit(src_w: u32, src_h: u32, box_w: u32, box_h: u32) -> Option<Placement> {
    if src_w == 0 || src_h == 0 || box_w == 0 || box_h == 0 {
        return None;
    }
    let (bw, bh) = (f64::from(box_w), f64::from(box_h));
    let box_ratio = bw / bh;
    let img_ratio = f64::from(src_w) / f64::from(src_h);

    let placement = if img_ratio > box_ratio {
        let height = bw / img_ratio;
        Placement { x: 0.0, y: (bh - height) / 2.0, width: bw, height }
    } else {
        let width = bh * img_ratio;
        Placement { x: (bw - width) / 2.0, y: 0.0, width, height: bh }
    };
    Some(placement)
}
