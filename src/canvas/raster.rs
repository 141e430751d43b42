//! Immediate-mode rasterization of pen segments.
//!
//! Coverage is the distance from the pixel center to the segment, which gives
//! round caps for free and round joins where consecutive segments meet. Edges
//! get one pixel of antialiasing.

#[cfg(test)]
#[path = "raster_test.rs"]
mod raster_test;

use image::{Rgba, RgbaImage};

use super::viewport::Point;

/// Fill every pixel with `color`.
pub fn fill(img: &mut RgbaImage, color: Rgba<u8>) {
    for pixel in img.pixels_mut() {
        *pixel = color;
    }
}

/// Stroke the segment `a -> b` with the given width and color.
pub fn stroke_segment(img: &mut RgbaImage, a: Point, b: Point, width: f64, color: Rgba<u8>) {
    let half = width / 2.0;
    let reach = half + 1.0;
    let max_x = f64::from(img.width()) - 1.0;
    let max_y = f64::from(img.height()) - 1.0;
    if max_x < 0.0 || max_y < 0.0 {
        return;
    }

    let x0 = (a.x.min(b.x) - reach).floor().clamp(0.0, max_x) as u32;
    let x1 = (a.x.max(b.x) + reach).ceil().clamp(0.0, max_x) as u32;
    let y0 = (a.y.min(b.y) - reach).floor().clamp(0.0, max_y) as u32;
    let y1 = (a.y.max(b.y) + reach).ceil().clamp(0.0, max_y) as u32;

    for py in y0..=y1 {
        for px in x0..=x1 {
            let center = Point::new(f64::from(px) + 0.5, f64::from(py) + 0.5);
            let coverage = (half + 0.5 - distance_to_segment(center, a, b)).clamp(0.0, 1.0);
            if coverage > 0.0 {
                let dst = img.get_pixel_mut(px, py);
                *dst = blend(*dst, color, coverage);
            }
        }
    }
}

/// Euclidean distance from `p` to the closest point on segment `a -> b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let (abx, aby) = (b.x - a.x, b.y - a.y);
    let len_sq = abx * abx + aby * aby;
    let t = if len_sq > 0.0 { (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0) } else { 0.0 };
    let (cx, cy) = (a.x + abx * t, a.y + aby * t);
    ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt()
}

/// Source-over blend of `src` onto `dst`, scaled by `coverage` in `[0, 1]`.
#[must_use]
pub fn blend(dst: Rgba<u8>, src: Rgba<u8>, coverage: f64) -> Rgba<u8> {
    let alpha = coverage * f64::from(src[3]) / 255.0;
    let mix = |d: u8, s: u8| (f64::from(s) * alpha + f64::from(d) * (1.0 - alpha)).round() as u8;
    let out_a = (alpha * 255.0 + f64::from(dst[3]) * (1.0 - alpha)).round() as u8;
    Rgba([mix(dst[0], src[0]), mix(dst[1], src[1]), mix(dst[2], src[2]), out_a])
}
