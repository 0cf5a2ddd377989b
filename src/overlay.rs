use std::collections::BTreeSet;

use image::{Rgb, RgbImage};

use crate::grid::{BlockCoord, Grid, Rect};

pub const MARKER_RED: Rgb<u8> = Rgb([255, 0, 0]);

/// Outlines `rect` with edges at `x`, `x + width`, `y` and `y + height`, so a
/// sampling rectangle's outline covers its block's full footprint. Edges
/// falling outside the image are clipped.
pub fn draw_outline(img: &mut RgbImage, rect: Rect, color: Rgb<u8>) {
    let (w, h) = img.dimensions();
    let left = rect.x;
    let top = rect.y;
    let right = rect.x + rect.width;
    let bottom = rect.y + rect.height;

    for x in left..=right.min(w.saturating_sub(1)) {
        if top < h {
            img.put_pixel(x, top, color);
        }
        if bottom < h {
            img.put_pixel(x, bottom, color);
        }
    }
    for y in top..=bottom.min(h.saturating_sub(1)) {
        if left < w {
            img.put_pixel(left, y, color);
        }
        if right < w {
            img.put_pixel(right, y, color);
        }
    }
}

/// Copy of `base` with every mismatched block outlined.
pub fn render(
    base: &RgbImage,
    grid: &Grid,
    mismatched: &BTreeSet<BlockCoord>,
    color: Rgb<u8>,
) -> RgbImage {
    let mut overlay = base.clone();
    for block in mismatched.iter().filter_map(|coord| grid.block(*coord)) {
        draw_outline(&mut overlay, block.sample_rect(), color);
    }
    overlay
}
