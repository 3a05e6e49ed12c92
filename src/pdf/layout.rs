// Phase 7: ページへのフィット & センタリング

use crate::error::LayerError;
use crate::raster::rect::Rect;

/// Offsets this close below zero are floating-point noise, not layout errors.
const OFFSET_EPSILON: f64 = 1e-6;

/// Uniform scale and centering offsets of a raster on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub scale: f64,
    pub x_offset: f64,
    pub y_offset: f64,
}

/// Position and size of an image on a page, in points, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Fit a `raster_w` x `raster_h` raster into a `page_w` x `page_h` page box.
///
/// The smaller axis ratio wins; the scaled raster is centered on the other
/// axis. Offsets are never negative.
pub fn compute_scale(
    page_w: f64,
    page_h: f64,
    raster_w: f64,
    raster_h: f64,
) -> crate::error::Result<Placement> {
    for (name, v) in [
        ("page width", page_w),
        ("page height", page_h),
        ("raster width", raster_w),
        ("raster height", raster_h),
    ] {
        if !v.is_finite() || v <= 0.0 {
            return Err(LayerError::geometry(format!("{name} must be positive, got {v}")));
        }
    }

    let x_scale = page_w / raster_w;
    let y_scale = page_h / raster_h;
    let (scale, x_offset, y_offset) = if x_scale < y_scale {
        (x_scale, 0.0, 0.5 * (page_h - x_scale * raster_h))
    } else {
        (y_scale, 0.5 * (page_w - y_scale * raster_w), 0.0)
    };

    Ok(Placement {
        scale,
        x_offset: non_negative("x", x_offset)?,
        y_offset: non_negative("y", y_offset)?,
    })
}

fn non_negative(axis: &str, offset: f64) -> crate::error::Result<f64> {
    if offset >= 0.0 {
        Ok(offset)
    } else if offset > -OFFSET_EPSILON {
        Ok(0.0)
    } else {
        Err(LayerError::geometry(format!(
            "negative {axis} offset {offset} while fitting raster to page"
        )))
    }
}

impl Placement {
    /// Map a rectangle in source pixels to its frame on the page.
    pub fn frame(&self, r: &Rect) -> Frame {
        Frame {
            x: r.x0() as f64 * self.scale + self.x_offset,
            y: r.y0() as f64 * self.scale + self.y_offset,
            width: r.width() as f64 * self.scale,
            height: r.height() as f64 * self.scale,
        }
    }
}
