// Phase 3: グレースケール化 + 固定閾値二値化 (bitonal 経路専用)

use super::pixels::{BitImage, PixelSource};

/// Fixed binarization midpoint: luminance below it is black.
pub const MIDPOINT: u8 = 128;

/// Rec. 601 luminance of a packed pixel. Alpha is ignored.
pub fn luminance(color: u32) -> u8 {
    let r = (color >> 24) & 0xFF;
    let g = (color >> 16) & 0xFF;
    let b = (color >> 8) & 0xFF;
    ((299 * r + 587 * g + 114 * b + 500) / 1000) as u8
}

/// Convert to gray and binarize at [`MIDPOINT`].
///
/// Destructive: only ever applied to a layer already selected for the bitonal
/// codec.
pub fn to_bilevel<P: PixelSource>(raster: &P) -> BitImage {
    let (w, h) = raster.dimensions();
    let mut out = BitImage::new(w, h);
    raster.for_each_pixel(|x, y, c| {
        if luminance(c) >= MIDPOINT {
            out.set(x, y, true);
        }
    });
    out
}
