// Phase 4: 前景切り出しと背景ノックアウト

use image::{Rgba, RgbaImage};
use serde::Deserialize;

use super::{Layer, LayerRole};
use crate::error::LayerError;
use crate::raster::histogram::Histogram;
use crate::raster::pixels::{PixelSource, to_rgba, unpack_rgba};
use crate::raster::rect::{self, Rect};

/// Fill used for knocked-out background regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum KnockoutColor {
    #[default]
    White,
    /// The source's most frequent color.
    Dominant,
    Rgb([u8; 3]),
}

/// Whether knockouts are filled to compress well or to be seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStyle {
    Knockout,
    /// Diagnostic: paints knockouts in the highlight color.
    Highlight,
}

#[derive(Debug, Clone)]
pub struct SegmenterConfig {
    pub knockout_color: KnockoutColor,
    pub highlight_color: [u8; 3],
    /// Knockouts are shrunk by this many pixels so the foreground overlaps them.
    pub dilation: i32,
    /// Foreground crops are grown by this many pixels (clipped to the raster).
    pub foreground_grow: i32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            knockout_color: KnockoutColor::White,
            highlight_color: [0x00, 0x00, 0xFF],
            dilation: 2,
            foreground_grow: 0,
        }
    }
}

/// Output of one segmentation pass.
pub struct Segmentation {
    pub background: Layer,
    pub foreground: Vec<Layer>,
    /// Knockout rectangles actually applied to the background.
    pub knockouts: Vec<Rect>,
}

pub struct Segmenter {
    config: SegmenterConfig,
}

impl Segmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Split `raster` into a knocked-out background and one foreground crop
    /// per rectangle.
    pub fn segment<P: PixelSource>(
        &self,
        raster: &P,
        rects: &[Rect],
        fill: FillStyle,
    ) -> crate::error::Result<Segmentation> {
        let (w, h) = raster.dimensions();
        let page = Rect::from_size(w, h)?;
        check_inside(&page, rects)?;

        let knockouts = knockout_rects(rects, self.config.dilation)?;
        let grown = grown_rects(rects, self.config.foreground_grow)?;
        let windows: Vec<Rect> = grown
            .iter()
            .zip(rects)
            .map(|(g, r)| g.intersection(&page).unwrap_or(*r))
            .collect();

        let foreground = extract_foreground(raster, &windows)?;
        let fill_color = self.fill_color(raster, fill);
        let background = Layer {
            role: LayerRole::Background,
            raster: make_background(raster, &knockouts, fill_color),
            placement: page,
        };

        tracing::debug!(
            rects = rects.len(),
            dilation = self.config.dilation,
            "segmented {}x{} raster",
            w,
            h
        );

        Ok(Segmentation {
            background,
            foreground,
            knockouts,
        })
    }

    fn fill_color<P: PixelSource>(&self, raster: &P, fill: FillStyle) -> Rgba<u8> {
        if fill == FillStyle::Highlight {
            let [r, g, b] = self.config.highlight_color;
            return Rgba([r, g, b, 0xFF]);
        }
        match self.config.knockout_color {
            KnockoutColor::White => Rgba([0xFF, 0xFF, 0xFF, 0xFF]),
            KnockoutColor::Rgb([r, g, b]) => Rgba([r, g, b, 0xFF]),
            KnockoutColor::Dominant => Histogram::from_pixels(raster)
                .dominant_color()
                .map(unpack_rgba)
                .unwrap_or(Rgba([0xFF, 0xFF, 0xFF, 0xFF])),
        }
    }
}

/// Every non-empty rectangle shrunk by `dilation`. An empty rectangle has
/// nothing to knock out and is left out.
pub fn knockout_rects(rects: &[Rect], dilation: i32) -> crate::error::Result<Vec<Rect>> {
    rects
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.is_empty())
        .map(|(i, r)| r.dilated(-dilation).map_err(|e| rect::at_index(i, e)))
        .collect()
}

/// Every non-empty rectangle grown by `grow`, index for index. Empty
/// rectangles stay empty.
pub fn grown_rects(rects: &[Rect], grow: i32) -> crate::error::Result<Vec<Rect>> {
    rects
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if r.is_empty() {
                Ok(*r)
            } else {
                r.dilated(grow).map_err(|e| rect::at_index(i, e))
            }
        })
        .collect()
}

fn check_inside(page: &Rect, rects: &[Rect]) -> crate::error::Result<()> {
    for (i, r) in rects.iter().enumerate() {
        if !page.contains(r) {
            return Err(LayerError::geometry(format!(
                "rect #{i} {r} lies outside the {}x{} raster",
                page.width(),
                page.height()
            )));
        }
    }
    Ok(())
}

/// One crop per rectangle, each a fresh raster of exactly that size.
///
/// Rectangles may overlap; every crop is independent.
pub fn extract_foreground<P: PixelSource>(
    raster: &P,
    rects: &[Rect],
) -> crate::error::Result<Vec<Layer>> {
    let (w, h) = raster.dimensions();
    check_inside(&Rect::from_size(w, h)?, rects)?;

    Ok(rects
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let dst = r.zero_bounds();
            let (sx, sy) = r.position();
            let mut crop = RgbaImage::new(dst.width(), dst.height());
            for y in 0..dst.height() {
                for x in 0..dst.width() {
                    let c = raster.pixel_at(sx as u32 + x, sy as u32 + y);
                    crop.put_pixel(x, y, unpack_rgba(c));
                }
            }
            Layer {
                role: LayerRole::Foreground(i),
                raster: crop,
                placement: *r,
            }
        })
        .collect())
}

/// Full copy of `raster` with every knockout filled solid with `fill`.
///
/// Knockouts are clipped to the raster.
pub fn make_background<P: PixelSource>(raster: &P, knockouts: &[Rect], fill: Rgba<u8>) -> RgbaImage {
    let (w, h) = raster.dimensions();
    let mut out = to_rgba(raster);

    let Ok(page) = Rect::from_size(w, h) else {
        return out;
    };
    for k in knockouts {
        let Some(clip) = k.intersection(&page) else {
            continue;
        };
        for y in clip.y0()..clip.y1() {
            for x in clip.x0()..clip.x1() {
                out.put_pixel(x as u32, y as u32, fill);
            }
        }
    }
    out
}
