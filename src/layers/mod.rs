pub mod codec;
pub mod compositor;
pub mod policy;
pub mod segmenter;

use std::fmt;

use image::RgbaImage;

use crate::raster::histogram::Classification;
use crate::raster::rect::Rect;
use codec::EncodedImage;
use policy::Codec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerRole {
    Background,
    Foreground(usize),
    /// Soft mask of the placed image with this index.
    Mask(usize),
}

impl fmt::Display for LayerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerRole::Background => write!(f, "background"),
            LayerRole::Foreground(i) => write!(f, "foreground[{i}]"),
            LayerRole::Mask(i) => write!(f, "mask[{i}]"),
        }
    }
}

/// A raster cut from a source page, placed in source-page pixel coordinates.
pub struct Layer {
    pub role: LayerRole,
    pub raster: RgbaImage,
    pub placement: Rect,
}

/// A layer after codec selection and encoding; only consumed for emission.
#[derive(Debug, Clone)]
pub struct EncodedLayer {
    pub role: LayerRole,
    pub placement: Rect,
    pub codec: Codec,
    pub image: EncodedImage,
    pub classification: Option<Classification>,
}
