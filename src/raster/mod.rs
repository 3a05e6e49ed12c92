pub mod histogram;
pub mod pixels;
pub mod rect;
pub mod threshold;

pub use histogram::{Classification, ClassifyParams, Histogram, classify};
pub use pixels::{BitImage, PackedColor, PixelSource};
pub use rect::{Rect, RectSpec, dilate, union};
