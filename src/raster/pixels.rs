// Phase 2: ピクセルアクセス抽象 (RGBA / RGB / Gray / 1-bit)

use image::{GrayImage, Rgba, RgbImage, RgbaImage};

/// A pixel packed into one comparable key: `R<<24 | G<<16 | B<<8 | A`.
pub type PackedColor = u32;

pub const BLACK: PackedColor = 0x0000_00FF;
pub const WHITE: PackedColor = 0xFFFF_FFFF;

pub fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> PackedColor {
    (r as u32) << 24 | (g as u32) << 16 | (b as u32) << 8 | a as u32
}

pub fn unpack_rgba(c: PackedColor) -> Rgba<u8> {
    Rgba([(c >> 24) as u8, (c >> 16) as u8, (c >> 8) as u8, c as u8])
}

/// Read-only pixel access shared by the histogram analyzer and the segmenter.
///
/// Implementations exist for each concrete raster layout so that callers never
/// depend on how pixels are stored.
pub trait PixelSource {
    fn dimensions(&self) -> (u32, u32);

    /// Packed color at `(x, y)`. Callers keep coordinates inside `dimensions()`.
    fn pixel_at(&self, x: u32, y: u32) -> PackedColor;

    /// Visit every pixel once in row-major order.
    fn for_each_pixel<F>(&self, mut f: F)
    where
        F: FnMut(u32, u32, PackedColor),
    {
        let (w, h) = self.dimensions();
        for y in 0..h {
            for x in 0..w {
                f(x, y, self.pixel_at(x, y));
            }
        }
    }
}

impl PixelSource for RgbaImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn pixel_at(&self, x: u32, y: u32) -> PackedColor {
        let [r, g, b, a] = self.get_pixel(x, y).0;
        pack_rgba(r, g, b, a)
    }

    fn for_each_pixel<F>(&self, mut f: F)
    where
        F: FnMut(u32, u32, PackedColor),
    {
        for (x, y, px) in self.enumerate_pixels() {
            let [r, g, b, a] = px.0;
            f(x, y, pack_rgba(r, g, b, a));
        }
    }
}

impl PixelSource for RgbImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn pixel_at(&self, x: u32, y: u32) -> PackedColor {
        let [r, g, b] = self.get_pixel(x, y).0;
        pack_rgba(r, g, b, 0xFF)
    }
}

impl PixelSource for GrayImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    fn pixel_at(&self, x: u32, y: u32) -> PackedColor {
        let l = self.get_pixel(x, y).0[0];
        pack_rgba(l, l, l, 0xFF)
    }
}

/// 1-bit raster, rows packed MSB first and padded to a whole byte.
///
/// A set bit is white, a clear bit is black, matching `DeviceGray` with one
/// bit per component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl BitImage {
    /// All-black image.
    pub fn new(width: u32, height: u32) -> Self {
        let stride = Self::stride_for(width);
        Self {
            width,
            height,
            data: vec![0; stride * height as usize],
        }
    }

    fn stride_for(width: u32) -> usize {
        (width as usize).div_ceil(8)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> usize {
        Self::stride_for(self.width)
    }

    /// `true` is white.
    pub fn get(&self, x: u32, y: u32) -> bool {
        let idx = y as usize * self.stride() + (x / 8) as usize;
        self.data[idx] & (0x80 >> (x % 8)) != 0
    }

    pub fn set(&mut self, x: u32, y: u32, white: bool) {
        let idx = y as usize * self.stride() + (x / 8) as usize;
        let bit = 0x80 >> (x % 8);
        if white {
            self.data[idx] |= bit;
        } else {
            self.data[idx] &= !bit;
        }
    }

    pub fn row(&self, y: u32) -> &[u8] {
        let stride = self.stride();
        let start = y as usize * stride;
        &self.data[start..start + stride]
    }

    /// Packed rows, ready for a 1-bpc image stream.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl PixelSource for BitImage {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn pixel_at(&self, x: u32, y: u32) -> PackedColor {
        if self.get(x, y) { WHITE } else { BLACK }
    }
}

/// Copy any pixel source into a fresh RGBA buffer.
pub fn to_rgba<P: PixelSource>(source: &P) -> RgbaImage {
    let (w, h) = source.dimensions();
    let mut out = RgbaImage::new(w, h);
    source.for_each_pixel(|x, y, c| out.put_pixel(x, y, unpack_rgba(c)));
    out
}
