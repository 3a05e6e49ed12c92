// Phase 5: コーデック呼び出し (DCT / Flate / CCITT G4) とラスタ読込

use std::io::{Cursor, Write};
use std::path::Path;

use fax::encoder::Encoder;
use fax::{Color, VecWriter};
use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::{DynamicImage, GrayImage, RgbImage, RgbaImage};

use super::policy::{Codec, MAX_BITONAL_COLUMNS};
use crate::error::LayerError;
use crate::raster::pixels::BitImage;
use crate::raster::threshold;

/// Color model of an encoded image stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorModel {
    Rgb,
    Gray,
}

impl ColorModel {
    /// From a declared component count (1 or 3).
    pub fn from_components(components: u8) -> crate::error::Result<Self> {
        match components {
            1 => Ok(ColorModel::Gray),
            3 => Ok(ColorModel::Rgb),
            n => Err(LayerError::unsupported_encoding(format!(
                "unsupported color component count {n}"
            ))),
        }
    }
}

/// An encoded image stream plus what a PDF image XObject needs to describe it.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub data: Vec<u8>,
    pub codec: Codec,
    pub color_space: &'static str,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn bits_per_component(&self) -> u8 {
        self.codec.bits_per_component()
    }
}

/// Encode `raster` with `codec`.
///
/// The bitonal path converts to gray and thresholds first; alpha is dropped
/// on every path.
pub fn encode(raster: &RgbaImage, codec: Codec, model: ColorModel) -> crate::error::Result<EncodedImage> {
    let (width, height) = raster.dimensions();
    if width == 0 || height == 0 {
        return Err(LayerError::encode(format!(
            "cannot encode an empty {width}x{height} raster"
        )));
    }

    let (data, color_space) = match codec {
        Codec::Dct { quality } => match model {
            ColorModel::Rgb => (encode_rgb_to_jpeg(&to_rgb(raster), quality)?, "DeviceRGB"),
            ColorModel::Gray => (encode_gray_to_jpeg(&to_gray(raster), quality)?, "DeviceGray"),
        },
        Codec::Flate => match model {
            ColorModel::Rgb => (encode_flate(to_rgb(raster).as_raw())?, "DeviceRGB"),
            ColorModel::Gray => (encode_flate(to_gray(raster).as_raw())?, "DeviceGray"),
        },
        Codec::CcittG4 { columns } => {
            if columns != width {
                return Err(LayerError::encode(format!(
                    "CCITT columns {columns} do not match raster width {width}"
                )));
            }
            (encode_ccitt_g4(&threshold::to_bilevel(raster))?, "DeviceGray")
        }
    };

    Ok(EncodedImage {
        data,
        codec,
        color_space,
        width,
        height,
    })
}

fn to_rgb(raster: &RgbaImage) -> RgbImage {
    DynamicImage::ImageRgba8(raster.clone()).to_rgb8()
}

fn to_gray(raster: &RgbaImage) -> GrayImage {
    DynamicImage::ImageRgba8(raster.clone()).to_luma8()
}

/// Encode an RGB image to JPEG bytes at `quality` (1-100).
pub fn encode_rgb_to_jpeg(rgb: &RgbImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    check_quality(quality)?;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    rgb.write_with_encoder(encoder)
        .map_err(|e| LayerError::encode(format!("JPEG encode error: {e}")))?;
    Ok(buf.into_inner())
}

/// Encode a grayscale image to JPEG bytes at `quality` (1-100).
pub fn encode_gray_to_jpeg(gray: &GrayImage, quality: u8) -> crate::error::Result<Vec<u8>> {
    check_quality(quality)?;
    let mut buf = Cursor::new(Vec::new());
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, quality);
    gray.write_with_encoder(encoder)
        .map_err(|e| LayerError::encode(format!("JPEG encode error: {e}")))?;
    Ok(buf.into_inner())
}

fn check_quality(quality: u8) -> crate::error::Result<()> {
    if !(1..=100).contains(&quality) {
        return Err(LayerError::unsupported_encoding(format!(
            "JPEG quality must be 1-100, got {quality}"
        )));
    }
    Ok(())
}

/// zlib-compress raw sample bytes for a `FlateDecode` stream.
pub fn encode_flate(raw: &[u8]) -> crate::error::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(raw)
        .map_err(|e| LayerError::encode(format!("Flate encode error: {e}")))?;
    encoder
        .finish()
        .map_err(|e| LayerError::encode(format!("Flate encode error: {e}")))
}

/// CCITT Group 4 (`K = -1`) encoding of a 1-bit image.
pub fn encode_ccitt_g4(bits: &BitImage) -> crate::error::Result<Vec<u8>> {
    if bits.width() == 0 || bits.width() > MAX_BITONAL_COLUMNS {
        return Err(LayerError::unsupported_encoding(format!(
            "bitonal codec cannot encode {} columns",
            bits.width()
        )));
    }
    let columns = bits.width() as u16;

    let mut encoder = Encoder::new(VecWriter::new());
    for y in 0..bits.height() {
        let line = (0..bits.width()).map(|x| {
            if bits.get(x, y) {
                Color::White
            } else {
                Color::Black
            }
        });
        encoder
            .encode_line(line, columns)
            .map_err(|e| LayerError::encode(format!("CCITT G4 line {y}: {e:?}")))?;
    }
    let writer = encoder
        .finish()
        .map_err(|e| LayerError::encode(format!("CCITT G4 finish: {e:?}")))?;
    Ok(writer.finish())
}

/// Decode the raster stored at `path` into RGBA.
pub fn load_raster(path: &Path) -> crate::error::Result<RgbaImage> {
    let reader = image::ImageReader::open(path)
        .map_err(|e| LayerError::io_failure(format!("cannot open {}: {e}", path.display())))?
        .with_guessed_format()
        .map_err(|e| LayerError::io_failure(format!("cannot read {}: {e}", path.display())))?;
    let img = reader
        .decode()
        .map_err(|e| LayerError::io_failure(format!("cannot decode {}: {e}", path.display())))?;
    Ok(img.to_rgba8())
}
