// Phase 5: レイヤ種別 + 分類結果 → コーデック選択

use super::LayerRole;
use crate::error::LayerError;
use crate::raster::histogram::Classification;

/// Default DCT quality: low fidelity, chosen for photographic fragments where
/// file size matters more than fidelity.
pub const DEFAULT_JPEG_QUALITY: u8 = 25;

/// CCITT G4 line width limit of the bitonal encoder.
pub const MAX_BITONAL_COLUMNS: u32 = u16::MAX as u32;

/// Codec assigned to a layer, with the parameters it is encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// Deflate, lossless.
    Flate,
    /// Baseline JPEG.
    Dct { quality: u8 },
    /// CCITT Group 4, one bit per pixel.
    CcittG4 { columns: u32 },
}

impl Codec {
    pub fn bits_per_component(&self) -> u8 {
        match self {
            Codec::CcittG4 { .. } => 1,
            Codec::Flate | Codec::Dct { .. } => 8,
        }
    }

    /// PDF filter name of the encoded stream.
    pub fn filter_name(&self) -> &'static str {
        match self {
            Codec::Flate => "FlateDecode",
            Codec::Dct { .. } => "DCTDecode",
            Codec::CcittG4 { .. } => "CCITTFaxDecode",
        }
    }

    pub fn is_bitonal(&self) -> bool {
        matches!(self, Codec::CcittG4 { .. })
    }
}

#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub jpeg_quality: u8,
    /// Classify foreground fragments and send bilevel ones to the bitonal codec.
    pub classify_foreground: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            classify_foreground: false,
        }
    }
}

/// Maps a layer's role and classification to a codec. Performs no I/O.
#[derive(Debug, Clone)]
pub struct EncoderPolicy {
    config: PolicyConfig,
}

impl EncoderPolicy {
    pub fn new(config: PolicyConfig) -> crate::error::Result<Self> {
        if !(1..=100).contains(&config.jpeg_quality) {
            return Err(LayerError::unsupported_encoding(format!(
                "JPEG quality must be 1-100, got {}",
                config.jpeg_quality
            )));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn classifies_foreground(&self) -> bool {
        self.config.classify_foreground
    }

    fn dct(&self) -> Codec {
        Codec::Dct {
            quality: self.config.jpeg_quality,
        }
    }

    fn bitonal(width: u32) -> crate::error::Result<Codec> {
        if width == 0 || width > MAX_BITONAL_COLUMNS {
            return Err(LayerError::unsupported_encoding(format!(
                "bitonal codec cannot encode {width} columns"
            )));
        }
        Ok(Codec::CcittG4 { columns: width })
    }

    /// Select the codec for a segmented layer of the given pixel `width`.
    pub fn select(
        &self,
        role: LayerRole,
        classification: Option<&Classification>,
        width: u32,
    ) -> crate::error::Result<Codec> {
        match role {
            LayerRole::Background | LayerRole::Mask(_) => match classification {
                Some(c) if c.is_bilevel => Self::bitonal(width),
                Some(_) => Ok(Codec::Flate),
                None => Err(LayerError::unsupported_encoding(format!(
                    "{role} layer has no classification"
                ))),
            },
            LayerRole::Foreground(_) => match classification {
                Some(c) if self.config.classify_foreground && c.is_bilevel => Self::bitonal(width),
                _ => Ok(self.dct()),
            },
        }
    }

    /// Select the codec for an explicitly placed image or mask from its
    /// declared bit depth and lossy flag.
    pub fn select_declared(
        &self,
        bits_per_component: u8,
        lossy: bool,
        width: u32,
    ) -> crate::error::Result<Codec> {
        match (bits_per_component, lossy) {
            (1, _) => Self::bitonal(width),
            (8, true) => Ok(self.dct()),
            (8, false) => Ok(Codec::Flate),
            (bpc, _) => Err(LayerError::unsupported_encoding(format!(
                "no codec for {bpc} bits per component"
            ))),
        }
    }
}
