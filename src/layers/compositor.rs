// Phase 6: パイプライン統合: raster + rects + config -> EncodedLayer 列

use std::path::PathBuf;

use image::RgbaImage;

use super::codec::{self, ColorModel, EncodedImage};
use super::policy::{Codec, EncoderPolicy};
use super::segmenter::Segmenter;
use super::{EncodedLayer, Layer, LayerRole};
use crate::config::merged::RunConfig;
use crate::config::settings::{Mode, PlainEncoding};
use crate::error::LayerError;
use crate::raster::histogram::Classification;
use crate::raster::rect::Rect;

/// Where intermediate layer rasters of one page are written.
#[derive(Debug, Clone)]
pub struct LayerDump {
    pub dir: PathBuf,
    pub stem: String,
}

impl LayerDump {
    fn path_for(&self, role: LayerRole, codec: Codec) -> PathBuf {
        let ext = match codec {
            Codec::Dct { .. } => "jpg",
            Codec::Flate | Codec::CcittG4 { .. } => "png",
        };
        let name = match role {
            LayerRole::Background => format!("{}.bgd.{ext}", self.stem),
            LayerRole::Foreground(i) => format!("{}-{i:03}.fgd.{ext}", self.stem),
            LayerRole::Mask(i) => format!("{}-{i:03}.mask.{ext}", self.stem),
        };
        self.dir.join(name)
    }

    /// Write one layer. DCT layers are written as their encoded JPEG bytes,
    /// everything else as PNG of the pre-encoding raster.
    pub fn write(&self, layer: &Layer, encoded: &EncodedImage) -> crate::error::Result<PathBuf> {
        let path = self.path_for(layer.role, encoded.codec);
        let written = match encoded.codec {
            Codec::Dct { .. } => std::fs::write(&path, &encoded.data).map_err(|e| e.to_string()),
            Codec::Flate | Codec::CcittG4 { .. } => layer
                .raster
                .save_with_format(&path, image::ImageFormat::Png)
                .map_err(|e| e.to_string()),
        };
        written.map_err(|e| {
            LayerError::io_failure(format!("cannot write layer {}: {e}", path.display()))
        })?;
        Ok(path)
    }
}

/// Builds the encoded layers of one page.
pub struct LayerCompositor<'a> {
    config: &'a RunConfig,
    segmenter: &'a Segmenter,
    policy: &'a EncoderPolicy,
}

impl<'a> LayerCompositor<'a> {
    pub fn new(config: &'a RunConfig, segmenter: &'a Segmenter, policy: &'a EncoderPolicy) -> Self {
        Self {
            config,
            segmenter,
            policy,
        }
    }

    /// Segment, classify, select codecs and encode, in paint order:
    /// background first, then foreground fragments by rectangle index.
    ///
    /// # Arguments
    /// * `raster` - Source page raster
    /// * `rects`  - Foreground rectangles, already validated
    /// * `dump`   - Optional destination for intermediate layer files
    pub fn compose(
        &self,
        raster: &RgbaImage,
        rects: &[Rect],
        dump: Option<&LayerDump>,
    ) -> crate::error::Result<Vec<EncodedLayer>> {
        let mode = self.config.mode;
        if mode == Mode::Plain {
            let layer = Layer {
                role: LayerRole::Background,
                raster: raster.clone(),
                placement: Rect::from_size(raster.width(), raster.height())?,
            };
            let lossy = self.config.plain_encoding == PlainEncoding::Lossy;
            let codec = self.policy.select_declared(8, lossy, raster.width())?;
            return Ok(vec![self.encode_layer(layer, codec, ColorModel::Rgb, None, dump)?]);
        }

        let segmentation = self.segmenter.segment(raster, rects, self.config.fill)?;
        let mut out = Vec::with_capacity(segmentation.foreground.len() + 1);

        if mode.emits_background() {
            let bg = segmentation.background;
            let class = Classification::of(&bg.raster, &self.config.bilevel, &self.config.quantizable);
            tracing::debug!(
                bilevel = class.is_bilevel,
                quantizable = class.is_quantizable,
                "background classified"
            );
            let codec = self.policy.select(bg.role, Some(&class), bg.raster.width())?;
            out.push(self.encode_layer(bg, codec, ColorModel::Rgb, Some(class), dump)?);
        }

        if mode.emits_foreground() {
            for fg in segmentation.foreground {
                if fg.placement.is_empty() {
                    tracing::debug!(role = %fg.role, "skipping empty foreground rectangle");
                    continue;
                }
                let class = self.policy.classifies_foreground().then(|| {
                    Classification::of(&fg.raster, &self.config.bilevel, &self.config.quantizable)
                });
                let codec = self.policy.select(fg.role, class.as_ref(), fg.raster.width())?;
                out.push(self.encode_layer(fg, codec, ColorModel::Rgb, class, dump)?);
            }
        }

        Ok(out)
    }

    /// Encode the soft mask of placed image `index` as a gray layer.
    ///
    /// A 1-bit mask keeps its declared depth. Deeper masks follow the
    /// background rule: bilevel goes to the bitonal codec, anything else is
    /// kept lossless.
    pub fn compose_mask(
        &self,
        index: usize,
        raster: RgbaImage,
        bits_per_component: u8,
        dump: Option<&LayerDump>,
    ) -> crate::error::Result<EncodedLayer> {
        let layer = Layer {
            role: LayerRole::Mask(index),
            placement: Rect::from_size(raster.width(), raster.height())?,
            raster,
        };
        let width = layer.raster.width();

        if bits_per_component == 1 {
            let codec = self.policy.select_declared(1, false, width)?;
            return self.encode_layer(layer, codec, ColorModel::Gray, None, dump);
        }

        let class = Classification::of(&layer.raster, &self.config.bilevel, &self.config.quantizable);
        tracing::debug!(
            role = %layer.role,
            bilevel = class.is_bilevel,
            quantizable = class.is_quantizable,
            "mask classified"
        );
        let codec = self.policy.select(layer.role, Some(&class), width)?;
        self.encode_layer(layer, codec, ColorModel::Gray, Some(class), dump)
    }

    fn encode_layer(
        &self,
        layer: Layer,
        codec: Codec,
        model: ColorModel,
        classification: Option<Classification>,
        dump: Option<&LayerDump>,
    ) -> crate::error::Result<EncodedLayer> {
        let image = codec::encode(&layer.raster, codec, model)?;
        tracing::debug!(
            role = %layer.role,
            filter = codec.filter_name(),
            bytes = image.data.len(),
            "encoded {}x{} layer",
            image.width,
            image.height
        );
        if let Some(dump) = dump {
            let path = dump.write(&layer, &image)?;
            tracing::debug!(path = %path.display(), "saved {}", layer.role);
        }
        Ok(EncodedLayer {
            role: layer.role,
            placement: layer.placement,
            codec,
            image,
            classification,
        })
    }
}
