// Phase 9: ページ単位処理: 検証 → ラスタ読込 → レイヤ生成 → 配置計算 → 出力

use std::path::Path;

use image::RgbaImage;

use crate::config::instructions::{PageSpec, PlacedImage};
use crate::config::merged::RunConfig;
use crate::config::settings::Mode;
use crate::error::LayerError;
use crate::layers::EncodedLayer;
use crate::layers::codec::{self, ColorModel, EncodedImage};
use crate::layers::compositor::{LayerCompositor, LayerDump};
use crate::layers::policy::EncoderPolicy;
use crate::layers::segmenter;
use crate::pdf::layout::{Frame, Placement, compute_scale};
use crate::pdf::writer::PageComposer;
use crate::raster::rect::{self, Rect};

/// A page whose instructions and geometry have been checked and whose source
/// raster is loaded. No raster operation has run yet.
pub struct PreparedPage<'a> {
    pub spec: &'a PageSpec,
    pub raster: Option<RgbaImage>,
    pub rects: Vec<Rect>,
}

/// An explicitly placed image, encoded and ready for emission.
pub struct RenderedImage {
    pub image: EncodedImage,
    pub mask: Option<EncodedImage>,
    pub frame: Frame,
    pub theta: f64,
}

/// A fully encoded page. Emitting it performs no further raster work.
pub struct RenderedPage {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub rotate: i64,
    pub layers: Vec<EncodedLayer>,
    /// Shared by every segmented layer of the page.
    pub placement: Option<Placement>,
    pub images: Vec<RenderedImage>,
}

/// Validate a page and load its source raster.
///
/// `InvalidGeometry` and `MalformedInstructions` from here are recoverable:
/// the caller may skip the page. A source that cannot be read is an
/// `IoFailure`.
pub fn prepare_page<'a>(spec: &'a PageSpec, config: &RunConfig) -> crate::error::Result<PreparedPage<'a>> {
    spec.validate()?;
    let rects = rect::validate_all(&spec.rects)?;
    if config.mode != Mode::Plain {
        segmenter::knockout_rects(&rects, config.segmenter.dilation)?;
        segmenter::grown_rects(&rects, config.segmenter.foreground_grow)?;
    }

    let raster = match &spec.source {
        Some(path) => Some(codec::load_raster(path)?),
        None => None,
    };

    if let Some(raster) = &raster {
        let bounds = Rect::from_size(raster.width(), raster.height())?;
        for (i, r) in rects.iter().enumerate() {
            if !bounds.contains(r) {
                return Err(LayerError::geometry(format!(
                    "rect #{i} {r} lies outside the {}x{} source image",
                    raster.width(),
                    raster.height()
                )));
            }
        }
    }

    Ok(PreparedPage { spec, raster, rects })
}

/// Run segmentation, classification, codec selection and encoding.
///
/// Every error from here on aborts the document.
pub fn render_page(
    page: PreparedPage<'_>,
    compositor: &LayerCompositor<'_>,
    policy: &EncoderPolicy,
    dump: Option<&LayerDump>,
) -> crate::error::Result<RenderedPage> {
    let spec = page.spec;

    let (layers, placement) = match &page.raster {
        Some(raster) => {
            let layers = compositor.compose(raster, &page.rects, dump)?;
            let placement = compute_scale(
                spec.width,
                spec.height,
                raster.width() as f64,
                raster.height() as f64,
            )?;
            tracing::debug!(
                scale = placement.scale,
                x_offset = placement.x_offset,
                y_offset = placement.y_offset,
                "page '{}' placement",
                spec.id
            );
            (layers, Some(placement))
        }
        None => (Vec::new(), None),
    };

    let images = spec
        .images
        .iter()
        .enumerate()
        .map(|(i, img)| render_placed_image(i, img, compositor, policy, dump))
        .collect::<crate::error::Result<Vec<_>>>()?;

    Ok(RenderedPage {
        id: spec.id.clone(),
        width: spec.width,
        height: spec.height,
        rotate: spec.rotate,
        layers,
        placement,
        images,
    })
}

fn render_placed_image(
    index: usize,
    img: &PlacedImage,
    compositor: &LayerCompositor<'_>,
    policy: &EncoderPolicy,
    dump: Option<&LayerDump>,
) -> crate::error::Result<RenderedImage> {
    let raster = codec::load_raster(&img.path)?;
    let image = encode_declared(
        &raster,
        policy,
        img.color_components,
        img.bits_per_component,
        img.lossy,
    )?;

    let mask = match &img.mask {
        Some(m) => {
            let mask_raster = codec::load_raster(&m.path)?;
            let layer = compositor.compose_mask(index, mask_raster, m.bits_per_component, dump)?;
            Some(layer.image)
        }
        None => None,
    };

    Ok(RenderedImage {
        image,
        mask,
        frame: Frame {
            x: img.x,
            y: img.y,
            width: img.w,
            height: img.h,
        },
        theta: img.theta,
    })
}

fn encode_declared(
    raster: &RgbaImage,
    policy: &EncoderPolicy,
    components: u8,
    bits_per_component: u8,
    lossy: bool,
) -> crate::error::Result<EncodedImage> {
    let model = ColorModel::from_components(components)?;
    let codec = policy.select_declared(bits_per_component, lossy, raster.width())?;
    codec::encode(raster, codec, model)
}

/// Emit a rendered page: segmented layers in paint order, then placed images.
pub fn emit_page<C: PageComposer>(page: &RenderedPage, composer: &mut C) -> crate::error::Result<()> {
    composer.add_page(page.width, page.height, page.rotate)?;

    if let Some(placement) = &page.placement {
        for layer in &page.layers {
            let frame = placement.frame(&layer.placement);
            composer.add_image(&layer.image, &frame, 0.0, None)?;
        }
    }

    for img in &page.images {
        composer.add_image(&img.image, &img.frame, img.theta, img.mask.as_ref())?;
    }
    Ok(())
}

/// File-name stem for the intermediate layers of page `index`.
pub fn layer_stem(index: usize, spec: &PageSpec) -> String {
    let stem = spec
        .source
        .as_deref()
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    format!("{:03}-{stem}", index + 1)
}
