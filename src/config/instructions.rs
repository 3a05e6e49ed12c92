// Phase 1: 指示ファイル (JSON) の読込とページ仕様への正規化

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::LayerError;
use crate::raster::rect::RectSpec;

/// A page entry that either parsed or carries the reason it did not.
pub type PageEntry<T> = std::result::Result<T, String>;

/// Instruction document. Two shapes are accepted.
///
/// Only the top level must be well formed. Every page entry is parsed on its
/// own so one malformed page does not reject its siblings.
#[derive(Debug, Clone)]
pub enum InstructionFile {
    /// `{"Pages": [...]}` with full per-page metadata.
    Layered(Vec<PageEntry<PageMark>>),
    /// `{"<image path>": [{"X0":..,"Y0":..,"X1":..,"Y1":..}], ...}`
    Rects(BTreeMap<String, PageEntry<Vec<RectSpec>>>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PageMark {
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub rotate: i64,
    /// Raster to segment with `rects`.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub rects: Vec<RectSpec>,
    /// Images placed as-is at explicit page positions.
    #[serde(default)]
    pub images: Vec<ImageMark>,
}

fn default_components() -> u8 {
    3
}

fn default_bits() -> u8 {
    8
}

fn one() -> u8 {
    1
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageMark {
    pub image_path: String,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    #[serde(default)]
    pub theta: f64,
    #[serde(default = "default_components")]
    pub color_components: u8,
    #[serde(default = "default_bits")]
    pub bits_per_component: u8,
    #[serde(default)]
    pub lossy: bool,
    #[serde(default)]
    pub mask: Option<MaskMark>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MaskMark {
    pub image_path: String,
    #[serde(default = "one")]
    pub color_components: u8,
    #[serde(default = "one")]
    pub bits_per_component: u8,
}

/// One output page, normalized from either instruction shape. Paths are
/// resolved against the instruction file's directory.
#[derive(Debug, Clone)]
pub struct PageSpec {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub rotate: i64,
    pub source: Option<PathBuf>,
    pub rects: Vec<RectSpec>,
    pub images: Vec<PlacedImage>,
    /// Why the page entry could not be parsed. Reported by [`PageSpec::validate`].
    pub malformed: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlacedImage {
    pub path: PathBuf,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub theta: f64,
    pub color_components: u8,
    pub bits_per_component: u8,
    pub lossy: bool,
    pub mask: Option<PlacedMask>,
}

#[derive(Debug, Clone)]
pub struct PlacedMask {
    pub path: PathBuf,
    pub color_components: u8,
    pub bits_per_component: u8,
}

impl InstructionFile {
    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        let shape_error = |detail: String| {
            LayerError::instructions(format!(
                "expected {{\"Pages\": [...]}} or {{\"<image>\": [rects]}}: {detail}"
            ))
        };

        let value: Value = serde_json::from_str(json).map_err(|e| shape_error(e.to_string()))?;
        let Value::Object(mut map) = value else {
            return Err(shape_error("top level is not an object".to_string()));
        };

        match map.remove("Pages") {
            Some(Value::Array(pages)) => Ok(InstructionFile::Layered(
                pages.into_iter().map(parse_entry).collect(),
            )),
            Some(_) => Err(shape_error("\"Pages\" is not an array".to_string())),
            None => Ok(InstructionFile::Rects(
                map.into_iter()
                    .map(|(image, rects)| (image, parse_entry(rects)))
                    .collect(),
            )),
        }
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LayerError::io_failure(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    /// Flatten into page specs. `default_page` is the page box used by the
    /// rectangle-only shape, which carries no page size.
    pub fn into_pages(self, base_dir: &Path, default_page: (f64, f64)) -> Vec<PageSpec> {
        match self {
            InstructionFile::Rects(map) => map
                .into_iter()
                .map(|(image, entry)| {
                    let (rects, malformed) = match entry {
                        Ok(rects) => (rects, None),
                        Err(e) => (Vec::new(), Some(e)),
                    };
                    PageSpec {
                        source: Some(resolve_path(base_dir, &image)),
                        id: image,
                        width: default_page.0,
                        height: default_page.1,
                        rotate: 0,
                        rects,
                        images: Vec::new(),
                        malformed,
                    }
                })
                .collect(),
            InstructionFile::Layered(pages) => pages
                .into_iter()
                .enumerate()
                .map(|(i, entry)| {
                    let id = format!("page {}", i + 1);
                    match entry {
                        Ok(page) => page.into_spec(id, base_dir),
                        Err(e) => PageSpec::unparsed(id, e),
                    }
                })
                .collect(),
        }
    }
}

fn parse_entry<T: DeserializeOwned>(value: Value) -> PageEntry<T> {
    serde_json::from_value(value).map_err(|e| format!("cannot parse page entry: {e}"))
}

impl PageMark {
    fn into_spec(self, id: String, base_dir: &Path) -> PageSpec {
        PageSpec {
            id,
            width: self.w,
            height: self.h,
            rotate: self.rotate,
            source: self.source.map(|s| resolve_path(base_dir, &s)),
            rects: self.rects,
            images: self
                .images
                .into_iter()
                .map(|img| PlacedImage {
                    path: resolve_path(base_dir, &img.image_path),
                    x: img.x,
                    y: img.y,
                    w: img.w,
                    h: img.h,
                    theta: img.theta,
                    color_components: img.color_components,
                    bits_per_component: img.bits_per_component,
                    lossy: img.lossy,
                    mask: img.mask.map(|m| PlacedMask {
                        path: resolve_path(base_dir, &m.image_path),
                        color_components: m.color_components,
                        bits_per_component: m.bits_per_component,
                    }),
                })
                .collect(),
            malformed: None,
        }
    }
}

/// Load and flatten an instruction file.
pub fn load_pages(path: &Path, default_page: (f64, f64)) -> crate::error::Result<Vec<PageSpec>> {
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    Ok(InstructionFile::from_file(path)?.into_pages(base_dir, default_page))
}

impl PageSpec {
    /// Placeholder for a page entry that could not be parsed. It keeps its
    /// position in the document so the page can be reported and skipped.
    fn unparsed(id: String, reason: String) -> Self {
        PageSpec {
            id,
            width: 0.0,
            height: 0.0,
            rotate: 0,
            source: None,
            rects: Vec::new(),
            images: Vec::new(),
            malformed: Some(reason),
        }
    }

    /// ラスタ処理前のページ単位の検証。
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(reason) = &self.malformed {
            return Err(LayerError::instructions(reason.clone()));
        }
        if !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
        {
            return Err(LayerError::instructions(format!(
                "page size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.rotate % 90 != 0 {
            return Err(LayerError::instructions(format!(
                "rotation must be a multiple of 90, got {}",
                self.rotate
            )));
        }
        if self.source.is_none() && !self.rects.is_empty() {
            return Err(LayerError::instructions(
                "rectangles given without a source image",
            ));
        }
        if self.source.is_none() && self.images.is_empty() {
            return Err(LayerError::instructions("page has nothing to draw"));
        }
        for (i, img) in self.images.iter().enumerate() {
            if !(img.w > 0.0 && img.h > 0.0) {
                return Err(LayerError::instructions(format!(
                    "image #{i}: size must be positive, got {}x{}",
                    img.w, img.h
                )));
            }
            check_depth(i, "image", img.color_components, img.bits_per_component)?;
            if let Some(mask) = &img.mask {
                check_depth(i, "mask", mask.color_components, mask.bits_per_component)?;
                if mask.color_components != 1 {
                    return Err(LayerError::instructions(format!(
                        "image #{i}: mask must have 1 color component, got {}",
                        mask.color_components
                    )));
                }
            }
        }
        Ok(())
    }
}

fn check_depth(i: usize, what: &str, components: u8, bits: u8) -> crate::error::Result<()> {
    if !matches!(components, 1 | 3) {
        return Err(LayerError::instructions(format!(
            "{what} #{i}: color components must be 1 or 3, got {components}"
        )));
    }
    if !matches!(bits, 1 | 8) {
        return Err(LayerError::instructions(format!(
            "{what} #{i}: bits per component must be 1 or 8, got {bits}"
        )));
    }
    if bits == 1 && components != 1 {
        return Err(LayerError::instructions(format!(
            "{what} #{i}: 1-bit images must have a single component"
        )));
    }
    Ok(())
}

/// Resolve a potentially relative path against a base directory.
/// If the path is already absolute, return it as-is.
pub fn resolve_path(base_dir: &Path, path: impl AsRef<Path>) -> PathBuf {
    let p = path.as_ref();
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}
