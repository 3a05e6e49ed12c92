use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::layers::policy::DEFAULT_JPEG_QUALITY;
use crate::layers::segmenter::KnockoutColor;
use crate::raster::histogram::ClassifyParams;

/// ページの出力モード（1回の実行につき1つ）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// No segmentation: the whole source image on the page.
    Plain,
    /// Knocked-out background only.
    BackgroundOnly,
    /// Foreground fragments only.
    ForegroundOnly,
    /// Background with the foreground fragments overlaid.
    #[default]
    Compound,
}

impl Mode {
    pub fn parse(s: &str) -> crate::error::Result<Self> {
        match s {
            "plain" => Ok(Mode::Plain),
            "background_only" | "bgd" => Ok(Mode::BackgroundOnly),
            "foreground_only" | "fgd" => Ok(Mode::ForegroundOnly),
            "compound" => Ok(Mode::Compound),
            other => Err(crate::error::LayerError::config(format!(
                "unknown mode '{other}' (expected plain, background_only, foreground_only, compound)"
            ))),
        }
    }

    pub fn emits_background(self) -> bool {
        matches!(self, Mode::BackgroundOnly | Mode::Compound)
    }

    pub fn emits_foreground(self) -> bool {
        matches!(self, Mode::ForegroundOnly | Mode::Compound)
    }
}

/// Plain モードでの全面画像のエンコード。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlainEncoding {
    #[default]
    Lossless,
    Lossy,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: Mode,
    /// Target page box for instruction documents that carry no page size (points).
    pub page_width: f64,
    pub page_height: f64,
    pub jpeg_quality: u8,
    pub dilation: i32,
    pub foreground_grow: i32,
    pub knockout_color: KnockoutColor,
    pub highlight_color: [u8; 3],
    pub highlight: bool,
    pub classify_foreground: bool,
    pub plain_encoding: PlainEncoding,
    pub bilevel: ClassifyParams,
    pub quantizable: ClassifyParams,
    /// Intermediate layer dump root, relative to the instruction file.
    pub layer_dir: Option<PathBuf>,
    pub parallel_workers: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            mode: Mode::Compound,
            // US Letter
            page_width: 8.5 * 72.0,
            page_height: 11.0 * 72.0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            dilation: 2,
            foreground_grow: 0,
            knockout_color: KnockoutColor::White,
            highlight_color: [0x00, 0x00, 0xFF],
            highlight: false,
            classify_foreground: false,
            plain_encoding: PlainEncoding::Lossless,
            bilevel: ClassifyParams::BILEVEL,
            quantizable: ClassifyParams::QUANTIZABLE,
            layer_dir: None,
            parallel_workers: 0,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> crate::error::Result<Self> {
        serde_yml::from_str(yaml).map_err(|e| {
            crate::error::LayerError::config(format!("Failed to parse settings YAML: {e}"))
        })
    }

    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }
}
