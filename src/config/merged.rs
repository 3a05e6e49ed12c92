use std::path::PathBuf;

use super::settings::{Mode, PlainEncoding, Settings};
use crate::layers::policy::PolicyConfig;
use crate::layers::segmenter::{FillStyle, SegmenterConfig};
use crate::raster::histogram::ClassifyParams;

/// Command-line values that take precedence over `settings.yaml`.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<Mode>,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub mode: Mode,
    pub page_width: f64,
    pub page_height: f64,
    pub fill: FillStyle,
    pub plain_encoding: PlainEncoding,
    pub bilevel: ClassifyParams,
    pub quantizable: ClassifyParams,
    pub segmenter: SegmenterConfig,
    pub policy: PolicyConfig,
    pub layer_dir: Option<PathBuf>,
    pub parallel_workers: usize,
}

impl RunConfig {
    /// OverridesのOption値がSomeならその値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, overrides: &Overrides) -> Self {
        RunConfig {
            mode: overrides.mode.unwrap_or(settings.mode),
            page_width: settings.page_width,
            page_height: settings.page_height,
            fill: if settings.highlight {
                FillStyle::Highlight
            } else {
                FillStyle::Knockout
            },
            plain_encoding: settings.plain_encoding,
            bilevel: settings.bilevel,
            quantizable: settings.quantizable,
            segmenter: SegmenterConfig {
                knockout_color: settings.knockout_color,
                highlight_color: settings.highlight_color,
                dilation: settings.dilation,
                foreground_grow: settings.foreground_grow,
            },
            policy: PolicyConfig {
                jpeg_quality: settings.jpeg_quality,
                classify_foreground: settings.classify_foreground,
            },
            layer_dir: settings.layer_dir.clone(),
            parallel_workers: settings.parallel_workers,
        }
    }
}

impl Default for RunConfig {
    fn default() -> Self {
        Self::new(&Settings::default(), &Overrides::default())
    }
}
