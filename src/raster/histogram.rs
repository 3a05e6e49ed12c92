// Phase 3: 色ヒストグラムと bilevel / quantizable 判定

use std::collections::HashMap;

use serde::Deserialize;

use super::pixels::{PackedColor, PixelSource};

/// Color histogram of one raster.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    total: u64,
    counts: HashMap<PackedColor, u64>,
}

impl Histogram {
    /// Count every pixel of `raster` once.
    pub fn from_pixels<P: PixelSource>(raster: &P) -> Self {
        let mut counts: HashMap<PackedColor, u64> = HashMap::new();
        let mut total = 0u64;
        raster.for_each_pixel(|_, _, c| {
            *counts.entry(c).or_insert(0) += 1;
            total += 1;
        });
        Self { total, counts }
    }

    /// Pixel count `n` (width × height).
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn distinct_colors(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, color: PackedColor) -> u64 {
        self.counts.get(&color).copied().unwrap_or(0)
    }

    pub fn counts(&self) -> &HashMap<PackedColor, u64> {
        &self.counts
    }

    /// Colors by descending count; ties by ascending packed value.
    pub fn ranked(&self) -> Vec<(PackedColor, u64)> {
        let mut ranked: Vec<(PackedColor, u64)> =
            self.counts.iter().map(|(&c, &n)| (c, n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }

    /// Fraction of pixels covered by the `max_colors` most frequent colors.
    ///
    /// An empty raster is fully covered.
    pub fn coverage(&self, max_colors: usize) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        let cumulative: u64 = self
            .ranked()
            .iter()
            .take(max_colors)
            .map(|&(_, n)| n)
            .sum();
        cumulative as f64 / self.total as f64
    }

    pub fn dominant_color(&self) -> Option<PackedColor> {
        self.ranked().first().map(|&(c, _)| c)
    }

    pub fn satisfies(&self, params: &ClassifyParams) -> bool {
        self.coverage(params.max_colors) >= params.threshold
    }
}

/// `(max_colors, threshold)` pair of a classification predicate.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ClassifyParams {
    pub max_colors: usize,
    pub threshold: f64,
}

impl ClassifyParams {
    pub const BILEVEL: ClassifyParams = ClassifyParams {
        max_colors: 2,
        threshold: 0.99,
    };

    pub const QUANTIZABLE: ClassifyParams = ClassifyParams {
        max_colors: 255,
        threshold: 0.99,
    };
}

/// True when the `max_colors` most frequent colors cover at least `threshold`
/// of the pixels.
pub fn classify<P: PixelSource>(raster: &P, params: &ClassifyParams) -> bool {
    Histogram::from_pixels(raster).satisfies(params)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_bilevel: bool,
    /// Palette-reduction candidate. Informational only.
    pub is_quantizable: bool,
}

impl Classification {
    pub fn from_histogram(
        hist: &Histogram,
        bilevel: &ClassifyParams,
        quantizable: &ClassifyParams,
    ) -> Self {
        Self {
            is_bilevel: hist.satisfies(bilevel),
            is_quantizable: hist.satisfies(quantizable),
        }
    }

    pub fn of<P: PixelSource>(
        raster: &P,
        bilevel: &ClassifyParams,
        quantizable: &ClassifyParams,
    ) -> Self {
        Self::from_histogram(&Histogram::from_pixels(raster), bilevel, quantizable)
    }
}
