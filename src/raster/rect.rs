// Phase 2: 矩形演算 (dilation, union, crop windows)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LayerError;

/// Half-open integer rectangle `[x0, x1) × [y0, y1)` in raster pixels.
///
/// `x0 <= x1` and `y0 <= y1` always hold; the only ways to build one are the
/// checked constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
}

/// Unvalidated rectangle record as it appears in instruction documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct RectSpec {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

impl Rect {
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> crate::error::Result<Self> {
        if x1 < x0 || y1 < y0 {
            return Err(LayerError::geometry(format!(
                "inverted rectangle (X0={x0}, Y0={y0}, X1={x1}, Y1={y1})"
            )));
        }
        Ok(Self { x0, y0, x1, y1 })
    }

    /// Rectangle covering a `width` x `height` raster, anchored at the origin.
    pub fn from_size(width: u32, height: u32) -> crate::error::Result<Self> {
        let w = i32::try_from(width)
            .map_err(|_| LayerError::geometry(format!("width {width} out of range")))?;
        let h = i32::try_from(height)
            .map_err(|_| LayerError::geometry(format!("height {height} out of range")))?;
        Ok(Self {
            x0: 0,
            y0: 0,
            x1: w,
            y1: h,
        })
    }

    pub fn x0(&self) -> i32 {
        self.x0
    }

    pub fn y0(&self) -> i32 {
        self.y0
    }

    pub fn x1(&self) -> i32 {
        self.x1
    }

    pub fn y1(&self) -> i32 {
        self.y1
    }

    /// Absolute box as `(x0, y0, x1, y1)`.
    pub fn bounds(&self) -> (i32, i32, i32, i32) {
        (self.x0, self.y0, self.x1, self.y1)
    }

    /// Top-left corner.
    pub fn position(&self) -> (i32, i32) {
        (self.x0, self.y0)
    }

    /// Same size, anchored at the origin. Destination window of a crop.
    pub fn zero_bounds(&self) -> Rect {
        Rect {
            x0: 0,
            y0: 0,
            x1: self.x1 - self.x0,
            y1: self.y1 - self.y0,
        }
    }

    pub fn width(&self) -> u32 {
        self.x1.abs_diff(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.abs_diff(self.y0)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.x0 == self.x1 || self.y0 == self.y1
    }

    /// `other` が完全に内側にあるか（辺の一致は内側扱い）。
    pub fn contains(&self, other: &Rect) -> bool {
        self.x0 <= other.x0 && self.y0 <= other.y0 && self.x1 >= other.x1 && self.y1 >= other.y1
    }

    /// This rectangle grown (`d > 0`) or shrunk (`d < 0`) by `d` on all 4 sides.
    pub fn dilated(&self, d: i32) -> crate::error::Result<Rect> {
        if d < 0 {
            let min = 2 * d.unsigned_abs() as u64;
            if (self.width() as u64) < min || (self.height() as u64) < min {
                return Err(LayerError::geometry(format!(
                    "{self}: {}x{} is too small to shrink by {}",
                    self.width(),
                    self.height(),
                    d.unsigned_abs()
                )));
            }
        }
        let overflow = || LayerError::geometry(format!("{self}: dilation by {d} overflows"));
        Ok(Rect {
            x0: self.x0.checked_sub(d).ok_or_else(overflow)?,
            y0: self.y0.checked_sub(d).ok_or_else(overflow)?,
            x1: self.x1.checked_add(d).ok_or_else(overflow)?,
            y1: self.y1.checked_add(d).ok_or_else(overflow)?,
        })
    }

    /// Overlapping window of two rectangles, `None` when they do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 < x1 && y0 < y1 {
            Some(Rect { x0, y0, x1, y1 })
        } else {
            None
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x0, self.y0, self.x1, self.y1)
    }
}

impl TryFrom<RectSpec> for Rect {
    type Error = LayerError;

    fn try_from(spec: RectSpec) -> Result<Self, Self::Error> {
        Rect::new(spec.x0, spec.y0, spec.x1, spec.y1)
    }
}

impl From<Rect> for RectSpec {
    fn from(r: Rect) -> Self {
        RectSpec {
            x0: r.x0,
            y0: r.y0,
            x1: r.x1,
            y1: r.y1,
        }
    }
}

/// Validate a list of rectangle records, naming the index of the first bad one.
pub fn validate_all(specs: &[RectSpec]) -> crate::error::Result<Vec<Rect>> {
    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            Rect::try_from(*spec).map_err(|e| match e {
                LayerError::InvalidGeometry(msg) => {
                    LayerError::geometry(format!("rect #{i}: {msg}"))
                }
                other => other,
            })
        })
        .collect()
}

/// Smallest rectangle containing every input. `None` for an empty list.
///
/// The accumulator starts from the first rectangle so that inputs lying left
/// of or above the origin are handled.
pub fn union(rects: &[Rect]) -> Option<Rect> {
    let (first, rest) = rects.split_first()?;
    Some(rest.iter().fold(*first, |u, r| Rect {
        x0: u.x0.min(r.x0),
        y0: u.y0.min(r.y0),
        x1: u.x1.max(r.x1),
        y1: u.y1.max(r.y1),
    }))
}

/// Grow (`d > 0`) or shrink (`d < 0`) every rectangle by `d` on all 4 sides.
///
/// Shrinking a rectangle narrower or shorter than `2·|d|` would invert it and
/// is rejected with the index of the offending rectangle.
pub fn dilate(rects: &[Rect], d: i32) -> crate::error::Result<Vec<Rect>> {
    rects
        .iter()
        .enumerate()
        .map(|(i, r)| r.dilated(d).map_err(|e| at_index(i, e)))
        .collect()
}

/// Prefix a geometry error with the index of the rectangle it concerns.
pub fn at_index(i: usize, e: LayerError) -> LayerError {
    match e {
        LayerError::InvalidGeometry(msg) => LayerError::geometry(format!("rect #{i} {msg}")),
        other => other,
    }
}
