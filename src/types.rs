//! Core value types for display controls
//!
//! This module contains the attribute value types pushed to visual objects
//! and the geometric types used by views and data selections.
//!
//! # Main Types
//!
//! - [`Color`] - RGBA color for single-color visuals
//! - [`Range`] / [`SelectRange`] - numeric data ranges and the select filter
//! - [`ColorTable`] - a named list of RGBA entries, with dimness applied on push
//! - [`ContourSpec`] - interval/base/min/max contour description
//! - [`Smoothing`] - smoothing kernel selection
//! - [`LatLonBox`] / [`ScreenBounds`] - geographic and screen extents

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lower bound of the dimness scalar
pub const MIN_DIMNESS: f32 = 0.1;

/// Upper bound of the dimness scalar
pub const MAX_DIMNESS: f32 = 1.0;

/// RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const ORANGE: Color = Color::rgb(255, 165, 0);

    /// Opaque color from RGB components
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a color name or `#rrggbb` / `#rrggbbaa` hex string
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if let Some(hex) = text.strip_prefix('#') {
            let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
            return match hex.len() {
                6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
                8 => Some(Color {
                    r: byte(0)?,
                    g: byte(2)?,
                    b: byte(4)?,
                    a: byte(6)?,
                }),
                _ => None,
            };
        }
        match text.to_ascii_lowercase().as_str() {
            "red" => Some(Color::RED),
            "green" => Some(Color::GREEN),
            "blue" => Some(Color::BLUE),
            "white" => Some(Color::WHITE),
            "black" => Some(Color::BLACK),
            "cyan" => Some(Color::CYAN),
            "magenta" => Some(Color::MAGENTA),
            "yellow" => Some(Color::YELLOW),
            "orange" => Some(Color::ORANGE),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Closed numeric interval `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    /// The range pushed for a disabled select filter
    pub const UNBOUNDED: Range = Range {
        min: f64::NEG_INFINITY,
        max: f64::INFINITY,
    };

    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_unbounded(&self) -> bool {
        self.min == f64::NEG_INFINITY && self.max == f64::INFINITY
    }

    /// Range covering all finite values, or `None` when there are none
    pub fn from_values<I: IntoIterator<Item = f64>>(values: I) -> Option<Self> {
        let mut out: Option<Range> = None;
        for v in values.into_iter().filter(|v| v.is_finite()) {
            out = Some(match out {
                None => Range::new(v, v),
                Some(r) => Range::new(r.min.min(v), r.max.max(v)),
            });
        }
        out
    }

    /// Parse `min,max` or `min:max`
    pub fn parse(text: &str) -> Option<Self> {
        let (a, b) = text.split_once(',').or_else(|| text.split_once(':'))?;
        Some(Range::new(a.trim().parse().ok()?, b.trim().parse().ok()?))
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Select-range filter state
///
/// The stored range survives while the filter is disabled so that re-enabling
/// restores the user's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SelectRange {
    pub range: Option<Range>,
    pub enabled: bool,
}

impl SelectRange {
    /// The range visual objects should receive
    pub fn effective(&self) -> Range {
        match (self.enabled, self.range) {
            (true, Some(range)) => range,
            _ => Range::UNBOUNDED,
        }
    }
}

/// Named list of RGBA entries (channels in `0.0..=1.0`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorTable {
    pub name: String,
    pub entries: Vec<[f32; 4]>,
}

impl ColorTable {
    pub fn new(name: impl Into<String>, entries: Vec<[f32; 4]>) -> Self {
        Self {
            name: name.into(),
            entries,
        }
    }

    /// Linear ramp between two RGBA entries
    pub fn ramp(name: impl Into<String>, from: [f32; 4], to: [f32; 4], steps: usize) -> Self {
        let steps = steps.max(2);
        let entries = (0..steps)
            .map(|i| {
                let t = i as f32 / (steps - 1) as f32;
                let mut e = [0.0; 4];
                for c in 0..4 {
                    e[c] = from[c] + (to[c] - from[c]) * t;
                }
                e
            })
            .collect();
        Self::new(name, entries)
    }

    /// Copy with the RGB channels multiplied by `dimness`; alpha is untouched
    pub fn dimmed(&self, dimness: f32) -> ColorTable {
        let entries = self
            .entries
            .iter()
            .map(|&[r, g, b, a]| [r * dimness, g * dimness, b * dimness, a])
            .collect();
        ColorTable::new(self.name.clone(), entries)
    }
}

/// Clamp a dimness value into `[MIN_DIMNESS, MAX_DIMNESS]`
pub fn clamp_dimness(value: f32) -> f32 {
    if value.is_nan() {
        return MAX_DIMNESS;
    }
    value.clamp(MIN_DIMNESS, MAX_DIMNESS)
}

/// Contour description in the display unit of its control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourSpec {
    pub interval: f64,
    pub base: f64,
    pub min: f64,
    pub max: f64,
    #[serde(default = "default_true")]
    pub labels: bool,
    #[serde(default)]
    pub dashed_below_base: bool,
    #[serde(default = "default_line_width")]
    pub line_width: f32,
    /// Unit the numeric fields are expressed in, when known
    #[serde(default)]
    pub unit: Option<String>,
}

fn default_true() -> bool {
    true
}

fn default_line_width() -> f32 {
    1.0
}

impl ContourSpec {
    /// Ten intervals across the given range, based at its minimum
    pub fn from_range(range: Range) -> Self {
        let span = range.span();
        let interval = if span > 0.0 && span.is_finite() {
            span / 10.0
        } else {
            1.0
        };
        Self {
            interval,
            base: range.min,
            min: range.min,
            max: range.max,
            labels: true,
            dashed_below_base: false,
            line_width: 1.0,
            unit: None,
        }
    }

    /// Parse the short form `interval;base;min;max`
    pub fn parse(text: &str) -> Option<Self> {
        let parts: Vec<f64> = text
            .split(|c| c == ';' || c == '/')
            .map(|p| p.trim().parse().ok())
            .collect::<Option<Vec<_>>>()?;
        match parts.as_slice() {
            [interval, base, min, max] => Some(Self {
                interval: *interval,
                base: *base,
                min: *min,
                max: *max,
                ..Self::from_range(Range::new(*min, *max))
            }),
            _ => None,
        }
    }
}

/// Smoothing kernels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SmoothingKind {
    #[default]
    None,
    FivePoint,
    NinePoint,
    Gaussian,
    Cressman,
    CircularAperture,
    RectangularAperture,
}

impl SmoothingKind {
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().replace(['_', '-', ' '], "").as_str() {
            "none" => Some(Self::None),
            "5point" | "fivepoint" | "smth5pt" => Some(Self::FivePoint),
            "9point" | "ninepoint" | "smth9pt" => Some(Self::NinePoint),
            "gaussian" | "gwfs" => Some(Self::Gaussian),
            "cressman" | "cressmansmoother" => Some(Self::Cressman),
            "circular" | "circularaperture" => Some(Self::CircularAperture),
            "rectangular" | "rectangularaperture" => Some(Self::RectangularAperture),
            _ => None,
        }
    }
}

/// Smoothing selection pushed to visual objects
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoothing {
    pub kind: SmoothingKind,
    pub factor: u32,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            kind: SmoothingKind::None,
            factor: 6,
        }
    }
}

/// Geographic bounds in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLonBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl LatLonBox {
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        Self {
            south,
            north,
            west,
            east,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// True when every edge moved by at most `tolerance` of the old span
    /// on its axis.
    pub fn approx_eq(&self, other: &LatLonBox, tolerance: f64) -> bool {
        let close = |old: f64, new: f64, span: f64| {
            let allowed = if span.abs() > f64::EPSILON {
                tolerance * span.abs()
            } else {
                tolerance
            };
            (new - old).abs() <= allowed
        };
        close(self.south, other.south, self.lat_span())
            && close(self.north, other.north, self.lat_span())
            && close(self.west, other.west, self.lon_span())
            && close(self.east, other.east, self.lon_span())
    }
}

/// Screen rectangle in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_parse() {
        assert_eq!(Color::parse("red"), Some(Color::RED));
        assert_eq!(Color::parse("#00ff00"), Some(Color::GREEN));
        assert_eq!(
            Color::parse("#0000ff80"),
            Some(Color {
                r: 0,
                g: 0,
                b: 255,
                a: 128
            })
        );
        assert_eq!(Color::parse("#12"), None);
        assert_eq!(Color::parse("chartreuse"), None);
        assert_eq!(Color::RED.to_string(), "#ff0000");
    }

    #[test]
    fn test_range_from_values_skips_nan() {
        let r = Range::from_values([3.0, f64::NAN, -1.0, 7.5]).unwrap();
        assert_eq!(r, Range::new(-1.0, 7.5));
        assert!(Range::from_values(std::iter::empty()).is_none());
    }

    #[test]
    fn test_select_range_disabled_is_unbounded() {
        let mut sel = SelectRange {
            range: Some(Range::new(1.0, 2.0)),
            enabled: false,
        };
        assert!(sel.effective().is_unbounded());
        sel.enabled = true;
        assert_eq!(sel.effective(), Range::new(1.0, 2.0));
    }

    #[test]
    fn test_dimmed_leaves_alpha() {
        let table = ColorTable::new("t", vec![[1.0, 0.5, 0.25, 0.7]]);
        let dim = table.dimmed(0.5);
        assert_eq!(dim.entries[0], [0.5, 0.25, 0.125, 0.7]);
    }

    #[test]
    fn test_clamp_dimness() {
        assert_eq!(clamp_dimness(0.0), MIN_DIMNESS);
        assert_eq!(clamp_dimness(4.0), MAX_DIMNESS);
        assert_eq!(clamp_dimness(0.4), 0.4);
        assert_eq!(clamp_dimness(f32::NAN), MAX_DIMNESS);
    }

    #[test]
    fn test_contour_parse() {
        let c = ContourSpec::parse("5;0;-40;40").unwrap();
        assert_eq!(c.interval, 5.0);
        assert_eq!(c.min, -40.0);
        assert!(ContourSpec::parse("5;0").is_none());
    }

    #[test]
    fn test_lat_lon_box_tolerance() {
        let a = LatLonBox::new(20.0, 50.0, -130.0, -60.0);
        let tiny = LatLonBox::new(20.1, 50.1, -130.2, -60.2);
        let moved = LatLonBox::new(25.0, 55.0, -130.0, -60.0);
        assert!(a.approx_eq(&tiny, 0.01));
        assert!(!a.approx_eq(&moved, 0.01));
    }

    #[test]
    fn test_smoothing_kind_parse() {
        assert_eq!(SmoothingKind::parse("SMTH9PT"), Some(SmoothingKind::NinePoint));
        assert_eq!(SmoothingKind::parse("gaussian"), Some(SmoothingKind::Gaussian));
        assert_eq!(SmoothingKind::parse("bogus"), None);
    }
}
