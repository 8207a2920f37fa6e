//! Externally supplied per-control property overrides
//!
//! Properties arrive as a `key=value;key=value` string (the form a UI shell
//! or a bundle hands to `init`) or as a TOML table. Keys are matched
//! case-insensitively; unknown keys and unparsable values are rejected with
//! [`ControlError::InvalidProperty`].
//!
//! | key | value |
//! |---|---|
//! | `color` | name or `#rrggbb[aa]` |
//! | `colortable` | registered table name |
//! | `range` | `min,max` |
//! | `selectrange` | `min,max` |
//! | `selectrangeenabled` | bool |
//! | `contour` | `interval/base/min/max` |
//! | `displayunit`, `colorunit` | unit name |
//! | `zposition` | float |
//! | `linewidth` | float |
//! | `skip`, `texturequality`, `smoothingfactor` | integer |
//! | `smoothing` | kernel name |
//! | `dimness` | float, clamped into `[0.1, 1.0]` on apply |
//! | `visible`, `lockvisibility`, `fastrendering` | bool |
//! | `istimedriver`, `usetimedriver` | bool |
//! | `legendtemplate`, `menutemplate`, `category` | text |

use crate::error::{ControlError, Result};
use crate::types::{Color, ContourSpec, Range, SmoothingKind};
use crate::units::Unit;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Parsed property overrides; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlProperties {
    pub color: Option<Color>,
    pub color_table: Option<String>,
    pub range: Option<Range>,
    pub select_range: Option<Range>,
    pub select_range_enabled: Option<bool>,
    pub contour: Option<ContourSpec>,
    pub display_unit: Option<Unit>,
    pub color_unit: Option<Unit>,
    pub z_position: Option<f64>,
    pub line_width: Option<f32>,
    pub skip: Option<u32>,
    pub texture_quality: Option<u32>,
    pub smoothing: Option<SmoothingKind>,
    pub smoothing_factor: Option<u32>,
    pub dimness: Option<f32>,
    pub visible: Option<bool>,
    pub lock_visibility: Option<bool>,
    pub fast_rendering: Option<bool>,
    pub is_time_driver: Option<bool>,
    pub use_time_driver: Option<bool>,
    pub legend_template: Option<String>,
    pub menu_template: Option<String>,
    pub category: Option<String>,
}

fn invalid(key: &str, value: &str) -> ControlError {
    ControlError::InvalidProperty {
        key: key.to_string(),
        value: value.to_string(),
    }
}

fn parse_with<T>(key: &str, value: &str, f: impl FnOnce(&str) -> Option<T>) -> Result<Option<T>> {
    f(value).map(Some).ok_or_else(|| invalid(key, value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ControlProperties {
    /// Parse `key=value;key=value`. Empty segments are ignored.
    pub fn parse(text: &str) -> Result<Self> {
        let mut props = Self::default();
        for segment in text.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (key, value) = segment
                .split_once('=')
                .ok_or_else(|| invalid(segment, ""))?;
            props.set(key.trim(), value.trim())?;
        }
        Ok(props)
    }

    /// Parse a TOML table of properties
    pub fn from_toml(content: &str) -> Result<Self> {
        let table: BTreeMap<String, toml::Value> = toml::from_str(content)
            .map_err(|e| ControlError::Config(format!("Failed to parse properties: {}", e)))?;
        let mut props = Self::default();
        for (key, value) in &table {
            let text = match value {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            props.set(key, &text)?;
        }
        Ok(props)
    }

    /// Set one property from its text form
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let lower = key.to_ascii_lowercase();
        match lower.as_str() {
            "color" => self.color = parse_with(key, value, Color::parse)?,
            "colortable" => self.color_table = Some(value.to_string()),
            "range" => self.range = parse_with(key, value, Range::parse)?,
            "selectrange" => self.select_range = parse_with(key, value, Range::parse)?,
            "selectrangeenabled" => {
                self.select_range_enabled = parse_with(key, value, parse_bool)?
            }
            "contour" => self.contour = parse_with(key, value, ContourSpec::parse)?,
            "displayunit" => {
                self.display_unit = Some(Unit::parse(value).map_err(|_| invalid(key, value))?)
            }
            "colorunit" => {
                self.color_unit = Some(Unit::parse(value).map_err(|_| invalid(key, value))?)
            }
            "zposition" => self.z_position = parse_with(key, value, |v| v.parse().ok())?,
            "linewidth" => self.line_width = parse_with(key, value, |v| v.parse().ok())?,
            "skip" => self.skip = parse_with(key, value, |v| v.parse().ok())?,
            "texturequality" => {
                self.texture_quality = parse_with(key, value, |v| v.parse().ok())?
            }
            "smoothing" => self.smoothing = parse_with(key, value, SmoothingKind::parse)?,
            "smoothingfactor" => {
                self.smoothing_factor = parse_with(key, value, |v| v.parse().ok())?
            }
            "dimness" => self.dimness = parse_with(key, value, |v| v.parse().ok())?,
            "visible" => self.visible = parse_with(key, value, parse_bool)?,
            "lockvisibility" => self.lock_visibility = parse_with(key, value, parse_bool)?,
            "fastrendering" => self.fast_rendering = parse_with(key, value, parse_bool)?,
            "istimedriver" => self.is_time_driver = parse_with(key, value, parse_bool)?,
            "usetimedriver" => self.use_time_driver = parse_with(key, value, parse_bool)?,
            "legendtemplate" => self.legend_template = Some(value.to_string()),
            "menutemplate" => self.menu_template = Some(value.to_string()),
            "category" => self.category = Some(value.to_string()),
            _ => return Err(invalid(key, value)),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overlay `other` on top of `self`; set fields in `other` win
    pub fn merge(&mut self, other: &ControlProperties) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            color,
            color_table,
            range,
            select_range,
            select_range_enabled,
            contour,
            display_unit,
            color_unit,
            z_position,
            line_width,
            skip,
            texture_quality,
            smoothing,
            smoothing_factor,
            dimness,
            visible,
            lock_visibility,
            fast_rendering,
            is_time_driver,
            use_time_driver,
            legend_template,
            menu_template,
            category
        );
    }
}

impl fmt::Display for ControlProperties {
    /// Writes the `key=value;...` form accepted by [`ControlProperties::parse`]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                parts.push(format!("{}={}", key, value));
            }
        };
        let range = |r: &Range| format!("{},{}", r.min, r.max);
        push("color", self.color.map(|c| c.to_string()));
        push("colortable", self.color_table.clone());
        push("range", self.range.as_ref().map(range));
        push("selectrange", self.select_range.as_ref().map(range));
        push("selectrangeenabled", self.select_range_enabled.map(|b| b.to_string()));
        push(
            "contour",
            self.contour
                .as_ref()
                .map(|c| format!("{}/{}/{}/{}", c.interval, c.base, c.min, c.max)),
        );
        push("displayunit", self.display_unit.as_ref().map(|u| u.name.clone()));
        push("colorunit", self.color_unit.as_ref().map(|u| u.name.clone()));
        push("zposition", self.z_position.map(|v| v.to_string()));
        push("linewidth", self.line_width.map(|v| v.to_string()));
        push("skip", self.skip.map(|v| v.to_string()));
        push("texturequality", self.texture_quality.map(|v| v.to_string()));
        push("smoothing", self.smoothing.map(|k| format!("{:?}", k)));
        push("smoothingfactor", self.smoothing_factor.map(|v| v.to_string()));
        push("dimness", self.dimness.map(|v| v.to_string()));
        push("visible", self.visible.map(|b| b.to_string()));
        push("lockvisibility", self.lock_visibility.map(|b| b.to_string()));
        push("fastrendering", self.fast_rendering.map(|b| b.to_string()));
        push("istimedriver", self.is_time_driver.map(|b| b.to_string()));
        push("usetimedriver", self.use_time_driver.map(|b| b.to_string()));
        push("legendtemplate", self.legend_template.clone());
        push("menutemplate", self.menu_template.clone());
        push("category", self.category.clone());
        f.write_str(&parts.join(";"))
    }
}

/// Named bundle of property overrides
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplaySetting {
    pub name: String,
    /// `key=value;...` form
    pub properties: String,
}

impl DisplaySetting {
    pub fn new(name: impl Into<String>, properties: &ControlProperties) -> Self {
        Self {
            name: name.into(),
            properties: properties.to_string(),
        }
    }

    pub fn parse_properties(&self) -> Result<ControlProperties> {
        ControlProperties::parse(&self.properties)
    }
}
