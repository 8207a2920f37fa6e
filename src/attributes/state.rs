//! Current attribute values of a control and the defaults derived from data.

use crate::error::{ControlError, Result};
use crate::types::{
    clamp_dimness, Color, ColorTable, ContourSpec, Range, SelectRange, Smoothing, MAX_DIMNESS,
};
use crate::units::Unit;
use serde::{Deserialize, Serialize};

/// Current value of every attribute category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeState {
    pub color: Option<Color>,
    pub color_table: Option<ColorTable>,
    pub(crate) dimness: f32,
    pub range: Option<Range>,
    pub select_range: SelectRange,
    pub contour: Option<ContourSpec>,
    pub display_unit: Option<Unit>,
    /// `None` means the color unit follows the display unit
    pub color_unit: Option<Unit>,
    pub z_position: f64,
    pub line_width: f32,
    pub skip: u32,
    pub texture_quality: u32,
    pub smoothing: Smoothing,
    pub fast_rendering: bool,
    pub visible: bool,
}

impl Default for AttributeState {
    fn default() -> Self {
        Self {
            color: None,
            color_table: None,
            dimness: MAX_DIMNESS,
            range: None,
            select_range: SelectRange::default(),
            contour: None,
            display_unit: None,
            color_unit: None,
            z_position: 0.0,
            line_width: 1.0,
            skip: 0,
            texture_quality: 1,
            smoothing: Smoothing::default(),
            fast_rendering: false,
            visible: true,
        }
    }
}

impl AttributeState {
    pub fn dimness(&self) -> f32 {
        self.dimness
    }

    /// Store a dimness value, clamped into `[0.1, 1.0]`
    pub fn set_dimness(&mut self, dimness: f32) {
        self.dimness = clamp_dimness(dimness);
    }

    /// True when the color unit is defined to equal the display unit
    pub fn color_unit_follows_display(&self) -> bool {
        self.color_unit.is_none()
    }

    /// The unit pushed to color-unit visuals
    pub fn effective_color_unit(&self) -> Option<Unit> {
        self.color_unit.clone().or_else(|| self.display_unit.clone())
    }

    /// Clear every override that is derived from data
    pub fn clear_data_overrides(&mut self) {
        self.display_unit = None;
        self.color_unit = None;
        self.range = None;
        self.select_range = SelectRange::default();
        self.contour = None;
    }

    /// Contour, range and select range re-expressed in `new_unit`.
    ///
    /// Nothing in `self` is modified; callers commit the result only when
    /// every conversion succeeded.
    pub fn converted_for_unit(&self, new_unit: &Unit) -> Result<UnitConversion> {
        let current = self.display_unit.as_ref();

        let contour = match &self.contour {
            Some(contour) => {
                let from = match contour.unit.as_deref() {
                    Some(name) => Some(Unit::parse(name)?),
                    None => current.cloned(),
                };
                Some(match from {
                    Some(from) => convert_contour(contour, &from, new_unit)?,
                    None => contour.clone(),
                })
            }
            None => None,
        };

        let convert_range = |range: Range| -> Result<Range> {
            match current {
                Some(from) => Ok(Range::new(
                    from.convert(range.min, new_unit)?,
                    from.convert(range.max, new_unit)?,
                )),
                None => Ok(range),
            }
        };

        let range = self.range.map(&convert_range).transpose()?;
        let select_range = SelectRange {
            range: self.select_range.range.map(&convert_range).transpose()?,
            enabled: self.select_range.enabled,
        };

        Ok(UnitConversion {
            contour,
            range,
            select_range,
        })
    }
}

/// Result of [`AttributeState::converted_for_unit`]
#[derive(Debug, Clone, PartialEq)]
pub struct UnitConversion {
    pub contour: Option<ContourSpec>,
    pub range: Option<Range>,
    pub select_range: SelectRange,
}

fn convert_contour(contour: &ContourSpec, from: &Unit, to: &Unit) -> Result<ContourSpec> {
    if !from.is_convertible(to) {
        return Err(ControlError::UnitConversion {
            from: from.name.clone(),
            to: to.name.clone(),
        });
    }
    Ok(ContourSpec {
        interval: from.convert_delta(contour.interval, to)?,
        base: from.convert(contour.base, to)?,
        min: from.convert(contour.min, to)?,
        max: from.convert(contour.max, to)?,
        unit: Some(to.name.clone()),
        ..contour.clone()
    })
}

/// Values a category falls back to when nothing is set or a push failed
#[derive(Debug, Clone, Default)]
pub struct AttributeDefaults {
    pub color: Option<Color>,
    pub color_table: Option<ColorTable>,
    pub range: Option<Range>,
    /// Unit `range` is expressed in, when it differs from `display_unit`
    pub range_unit: Option<Unit>,
    /// The data's native unit
    pub display_unit: Option<Unit>,
}

impl AttributeDefaults {
    pub fn contour(&self) -> Option<ContourSpec> {
        self.range.map(|range| {
            let mut spec = ContourSpec::from_range(range);
            spec.unit = self
                .range_unit
                .as_ref()
                .or(self.display_unit.as_ref())
                .map(|u| u.name.clone());
            spec
        })
    }
}
