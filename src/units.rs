//! Unit catalog and conversion
//!
//! Units are linear transforms onto a base unit of their dimension:
//! `base = value * scale + offset`. Conversion between units of different
//! dimensions fails with [`ControlError::UnitConversion`].

use crate::error::{ControlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical dimension of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Temperature,
    Length,
    Speed,
    Pressure,
    Time,
    Dimensionless,
}

/// A named unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub name: String,
    pub dimension: Dimension,
    pub scale: f64,
    pub offset: f64,
}

/// (name, aliases, dimension, scale, offset)
const CATALOG: &[(&str, &[&str], Dimension, f64, f64)] = &[
    ("K", &["kelvin"], Dimension::Temperature, 1.0, 0.0),
    ("C", &["celsius", "degC"], Dimension::Temperature, 1.0, 273.15),
    (
        "F",
        &["fahrenheit", "degF"],
        Dimension::Temperature,
        5.0 / 9.0,
        273.15 - 32.0 * 5.0 / 9.0,
    ),
    ("m", &["meter", "meters"], Dimension::Length, 1.0, 0.0),
    ("km", &["kilometer", "kilometers"], Dimension::Length, 1000.0, 0.0),
    ("ft", &["foot", "feet"], Dimension::Length, 0.3048, 0.0),
    ("m/s", &["mps", "m s-1"], Dimension::Speed, 1.0, 0.0),
    ("knot", &["kt", "knots"], Dimension::Speed, 1852.0 / 3600.0, 0.0),
    ("km/h", &["kph"], Dimension::Speed, 1000.0 / 3600.0, 0.0),
    ("Pa", &["pascal"], Dimension::Pressure, 1.0, 0.0),
    ("hPa", &["mb", "millibar"], Dimension::Pressure, 100.0, 0.0),
    ("s", &["second", "seconds"], Dimension::Time, 1.0, 0.0),
    ("h", &["hour", "hours"], Dimension::Time, 3600.0, 0.0),
    ("1", &["", "dimensionless"], Dimension::Dimensionless, 1.0, 0.0),
    ("%", &["percent"], Dimension::Dimensionless, 0.01, 0.0),
];

impl Unit {
    /// Look up a unit by canonical name or alias
    pub fn parse(name: &str) -> Result<Unit> {
        let name = name.trim();
        CATALOG
            .iter()
            .find(|(canonical, aliases, ..)| {
                *canonical == name || aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
            })
            .map(|&(canonical, _, dimension, scale, offset)| Unit {
                name: canonical.to_string(),
                dimension,
                scale,
                offset,
            })
            .ok_or_else(|| ControlError::UnknownUnit(name.to_string()))
    }

    /// Whether values in `self` can be converted into `other`
    pub fn is_convertible(&self, other: &Unit) -> bool {
        self.dimension == other.dimension
    }

    /// Convert a value expressed in `self` into `to`
    pub fn convert(&self, value: f64, to: &Unit) -> Result<f64> {
        if !self.is_convertible(to) {
            return Err(ControlError::UnitConversion {
                from: self.name.clone(),
                to: to.name.clone(),
            });
        }
        let base = value * self.scale + self.offset;
        Ok((base - to.offset) / to.scale)
    }

    /// Convert an interval length (ignores offsets)
    pub fn convert_delta(&self, delta: f64, to: &Unit) -> Result<f64> {
        if !self.is_convertible(to) {
            return Err(ControlError::UnitConversion {
                from: self.name.clone(),
                to: to.name.clone(),
            });
        }
        Ok(delta * self.scale / to.scale)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(name: &str) -> Unit {
        Unit::parse(name).unwrap()
    }

    #[test]
    fn test_parse_alias() {
        assert_eq!(unit("celsius").name, "C");
        assert_eq!(unit("kt").name, "knot");
        assert!(matches!(
            Unit::parse("furlong"),
            Err(ControlError::UnknownUnit(_))
        ));
    }

    #[test]
    fn test_temperature_conversion() {
        let c = unit("C");
        let f = unit("F");
        let k = unit("K");
        assert!((c.convert(100.0, &f).unwrap() - 212.0).abs() < 1e-9);
        assert!((k.convert(273.15, &c).unwrap()).abs() < 1e-9);
        assert!((c.convert_delta(10.0, &f).unwrap() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_incompatible_dimensions() {
        let err = unit("K").convert(1.0, &unit("m")).unwrap_err();
        assert!(matches!(err, ControlError::UnitConversion { .. }));
    }
}
