//! Attribute categories and capability sets.
//!
//! Each control declares the set of attribute categories it supports, and
//! each visual object it owns carries the subset that applies to it. The
//! propagation engine matches on [`AttributeFlag`] rather than on raw bits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// One attribute category a control may support
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AttributeFlag {
    Color,
    ColorTable,
    Range,
    SelectRange,
    Contour,
    DisplayUnit,
    ColorUnit,
    ZPosition,
    LineWidth,
    SkipFactor,
    TextureQuality,
    Smoothing,
}

impl AttributeFlag {
    pub const ALL: [AttributeFlag; 12] = [
        AttributeFlag::Color,
        AttributeFlag::ColorTable,
        AttributeFlag::Range,
        AttributeFlag::SelectRange,
        AttributeFlag::Contour,
        AttributeFlag::DisplayUnit,
        AttributeFlag::ColorUnit,
        AttributeFlag::ZPosition,
        AttributeFlag::LineWidth,
        AttributeFlag::SkipFactor,
        AttributeFlag::TextureQuality,
        AttributeFlag::Smoothing,
    ];

    fn bit(self) -> u16 {
        1 << (self as u16)
    }

    pub fn label(self) -> &'static str {
        match self {
            AttributeFlag::Color => "color",
            AttributeFlag::ColorTable => "color table",
            AttributeFlag::Range => "range",
            AttributeFlag::SelectRange => "select range",
            AttributeFlag::Contour => "contour",
            AttributeFlag::DisplayUnit => "display unit",
            AttributeFlag::ColorUnit => "color unit",
            AttributeFlag::ZPosition => "z position",
            AttributeFlag::LineWidth => "line width",
            AttributeFlag::SkipFactor => "skip factor",
            AttributeFlag::TextureQuality => "texture quality",
            AttributeFlag::Smoothing => "smoothing",
        }
    }
}

impl fmt::Display for AttributeFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Small set of [`AttributeFlag`]s
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AttributeSet(u16);

impl AttributeSet {
    pub const fn empty() -> Self {
        Self(0)
    }

    pub fn all() -> Self {
        AttributeFlag::ALL.into_iter().collect()
    }

    pub fn of(flags: &[AttributeFlag]) -> Self {
        flags.iter().copied().collect()
    }

    pub fn contains(&self, flag: AttributeFlag) -> bool {
        self.0 & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: AttributeFlag) {
        self.0 |= flag.bit();
    }

    pub fn remove(&mut self, flag: AttributeFlag) {
        self.0 &= !flag.bit();
    }

    pub fn with(mut self, flag: AttributeFlag) -> Self {
        self.insert(flag);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn union(self, other: AttributeSet) -> AttributeSet {
        AttributeSet(self.0 | other.0)
    }

    pub fn intersection(self, other: AttributeSet) -> AttributeSet {
        AttributeSet(self.0 & other.0)
    }

    pub fn difference(self, other: AttributeSet) -> AttributeSet {
        AttributeSet(self.0 & !other.0)
    }

    pub fn is_subset(&self, other: &AttributeSet) -> bool {
        self.0 & !other.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = AttributeFlag> + '_ {
        AttributeFlag::ALL
            .into_iter()
            .filter(move |f| self.contains(*f))
    }
}

impl FromIterator<AttributeFlag> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = AttributeFlag>>(iter: I) -> Self {
        let mut set = AttributeSet::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl fmt::Debug for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for AttributeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for AttributeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flags = Vec::<AttributeFlag>::deserialize(deserializer)?;
        Ok(flags.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations() {
        let a = AttributeSet::of(&[AttributeFlag::Color, AttributeFlag::LineWidth]);
        let b = AttributeSet::of(&[AttributeFlag::Color, AttributeFlag::ColorTable]);
        assert!(a.contains(AttributeFlag::Color));
        assert!(!a.contains(AttributeFlag::ColorTable));
        assert_eq!(a.union(b).len(), 3);
        assert_eq!(a.intersection(b), AttributeSet::of(&[AttributeFlag::Color]));
        assert_eq!(a.difference(b), AttributeSet::of(&[AttributeFlag::LineWidth]));
        assert!(AttributeSet::of(&[AttributeFlag::Color]).is_subset(&a));
    }

    #[test]
    fn test_iter_order_is_stable() {
        let set = AttributeSet::of(&[AttributeFlag::Smoothing, AttributeFlag::Color]);
        let flags: Vec<_> = set.iter().collect();
        assert_eq!(flags, vec![AttributeFlag::Color, AttributeFlag::Smoothing]);
    }

    #[test]
    fn test_serde_as_list() {
        let set = AttributeSet::of(&[AttributeFlag::Contour, AttributeFlag::ZPosition]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"["Contour","ZPosition"]"#);
        let back: AttributeSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_all_contains_every_flag() {
        let all = AttributeSet::all();
        assert_eq!(all.len(), AttributeFlag::ALL.len());
        for flag in AttributeFlag::ALL {
            assert!(all.contains(flag));
        }
    }
}
