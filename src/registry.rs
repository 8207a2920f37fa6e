//! Shared registries injected into controls
//!
//! - [`CategoryRegistry`] - display categories controls announce themselves under
//! - [`ColorTableRegistry`] - named color tables, built-ins plus user tables
//!
//! Both are plain objects owned by whoever builds the [`crate::control::ControlEnv`];
//! nothing here is process-global.

use crate::error::{ControlError, Result};
use crate::types::ColorTable;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Set of known display categories
#[derive(Debug, Default)]
pub struct CategoryRegistry {
    categories: RwLock<BTreeSet<String>>,
}

impl CategoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a category. Returns true when it was not known before.
    pub fn register(&self, category: &str) -> bool {
        let category = category.trim();
        if category.is_empty() {
            return false;
        }
        self.categories
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(category.to_string())
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains(category)
    }

    /// Sorted category names
    pub fn list(&self) -> Vec<String> {
        self.categories
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

pub const RAINBOW: &str = "Rainbow";
pub const GRAYSCALE: &str = "Grayscale";
pub const TEMPERATURE: &str = "Temperature";
pub const BLUE_RED: &str = "BlueRed";

/// Named color tables
#[derive(Debug)]
pub struct ColorTableRegistry {
    tables: RwLock<BTreeMap<String, ColorTable>>,
    default_name: String,
}

impl Default for ColorTableRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ColorTableRegistry {
    /// Registry without any tables; [`Self::default_table`] is `None`
    pub fn empty() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
            default_name: RAINBOW.to_string(),
        }
    }

    pub fn with_builtins() -> Self {
        let registry = Self::empty();
        for table in builtin_tables() {
            registry.insert(table);
        }
        registry
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, ColorTable>> {
        self.tables.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, ColorTable>> {
        self.tables.write().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, table: ColorTable) {
        self.write().insert(table.name.clone(), table);
    }

    /// Add or replace a user table. Empty tables are rejected.
    pub fn register(&self, table: ColorTable) -> Result<()> {
        if table.entries.is_empty() {
            return Err(ControlError::InvalidProperty {
                key: "colortable".to_string(),
                value: table.name,
            });
        }
        tracing::debug!("Registered color table '{}'", table.name);
        self.insert(table);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<ColorTable> {
        let tables = self.read();
        tables.get(name).cloned().or_else(|| {
            tables
                .values()
                .find(|t| t.name.eq_ignore_ascii_case(name))
                .cloned()
        })
    }

    pub fn names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Table used when nothing else is configured
    pub fn default_table(&self) -> Option<ColorTable> {
        self.get(&self.default_name)
    }
}

fn builtin_tables() -> Vec<ColorTable> {
    vec![
        ColorTable::new(
            RAINBOW,
            vec![
                [0.5, 0.0, 1.0, 1.0],
                [0.0, 0.0, 1.0, 1.0],
                [0.0, 1.0, 1.0, 1.0],
                [0.0, 1.0, 0.0, 1.0],
                [1.0, 1.0, 0.0, 1.0],
                [1.0, 0.5, 0.0, 1.0],
                [1.0, 0.0, 0.0, 1.0],
            ],
        ),
        ColorTable::ramp(GRAYSCALE, [0.0, 0.0, 0.0, 1.0], [1.0, 1.0, 1.0, 1.0], 16),
        ColorTable::new(
            TEMPERATURE,
            vec![
                [0.2, 0.0, 0.6, 1.0],
                [0.0, 0.4, 1.0, 1.0],
                [0.6, 0.9, 1.0, 1.0],
                [1.0, 1.0, 0.6, 1.0],
                [1.0, 0.6, 0.0, 1.0],
                [0.8, 0.0, 0.0, 1.0],
            ],
        ),
        ColorTable::ramp(BLUE_RED, [0.0, 0.0, 1.0, 1.0], [1.0, 0.0, 0.0, 1.0], 16),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_sorted_and_deduped() {
        let reg = CategoryRegistry::new();
        assert!(reg.register("Plan Views"));
        assert!(reg.register("Soundings"));
        assert!(!reg.register("Plan Views"));
        assert!(!reg.register("  "));
        assert_eq!(reg.list(), vec!["Plan Views", "Soundings"]);
        assert!(reg.contains("Soundings"));
    }

    #[test]
    fn test_builtin_tables() {
        let reg = ColorTableRegistry::with_builtins();
        assert_eq!(reg.names().len(), 4);
        assert_eq!(reg.default_table().unwrap().name, RAINBOW);
        assert!(reg.get("grayscale").is_some());
        assert!(ColorTableRegistry::empty().default_table().is_none());
    }

    #[test]
    fn test_register_user_table() {
        let reg = ColorTableRegistry::with_builtins();
        reg.register(ColorTable::new("Mine", vec![[1.0, 1.0, 1.0, 1.0]]))
            .unwrap();
        assert!(reg.get("Mine").is_some());
        assert!(reg.register(ColorTable::new("Empty", vec![])).is_err());
    }
}
