//! Persistence store and control settings snapshots
//!
//! The store is a flat key/value map of JSON values. Controls save a
//! [`ControlSettings`] snapshot under one key each, and per-parameter
//! default preferences live under `defaults.<param>.<field>`.
//!
//! # Files
//!
//! [`JsonFileStore`] keeps the whole map in one pretty-printed JSON file,
//! by default `store.json` in the app data directory:
//!
//! - **Linux**: `~/.local/share/displayctl-rs/store.json`
//! - **macOS**: `~/Library/Application Support/displayctl-rs/store.json`
//! - **Windows**: `%APPDATA%\displayctl-rs\store.json`

use crate::attributes::AttributeState;
use crate::config::app_data_dir;
use crate::data::DataReference;
use crate::error::{ControlError, Result};
use crate::types::{Color, ColorTable, ContourSpec, Range, ScreenBounds, SelectRange, Smoothing};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Store filename inside the app data directory
pub const STORE_FILE: &str = "store.json";

/// Durable key/value settings
#[cfg_attr(test, mockall::automock)]
pub trait PersistenceStore: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;

    fn put_value(&self, key: &str, value: Value) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Every key, sorted
    fn keys(&self) -> Vec<String>;
}

/// Typed access on top of [`PersistenceStore`]
pub trait PersistenceStoreExt: PersistenceStore {
    /// Typed value, or `default` when missing or of the wrong shape
    fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get_opt(key).unwrap_or(default)
    }

    fn get_opt<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Ignoring stored value for '{}': {}", key, e);
                None
            }
        }
    }

    fn put<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        self.put_value(key, serde_json::to_value(value)?)
    }
}

impl<S: PersistenceStore + ?Sized> PersistenceStoreExt for S {}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Store that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    fn put_value(&self, key: &str, value: Value) -> Result<()> {
        lock(&self.values).insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.values).remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.values).keys().cloned().collect()
    }
}

/// Store backed by a single JSON file, rewritten on every change
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonFileStore {
    /// Open (or start) the store at `path`
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let values = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|e| {
                ControlError::Persistence(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                ControlError::Persistence(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };
        tracing::debug!("Opened settings store at {:?}", path);
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Open the store at its default location, creating the directory
    pub fn open_default() -> Result<Self> {
        let dir = app_data_dir().ok_or_else(|| {
            ControlError::Persistence("Could not determine app data directory".to_string())
        })?;
        std::fs::create_dir_all(&dir)?;
        Self::open(dir.join(STORE_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(values)?;
        std::fs::write(&self.path, content).map_err(|e| {
            ControlError::Persistence(format!("Failed to write {}: {}", self.path.display(), e))
        })
    }
}

impl PersistenceStore for JsonFileStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    fn put_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = lock(&self.values);
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = lock(&self.values);
        if values.remove(key).is_some() {
            self.flush(&values)?;
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        lock(&self.values).keys().cloned().collect()
    }
}

/// Preferred defaults for one parameter, stored under `defaults.<param>.*`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterDefaults {
    pub color: Option<Color>,
    pub color_table: Option<String>,
    pub range: Option<Range>,
    pub display_unit: Option<String>,
}

impl ParameterDefaults {
    fn key(param: &str, field: &str) -> String {
        format!("defaults.{}.{}", param, field)
    }

    pub fn load(store: &dyn PersistenceStore, param: &str) -> Self {
        Self {
            color: store.get_opt(&Self::key(param, "color")),
            color_table: store.get_opt(&Self::key(param, "colortable")),
            range: store.get_opt(&Self::key(param, "range")),
            display_unit: store.get_opt(&Self::key(param, "unit")),
        }
    }

    /// Write the fields that are set; clear the ones that are not
    pub fn save(&self, store: &dyn PersistenceStore, param: &str) -> Result<()> {
        fn write<T: Serialize>(
            store: &dyn PersistenceStore,
            key: String,
            value: &Option<T>,
        ) -> Result<()> {
            match value {
                Some(v) => store.put(&key, v),
                None => store.remove(&key),
            }
        }
        write(store, Self::key(param, "color"), &self.color)?;
        write(store, Self::key(param, "colortable"), &self.color_table)?;
        write(store, Self::key(param, "range"), &self.range)?;
        write(store, Self::key(param, "unit"), &self.display_unit)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Persisted state of one control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlSettings {
    pub version: u32,
    pub category: Option<String>,
    pub color: Option<Color>,
    pub color_table: Option<ColorTable>,
    pub dimness: f32,
    pub range: Option<Range>,
    pub select_range: SelectRange,
    pub contour: Option<ContourSpec>,
    pub display_unit: Option<String>,
    pub color_unit: Option<String>,
    pub z_position: f64,
    pub line_width: f32,
    pub skip: u32,
    pub texture_quality: u32,
    pub smoothing: Smoothing,
    pub fast_rendering: bool,
    pub legend_template: Option<String>,
    pub menu_template: Option<String>,
    pub visible: bool,
    pub lock_visibility: bool,
    pub window: Option<ScreenBounds>,
    pub is_time_driver: bool,
    pub uses_time_driver: bool,
    /// Present only when the "save data sources" policy is on
    pub data_references: Option<Vec<DataReference>>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            version: 1,
            category: None,
            color: None,
            color_table: None,
            dimness: 1.0,
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
            legend_template: None,
            menu_template: None,
            visible: true,
            lock_visibility: false,
            window: None,
            is_time_driver: false,
            uses_time_driver: false,
            data_references: None,
        }
    }
}

impl ControlSettings {
    /// Copy the attribute fields out of `state`
    pub fn capture_attributes(&mut self, state: &AttributeState) {
        self.color = state.color;
        self.color_table = state.color_table.clone();
        self.dimness = state.dimness();
        self.range = state.range;
        self.select_range = state.select_range;
        self.contour = state.contour.clone();
        self.display_unit = state.display_unit.as_ref().map(|u| u.name.clone());
        self.color_unit = state.color_unit.as_ref().map(|u| u.name.clone());
        self.z_position = state.z_position;
        self.line_width = state.line_width;
        self.skip = state.skip;
        self.texture_quality = state.texture_quality;
        self.smoothing = state.smoothing;
        self.fast_rendering = state.fast_rendering;
        self.visible = state.visible;
    }

    pub fn save_to(&self, store: &dyn PersistenceStore, key: &str) -> Result<()> {
        store.put(key, self)
    }

    /// `Ok(None)` when nothing is stored under `key`
    pub fn load_from(store: &dyn PersistenceStore, key: &str) -> Result<Option<Self>> {
        match store.get_value(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}
