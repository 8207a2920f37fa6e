//! Visual object abstraction
//!
//! A visual object is an opaque renderable handle (a colored surface, a
//! contour set, a vector field, a text overlay). The framework never looks
//! inside one; it only pushes attribute values and data into it and inserts
//! it into view contexts.
//!
//! Handles are shared between the owning control's registry and the view
//! contexts that render them, so every method takes `&self` and
//! implementations use interior mutability.
//!
//! [`RecordingVisual`] and [`RecordingFactory`] are in-memory
//! implementations that remember everything pushed to them. The demo binary
//! and the integration tests run against them.

use crate::attributes::{AttributeFlag, AttributeSet};
use crate::data::SampledData;
use crate::error::{ControlError, Result};
use crate::id::VisualId;
use crate::types::{Color, ColorTable, ContourSpec, Range, Smoothing};
use crate::units::Unit;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Renderable handle driven by a display control
#[cfg_attr(test, mockall::automock)]
pub trait VisualObject: Send + Sync {
    /// Stable identity of this handle
    fn id(&self) -> VisualId;

    /// Human-readable name, used in logs and error messages
    fn name(&self) -> String;

    fn set_color(&self, color: Color) -> Result<()>;

    fn set_color_table(&self, table: &ColorTable) -> Result<()>;

    fn set_range(&self, range: crate::types::Range) -> Result<()>;

    fn set_select_range(&self, range: crate::types::Range) -> Result<()>;

    fn set_contour(&self, contour: &ContourSpec) -> Result<()>;

    fn set_display_unit(&self, unit: Option<Unit>) -> Result<()>;

    fn set_color_unit(&self, unit: Option<Unit>) -> Result<()>;

    fn set_z_position(&self, z: f64) -> Result<()>;

    fn set_fast_rendering(&self, fast: bool) -> Result<()>;

    fn set_line_width(&self, width: f32) -> Result<()>;

    fn set_skip(&self, skip: u32) -> Result<()>;

    fn set_texture_quality(&self, quality: u32) -> Result<()>;

    fn set_smoothing(&self, smoothing: Smoothing) -> Result<()>;

    fn set_visible(&self, visible: bool) -> Result<()>;

    /// Replace the sampled data this object renders
    fn set_data(&self, data: &SampledData) -> Result<()>;

    /// Release renderer resources. Called once during teardown.
    fn dispose(&self) -> Result<()>;
}

/// Visual handle shared between a control and its views
pub type SharedVisual = Arc<dyn VisualObject>;

/// What kind of visual a control behavior asks the factory for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VisualKind {
    ColorFilledSurface,
    ContourLines,
    VectorField,
    Points,
    Lines,
    TextOverlay,
}

/// Creates visual objects on behalf of control behaviors
pub trait VisualFactory: Send + Sync {
    fn create(&self, kind: VisualKind, name: &str) -> Result<SharedVisual>;
}

/// Everything a [`RecordingVisual`] has received
#[derive(Debug, Clone, Default)]
pub struct VisualSnapshot {
    pub color: Option<Color>,
    pub color_table: Option<ColorTable>,
    pub range: Option<Range>,
    pub select_range: Option<Range>,
    pub contour: Option<ContourSpec>,
    pub display_unit: Option<Option<Unit>>,
    pub color_unit: Option<Option<Unit>>,
    pub z_position: Option<f64>,
    pub fast_rendering: Option<bool>,
    pub line_width: Option<f32>,
    pub skip: Option<u32>,
    pub texture_quality: Option<u32>,
    pub smoothing: Option<Smoothing>,
    pub visible: Option<bool>,
    pub data_points: Option<usize>,
    pub disposed: bool,
    /// Number of accepted pushes per category
    pub pushes: HashMap<AttributeFlag, usize>,
}

/// In-memory visual object that records every value pushed to it
#[derive(Debug)]
pub struct RecordingVisual {
    id: VisualId,
    name: String,
    kind: VisualKind,
    state: Mutex<VisualSnapshot>,
    rejects: Mutex<AttributeSet>,
    rejected_units: Mutex<Vec<String>>,
}

impl RecordingVisual {
    pub fn new(kind: VisualKind, name: impl Into<String>) -> Self {
        Self {
            id: VisualId::next(),
            name: name.into(),
            kind,
            state: Mutex::new(VisualSnapshot::default()),
            rejects: Mutex::new(AttributeSet::empty()),
            rejected_units: Mutex::new(Vec::new()),
        }
    }

    /// Convenience constructor returning a shared handle
    pub fn shared(kind: VisualKind, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self::new(kind, name))
    }

    pub fn kind(&self) -> VisualKind {
        self.kind
    }

    /// Make every push for `category` fail
    pub fn reject(&self, category: AttributeFlag) {
        lock(&self.rejects).insert(category);
    }

    /// Make display/color unit pushes of the named unit fail
    pub fn reject_unit(&self, unit: &str) {
        lock(&self.rejected_units).push(unit.to_string());
    }

    pub fn snapshot(&self) -> VisualSnapshot {
        lock(&self.state).clone()
    }

    pub fn push_count(&self, category: AttributeFlag) -> usize {
        lock(&self.state).pushes.get(&category).copied().unwrap_or(0)
    }

    fn accept<F>(&self, category: AttributeFlag, update: F) -> Result<()>
    where
        F: FnOnce(&mut VisualSnapshot),
    {
        if lock(&self.rejects).contains(category) {
            return Err(ControlError::rejected(
                category,
                self.name.clone(),
                "category not supported",
            ));
        }
        let mut state = lock(&self.state);
        update(&mut state);
        *state.pushes.entry(category).or_insert(0) += 1;
        Ok(())
    }

    fn check_unit(&self, category: AttributeFlag, unit: &Option<Unit>) -> Result<()> {
        if let Some(unit) = unit {
            if lock(&self.rejected_units).iter().any(|u| *u == unit.name) {
                return Err(ControlError::rejected(
                    category,
                    self.name.clone(),
                    format!("incompatible unit {}", unit.name),
                ));
            }
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

impl VisualObject for RecordingVisual {
    fn id(&self) -> VisualId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn set_color(&self, color: Color) -> Result<()> {
        self.accept(AttributeFlag::Color, |s| s.color = Some(color))
    }

    fn set_color_table(&self, table: &ColorTable) -> Result<()> {
        self.accept(AttributeFlag::ColorTable, |s| {
            s.color_table = Some(table.clone())
        })
    }

    fn set_range(&self, range: Range) -> Result<()> {
        self.accept(AttributeFlag::Range, |s| s.range = Some(range))
    }

    fn set_select_range(&self, range: Range) -> Result<()> {
        self.accept(AttributeFlag::SelectRange, |s| s.select_range = Some(range))
    }

    fn set_contour(&self, contour: &ContourSpec) -> Result<()> {
        self.accept(AttributeFlag::Contour, |s| s.contour = Some(contour.clone()))
    }

    fn set_display_unit(&self, unit: Option<Unit>) -> Result<()> {
        self.check_unit(AttributeFlag::DisplayUnit, &unit)?;
        self.accept(AttributeFlag::DisplayUnit, |s| s.display_unit = Some(unit))
    }

    fn set_color_unit(&self, unit: Option<Unit>) -> Result<()> {
        self.check_unit(AttributeFlag::ColorUnit, &unit)?;
        self.accept(AttributeFlag::ColorUnit, |s| s.color_unit = Some(unit))
    }

    fn set_z_position(&self, z: f64) -> Result<()> {
        self.accept(AttributeFlag::ZPosition, |s| s.z_position = Some(z))
    }

    fn set_fast_rendering(&self, fast: bool) -> Result<()> {
        lock(&self.state).fast_rendering = Some(fast);
        Ok(())
    }

    fn set_line_width(&self, width: f32) -> Result<()> {
        self.accept(AttributeFlag::LineWidth, |s| s.line_width = Some(width))
    }

    fn set_skip(&self, skip: u32) -> Result<()> {
        self.accept(AttributeFlag::SkipFactor, |s| s.skip = Some(skip))
    }

    fn set_texture_quality(&self, quality: u32) -> Result<()> {
        self.accept(AttributeFlag::TextureQuality, |s| {
            s.texture_quality = Some(quality)
        })
    }

    fn set_smoothing(&self, smoothing: Smoothing) -> Result<()> {
        self.accept(AttributeFlag::Smoothing, |s| s.smoothing = Some(smoothing))
    }

    fn set_visible(&self, visible: bool) -> Result<()> {
        lock(&self.state).visible = Some(visible);
        Ok(())
    }

    fn set_data(&self, data: &SampledData) -> Result<()> {
        lock(&self.state).data_points = Some(data.values.len());
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        lock(&self.state).disposed = true;
        Ok(())
    }
}

/// Factory producing [`RecordingVisual`]s and remembering them by name
#[derive(Debug, Default)]
pub struct RecordingFactory {
    created: Mutex<Vec<Arc<RecordingVisual>>>,
    failing: Mutex<Vec<String>>,
}

impl RecordingFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every visual created so far, in creation order
    pub fn created(&self) -> Vec<Arc<RecordingVisual>> {
        lock(&self.created).clone()
    }

    /// Most recently created visual with the given name
    pub fn find(&self, name: &str) -> Option<Arc<RecordingVisual>> {
        lock(&self.created)
            .iter()
            .rev()
            .find(|v| v.name == name)
            .cloned()
    }

    /// Make creating visuals with this name fail
    pub fn fail_on(&self, name: impl Into<String>) {
        lock(&self.failing).push(name.into());
    }
}

impl VisualFactory for RecordingFactory {
    fn create(&self, kind: VisualKind, name: &str) -> Result<SharedVisual> {
        if lock(&self.failing).iter().any(|n| n == name) {
            return Err(ControlError::View(format!("cannot create '{}'", name)));
        }
        let visual = RecordingVisual::shared(kind, name);
        lock(&self.created).push(visual.clone());
        Ok(visual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_visual_records_pushes() {
        let v = RecordingVisual::new(VisualKind::Lines, "outline");
        v.set_color(Color::RED).unwrap();
        v.set_line_width(2.5).unwrap();
        let snap = v.snapshot();
        assert_eq!(snap.color, Some(Color::RED));
        assert_eq!(snap.line_width, Some(2.5));
        assert_eq!(v.push_count(AttributeFlag::Color), 1);
    }

    #[test]
    fn test_recording_visual_rejects() {
        let v = RecordingVisual::new(VisualKind::ContourLines, "contours");
        v.reject(AttributeFlag::Smoothing);
        v.reject_unit("F");
        assert!(v.set_smoothing(Smoothing::default()).is_err());
        assert!(v.set_display_unit(Some(Unit::parse("F").unwrap())).is_err());
        assert!(v.set_display_unit(Some(Unit::parse("C").unwrap())).is_ok());
    }

    #[test]
    fn test_factory_find() {
        let factory = RecordingFactory::new();
        factory.create(VisualKind::Points, "a").unwrap();
        factory.create(VisualKind::Points, "b").unwrap();
        assert_eq!(factory.created().len(), 2);
        assert!(factory.find("b").is_some());
        assert!(factory.find("c").is_none());
    }
}
