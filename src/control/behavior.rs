//! Control-type specific strategy
//!
//! The lifecycle and propagation machinery is the same for every control;
//! what differs is which visuals a control creates, which attribute
//! categories it supports and what counts as usable data. That is a
//! [`ControlBehavior`].

use crate::attributes::{AttributeFlag, AttributeSet, FlaggedVisual, VisualRegistry};
use crate::data::{Cardinality, DataBinding, SampledData};
use crate::error::{Result, ResultExt};
use crate::visual::{VisualFactory, VisualKind};

/// Category used when a behavior does not name one
pub const DEFAULT_CATEGORY: &str = "Displays";

/// Control-specific parts plugged into a [`super::DisplayControl`]
#[cfg_attr(test, mockall::automock)]
pub trait ControlBehavior: Send + Sync {
    /// Name shown for `%displayname%`
    fn display_name(&self) -> String;

    fn category(&self) -> String {
        DEFAULT_CATEGORY.to_string()
    }

    /// Every attribute category this control supports
    fn attribute_flags(&self) -> AttributeSet;

    fn cardinality(&self) -> Cardinality {
        Cardinality::Single
    }

    /// Validity check run on resolved data
    fn is_valid(&self, data: &SampledData) -> bool {
        !data.is_empty()
    }

    /// Create the visuals this control drives. `flags` is the control's
    /// attribute set; entries should not carry categories outside it.
    fn create_visuals(
        &self,
        factory: &dyn VisualFactory,
        flags: AttributeSet,
    ) -> Result<Vec<FlaggedVisual>>;

    /// Push resolved data into the visuals. Returns the number of failed
    /// pushes.
    fn push_data(&self, visuals: &VisualRegistry, binding: &DataBinding) -> usize {
        let mut failures = 0;
        for entry in visuals.iter() {
            let Some(index) = entry.data_index else {
                continue;
            };
            let Some(instance) = binding.instances().get(index) else {
                continue;
            };
            if let Err(e) = entry.visual.set_data(instance.data()) {
                tracing::warn!("Failed to push data to '{}': {}", entry.visual.name(), e);
                failures += 1;
            }
        }
        failures
    }
}

/// One visual a [`BasicBehavior`] creates
#[derive(Debug, Clone, PartialEq)]
pub struct VisualSpec {
    pub kind: VisualKind,
    pub name: String,
    pub flags: AttributeSet,
    pub not_global: AttributeSet,
    /// Data instance rendered by the visual, `None` for decorations
    pub data_index: Option<usize>,
}

impl VisualSpec {
    pub fn new(kind: VisualKind, name: impl Into<String>, flags: &[AttributeFlag]) -> Self {
        Self {
            kind,
            name: name.into(),
            flags: AttributeSet::of(flags),
            not_global: AttributeSet::empty(),
            data_index: Some(0),
        }
    }

    pub fn not_global(mut self, flags: &[AttributeFlag]) -> Self {
        self.not_global = AttributeSet::of(flags);
        self
    }

    pub fn data(mut self, index: usize) -> Self {
        self.data_index = Some(index);
        self
    }

    pub fn without_data(mut self) -> Self {
        self.data_index = None;
        self
    }
}

/// Table-driven behavior: a fixed list of visuals
#[derive(Debug, Clone)]
pub struct BasicBehavior {
    name: String,
    category: String,
    cardinality: Cardinality,
    visuals: Vec<VisualSpec>,
}

impl BasicBehavior {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: DEFAULT_CATEGORY.to_string(),
            cardinality: Cardinality::Single,
            visuals: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = cardinality;
        self
    }

    pub fn with_visual(mut self, spec: VisualSpec) -> Self {
        self.visuals.push(spec);
        self
    }

    pub fn visuals(&self) -> &[VisualSpec] {
        &self.visuals
    }

    /// Color-filled surface plus its select-range outline
    pub fn plan_view(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone())
            .with_category("Plan Views")
            .with_visual(VisualSpec::new(
                VisualKind::ColorFilledSurface,
                format!("{} surface", name),
                &[
                    AttributeFlag::ColorTable,
                    AttributeFlag::Range,
                    AttributeFlag::SelectRange,
                    AttributeFlag::DisplayUnit,
                    AttributeFlag::ColorUnit,
                    AttributeFlag::ZPosition,
                    AttributeFlag::TextureQuality,
                    AttributeFlag::Smoothing,
                ],
            ))
    }

    /// Contour lines with labels
    pub fn contour_plot(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone())
            .with_category("Plan Views")
            .with_visual(VisualSpec::new(
                VisualKind::ContourLines,
                format!("{} contours", name),
                &[
                    AttributeFlag::Color,
                    AttributeFlag::Contour,
                    AttributeFlag::DisplayUnit,
                    AttributeFlag::LineWidth,
                    AttributeFlag::ZPosition,
                    AttributeFlag::SkipFactor,
                    AttributeFlag::Smoothing,
                ],
            ))
    }
}

impl ControlBehavior for BasicBehavior {
    fn display_name(&self) -> String {
        self.name.clone()
    }

    fn category(&self) -> String {
        self.category.clone()
    }

    fn attribute_flags(&self) -> AttributeSet {
        self.visuals
            .iter()
            .fold(AttributeSet::empty(), |acc, v| acc.union(v.flags))
    }

    fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    fn create_visuals(
        &self,
        factory: &dyn VisualFactory,
        flags: AttributeSet,
    ) -> Result<Vec<FlaggedVisual>> {
        let mut created: Vec<FlaggedVisual> = Vec::with_capacity(self.visuals.len());
        for spec in &self.visuals {
            let visual = match factory
                .create(spec.kind, &spec.name)
                .with_context(|| format!("Creating '{}'", spec.name))
            {
                Ok(visual) => visual,
                Err(e) => {
                    // Nothing owns the earlier visuals yet
                    for entry in &created {
                        if let Err(dispose_err) = entry.visual.dispose() {
                            tracing::warn!(
                                "Failed to dispose '{}': {}",
                                entry.visual.name(),
                                dispose_err
                            );
                        }
                    }
                    return Err(e);
                }
            };
            let mut entry =
                FlaggedVisual::new(visual, spec.flags.intersection(flags)).not_global(spec.not_global);
            entry.data_index = spec.data_index;
            created.push(entry);
        }
        Ok(created)
    }
}
