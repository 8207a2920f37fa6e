//! Data references, selections and sampled values.

use crate::id::ReferenceId;
use crate::types::{LatLonBox, Range};
use crate::units::Unit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque handle to a selectable data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataReference {
    pub id: ReferenceId,
    /// Short parameter name, e.g. `T` or `rh`
    pub name: String,
    pub long_name: Option<String>,
    /// Name of the data source this reference came from
    pub source_name: Option<String>,
    /// Native unit name of the values
    pub unit: Option<String>,
    /// Model run time, for forecast data
    pub run_time: Option<DateTime<Utc>>,
    /// Operands when this reference is a derived (composed) quantity
    pub derived_from: Vec<DataReference>,
}

impl DataReference {
    /// A new reference with a fresh identity
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ReferenceId::next(),
            name: name.into(),
            long_name: None,
            source_name: None,
            unit: None,
            run_time: None,
            derived_from: Vec::new(),
        }
    }

    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = Some(long_name.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source_name = Some(source.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_run_time(mut self, run_time: DateTime<Utc>) -> Self {
        self.run_time = Some(run_time);
        self
    }

    pub fn derived_from(mut self, operands: Vec<DataReference>) -> Self {
        self.derived_from = operands;
        self
    }

    pub fn is_derived(&self) -> bool {
        !self.derived_from.is_empty()
    }

    /// Same identity or same name
    pub fn basically_equal(&self, other: &DataReference) -> bool {
        self.id == other.id || self.name == other.name
    }

    /// First non-derived reference in the composition chain, depth first
    pub fn first_source(&self) -> &DataReference {
        match self.derived_from.first() {
            Some(operand) => operand.first_source(),
            None => self,
        }
    }

    pub fn display_long_name(&self) -> &str {
        self.long_name.as_deref().unwrap_or(&self.name)
    }
}

/// Pairwise [`DataReference::basically_equal`] over two lists
pub fn all_basically_equal(old: &[DataReference], new: &[DataReference]) -> bool {
    old.len() == new.len() && old.iter().zip(new).all(|(a, b)| a.basically_equal(b))
}

/// Subsetting applied when resolving a reference
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataSelection {
    pub bounds: Option<LatLonBox>,
    pub level: Option<Range>,
    /// Explicit times; empty means all times
    pub times: Vec<DateTime<Utc>>,
    /// Subset to the view's visible region on every viewpoint change
    pub use_view_bounds: bool,
    /// Overwrite `times` with the view's time-driver sequence on refresh
    pub use_time_driver_times: bool,
}

impl DataSelection {
    pub fn with_bounds(mut self, bounds: LatLonBox) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn with_times(mut self, times: Vec<DateTime<Utc>>) -> Self {
        self.times = times;
        self
    }
}

/// Values produced by a resolver
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampledData {
    pub values: Vec<f64>,
    pub unit: Option<Unit>,
    pub times: Vec<DateTime<Utc>>,
    pub bounds: Option<LatLonBox>,
    pub level: Option<f64>,
}

impl SampledData {
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            ..Default::default()
        }
    }

    pub fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub fn with_times(mut self, times: Vec<DateTime<Utc>>) -> Self {
        self.times = times;
        self
    }

    /// Range of the finite values
    pub fn range(&self) -> Option<Range> {
        Range::from_values(self.values.iter().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
