//! Attribute categories, per-control attribute state and the propagation
//! engine that pushes state into visual objects.

pub mod flags;
pub mod propagation;
pub mod registry;
pub mod state;

pub use flags::{AttributeFlag, AttributeSet};
pub use propagation::{ApplyReport, Propagator, RefreshReport};
pub use registry::{FlaggedVisual, VisualRegistry};
pub use state::{AttributeDefaults, AttributeState, UnitConversion};
