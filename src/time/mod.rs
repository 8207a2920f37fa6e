//! Time-driver synchronization and time-dependent labels.

pub mod driver;
pub mod labels;

pub use driver::{TimeDriverClaim, TimeDriverEvent, TimeDriverListener, TimeDriverSlot};
pub use labels::{
    forecast_base_time, forecast_hour, has_time_macros, merge_time_sets, LabelContext,
    LabelFormatter,
};
