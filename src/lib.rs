//! # displayctl-rs: Display Control Framework
//!
//! A display control binds named data references to renderable visual
//! objects inside one or more view contexts, and keeps that binding
//! consistent while attributes are edited, data changes and the camera
//! moves.
//!
//! ## Architecture
//!
//! - **Control**: lifecycle state machine and the façade a UI shell talks to
//! - **Attributes**: capability flags, attribute state and the propagation
//!   engine that pushes values into visual objects
//! - **Data**: data references, resolution and change notification
//! - **Time**: per-view time-driver role and label templates
//! - **View**: the view context abstraction and the camera-change debounce
//! - **Communication**: crossbeam channels for control events and the
//!   background worker pool
//!
//! Renderers, data sources and durable storage are collaborators behind
//! the [`visual::VisualFactory`], [`data::DataResolver`],
//! [`view::ViewContext`] and [`persistence::PersistenceStore`] traits. The
//! in-memory implementations ([`view::MemoryView`],
//! [`data::MemoryResolver`], [`visual::RecordingFactory`],
//! [`persistence::MemoryStore`]) back the demo binary and the tests.
//!
//! ## Configuration
//!
//! Framework settings are read from `displayctl.toml` in the platform
//! config directory under `displayctl-rs`:
//!
//! - **Linux**: `~/.config/displayctl-rs/displayctl.toml`
//! - **macOS**: `~/Library/Application Support/displayctl-rs/displayctl.toml`
//! - **Windows**: `%APPDATA%\displayctl-rs\displayctl.toml`
//!
//! ## Example
//!
//! ```ignore
//! use displayctl_rs::{
//!     control::{BasicBehavior, ControlEnv, DisplayControl},
//!     data::{DataReference, DataSelection, MemoryResolver, SampledData},
//!     view::MemoryView,
//!     visual::RecordingFactory,
//!     FrameworkConfig,
//! };
//! use std::sync::Arc;
//!
//! let resolver = Arc::new(MemoryResolver::new());
//! resolver.insert("T", SampledData::new(vec![271.0, 288.5]));
//! let env = ControlEnv::new(
//!     FrameworkConfig::default(),
//!     resolver,
//!     Arc::new(RecordingFactory::new()),
//! )?;
//!
//! let control = DisplayControl::new(Arc::new(BasicBehavior::plan_view("T")), env);
//! control.init(
//!     vec![DataReference::new("T")],
//!     Arc::new(MemoryView::new("main")),
//!     None,
//!     DataSelection::default(),
//! )?;
//! control.set_dimness(0.5);
//! println!("{}", control.legend_label());
//! control.remove();
//! ```

pub mod attributes;
pub mod config;
pub mod control;
pub mod data;
pub mod error;
pub mod id;
pub mod logging;
pub mod persistence;
pub mod registry;
pub mod time;
pub mod types;
pub mod units;
pub mod view;
pub mod visual;
pub mod worker;

// Re-export commonly used types
pub use attributes::{AttributeFlag, AttributeSet, AttributeState};
pub use config::{ControlProperties, DisplaySetting, FrameworkConfig};
pub use control::{BasicBehavior, ControlBehavior, ControlEnv, ControlEvent, DisplayControl};
pub use error::{ControlError, Result, ResultExt};
pub use id::{ControlId, ViewId, VisualId};
pub use units::Unit;
