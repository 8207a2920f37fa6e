//! Display control façade
//!
//! A [`DisplayControl`] is the aggregate a UI shell talks to. It wires the
//! collaborating parts together:
//!
//! - [`lifecycle`] - `init` / `remove` and the background entry points
//! - [`crate::attributes`] - attribute state and the propagation engine
//! - [`crate::data`] - data binding and re-resolution
//! - [`timing`] - time-driver role and label templates
//! - [`settings`] - snapshot, restore and display settings
//!
//! Control-type specific parts (which visuals to create, which attribute
//! categories apply, the data validity check) come from a
//! [`ControlBehavior`].
//!
//! # Threads
//!
//! Public methods may be called from any thread. Notifications that arrive
//! on foreign threads (resolver change events, camera settle, time-driver
//! fan-out) are handed to the shared [`WorkerPool`] and never touch control
//! state on the caller's thread.
//!
//! # Example
//!
//! ```ignore
//! use displayctl_rs::control::{BasicBehavior, ControlEnv, DisplayControl};
//!
//! let env = ControlEnv::new(config, resolver, factory)?;
//! let control = DisplayControl::new(Arc::new(BasicBehavior::plan_view("Temperature")), env);
//! control.init(vec![reference], view, None, DataSelection::default())?;
//! control.set_color_table_by_name("Grayscale")?;
//! control.remove();
//! ```

pub mod behavior;
mod display;
pub mod lifecycle;
pub mod settings;
pub mod timing;

pub use behavior::{BasicBehavior, ControlBehavior, VisualSpec, DEFAULT_CATEGORY};
pub use display::DisplayControl;
pub use lifecycle::LifecycleState;

#[cfg(test)]
pub use behavior::MockControlBehavior;

use crate::config::FrameworkConfig;
use crate::data::DataResolver;
use crate::error::Result;
use crate::id::ControlId;
use crate::persistence::{MemoryStore, PersistenceStore};
use crate::registry::{CategoryRegistry, ColorTableRegistry};
use crate::visual::VisualFactory;
use crate::worker::WorkerPool;
use std::sync::Arc;

/// Collaborators shared by every control of one application
#[derive(Clone)]
pub struct ControlEnv {
    pub config: Arc<FrameworkConfig>,
    pub resolver: Arc<dyn DataResolver>,
    pub factory: Arc<dyn VisualFactory>,
    pub store: Arc<dyn PersistenceStore>,
    pub workers: Arc<WorkerPool>,
    pub categories: Arc<CategoryRegistry>,
    pub color_tables: Arc<ColorTableRegistry>,
}

impl ControlEnv {
    /// Environment with an in-memory store and the built-in color tables.
    /// Starts the worker pool sized from `config.workers`.
    pub fn new(
        config: FrameworkConfig,
        resolver: Arc<dyn DataResolver>,
        factory: Arc<dyn VisualFactory>,
    ) -> Result<Self> {
        let workers = WorkerPool::new(config.workers.threads, config.workers.queue_capacity)?;
        Ok(Self {
            config: Arc::new(config),
            resolver,
            factory,
            store: Arc::new(MemoryStore::new()),
            workers: Arc::new(workers),
            categories: Arc::new(CategoryRegistry::new()),
            color_tables: Arc::new(ColorTableRegistry::with_builtins()),
        })
    }

    pub fn with_store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_categories(mut self, categories: Arc<CategoryRegistry>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_color_tables(mut self, color_tables: Arc<ColorTableRegistry>) -> Self {
        self.color_tables = color_tables;
        self
    }
}

impl std::fmt::Debug for ControlEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlEnv")
            .field("config", &self.config)
            .field("workers", &self.workers.threads())
            .field("categories", &self.categories.list())
            .field("color_tables", &self.color_tables.names())
            .finish()
    }
}

/// Notification sent to control subscribers
#[derive(Debug, Clone, PartialEq)]
pub enum ControlEvent {
    /// Initialization reached `Ready`
    Initialized(ControlId),
    /// Data was re-resolved and pushed to the visuals
    DataChanged(ControlId),
    /// An attribute batch finished
    AttributesApplied { control: ControlId, failures: usize },
    VisibilityChanged { control: ControlId, visible: bool },
    /// Legend label re-derived after an animation tick
    LabelChanged { control: ControlId, label: String },
    /// Another control took over the time-driver role
    TimeDriverRevoked(ControlId),
    /// Message meant for the user
    Failure { control: ControlId, message: String },
    Removed(ControlId),
}

impl ControlEvent {
    pub fn control(&self) -> ControlId {
        match self {
            ControlEvent::Initialized(c)
            | ControlEvent::DataChanged(c)
            | ControlEvent::TimeDriverRevoked(c)
            | ControlEvent::Removed(c) => *c,
            ControlEvent::AttributesApplied { control, .. }
            | ControlEvent::VisibilityChanged { control, .. }
            | ControlEvent::LabelChanged { control, .. }
            | ControlEvent::Failure { control, .. } => *control,
        }
    }

    /// Text of a [`ControlEvent::LabelChanged`]
    pub fn label(&self) -> Option<&str> {
        match self {
            ControlEvent::LabelChanged { label, .. } => Some(label),
            _ => None,
        }
    }
}
