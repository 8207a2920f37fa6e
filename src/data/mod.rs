//! Data binding layer
//!
//! A control displays one or more [`DataReference`]s. Each reference is
//! resolved through a [`DataResolver`] into a [`DataInstance`], which pairs
//! the reference with the [`DataSelection`] it was subset by and the
//! [`SampledData`] the resolver produced. [`DataBinding`] owns the instances
//! of one control and implements the resolve / re-resolve / replace rules.

pub mod binding;
pub mod memory;
pub mod reference;

pub use binding::{Cardinality, DataBinding, DataInstance, ReplaceOutcome};
pub use memory::MemoryResolver;
pub use reference::{all_basically_equal, DataReference, DataSelection, SampledData};

use crate::error::Result;
use crate::id::{ListenerId, ReferenceId};
use std::sync::Arc;

/// Callback fired when the data behind a reference changes
pub type DataChangeListener = Arc<dyn Fn(ReferenceId) + Send + Sync>;

/// Produces sampled values for data references
#[cfg_attr(test, mockall::automock)]
pub trait DataResolver: Send + Sync {
    /// Resolve `reference` subset by `selection`. `Ok(None)` means the
    /// resolver has nothing for this reference.
    fn resolve(
        &self,
        reference: &DataReference,
        selection: &DataSelection,
    ) -> Result<Option<SampledData>>;

    /// Subscribe to change notifications for `reference`
    fn subscribe(&self, reference: ReferenceId, listener: DataChangeListener) -> ListenerId;

    fn unsubscribe(&self, id: ListenerId);
}
