//! In-memory data resolver keyed by reference name.

use super::reference::{DataReference, DataSelection, SampledData};
use super::{DataChangeListener, DataResolver};
use crate::error::Result;
use crate::id::{ListenerId, ReferenceId};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct ResolverState {
    datasets: HashMap<String, SampledData>,
    listeners: Vec<(ListenerId, ReferenceId, DataChangeListener)>,
    resolve_counts: HashMap<String, usize>,
}

/// Resolver backed by a name → [`SampledData`] map
///
/// Selections are honored loosely: an explicit time list filters the
/// stored times, and explicit bounds replace the stored bounds.
#[derive(Default)]
pub struct MemoryResolver {
    state: Mutex<ResolverState>,
}

impl MemoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store (or overwrite) the data for a reference name
    pub fn insert(&self, name: impl Into<String>, data: SampledData) {
        self.lock().datasets.insert(name.into(), data);
    }

    pub fn remove(&self, name: &str) -> Option<SampledData> {
        self.lock().datasets.remove(name)
    }

    /// Store new data for `reference` and notify its subscribers
    pub fn update(&self, reference: &DataReference, data: SampledData) {
        self.insert(reference.name.clone(), data);
        self.notify_changed(reference.id);
    }

    /// Fire the change listeners subscribed to `reference`
    pub fn notify_changed(&self, reference: ReferenceId) {
        let listeners: Vec<DataChangeListener> = self
            .lock()
            .listeners
            .iter()
            .filter(|(_, r, _)| *r == reference)
            .map(|(_, _, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(reference);
        }
    }

    /// How many times `name` was resolved
    pub fn resolve_count(&self, name: &str) -> usize {
        self.lock().resolve_counts.get(name).copied().unwrap_or(0)
    }

    pub fn listener_count(&self) -> usize {
        self.lock().listeners.len()
    }
}

impl DataResolver for MemoryResolver {
    fn resolve(
        &self,
        reference: &DataReference,
        selection: &DataSelection,
    ) -> Result<Option<SampledData>> {
        let mut state = self.lock();
        *state
            .resolve_counts
            .entry(reference.name.clone())
            .or_insert(0) += 1;
        let Some(mut data) = state.datasets.get(&reference.name).cloned() else {
            return Ok(None);
        };
        if !selection.times.is_empty() && !data.times.is_empty() {
            data.times.retain(|t| selection.times.contains(t));
        }
        if selection.bounds.is_some() {
            data.bounds = selection.bounds;
        }
        Ok(Some(data))
    }

    fn subscribe(&self, reference: ReferenceId, listener: DataChangeListener) -> ListenerId {
        let id = ListenerId::next();
        self.lock().listeners.push((id, reference, listener));
        id
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.lock().listeners.retain(|(l, _, _)| *l != id);
    }
}
