//! Data instances and the per-control binding that owns them.

use super::reference::{all_basically_equal, DataReference, DataSelection, SampledData};
use super::{DataChangeListener, DataResolver};
use crate::error::{ControlError, Result, ResultExt};
use crate::id::{ListenerId, ReferenceId};
use std::sync::Arc;

/// How many data instances a control holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cardinality {
    /// A new instance replaces the previous one
    #[default]
    Single,
    /// New instances are appended
    Multiple,
}

/// A resolved, validity-checked data reference plus its selection
#[derive(Debug)]
pub struct DataInstance {
    reference: DataReference,
    selection: DataSelection,
    data: SampledData,
    subscription: Option<ListenerId>,
    generation: u64,
}

impl DataInstance {
    pub fn reference(&self) -> &DataReference {
        &self.reference
    }

    pub fn selection(&self) -> &DataSelection {
        &self.selection
    }

    pub fn data(&self) -> &SampledData {
        &self.data
    }

    /// Number of times this instance was re-initialized in place
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Re-resolve in place, keeping identity and the change subscription.
    /// On failure the previous data is kept.
    pub fn reinitialize(
        &mut self,
        resolver: &dyn DataResolver,
        selection: Option<&DataSelection>,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<()> {
        let selection = selection.unwrap_or(&self.selection).clone();
        let data = fetch(resolver, &self.reference, &selection, valid)?;
        self.selection = selection;
        self.data = data;
        self.generation += 1;
        Ok(())
    }
}

fn fetch(
    resolver: &dyn DataResolver,
    reference: &DataReference,
    selection: &DataSelection,
    valid: &dyn Fn(&SampledData) -> bool,
) -> Result<SampledData> {
    let data = resolver
        .resolve(reference, selection)
        .with_context(|| format!("Resolving '{}'", reference.name))?
        .ok_or_else(|| ControlError::data_unavailable(reference.name.clone(), "no data"))?;
    if !valid(&data) {
        return Err(ControlError::data_unavailable(
            reference.name.clone(),
            "data failed validity check",
        ));
    }
    Ok(data)
}

/// Result of [`DataBinding::replace_and_resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Old and new lists are pairwise basically equal; overrides survive
    PreserveOverrides,
    /// Unrelated data; unit and range overrides must be re-derived
    ClearOverrides,
}

/// The data references and resolved instances of one control
pub struct DataBinding {
    resolver: Arc<dyn DataResolver>,
    cardinality: Cardinality,
    references: Vec<DataReference>,
    instances: Vec<DataInstance>,
    listener: Option<DataChangeListener>,
}

impl DataBinding {
    pub fn new(resolver: Arc<dyn DataResolver>, cardinality: Cardinality) -> Self {
        Self {
            resolver,
            cardinality,
            references: Vec::new(),
            instances: Vec::new(),
            listener: None,
        }
    }

    /// Listener attached to every instance created from now on
    pub fn set_change_listener(&mut self, listener: DataChangeListener) {
        self.listener = Some(listener);
    }

    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    pub fn references(&self) -> &[DataReference] {
        &self.references
    }

    pub fn set_references(&mut self, references: Vec<DataReference>) {
        self.references = references;
    }

    pub fn instances(&self) -> &[DataInstance] {
        &self.instances
    }

    pub fn primary(&self) -> Option<&DataInstance> {
        self.instances.first()
    }

    pub fn has_data(&self) -> bool {
        !self.instances.is_empty()
    }

    pub fn resolver(&self) -> &Arc<dyn DataResolver> {
        &self.resolver
    }

    /// Resolve one reference into a new instance.
    ///
    /// Single-data bindings release their previous instance; multi-data
    /// bindings append.
    pub fn resolve(
        &mut self,
        reference: &DataReference,
        selection: &DataSelection,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<&DataInstance> {
        let data = fetch(self.resolver.as_ref(), reference, selection, valid)?;
        if self.cardinality == Cardinality::Single {
            self.release_all();
        }
        Ok(self.adopt(reference, selection, data))
    }

    /// Subscribe to changes and append a resolved instance
    fn adopt(
        &mut self,
        reference: &DataReference,
        selection: &DataSelection,
        data: SampledData,
    ) -> &DataInstance {
        let subscription = self
            .listener
            .as_ref()
            .map(|l| self.resolver.subscribe(reference.id, l.clone()));
        tracing::debug!("Resolved '{}' ({} values)", reference.name, data.values.len());
        self.instances.push(DataInstance {
            reference: reference.clone(),
            selection: selection.clone(),
            data,
            subscription,
            generation: 0,
        });
        // Non-empty: pushed above
        &self.instances[self.instances.len() - 1]
    }

    /// The references that get instances (only the first for single-data)
    fn wanted(&self, references: &[DataReference]) -> Vec<DataReference> {
        match self.cardinality {
            Cardinality::Single => references.iter().take(1).cloned().collect(),
            Cardinality::Multiple => references.to_vec(),
        }
    }

    /// Fetch every wanted reference without touching the binding
    fn fetch_all(
        &self,
        references: &[DataReference],
        selection: &DataSelection,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<Vec<(DataReference, SampledData)>> {
        let wanted = self.wanted(references);
        if wanted.is_empty() {
            return Err(ControlError::data_unavailable("<none>", "no data references"));
        }
        wanted
            .into_iter()
            .map(|reference| {
                let data = fetch(self.resolver.as_ref(), &reference, selection, valid)?;
                Ok((reference, data))
            })
            .collect()
    }

    /// Resolve every bound reference, all or nothing: on failure the
    /// current instances are kept.
    pub fn resolve_all(
        &mut self,
        selection: &DataSelection,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<()> {
        let staged = self.fetch_all(&self.references, selection, valid)?;
        self.release_all();
        for (reference, data) in staged {
            self.adopt(&reference, selection, data);
        }
        Ok(())
    }

    /// Change notification path: re-initialize the instances bound to
    /// `reference` in place. Returns false when no instance matched.
    pub fn reinitialize(
        &mut self,
        reference: ReferenceId,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<bool> {
        let mut matched = false;
        for instance in self
            .instances
            .iter_mut()
            .filter(|i| i.reference.id == reference)
        {
            instance.reinitialize(self.resolver.as_ref(), None, valid)?;
            matched = true;
        }
        Ok(matched)
    }

    /// Re-resolve every instance in place with a new selection.
    ///
    /// Existing instances are refreshed all or nothing. Multi-data
    /// references that never resolved are tried again; those still missing
    /// are skipped.
    pub fn reload(
        &mut self,
        selection: &DataSelection,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<()> {
        let refreshed = self
            .instances
            .iter()
            .map(|i| fetch(self.resolver.as_ref(), &i.reference, selection, valid))
            .collect::<Result<Vec<_>>>()?;
        for (instance, data) in self.instances.iter_mut().zip(refreshed) {
            instance.selection = selection.clone();
            instance.data = data;
            instance.generation += 1;
        }

        let missing: Vec<DataReference> = match self.cardinality {
            Cardinality::Single if self.has_data() => Vec::new(),
            _ => self
                .wanted(&self.references)
                .into_iter()
                .filter(|r| !self.instances.iter().any(|i| i.reference.id == r.id))
                .collect(),
        };
        if missing.is_empty() {
            return Ok(());
        }
        for reference in missing {
            match fetch(self.resolver.as_ref(), &reference, selection, valid) {
                Ok(data) => {
                    self.adopt(&reference, selection, data);
                }
                Err(e) => tracing::debug!("'{}' is still unavailable: {}", reference.name, e),
            }
        }
        // Keep instances in reference order so the primary stays first
        let references = &self.references;
        self.instances.sort_by_key(|i| {
            references
                .iter()
                .position(|r| r.id == i.reference.id)
                .unwrap_or(usize::MAX)
        });
        Ok(())
    }

    /// How a new reference list relates to the current one
    pub fn replace_outcome(&self, references: &[DataReference]) -> ReplaceOutcome {
        if all_basically_equal(&self.references, references) {
            ReplaceOutcome::PreserveOverrides
        } else {
            ReplaceOutcome::ClearOverrides
        }
    }

    /// Swap in a new reference list and resolve it.
    ///
    /// The new data is fetched first; when any of it is unavailable the
    /// error is returned and the references and instances stay as they were.
    pub fn replace_and_resolve(
        &mut self,
        references: Vec<DataReference>,
        selection: &DataSelection,
        valid: &dyn Fn(&SampledData) -> bool,
    ) -> Result<ReplaceOutcome> {
        let outcome = self.replace_outcome(&references);
        let staged = self.fetch_all(&references, selection, valid)?;
        tracing::debug!(
            "Replacing {} data reference(s) with {} ({:?})",
            self.references.len(),
            references.len(),
            outcome
        );
        self.release_all();
        self.references = references;
        for (reference, data) in staged {
            self.adopt(&reference, selection, data);
        }
        Ok(outcome)
    }

    /// Drop every instance and its change subscription
    pub fn release_all(&mut self) {
        for instance in self.instances.drain(..) {
            if let Some(id) = instance.subscription {
                self.resolver.unsubscribe(id);
            }
        }
    }
}

impl std::fmt::Debug for DataBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBinding")
            .field("cardinality", &self.cardinality)
            .field("references", &self.references)
            .field("instances", &self.instances.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryResolver, MockDataResolver};

    fn any(_: &SampledData) -> bool {
        true
    }

    #[test]
    fn test_resolve_missing_is_data_unavailable() {
        let resolver = Arc::new(MemoryResolver::new());
        let mut binding = DataBinding::new(resolver, Cardinality::Single);
        let err = binding
            .resolve(&DataReference::new("T"), &DataSelection::default(), &any)
            .unwrap_err();
        assert!(err.is_data_unavailable());
        assert!(!binding.has_data());
    }

    #[test]
    fn test_validity_check_rejects() {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("T", SampledData::default());
        let mut binding = DataBinding::new(resolver, Cardinality::Single);
        let non_empty = |d: &SampledData| !d.is_empty();
        let err = binding
            .resolve(&DataReference::new("T"), &DataSelection::default(), &non_empty)
            .unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn test_single_replaces_multiple_appends() {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("T", SampledData::new(vec![1.0]));
        resolver.insert("rh", SampledData::new(vec![2.0]));
        let sel = DataSelection::default();

        let mut single = DataBinding::new(resolver.clone(), Cardinality::Single);
        single.resolve(&DataReference::new("T"), &sel, &any).unwrap();
        single.resolve(&DataReference::new("rh"), &sel, &any).unwrap();
        assert_eq!(single.instances().len(), 1);
        assert_eq!(single.primary().unwrap().reference().name, "rh");

        let mut multi = DataBinding::new(resolver, Cardinality::Multiple);
        multi.set_references(vec![DataReference::new("T"), DataReference::new("rh")]);
        multi.resolve_all(&sel, &any).unwrap();
        assert_eq!(multi.instances().len(), 2);
    }

    #[test]
    fn test_reinitialize_keeps_instance() {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("T", SampledData::new(vec![1.0]));
        let mut binding = DataBinding::new(resolver.clone(), Cardinality::Single);
        binding.set_change_listener(Arc::new(|_| {}));
        let reference = DataReference::new("T");
        binding
            .resolve(&reference, &DataSelection::default(), &any)
            .unwrap();
        assert_eq!(resolver.listener_count(), 1);

        resolver.insert("T", SampledData::new(vec![1.0, 2.0, 3.0]));
        assert!(binding.reinitialize(reference.id, &any).unwrap());
        let instance = binding.primary().unwrap();
        assert_eq!(instance.generation(), 1);
        assert_eq!(instance.data().values.len(), 3);
        assert_eq!(resolver.listener_count(), 1);

        binding.release_all();
        assert_eq!(resolver.listener_count(), 0);
    }

    #[test]
    fn test_replace_outcome() {
        let resolver = Arc::new(MemoryResolver::new());
        let mut binding = DataBinding::new(resolver, Cardinality::Single);
        binding.set_references(vec![DataReference::new("T")]);
        assert_eq!(
            binding.replace_outcome(&[DataReference::new("T")]),
            ReplaceOutcome::PreserveOverrides
        );
        assert_eq!(
            binding.replace_outcome(&[DataReference::new("rh")]),
            ReplaceOutcome::ClearOverrides
        );
    }

    #[test]
    fn test_failed_replace_keeps_binding() {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("T", SampledData::new(vec![1.0, 2.0]));
        let mut binding = DataBinding::new(resolver.clone(), Cardinality::Single);
        binding.set_change_listener(Arc::new(|_| {}));
        binding.set_references(vec![DataReference::new("T")]);
        binding.resolve_all(&DataSelection::default(), &any).unwrap();

        let err = binding
            .replace_and_resolve(vec![DataReference::new("missing")], &DataSelection::default(), &any)
            .unwrap_err();

        assert!(err.is_data_unavailable());
        assert_eq!(binding.references()[0].name, "T");
        assert_eq!(binding.primary().unwrap().reference().name, "T");
        assert_eq!(resolver.listener_count(), 1);
    }

    #[test]
    fn test_resolve_all_is_all_or_nothing() {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("T", SampledData::new(vec![1.0]));
        let mut binding = DataBinding::new(resolver.clone(), Cardinality::Multiple);
        binding.set_references(vec![DataReference::new("T"), DataReference::new("rh")]);

        assert!(binding.resolve_all(&DataSelection::default(), &any).is_err());
        assert!(!binding.has_data());

        resolver.insert("rh", SampledData::new(vec![2.0]));
        binding.resolve_all(&DataSelection::default(), &any).unwrap();
        assert_eq!(binding.instances().len(), 2);
    }

    #[test]
    fn test_reload_fills_missing_references() {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("rh", SampledData::new(vec![2.0]));
        let mut binding = DataBinding::new(resolver.clone(), Cardinality::Multiple);
        let sel = DataSelection::default();
        binding.set_references(vec![DataReference::new("T"), DataReference::new("rh")]);
        let rh = binding.references()[1].clone();
        binding.resolve(&rh, &sel, &any).unwrap();

        binding.reload(&sel, &any).unwrap();
        assert_eq!(binding.instances().len(), 1);

        resolver.insert("T", SampledData::new(vec![1.0]));
        binding.reload(&sel, &any).unwrap();
        let names: Vec<_> = binding
            .instances()
            .iter()
            .map(|i| i.reference().name.clone())
            .collect();
        assert_eq!(names, vec!["T", "rh"]);
    }

    #[test]
    fn test_resolver_error_gets_context() {
        let mut resolver = MockDataResolver::new();
        resolver
            .expect_resolve()
            .returning(|_, _| Err(ControlError::View("offline".into())));
        let mut binding = DataBinding::new(Arc::new(resolver), Cardinality::Single);
        let err = binding
            .resolve(&DataReference::new("T"), &DataSelection::default(), &any)
            .unwrap_err();
        assert!(err.to_string().contains("Resolving 'T'"));
        assert!(matches!(err.root(), ControlError::View(_)));
    }
}
