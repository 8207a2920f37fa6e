//! Test data builders for creating test objects

use displayctl_rs::config::FrameworkConfig;
use displayctl_rs::control::{BasicBehavior, ControlEnv, DisplayControl};
use displayctl_rs::data::{DataReference, DataSelection, MemoryResolver, SampledData};
use displayctl_rs::persistence::PersistenceStore;
use displayctl_rs::units::Unit;
use displayctl_rs::view::MemoryView;
use displayctl_rs::visual::{RecordingFactory, RecordingVisual};
use std::sync::Arc;
use std::time::Duration;

/// Builder for a control environment backed by in-memory collaborators
pub struct HarnessBuilder {
    config: FrameworkConfig,
    datasets: Vec<(String, SampledData)>,
    store: Option<Arc<dyn PersistenceStore>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: FrameworkConfig::default(),
            datasets: Vec::new(),
            store: None,
        }
    }

    /// Add a dataset; `unit` is parsed from the catalog
    pub fn dataset(mut self, name: &str, values: &[f64], unit: &str) -> Self {
        let data = SampledData::new(values.to_vec()).with_unit(Unit::parse(unit).unwrap());
        self.datasets.push((name.to_string(), data));
        self
    }

    pub fn data(mut self, name: &str, data: SampledData) -> Self {
        self.datasets.push((name.to_string(), data));
        self
    }

    pub fn debounce(mut self, delay: Duration) -> Self {
        self.config.debounce.delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn ignore_errors(mut self) -> Self {
        self.config.policy.ignore_errors = true;
        self
    }

    pub fn store(mut self, store: Arc<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Harness {
        let resolver = Arc::new(MemoryResolver::new());
        for (name, data) in self.datasets {
            resolver.insert(name, data);
        }
        let factory = Arc::new(RecordingFactory::new());
        let mut env = ControlEnv::new(self.config, resolver.clone(), factory.clone()).unwrap();
        if let Some(store) = self.store {
            env = env.with_store(store);
        }
        Harness {
            env,
            resolver,
            factory,
            view: Arc::new(MemoryView::new("main")),
        }
    }
}

/// Shared collaborators for one test
pub struct Harness {
    pub env: ControlEnv,
    pub resolver: Arc<MemoryResolver>,
    pub factory: Arc<RecordingFactory>,
    pub view: Arc<MemoryView>,
}

impl Harness {
    pub fn control(&self, behavior: BasicBehavior) -> DisplayControl {
        DisplayControl::new(Arc::new(behavior), self.env.clone())
    }

    /// Create and initialize a control on the harness view
    pub fn ready(&self, behavior: BasicBehavior, reference: DataReference) -> DisplayControl {
        self.ready_with(behavior, reference, DataSelection::default())
    }

    pub fn ready_with(
        &self,
        behavior: BasicBehavior,
        reference: DataReference,
        selection: DataSelection,
    ) -> DisplayControl {
        let control = self.control(behavior);
        control
            .init(vec![reference], self.view.clone(), None, selection)
            .unwrap();
        control
    }

    pub fn visual(&self, name: &str) -> Arc<RecordingVisual> {
        self.factory
            .find(name)
            .unwrap_or_else(|| panic!("no visual named '{}'", name))
    }

    /// Wait for every queued background job
    pub fn settle(&self) {
        assert!(self.env.workers.wait_idle(super::test_timeout()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_builder() {
        let harness = HarnessBuilder::new()
            .dataset("T", &[1.0, 2.0], "K")
            .debounce(Duration::from_millis(20))
            .build();

        assert_eq!(harness.env.config.debounce.delay_ms, 20);
        assert_eq!(harness.resolver.resolve_count("T"), 0);
        assert_eq!(harness.view.visual_count(), 0);
    }
}
