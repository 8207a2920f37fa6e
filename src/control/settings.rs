//! Settings snapshot and restore, property bundles and data replacement.

use super::display::{ControlCore, DisplayControl};
use super::ControlEvent;
use crate::attributes::RefreshReport;
use crate::config::{ControlProperties, DisplaySetting};
use crate::data::{DataReference, ReplaceOutcome};
use crate::error::{ControlError, Result};
use crate::persistence::{ControlSettings, ParameterDefaults};
use crate::time::labels::has_time_macros;
use crate::units::Unit;

fn parse_unit(name: Option<&str>, what: &str) -> Option<Unit> {
    let name = name?;
    match Unit::parse(name) {
        Ok(unit) => Some(unit),
        Err(e) => {
            tracing::warn!("Ignoring persisted {} '{}': {}", what, name, e);
            None
        }
    }
}

impl DisplayControl {
    // ==================== Snapshot ====================

    /// Snapshot of everything persisted for this control
    pub fn settings(&self) -> ControlSettings {
        let save_sources = self.shared.env.config.policy.save_data_sources;
        let core = self.core();
        let mut settings = ControlSettings {
            category: Some(core.category.clone()),
            legend_template: Some(core.legend_template.clone()),
            menu_template: Some(core.menu_template.clone()),
            lock_visibility: core.lock_visibility,
            window: core.window,
            is_time_driver: core.wants_time_driver,
            uses_time_driver: core.uses_time_driver,
            data_references: save_sources.then(|| core.binding.references().to_vec()),
            ..Default::default()
        };
        settings.capture_attributes(&core.attrs);
        settings
    }

    pub fn save(&self, key: &str) -> Result<()> {
        let settings = self.settings();
        settings.save_to(self.shared.env.store.as_ref(), key)?;
        tracing::debug!("Saved {} under '{}'", self.id(), key);
        Ok(())
    }

    /// Restore from the store. Returns false when nothing is stored.
    pub fn restore_from(&self, key: &str) -> Result<bool> {
        match ControlSettings::load_from(self.shared.env.store.as_ref(), key)? {
            Some(settings) => {
                self.restore(&settings)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-apply a persisted snapshot.
    ///
    /// Before `init` the values are only stored and take effect during
    /// initialization. A ready control refreshes every category.
    pub fn restore(&self, settings: &ControlSettings) -> Result<()> {
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        let save_sources = self.shared.env.config.policy.save_data_sources;
        let (ready, references) = {
            let mut guard = self.core();
            let core = &mut *guard;
            core.restored_from_persistence = true;

            let attrs = &mut core.attrs;
            attrs.color = settings.color;
            attrs.color_table = settings.color_table.clone();
            attrs.set_dimness(settings.dimness);
            attrs.range = settings.range;
            attrs.select_range = settings.select_range;
            attrs.contour = settings.contour.clone();
            attrs.display_unit = parse_unit(settings.display_unit.as_deref(), "display unit");
            attrs.color_unit = parse_unit(settings.color_unit.as_deref(), "color unit");
            attrs.z_position = settings.z_position;
            attrs.line_width = settings.line_width;
            attrs.skip = settings.skip;
            attrs.texture_quality = settings.texture_quality;
            attrs.smoothing = settings.smoothing;
            attrs.fast_rendering = settings.fast_rendering;
            attrs.visible = settings.visible;

            if let Some(template) = &settings.legend_template {
                core.legend_template = template.clone();
            }
            if let Some(template) = &settings.menu_template {
                core.menu_template = template.clone();
            }
            if let Some(category) = &settings.category {
                self.shared.env.categories.register(category);
                core.category = category.clone();
            }
            core.lock_visibility = settings.lock_visibility;
            core.window = settings.window;

            if settings.is_time_driver && settings.uses_time_driver {
                tracing::warn!(
                    "{} restored as time driver; dropping its time-driver consumer flag",
                    self.id()
                );
            }
            core.wants_time_driver = settings.is_time_driver;
            core.uses_time_driver = settings.uses_time_driver && !settings.is_time_driver;

            let references = settings
                .data_references
                .clone()
                .filter(|r| save_sources && !r.is_empty());
            let ready = core.state.is_ready();
            if !ready {
                if let Some(references) = &references {
                    core.binding.set_references(references.clone());
                }
            }
            if ready && has_time_macros(&core.legend_template) {
                self.register_animation_listener(core);
            }
            (ready, references)
        };
        tracing::info!("Restored {} from settings", self.id());

        if !ready {
            return Ok(());
        }
        if let Some(references) = references {
            self.set_data_references(references)?;
        }
        self.refresh();
        self.set_display_visibility(settings.visible);
        if settings.is_time_driver && !self.is_time_driver() {
            self.become_time_driver()?;
        } else if !settings.is_time_driver && self.is_time_driver() {
            self.release_time_driver();
        }
        Ok(())
    }

    /// Store the current color, color table, range and unit as the
    /// preferred defaults of the primary parameter
    pub fn save_parameter_defaults(&self) -> Result<()> {
        let (param, defaults) = {
            let core = self.core();
            let param = core
                .binding
                .references()
                .first()
                .map(|r| r.name.clone())
                .ok_or_else(|| {
                    ControlError::Persistence(format!("{} has no parameter", self.id()))
                })?;
            let defaults = ParameterDefaults {
                color: core.attrs.color,
                color_table: core.attrs.color_table.as_ref().map(|t| t.name.clone()),
                range: core.attrs.range,
                display_unit: core.attrs.display_unit.as_ref().map(|u| u.name.clone()),
            };
            (param, defaults)
        };
        defaults.save(self.shared.env.store.as_ref(), &param)?;
        tracing::debug!("Saved defaults for '{}'", param);
        Ok(())
    }

    // ==================== Property Bundles ====================

    /// Apply a named property bundle, then refresh every category
    pub fn apply_display_setting(&self, setting: &DisplaySetting) -> Result<RefreshReport> {
        tracing::debug!("{} applying display setting '{}'", self.id(), setting.name);
        let properties = setting.parse_properties()?;
        self.apply_properties(&properties)
    }

    /// Apply property overrides and refresh every category.
    ///
    /// An unknown color table is reported after the remaining properties
    /// were applied.
    pub fn apply_properties(&self, properties: &ControlProperties) -> Result<RefreshReport> {
        if self.is_removed() {
            return Ok(RefreshReport {
                reports: Vec::new(),
                aborted: true,
            });
        }
        let (applied, report, was_driver, was_consumer, ready) = {
            let mut guard = self.core();
            let core = &mut *guard;
            let was_driver = core.wants_time_driver;
            let was_consumer = core.uses_time_driver;
            let applied = self.apply_properties_to_state(core, properties);
            let ready = core.state.is_ready();
            if ready
                && (has_time_macros(&core.legend_template) || has_time_macros(&core.menu_template))
            {
                self.register_animation_listener(core);
            }
            let report = core.refresh(&self.shared.removed);
            (applied, report, was_driver, was_consumer, ready)
        };
        self.emit(ControlEvent::AttributesApplied {
            control: self.id(),
            failures: report.failures(),
        });

        if ready {
            if let Some(visible) = properties.visible {
                self.set_display_visibility(visible);
            }
            let (driver, consumer) = {
                let core = self.core();
                (core.wants_time_driver, core.uses_time_driver)
            };
            if driver && !was_driver {
                self.become_time_driver()?;
            } else if !driver && was_driver {
                self.release_time_driver();
            }
            if consumer && !was_consumer {
                self.reload()?;
            }
        }
        applied?;
        Ok(report)
    }

    /// Write `properties` into the attribute state without pushing
    pub(super) fn apply_properties_to_state(
        &self,
        core: &mut ControlCore,
        properties: &ControlProperties,
    ) -> Result<()> {
        let mut rejected = None;
        let attrs = &mut core.attrs;
        if let Some(color) = properties.color {
            attrs.color = Some(color);
        }
        if let Some(name) = &properties.color_table {
            match self.shared.env.color_tables.get(name) {
                Some(table) => attrs.color_table = Some(table),
                None => {
                    rejected = Some(ControlError::InvalidProperty {
                        key: "colortable".to_string(),
                        value: name.clone(),
                    })
                }
            }
        }
        if let Some(dimness) = properties.dimness {
            attrs.set_dimness(dimness);
        }
        if let Some(range) = properties.range {
            attrs.range = Some(range);
        }
        if let Some(range) = properties.select_range {
            attrs.select_range.range = Some(range);
        }
        if let Some(enabled) = properties.select_range_enabled {
            attrs.select_range.enabled = enabled;
        }
        if let Some(contour) = &properties.contour {
            attrs.contour = Some(contour.clone());
        }
        if let Some(unit) = &properties.display_unit {
            attrs.display_unit = Some(unit.clone());
        }
        if let Some(unit) = &properties.color_unit {
            attrs.color_unit = Some(unit.clone());
        }
        if let Some(z) = properties.z_position {
            attrs.z_position = z;
        }
        if let Some(width) = properties.line_width {
            attrs.line_width = width;
        }
        if let Some(skip) = properties.skip {
            attrs.skip = skip;
        }
        if let Some(quality) = properties.texture_quality {
            attrs.texture_quality = quality;
        }
        if let Some(kind) = properties.smoothing {
            attrs.smoothing.kind = kind;
        }
        if let Some(factor) = properties.smoothing_factor {
            attrs.smoothing.factor = factor;
        }
        if let Some(fast) = properties.fast_rendering {
            attrs.fast_rendering = fast;
        }
        if let Some(visible) = properties.visible {
            attrs.visible = visible;
        }

        if let Some(lock) = properties.lock_visibility {
            core.lock_visibility = lock;
        }
        if let Some(template) = &properties.legend_template {
            core.legend_template = template.clone();
        }
        if let Some(template) = &properties.menu_template {
            core.menu_template = template.clone();
        }
        if let Some(category) = &properties.category {
            self.shared.env.categories.register(category);
            core.category = category.clone();
        }
        if let Some(driver) = properties.is_time_driver {
            core.wants_time_driver = driver;
        }
        if let Some(uses) = properties.use_time_driver {
            core.uses_time_driver = uses;
        }
        if core.wants_time_driver && core.uses_time_driver {
            tracing::warn!(
                "{} is both time driver and consumer; keeping the driver role",
                self.id()
            );
            core.uses_time_driver = false;
        }

        match rejected {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ==================== Data References ====================

    pub fn data_references(&self) -> Vec<DataReference> {
        self.core().binding.references().to_vec()
    }

    /// Replace the data references and re-resolve.
    ///
    /// When old and new lists are basically equal the unit and range
    /// overrides survive; otherwise they are cleared and re-derived from the
    /// new data. Before `init` the list is only stored.
    pub fn set_data_references(&self, references: Vec<DataReference>) -> Result<ReplaceOutcome> {
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        let valid = self.validity_check();
        let result = {
            let mut guard = self.core();
            let core = &mut *guard;
            if !core.state.is_ready() {
                let outcome = core.binding.replace_outcome(&references);
                core.binding.set_references(references);
                return Ok(outcome);
            }

            // Nothing changes unless every new reference resolves
            self.prepare_selection(core);
            match core
                .binding
                .replace_and_resolve(references, &core.selection, &valid)
            {
                Ok(outcome) => {
                    if outcome == ReplaceOutcome::ClearOverrides {
                        core.attrs.clear_data_overrides();
                        self.derive_defaults(core);
                    }
                    self.shared.behavior.push_data(&core.visuals, &core.binding);
                    core.refresh(&self.shared.removed);
                    Ok(outcome)
                }
                Err(e) => Err(e),
            }
        };

        match result {
            Ok(outcome) => {
                tracing::info!("{} data replaced ({:?})", self.id(), outcome);
                self.publish_driver_times();
                self.emit(ControlEvent::DataChanged(self.id()));
                Ok(outcome)
            }
            Err(e) => {
                tracing::warn!("{} could not resolve new data: {}", self.id(), e);
                self.emit(ControlEvent::Failure {
                    control: self.id(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::attributes::AttributeFlag;
    use crate::config::{ControlProperties, DisplaySetting, FrameworkConfig};
    use crate::control::{BasicBehavior, ControlEnv, DisplayControl};
    use crate::data::{DataReference, DataSelection, MemoryResolver, SampledData};
    use crate::error::ControlError;
    use crate::persistence::{ControlSettings, MemoryStore};
    use crate::types::{Color, Range};
    use crate::units::Unit;
    use crate::view::MemoryView;
    use crate::visual::RecordingFactory;
    use std::sync::Arc;

    struct Fixture {
        env: ControlEnv,
        factory: Arc<RecordingFactory>,
        view: Arc<MemoryView>,
    }

    fn fixture(config: FrameworkConfig) -> Fixture {
        let resolver = Arc::new(MemoryResolver::new());
        resolver.insert("T", SampledData::new(vec![270.0, 300.0]).with_unit(Unit::parse("K").unwrap()));
        resolver.insert("Z", SampledData::new(vec![5000.0, 5800.0]).with_unit(Unit::parse("m").unwrap()));
        let factory = Arc::new(RecordingFactory::new());
        let env = ControlEnv::new(config, resolver, factory.clone())
            .unwrap()
            .with_store(Arc::new(MemoryStore::new()));
        Fixture {
            env,
            factory,
            view: Arc::new(MemoryView::new("main")),
        }
    }

    fn contour(f: &Fixture, name: &str) -> DisplayControl {
        DisplayControl::new(Arc::new(BasicBehavior::contour_plot(name)), f.env.clone())
    }

    fn init(f: &Fixture, control: &DisplayControl, name: &str) {
        control
            .init(vec![DataReference::new(name)], f.view.clone(), None, DataSelection::default())
            .unwrap();
    }

    #[test]
    fn test_save_and_restore_before_init() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        a.set_color(Color::RED);
        a.set_line_width(2.5);
        a.set_legend_template("%longname%");
        a.set_lock_visibility(true);
        a.save("display.1").unwrap();

        let b = contour(&f, "T");
        assert!(b.restore_from("display.1").unwrap());
        b.init(Vec::new(), f.view.clone(), None, DataSelection::default())
            .unwrap();

        assert!(b.restored_from_persistence());
        assert_eq!(b.attributes().color, Some(Color::RED));
        assert_eq!(b.attributes().line_width, 2.5);
        assert_eq!(b.legend_template(), "%longname%");
        assert!(b.is_visibility_locked());
        assert_eq!(b.data_references()[0].name, "T");
        let visual = f.factory.created().pop().unwrap();
        assert_eq!(visual.snapshot().color, Some(Color::RED));
        assert_eq!(visual.snapshot().line_width, Some(2.5));
    }

    #[test]
    fn test_restore_missing_key() {
        let f = fixture(FrameworkConfig::default());
        assert!(!contour(&f, "T").restore_from("nothing").unwrap());
    }

    #[test]
    fn test_data_sources_follow_policy() {
        let mut config = FrameworkConfig::default();
        config.policy.save_data_sources = false;
        let f = fixture(config);
        let a = contour(&f, "T");
        init(&f, &a, "T");
        assert_eq!(a.settings().data_references, None);
    }

    #[test]
    fn test_restore_driver_wins() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        let settings = ControlSettings {
            is_time_driver: true,
            uses_time_driver: true,
            ..a.settings()
        };
        a.restore(&settings).unwrap();
        assert!(a.is_time_driver());
        assert!(!a.uses_time_driver());
    }

    #[test]
    fn test_display_setting_applies_and_refreshes() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        let props = ControlProperties::parse("color=blue;linewidth=3;skip=2").unwrap();
        let report = a
            .apply_display_setting(&DisplaySetting::new("bold", &props))
            .unwrap();
        assert!(!report.aborted);

        let visual = f.factory.find("T contours").unwrap();
        assert_eq!(visual.snapshot().color, Some(Color::BLUE));
        assert_eq!(visual.snapshot().line_width, Some(3.0));
        assert_eq!(visual.snapshot().skip, Some(2));
    }

    #[test]
    fn test_unknown_table_reported_after_other_properties() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        let mut props = ControlProperties::default();
        props.color_table = Some("NoSuchTable".to_string());
        props.line_width = Some(4.0);
        let err = a.apply_properties(&props).unwrap_err();
        assert!(matches!(err, ControlError::InvalidProperty { .. }));
        assert_eq!(a.attributes().line_width, 4.0);
    }

    #[test]
    fn test_same_name_preserves_overrides() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        a.set_range(Range::new(250.0, 260.0));
        a.set_display_unit(Unit::parse("C").unwrap()).unwrap();

        a.set_data_references(vec![DataReference::new("T")]).unwrap();
        let attrs = a.attributes();
        assert_eq!(attrs.display_unit.unwrap().name, "C");
        assert!(attrs.range.is_some());
        assert_eq!(a.data_generation(), Some(0));
    }

    #[test]
    fn test_different_name_clears_overrides() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        a.set_range(Range::new(250.0, 260.0));
        a.set_display_unit(Unit::parse("C").unwrap()).unwrap();

        a.set_data_references(vec![DataReference::new("Z")]).unwrap();
        // Re-derived from the new data's native unit and range
        let attrs = a.attributes();
        assert_eq!(attrs.display_unit, Some(Unit::parse("m").unwrap()));
        assert_eq!(attrs.range, Some(Range::new(5000.0, 5800.0)));
        let contours = f.factory.find("T contours").unwrap();
        assert_eq!(contours.snapshot().display_unit, Some(Some(Unit::parse("m").unwrap())));
    }

    #[test]
    fn test_unresolvable_references_leave_control_untouched() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        a.set_range(Range::new(250.0, 260.0));
        let contours = f.factory.find("T contours").unwrap();
        let before = contours.snapshot();

        let err = a
            .set_data_references(vec![DataReference::new("missing")])
            .unwrap_err();

        assert!(err.is_data_unavailable());
        assert_eq!(a.state(), crate::control::LifecycleState::Ready);
        assert_eq!(a.data_references()[0].name, "T");
        assert!(a.has_data());
        assert_eq!(a.attributes().range, Some(Range::new(250.0, 260.0)));
        assert_eq!(contours.snapshot().data_points, before.data_points);
        assert_eq!(contours.snapshot().display_unit, before.display_unit);
    }

    #[test]
    fn test_parameter_defaults_seed_new_controls() {
        let f = fixture(FrameworkConfig::default());
        let a = contour(&f, "T");
        init(&f, &a, "T");
        a.set_color(Color::ORANGE);
        a.set_range(Range::new(260.0, 280.0));
        a.save_parameter_defaults().unwrap();

        let b = contour(&f, "T");
        init(&f, &b, "T");
        assert_eq!(b.attributes().color, Some(Color::ORANGE));
        assert!(f.factory.created()[1].push_count(AttributeFlag::Contour) > 0);
        let contour = f.factory.created()[1].snapshot().contour.unwrap();
        assert_eq!(contour.min, 260.0);
        assert_eq!(contour.max, 280.0);
    }
}
