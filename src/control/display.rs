//! The control aggregate and its attribute operations.

use super::behavior::ControlBehavior;
use super::lifecycle::LifecycleState;
use super::{ControlEnv, ControlEvent};
use crate::attributes::{
    ApplyReport, AttributeDefaults, AttributeFlag, AttributeSet, AttributeState, Propagator,
    RefreshReport, VisualRegistry,
};
use crate::data::{DataBinding, DataSelection};
use crate::error::{ControlError, Result};
use crate::id::{ControlId, ListenerId, ViewId, VisualId};
use crate::time::TimeDriverClaim;
use crate::types::{Color, ColorTable, ContourSpec, Range, ScreenBounds, Smoothing, SmoothingKind};
use crate::units::Unit;
use crate::view::{RenderingPause, SharedView, ViewChangeCoalescer, ViewDisplayInfo};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Mutable state of one control, guarded by [`ControlShared::core`]
pub(super) struct ControlCore {
    pub(super) state: LifecycleState,
    pub(super) attrs: AttributeState,
    pub(super) defaults: AttributeDefaults,
    /// Data-derived range in the native unit, before display conversion
    pub(super) native_range: Option<Range>,
    pub(super) visuals: VisualRegistry,
    pub(super) binding: DataBinding,
    pub(super) selection: DataSelection,
    /// Primary view first
    pub(super) views: Vec<SharedView>,
    /// Secondary views this control created and must dispose
    pub(super) owned_views: Vec<ViewId>,
    pub(super) display_infos: Vec<ViewDisplayInfo>,
    pub(super) listeners: Vec<(SharedView, ListenerId)>,
    pub(super) animation_listener: Option<ListenerId>,
    pub(super) driver_claim: Option<TimeDriverClaim>,
    pub(super) wants_time_driver: bool,
    pub(super) uses_time_driver: bool,
    pub(super) lock_visibility: bool,
    pub(super) legend_template: String,
    pub(super) menu_template: String,
    pub(super) display_name: String,
    pub(super) category: String,
    pub(super) window: Option<ScreenBounds>,
    pub(super) ignore_errors: bool,
    pub(super) initialization_done: bool,
    /// Set once the registry was first inserted into the views
    pub(super) visuals_inserted: bool,
    pub(super) restored_from_persistence: bool,
}

impl ControlCore {
    pub(super) fn primary_view(&self) -> Option<&SharedView> {
        self.views.first()
    }

    /// Express the native data range in the current display unit
    pub(super) fn sync_default_range(&mut self) {
        self.defaults.range = self.native_range;
        self.defaults.range_unit = None;
        let (Some(range), Some(from), Some(to)) = (
            self.native_range,
            self.defaults.display_unit.as_ref(),
            self.attrs.display_unit.as_ref(),
        ) else {
            return;
        };
        if from == to {
            return;
        }
        match (from.convert(range.min, to), from.convert(range.max, to)) {
            (Ok(min), Ok(max)) => {
                self.defaults.range = Some(Range::new(min, max));
                self.defaults.range_unit = Some(to.clone());
            }
            _ => tracing::debug!("Default range stays in {} (no conversion to {})", from, to),
        }
    }

    /// Push `categories` in order inside one rendering pause
    pub(super) fn apply_categories(&mut self, categories: &[AttributeFlag]) -> Vec<ApplyReport> {
        let _pause = RenderingPause::new(&self.views);
        let propagator = Propagator::new(&self.visuals, &self.defaults);
        categories
            .iter()
            .map(|c| propagator.apply(*c, &mut self.attrs))
            .collect()
    }

    /// Full refresh, aborted between steps once `removed` is set
    pub(super) fn refresh(&mut self, removed: &AtomicBool) -> RefreshReport {
        Propagator::new(&self.visuals, &self.defaults).apply_all(
            &mut self.attrs,
            &self.views,
            removed,
        )
    }

    pub(super) fn view(&self, id: ViewId) -> Option<&SharedView> {
        self.views.iter().find(|v| v.id() == id)
    }
}

pub(super) struct ControlShared {
    pub(super) id: ControlId,
    pub(super) env: ControlEnv,
    pub(super) behavior: Arc<dyn ControlBehavior>,
    pub(super) flags: AttributeSet,
    pub(super) initialized: AtomicBool,
    pub(super) removed: AtomicBool,
    /// Set by the view's driver slot while this control holds the role
    pub(super) is_time_driver: Arc<AtomicBool>,
    pub(super) core: Mutex<ControlCore>,
    /// Kept outside `core` so camera callbacks never wait on a reload
    pub(super) coalescer: Mutex<Option<ViewChangeCoalescer>>,
    pub(super) subscribers: Mutex<Vec<Sender<ControlEvent>>>,
}

/// Handle to one display control. Clones share the same control.
#[derive(Clone)]
pub struct DisplayControl {
    pub(super) shared: Arc<ControlShared>,
}

impl DisplayControl {
    pub fn new(behavior: Arc<dyn ControlBehavior>, env: ControlEnv) -> Self {
        let flags = behavior.attribute_flags();
        let policy = env.config.policy.clone();
        let labels = env.config.labels.clone();
        let core = ControlCore {
            state: LifecycleState::Uninitialized,
            attrs: AttributeState::default(),
            defaults: AttributeDefaults::default(),
            native_range: None,
            visuals: VisualRegistry::new(),
            binding: DataBinding::new(env.resolver.clone(), behavior.cardinality()),
            selection: DataSelection::default(),
            views: Vec::new(),
            owned_views: Vec::new(),
            display_infos: Vec::new(),
            listeners: Vec::new(),
            animation_listener: None,
            driver_claim: None,
            wants_time_driver: false,
            uses_time_driver: policy.use_time_driver,
            lock_visibility: false,
            legend_template: labels.legend_template,
            menu_template: labels.menu_template,
            display_name: behavior.display_name(),
            category: behavior.category(),
            window: None,
            ignore_errors: policy.ignore_errors,
            initialization_done: false,
            visuals_inserted: false,
            restored_from_persistence: false,
        };
        Self {
            shared: Arc::new(ControlShared {
                id: ControlId::next(),
                env,
                behavior,
                flags,
                initialized: AtomicBool::new(false),
                removed: AtomicBool::new(false),
                is_time_driver: Arc::new(AtomicBool::new(false)),
                core: Mutex::new(core),
                coalescer: Mutex::new(None),
                subscribers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub(super) fn core(&self) -> MutexGuard<'_, ControlCore> {
        self.shared.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(super) fn emit(&self, event: ControlEvent) {
        let mut subscribers = self
            .shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> ControlId {
        self.shared.id
    }

    pub fn env(&self) -> &ControlEnv {
        &self.shared.env
    }

    pub fn attribute_flags(&self) -> AttributeSet {
        self.shared.flags
    }

    pub fn state(&self) -> LifecycleState {
        self.core().state
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.initialized.load(Ordering::SeqCst)
    }

    pub fn is_removed(&self) -> bool {
        self.shared.removed.load(Ordering::SeqCst)
    }

    pub fn initialization_done(&self) -> bool {
        self.core().initialization_done
    }

    pub fn restored_from_persistence(&self) -> bool {
        self.core().restored_from_persistence
    }

    /// Copy of the current attribute values
    pub fn attributes(&self) -> AttributeState {
        self.core().attrs.clone()
    }

    pub fn display_name(&self) -> String {
        self.core().display_name.clone()
    }

    pub fn set_display_name(&self, name: impl Into<String>) {
        if !self.is_removed() {
            self.core().display_name = name.into();
        }
    }

    pub fn category(&self) -> String {
        self.core().category.clone()
    }

    pub fn visual_ids(&self) -> Vec<VisualId> {
        self.core().visuals.ids()
    }

    /// Categories that should show a shared UI widget
    pub fn widget_flags(&self) -> AttributeSet {
        self.core().visuals.widget_flags()
    }

    pub fn display_infos(&self) -> Vec<ViewDisplayInfo> {
        self.core().display_infos.clone()
    }

    pub fn has_data(&self) -> bool {
        self.core().binding.has_data()
    }

    pub fn data_instance_count(&self) -> usize {
        self.core().binding.instances().len()
    }

    /// Generation counter of the primary data instance
    pub fn data_generation(&self) -> Option<u64> {
        self.core().binding.primary().map(|i| i.generation())
    }

    pub fn selection(&self) -> DataSelection {
        self.core().selection.clone()
    }

    pub fn window(&self) -> Option<ScreenBounds> {
        self.core().window
    }

    pub fn set_window(&self, window: Option<ScreenBounds>) {
        if !self.is_removed() {
            self.core().window = window;
        }
    }

    /// Receive [`ControlEvent`]s from now on
    pub fn subscribe(&self) -> Receiver<ControlEvent> {
        let (tx, rx) = unbounded();
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(tx);
        rx
    }

    // ==================== Attribute Operations ====================

    /// Mutate the attribute state and push one category
    fn update<F>(&self, category: AttributeFlag, mutate: F) -> ApplyReport
    where
        F: FnOnce(&mut AttributeState),
    {
        if self.is_removed() {
            return ApplyReport::skipped(Some(category));
        }
        let report = {
            let mut core = self.core();
            mutate(&mut core.attrs);
            let mut reports = core.apply_categories(&[category]);
            reports.remove(0)
        };
        self.emit(ControlEvent::AttributesApplied {
            control: self.id(),
            failures: report.failures,
        });
        report
    }

    pub fn set_color(&self, color: Color) -> ApplyReport {
        self.update(AttributeFlag::Color, |a| a.color = Some(color))
    }

    pub fn set_color_table(&self, table: ColorTable) -> ApplyReport {
        self.update(AttributeFlag::ColorTable, |a| a.color_table = Some(table))
    }

    /// Look the table up in the color table registry
    pub fn set_color_table_by_name(&self, name: &str) -> Result<ApplyReport> {
        let table = self
            .shared
            .env
            .color_tables
            .get(name)
            .ok_or_else(|| ControlError::InvalidProperty {
                key: "colortable".to_string(),
                value: name.to_string(),
            })?;
        Ok(self.set_color_table(table))
    }

    /// Store `dimness` (clamped) and re-push the color table
    pub fn set_dimness(&self, dimness: f32) -> ApplyReport {
        self.update(AttributeFlag::ColorTable, |a| a.set_dimness(dimness))
    }

    pub fn set_range(&self, range: Range) -> ApplyReport {
        self.update(AttributeFlag::Range, |a| a.range = Some(range))
    }

    pub fn set_select_range(&self, range: Range) -> ApplyReport {
        self.update(AttributeFlag::SelectRange, |a| a.select_range.range = Some(range))
    }

    /// Disabling pushes an unbounded range and keeps the stored bounds
    pub fn set_select_range_enabled(&self, enabled: bool) -> ApplyReport {
        self.update(AttributeFlag::SelectRange, |a| a.select_range.enabled = enabled)
    }

    pub fn set_contour(&self, contour: ContourSpec) -> ApplyReport {
        self.update(AttributeFlag::Contour, |a| a.contour = Some(contour))
    }

    pub fn set_z_position(&self, z: f64) -> ApplyReport {
        self.update(AttributeFlag::ZPosition, |a| a.z_position = z)
    }

    pub fn set_line_width(&self, width: f32) -> ApplyReport {
        self.update(AttributeFlag::LineWidth, |a| a.line_width = width)
    }

    pub fn set_skip_value(&self, skip: u32) -> ApplyReport {
        self.update(AttributeFlag::SkipFactor, |a| a.skip = skip)
    }

    pub fn set_texture_quality(&self, quality: u32) -> ApplyReport {
        self.update(AttributeFlag::TextureQuality, |a| a.texture_quality = quality)
    }

    pub fn set_smoothing(&self, smoothing: Smoothing) -> ApplyReport {
        self.update(AttributeFlag::Smoothing, |a| a.smoothing = smoothing)
    }

    /// Change the kernel, keeping the factor
    pub fn set_smoothing_type(&self, kind: SmoothingKind) -> ApplyReport {
        self.update(AttributeFlag::Smoothing, |a| a.smoothing.kind = kind)
    }

    /// `None` makes the color unit follow the display unit again
    pub fn set_color_unit(&self, unit: Option<Unit>) -> ApplyReport {
        match unit {
            Some(unit) => self.update(AttributeFlag::ColorUnit, |a| a.color_unit = Some(unit)),
            None => self.update(AttributeFlag::DisplayUnit, |a| a.color_unit = None),
        }
    }

    /// Fast rendering goes to every visual regardless of flags
    pub fn set_fast_rendering(&self, fast: bool) -> ApplyReport {
        if self.is_removed() {
            return ApplyReport::skipped(None);
        }
        let mut core = self.core();
        core.attrs.fast_rendering = fast;
        let report = Propagator::new(&core.visuals, &core.defaults).apply_fast_rendering(&core.attrs);
        report
    }

    /// Change the display unit, converting contour, range and select range.
    ///
    /// Everything is rolled back when a conversion fails or the visuals
    /// reject the unit outright; the error is
    /// [`ControlError::UnitChangeRejected`].
    pub fn set_display_unit(&self, unit: Unit) -> Result<RefreshReport> {
        const UNIT_STEPS: [AttributeFlag; 5] = [
            AttributeFlag::DisplayUnit,
            AttributeFlag::ColorUnit,
            AttributeFlag::Contour,
            AttributeFlag::Range,
            AttributeFlag::SelectRange,
        ];

        if self.is_removed() {
            return Ok(RefreshReport {
                reports: Vec::new(),
                aborted: true,
            });
        }

        let outcome = {
            let mut guard = self.core();
            let core = &mut *guard;
            let mut basis = core.attrs.clone();
            if basis.display_unit.is_none() {
                basis.display_unit = core.defaults.display_unit.clone();
            }
            match basis.converted_for_unit(&unit) {
                Err(e) => Err(e.to_string()),
                Ok(conversion) => {
                    let previous = core.attrs.clone();
                    core.attrs.display_unit = Some(unit.clone());
                    core.attrs.contour = conversion.contour;
                    core.attrs.range = conversion.range;
                    core.attrs.select_range = conversion.select_range;
                    core.sync_default_range();
                    let reports = core.apply_categories(&UNIT_STEPS);
                    if reports[0].fell_back {
                        core.attrs = previous;
                        core.sync_default_range();
                        core.apply_categories(&UNIT_STEPS);
                        Err(format!("visuals rejected unit {}", unit))
                    } else {
                        Ok(RefreshReport {
                            reports,
                            aborted: false,
                        })
                    }
                }
            }
        };

        match outcome {
            Ok(report) => {
                tracing::debug!("{} display unit is now {}", self.id(), unit);
                self.emit(ControlEvent::AttributesApplied {
                    control: self.id(),
                    failures: report.failures(),
                });
                Ok(report)
            }
            Err(message) => {
                tracing::warn!("{} rejected unit change to {}: {}", self.id(), unit, message);
                self.emit(ControlEvent::Failure {
                    control: self.id(),
                    message: format!("Cannot change unit to {}: {}", unit, message),
                });
                Err(ControlError::UnitChangeRejected {
                    unit: unit.name.clone(),
                    message,
                })
            }
        }
    }

    /// Re-push every category in the fixed refresh order
    pub fn refresh(&self) -> RefreshReport {
        if self.is_removed() {
            return RefreshReport {
                reports: Vec::new(),
                aborted: true,
            };
        }
        let report = self.core().refresh(&self.shared.removed);
        self.emit(ControlEvent::AttributesApplied {
            control: self.id(),
            failures: report.failures(),
        });
        report
    }

    // ==================== Visibility ====================

    pub fn is_visible(&self) -> bool {
        self.core().attrs.visible
    }

    pub fn set_display_visibility(&self, visible: bool) -> ApplyReport {
        if self.is_removed() {
            return ApplyReport::skipped(None);
        }
        let report = {
            let mut core = self.core();
            core.attrs.visible = visible;
            let report = Propagator::new(&core.visuals, &core.defaults).apply_visibility(visible);
            report
        };
        self.emit(ControlEvent::VisibilityChanged {
            control: self.id(),
            visible,
        });
        report
    }

    /// Group toggles are ignored while visibility is locked
    pub fn set_display_visibility_from_group(&self, visible: bool) -> ApplyReport {
        if self.is_visibility_locked() {
            tracing::debug!("{} visibility is locked; ignoring group toggle", self.id());
            return ApplyReport::skipped(None);
        }
        self.set_display_visibility(visible)
    }

    pub fn set_lock_visibility(&self, lock: bool) {
        if !self.is_removed() {
            self.core().lock_visibility = lock;
        }
    }

    pub fn is_visibility_locked(&self) -> bool {
        self.core().lock_visibility
    }
}

impl std::fmt::Debug for DisplayControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayControl")
            .field("id", &self.shared.id)
            .field("flags", &self.shared.flags)
            .field("removed", &self.is_removed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributes::FlaggedVisual;
    use crate::config::FrameworkConfig;
    use crate::control::behavior::MockControlBehavior;
    use crate::data::MemoryResolver;
    use crate::visual::{RecordingFactory, RecordingVisual, VisualKind};

    fn env() -> ControlEnv {
        ControlEnv::new(
            FrameworkConfig::default(),
            Arc::new(MemoryResolver::new()),
            Arc::new(RecordingFactory::new()),
        )
        .unwrap()
    }

    fn behavior() -> MockControlBehavior {
        let mut mock = MockControlBehavior::new();
        mock.expect_attribute_flags()
            .return_const(AttributeSet::of(&[AttributeFlag::Color, AttributeFlag::LineWidth]));
        mock.expect_display_name().return_const("mock".to_string());
        mock.expect_category().return_const("Tests".to_string());
        mock.expect_cardinality()
            .return_const(crate::data::Cardinality::Single);
        mock
    }

    fn with_visual(control: &DisplayControl, flags: &[AttributeFlag]) -> Arc<RecordingVisual> {
        let visual = RecordingVisual::shared(VisualKind::Lines, "v");
        control
            .core()
            .visuals
            .add(FlaggedVisual::new(visual.clone(), AttributeSet::of(flags)));
        visual
    }

    #[test]
    fn test_new_control_is_uninitialized() {
        let control = DisplayControl::new(Arc::new(behavior()), env());
        assert_eq!(control.state(), LifecycleState::Uninitialized);
        assert_eq!(control.category(), "Tests");
        assert_eq!(control.display_name(), "mock");
        assert!(!control.is_initialized());
    }

    #[test]
    fn test_set_color_pushes_and_emits() {
        let control = DisplayControl::new(Arc::new(behavior()), env());
        let visual = with_visual(&control, &[AttributeFlag::Color]);
        let rx = control.subscribe();

        let report = control.set_color(Color::RED);
        assert_eq!(report.pushed, 1);
        assert_eq!(visual.snapshot().color, Some(Color::RED));
        assert_eq!(control.attributes().color, Some(Color::RED));
        assert!(matches!(
            rx.try_recv(),
            Ok(ControlEvent::AttributesApplied { failures: 0, .. })
        ));
    }

    #[test]
    fn test_mutations_after_removal_are_no_ops() {
        let control = DisplayControl::new(Arc::new(behavior()), env());
        let visual = with_visual(&control, &[AttributeFlag::LineWidth]);
        control.shared.removed.store(true, Ordering::SeqCst);

        assert!(control.set_line_width(4.0).skipped);
        assert_eq!(visual.snapshot().line_width, None);
        assert_eq!(control.attributes().line_width, 1.0);
        assert!(control.set_display_visibility(false).skipped);
    }

    #[test]
    fn test_time_driver_settings_after_removal_are_no_ops() {
        let control = DisplayControl::new(Arc::new(behavior()), env());
        let template = control.legend_template();
        control.remove();

        assert!(matches!(
            control.set_uses_time_driver(true),
            Err(ControlError::ControlRemoved(_))
        ));
        assert!(!control.uses_time_driver());
        assert!(!control.settings().uses_time_driver);
        assert!(!control.release_time_driver());
        assert!(matches!(
            control.set_time_driver(true),
            Err(ControlError::ControlRemoved(_))
        ));
        assert!(!control.is_time_driver());
        control.set_legend_template("%timestamp%");
        assert_eq!(control.legend_template(), template);
    }

    #[test]
    fn test_group_visibility_respects_lock() {
        let control = DisplayControl::new(Arc::new(behavior()), env());
        let visual = with_visual(&control, &[]);
        control.set_lock_visibility(true);

        assert!(control.set_display_visibility_from_group(false).skipped);
        assert_eq!(visual.snapshot().visible, None);

        control.set_display_visibility(false);
        assert_eq!(visual.snapshot().visible, Some(false));
        assert!(!control.is_visible());
    }

    #[test]
    fn test_unknown_color_table_name() {
        let control = DisplayControl::new(Arc::new(behavior()), env());
        assert!(control.set_color_table_by_name("Nope").is_err());
        assert!(control.set_color_table_by_name("grayscale").is_ok());
    }
}
