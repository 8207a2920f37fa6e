//! Lifecycle state machine
//!
//! ```text
//! Uninitialized → Initializing → Ready → Removed
//!                      └──────────────────↗
//! ```
//!
//! `init` runs once per control; later calls are no-ops. Its steps are:
//!
//! 1. bind the view and data selection
//! 2. claim the time-driver role when requested
//! 3. apply property overrides
//! 4. pick the initial color
//! 5. resolve data (failure removes the control unless errors are ignored)
//! 6. derive attribute defaults from data and stored preferences
//! 7. create visuals and push data and attributes
//! 8. insert visuals into their views, pruning the ones that fail
//! 9. register time-driver, animation and camera listeners
//! 10. mark `Ready`
//!
//! From step 6 on, every step first checks the `removed` flag and stops
//! quietly when a concurrent [`DisplayControl::remove`] got there first.
//!
//! `remove` is idempotent and tears down in a fixed order: listeners,
//! removed notification, time-driver role, data instances, visuals, owned
//! views, internal references.

use super::display::{ControlCore, ControlShared, DisplayControl};
use super::ControlEvent;
use crate::attributes::{AttributeFlag, FlaggedVisual};
use crate::config::ControlProperties;
use crate::data::{DataChangeListener, DataReference, DataSelection, SampledData};
use crate::error::{ControlError, Result};
use crate::id::{ReferenceId, ViewId, VisualId};
use crate::persistence::ParameterDefaults;
use crate::time::labels::has_time_macros;
use crate::time::{TimeDriverEvent, TimeDriverListener};
use crate::types::Color;
use crate::units::Unit;
use crate::view::{
    AnimationEvent, AnimationListener, CameraEvent, CameraListener, SharedView,
    ViewChangeCoalescer, ViewDisplayInfo,
};
use crate::visual::SharedVisual;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

/// Colors handed out to new controls that have no stored preference
const INITIAL_COLORS: [Color; 6] = [
    Color::CYAN,
    Color::MAGENTA,
    Color::YELLOW,
    Color::ORANGE,
    Color::GREEN,
    Color::RED,
];

/// Lifecycle state of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LifecycleState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
    /// Terminal
    Removed,
}

impl LifecycleState {
    pub fn is_ready(self) -> bool {
        self == LifecycleState::Ready
    }

    pub fn is_removed(self) -> bool {
        self == LifecycleState::Removed
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LifecycleState::Uninitialized => "uninitialized",
            LifecycleState::Initializing => "initializing",
            LifecycleState::Ready => "ready",
            LifecycleState::Removed => "removed",
        };
        f.write_str(name)
    }
}

/// Why the later init steps stopped
enum InitAbort {
    /// A concurrent `remove` won; stop quietly
    Removed,
    /// Visuals existed but none could be inserted
    NothingDisplayed,
    Failed(ControlError),
}

impl From<ControlError> for InitAbort {
    fn from(err: ControlError) -> Self {
        InitAbort::Failed(err)
    }
}

/// Hand a job to the worker pool, bound to the control only weakly
pub(super) fn submit_job<F>(weak: &Weak<ControlShared>, what: &'static str, job: F)
where
    F: FnOnce(DisplayControl) + Send + 'static,
{
    let Some(shared) = weak.upgrade() else {
        return;
    };
    if shared.removed.load(Ordering::SeqCst) {
        return;
    }
    let workers = shared.env.workers.clone();
    let id = shared.id;
    drop(shared);

    let weak = weak.clone();
    let submitted = workers.submit(move || {
        if let Some(shared) = weak.upgrade() {
            job(DisplayControl { shared });
        }
    });
    if let Err(e) = submitted {
        tracing::warn!("Dropped {} for {}: {}", what, id, e);
    }
}

fn dispose_visual(visual: &SharedVisual) {
    if let Err(e) = visual.dispose() {
        tracing::warn!("Failed to dispose '{}': {}", visual.name(), e);
    }
}

impl DisplayControl {
    fn weak(&self) -> Weak<ControlShared> {
        Arc::downgrade(&self.shared)
    }

    fn check_removed(&self) -> std::result::Result<(), InitAbort> {
        if self.is_removed() {
            Err(InitAbort::Removed)
        } else {
            Ok(())
        }
    }

    pub(super) fn validity_check(&self) -> impl Fn(&SampledData) -> bool {
        let behavior = self.shared.behavior.clone();
        move |data: &SampledData| behavior.is_valid(data)
    }

    // ==================== Init ====================

    /// Initialize the control against `view`.
    ///
    /// Runs once; repeat calls return `Ok(())` without doing anything. A
    /// control removed concurrently also returns `Ok(())` with
    /// [`Self::state`] reporting `Removed`.
    pub fn init(
        &self,
        references: Vec<DataReference>,
        view: SharedView,
        properties: Option<&ControlProperties>,
        selection: DataSelection,
    ) -> Result<()> {
        if self.shared.initialized.swap(true, Ordering::SeqCst) {
            tracing::debug!("{} is already initialized", self.id());
            return Ok(());
        }
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        tracing::info!(
            "Initializing {} '{}' in view '{}'",
            self.id(),
            self.display_name(),
            view.name()
        );

        // 1. Context and selection
        {
            let listener = self.data_change_listener();
            let mut core = self.core();
            core.state = LifecycleState::Initializing;
            core.views.insert(0, view);
            core.selection = selection;
            core.binding.set_change_listener(listener);
            if !references.is_empty() {
                core.binding.set_references(references);
            }
            self.shared.env.categories.register(&core.category);
        }

        // 2. Time-driver role
        let wants_driver = {
            let mut core = self.core();
            if let Some(props) = properties {
                if let Some(driver) = props.is_time_driver {
                    core.wants_time_driver = driver;
                }
                if let Some(uses) = props.use_time_driver {
                    core.uses_time_driver = uses;
                }
            }
            core.wants_time_driver
        };
        if wants_driver {
            self.become_time_driver()?;
        }

        // 3. Property overrides
        if let Some(props) = properties {
            let mut core = self.core();
            if let Err(e) = self.apply_properties_to_state(&mut core, props) {
                tracing::warn!("{} ignoring property overrides: {}", self.id(), e);
            }
        }

        // 4. Initial color
        if self.shared.flags.contains(AttributeFlag::Color) {
            let mut core = self.core();
            if core.attrs.color.is_none() {
                let color = self.initial_color(&core);
                core.attrs.color = Some(color);
                core.defaults.color = Some(color);
            }
        }

        // 5. Data
        if let Err(e) = self.resolve_initial_data() {
            if e.is_user_cancel() {
                tracing::debug!("{} data selection cancelled", self.id());
                self.remove();
                return Ok(());
            }
            let ignore = self.core().ignore_errors;
            self.emit(ControlEvent::Failure {
                control: self.id(),
                message: e.to_string(),
            });
            if ignore {
                tracing::warn!("{} has no data, continuing: {}", self.id(), e);
            } else {
                tracing::error!("{} failed to load data: {}", self.id(), e);
                self.remove();
                return Err(e);
            }
        }

        // 6-10
        match self.finish_init() {
            Ok(()) => {
                tracing::info!("{} is ready", self.id());
                self.publish_driver_times();
                self.emit(ControlEvent::Initialized(self.id()));
                Ok(())
            }
            Err(InitAbort::Removed) => {
                tracing::debug!("{} was removed during initialization", self.id());
                Ok(())
            }
            Err(InitAbort::NothingDisplayed) => {
                let err = ControlError::IrrecoverableInitFailure(
                    "no visual could be displayed".to_string(),
                );
                tracing::error!("{}: {}", self.id(), err);
                self.emit(ControlEvent::Failure {
                    control: self.id(),
                    message: err.to_string(),
                });
                self.remove();
                Err(err)
            }
            Err(InitAbort::Failed(e)) => {
                let err = ControlError::IrrecoverableInitFailure(e.to_string());
                self.emit(ControlEvent::Failure {
                    control: self.id(),
                    message: err.to_string(),
                });
                let mut core = self.core();
                if core.ignore_errors && !self.is_removed() {
                    tracing::warn!("{} kept without data: {}", self.id(), err);
                    core.binding.release_all();
                    core.state = LifecycleState::Ready;
                    core.initialization_done = true;
                    return Ok(());
                }
                drop(core);
                tracing::error!("{}: {}", self.id(), err);
                self.remove();
                Err(err)
            }
        }
    }

    fn initial_color(&self, core: &ControlCore) -> Color {
        let stored = core
            .binding
            .references()
            .first()
            .and_then(|r| ParameterDefaults::load(self.shared.env.store.as_ref(), &r.name).color);
        stored.unwrap_or(INITIAL_COLORS[(self.id().raw() as usize) % INITIAL_COLORS.len()])
    }

    fn resolve_initial_data(&self) -> Result<()> {
        let valid = self.validity_check();
        let mut guard = self.core();
        let core = &mut *guard;
        self.prepare_selection(core);
        core.binding.resolve_all(&core.selection, &valid)
    }

    fn finish_init(&self) -> std::result::Result<(), InitAbort> {
        // 6. Defaults
        self.check_removed()?;
        {
            let mut core = self.core();
            self.derive_defaults(&mut core);
        }

        // 7. Visuals, data and attributes
        self.check_removed()?;
        let created = self
            .shared
            .behavior
            .create_visuals(self.shared.env.factory.as_ref(), self.shared.flags)?;
        {
            let mut guard = self.core();
            let core = &mut *guard;
            // remove() may have drained the registry while visuals were created
            if self.is_removed() {
                drop(guard);
                for entry in &created {
                    dispose_visual(&entry.visual);
                }
                return Err(InitAbort::Removed);
            }
            for entry in created {
                core.visuals.add(entry);
            }
            self.shared.behavior.push_data(&core.visuals, &core.binding);
            let report = core.refresh(&self.shared.removed);
            if report.aborted {
                return Err(InitAbort::Removed);
            }
            if !core.attrs.visible {
                let visible = core.attrs.visible;
                crate::attributes::Propagator::new(&core.visuals, &core.defaults)
                    .apply_visibility(visible);
            }
            if report.failures() > 0 {
                tracing::warn!(
                    "{} initial attribute push had {} failure(s)",
                    self.id(),
                    report.failures()
                );
            }
        }

        // 8. Insert into views
        self.check_removed()?;
        let (attempted, inserted) = self.insert_visuals();
        if attempted > 0 && inserted == 0 {
            return Err(InitAbort::NothingDisplayed);
        }

        // 9. Listeners
        self.check_removed()?;
        self.register_listeners()?;

        // 10. Ready
        let mut core = self.core();
        if self.is_removed() {
            return Err(InitAbort::Removed);
        }
        core.state = LifecycleState::Ready;
        core.initialization_done = true;
        Ok(())
    }

    /// Overwrite times and bounds from the view when the selection asks for it
    pub(super) fn prepare_selection(&self, core: &mut ControlCore) {
        let Some(view) = core.primary_view().cloned() else {
            return;
        };
        let consumes = core.uses_time_driver || core.selection.use_time_driver_times;
        if consumes && view.time_driver() != Some(self.id()) {
            if let Some(times) = view.time_driver_times() {
                core.selection.times = times;
            }
        }
        if core.selection.use_view_bounds {
            if let Some(bounds) = view.lat_lon_box() {
                core.selection.bounds = Some(bounds);
            }
        }
    }

    /// Defaults from the primary data instance and stored preferences
    pub(super) fn derive_defaults(&self, core: &mut ControlCore) {
        let env = &self.shared.env;
        let reference = core.binding.references().first().cloned();
        let prefs = reference
            .as_ref()
            .map(|r| ParameterDefaults::load(env.store.as_ref(), &r.name))
            .unwrap_or_default();
        let primary = core.binding.primary();
        let data_range = primary.and_then(|i| i.data().range());
        let data_unit = primary.and_then(|i| i.data().unit.clone()).or_else(|| {
            reference
                .as_ref()
                .and_then(|r| r.unit.as_deref())
                .and_then(|u| Unit::parse(u).ok())
        });

        core.defaults.display_unit = data_unit;
        core.native_range = prefs.range.or(data_range);
        if prefs.color.is_some() {
            core.defaults.color = prefs.color;
        }
        core.defaults.color_table = prefs
            .color_table
            .as_deref()
            .and_then(|name| env.color_tables.get(name))
            .or_else(|| env.color_tables.default_table());
        if core.attrs.display_unit.is_none() {
            if let Some(name) = prefs.display_unit.as_deref() {
                match Unit::parse(name) {
                    Ok(unit) => core.attrs.display_unit = Some(unit),
                    Err(e) => tracing::warn!("Ignoring stored display unit: {}", e),
                }
            }
        }
        core.sync_default_range();
    }

    /// Insert one registry entry into its view and record the association
    fn insert_entry(&self, core: &mut ControlCore, entry: &FlaggedVisual) -> Result<ViewId> {
        let view = match entry.view {
            Some(id) => core.view(id).cloned(),
            None => core.primary_view().cloned(),
        }
        .ok_or_else(|| ControlError::View(format!("no view for '{}'", entry.visual.name())))?;
        view.add_visual(entry.visual.clone())?;
        core.display_infos.push(ViewDisplayInfo {
            control: self.id(),
            view: view.id(),
            visual: entry.id(),
        });
        Ok(view.id())
    }

    /// Returns (attempted, inserted)
    fn insert_visuals(&self) -> (usize, usize) {
        let mut guard = self.core();
        let core = &mut *guard;
        core.visuals_inserted = true;
        let entries: Vec<FlaggedVisual> = core.visuals.iter().cloned().collect();
        let mut inserted = 0;
        for entry in &entries {
            match self.insert_entry(core, entry) {
                Ok(_) => inserted += 1,
                Err(e) => {
                    tracing::warn!("Pruning '{}' from {}: {}", entry.visual.name(), self.id(), e);
                    core.visuals.remove(entry.id());
                    dispose_visual(&entry.visual);
                }
            }
        }
        (entries.len(), inserted)
    }

    fn register_listeners(&self) -> Result<()> {
        let mut guard = self.core();
        let core = &mut *guard;
        if self.is_removed() {
            return Ok(());
        }
        let Some(view) = core.primary_view().cloned() else {
            return Ok(());
        };
        let weak = self.weak();

        let id = view.register_time_driver_listener(time_driver_listener(weak.clone()));
        core.listeners.push((view.clone(), id));

        if has_time_macros(&core.legend_template) || has_time_macros(&core.menu_template) {
            self.register_animation_listener(core);
        }

        if core.selection.use_view_bounds {
            let animating = view.clone();
            let settled = weak.clone();
            let coalescer = ViewChangeCoalescer::new(
                self.shared.env.config.debounce.to_config(),
                move || animating.is_animating(),
                move || {
                    submit_job(&settled, "viewpoint reload", |control| {
                        control.on_viewpoint_changed()
                    });
                    Ok(())
                },
            )?;
            coalescer.seed(view.lat_lon_box());
            *self
                .shared
                .coalescer
                .lock()
                .unwrap_or_else(|e| e.into_inner()) = Some(coalescer);
            let id = view.register_camera_listener(camera_listener(weak));
            core.listeners.push((view, id));
        }
        Ok(())
    }

    pub(super) fn register_animation_listener(&self, core: &mut ControlCore) {
        if core.animation_listener.is_some() {
            return;
        }
        let Some(view) = core.primary_view().cloned() else {
            return;
        };
        let id = view.register_animation_listener(animation_listener(self.weak()));
        core.animation_listener = Some(id);
        core.listeners.push((view, id));
    }

    fn data_change_listener(&self) -> DataChangeListener {
        let weak = self.weak();
        Arc::new(move |reference: ReferenceId| {
            submit_job(&weak, "data change", move |control| {
                control.on_data_changed(reference)
            });
        })
    }

    // ==================== Remove ====================

    /// Tear the control down. Safe to call more than once.
    pub fn remove(&self) {
        if self.shared.removed.swap(true, Ordering::SeqCst) {
            tracing::debug!("{} is already removed", self.id());
            return;
        }
        let id = self.id();
        tracing::info!("Removing {}", id);

        // Listeners
        let listeners = {
            let mut core = self.core();
            core.state = LifecycleState::Removed;
            core.animation_listener = None;
            std::mem::take(&mut core.listeners)
        };
        for (view, listener) in listeners {
            view.remove_listener(listener);
        }
        let coalescer = self
            .shared
            .coalescer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(mut coalescer) = coalescer {
            coalescer.shutdown();
        }

        // Notification
        self.emit(ControlEvent::Removed(id));

        // Time-driver role
        let (claim, primary) = {
            let mut core = self.core();
            core.wants_time_driver = false;
            (core.driver_claim.take(), core.primary_view().cloned())
        };
        if let (Some(_), Some(view)) = (claim, primary) {
            view.release_time_driver(id);
        }
        self.shared.is_time_driver.store(false, Ordering::SeqCst);

        let mut guard = self.core();
        let core = &mut *guard;

        // Data
        core.binding.release_all();

        // Visuals, each best effort
        let infos = std::mem::take(&mut core.display_infos);
        for entry in core.visuals.drain() {
            for info in infos.iter().filter(|i| i.visual == entry.id()) {
                if let Some(view) = core.view(info.view) {
                    if let Err(e) = view.remove_visual(info.visual) {
                        tracing::warn!("Failed to detach '{}': {}", entry.visual.name(), e);
                    }
                }
            }
            dispose_visual(&entry.visual);
        }

        // Owned secondary views
        for view_id in std::mem::take(&mut core.owned_views) {
            if let Some(view) = core.view(view_id) {
                if let Err(e) = view.dispose() {
                    tracing::warn!("Failed to dispose view '{}': {}", view.name(), e);
                }
            }
        }

        // References
        core.views.clear();
        drop(guard);
        self.shared
            .subscribers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        tracing::debug!("{} removed", id);
    }

    // ==================== Views and Visuals ====================

    /// Add a secondary view shared with other controls
    pub fn add_view(&self, view: SharedView) {
        if !self.is_removed() {
            self.core().views.push(view);
        }
    }

    /// Add a secondary view this control owns; it is disposed on removal
    pub fn add_owned_view(&self, view: SharedView) {
        if !self.is_removed() {
            let mut core = self.core();
            core.owned_views.push(view.id());
            core.views.push(view);
        }
    }

    /// Register and display one more visual.
    ///
    /// The current attribute state is pushed before insertion. When the
    /// view refuses the visual it is unregistered and disposed again.
    pub fn attach_visual(&self, mut entry: FlaggedVisual) -> Result<()> {
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        entry.flags = entry.flags.intersection(self.shared.flags);
        let mut guard = self.core();
        let core = &mut *guard;
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        core.visuals.add(entry.clone());
        self.shared.behavior.push_data(&core.visuals, &core.binding);
        core.refresh(&self.shared.removed);
        // Before the first insertion pass the entry is picked up by init
        if !core.visuals_inserted {
            return Ok(());
        }
        if let Err(e) = self.insert_entry(core, &entry) {
            core.visuals.remove(entry.id());
            dispose_visual(&entry.visual);
            return Err(e);
        }
        Ok(())
    }

    /// Remove a visual from the registry and its views, then dispose it
    pub fn detach_visual(&self, visual: VisualId) -> Result<()> {
        let mut guard = self.core();
        let core = &mut *guard;
        let entry = core
            .visuals
            .remove(visual)
            .ok_or_else(|| ControlError::View(format!("{} is not attached", visual)))?;
        let (detached, kept): (Vec<_>, Vec<_>) = core
            .display_infos
            .drain(..)
            .partition(|i| i.visual == visual);
        core.display_infos = kept;
        for info in detached {
            if let Some(view) = core.view(info.view) {
                if let Err(e) = view.remove_visual(visual) {
                    tracing::warn!("Failed to detach '{}': {}", entry.visual.name(), e);
                }
            }
        }
        dispose_visual(&entry.visual);
        Ok(())
    }

    // ==================== Background Entry Points ====================

    /// Re-resolve data with the current selection and re-apply attributes
    pub fn reload(&self) -> Result<()> {
        self.reresolve(|control, core, valid| {
            control.prepare_selection(core);
            if core.binding.has_data() {
                core.binding.reload(&core.selection, valid)
            } else {
                core.binding.resolve_all(&core.selection, valid)
            }
        })
    }

    pub(super) fn on_data_changed(&self, reference: ReferenceId) {
        let result = self.reresolve(|_, core, valid| {
            if core.binding.reinitialize(reference, valid)? {
                Ok(())
            } else {
                Err(ControlError::data_unavailable(
                    reference.to_string(),
                    "not bound to this control",
                ))
            }
        });
        if let Err(e) = result {
            tracing::warn!("{} could not refresh changed data: {}", self.id(), e);
        }
    }

    fn on_viewpoint_changed(&self) {
        if !self.core().selection.use_view_bounds {
            return;
        }
        if let Err(e) = self.reload() {
            tracing::warn!("{} viewpoint reload failed: {}", self.id(), e);
        }
    }

    /// The view's time driver changed its times or data
    fn on_driver_update(&self) {
        if !self.core().uses_time_driver {
            return;
        }
        tracing::debug!("{} reloading for time driver", self.id());
        if let Err(e) = self.reload() {
            tracing::warn!("{} time-driver reload failed: {}", self.id(), e);
        }
    }

    fn on_driver_revoked(&self) {
        let had_claim = {
            let mut core = self.core();
            core.wants_time_driver = false;
            core.driver_claim.take().is_some()
        };
        if had_claim {
            self.emit(ControlEvent::TimeDriverRevoked(self.id()));
        }
    }

    fn on_animation_tick(&self) {
        if self.is_removed() {
            return;
        }
        let label = self.legend_label();
        self.emit(ControlEvent::LabelChanged {
            control: self.id(),
            label,
        });
    }

    /// Shared tail of every re-resolution path: run `resolve`, then derive
    /// defaults, push data and attributes, and tell time-driver consumers.
    fn reresolve<F>(&self, resolve: F) -> Result<()>
    where
        F: FnOnce(&DisplayControl, &mut ControlCore, &dyn Fn(&SampledData) -> bool) -> Result<()>,
    {
        if self.is_removed() {
            return Ok(());
        }
        let valid = self.validity_check();
        let driver_view = {
            let mut guard = self.core();
            let core = &mut *guard;
            if let Err(e) = resolve(self, core, &valid) {
                drop(guard);
                self.emit(ControlEvent::Failure {
                    control: self.id(),
                    message: e.to_string(),
                });
                return Err(e);
            }
            if self.is_removed() {
                return Ok(());
            }
            self.derive_defaults(core);
            self.shared.behavior.push_data(&core.visuals, &core.binding);
            let report = core.refresh(&self.shared.removed);
            if report.aborted {
                return Ok(());
            }
            match &core.driver_claim {
                Some(claim) if claim.is_active() => {
                    claim.set_times(Self::time_set(core));
                    core.primary_view().cloned()
                }
                _ => None,
            }
        };
        self.emit(ControlEvent::DataChanged(self.id()));
        if let Some(view) = driver_view {
            view.publish_time_driver_event(TimeDriverEvent::DataChanged(self.id()));
        }
        Ok(())
    }
}

fn time_driver_listener(weak: Weak<ControlShared>) -> TimeDriverListener {
    Arc::new(move |event: &TimeDriverEvent| {
        let Some(me) = weak.upgrade().map(|s| s.id) else {
            return;
        };
        match *event {
            TimeDriverEvent::Revoked(control) if control == me => {
                submit_job(&weak, "time-driver revocation", |c| c.on_driver_revoked());
            }
            TimeDriverEvent::Granted(control)
            | TimeDriverEvent::TimesChanged(control)
            | TimeDriverEvent::DataChanged(control)
                if control != me =>
            {
                submit_job(&weak, "time-driver reload", |c| c.on_driver_update());
            }
            _ => {}
        }
    })
}

fn camera_listener(weak: Weak<ControlShared>) -> CameraListener {
    Arc::new(move |event: &CameraEvent| {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let coalescer = shared.coalescer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(coalescer) = coalescer.as_ref() {
            coalescer.notify(event.bounds);
        }
    })
}

fn animation_listener(weak: Weak<ControlShared>) -> AnimationListener {
    Arc::new(move |_: &AnimationEvent| {
        submit_job(&weak, "label update", |c| c.on_animation_tick());
    })
}
