//! Time-driver role and time-dependent labels.
//!
//! A control is either the view's time driver (its data times define the
//! animation sequence), a consumer of the driver's sequence, or neither.
//! When both are requested the driver role wins.

use super::display::{ControlCore, DisplayControl};
use crate::error::{ControlError, Result};
use crate::id::ControlId;
use crate::time::labels::has_time_macros;
use crate::time::{
    forecast_base_time, merge_time_sets, LabelContext, LabelFormatter, TimeDriverClaim,
    TimeDriverEvent,
};
use chrono::{DateTime, Offset, Utc};
use std::sync::atomic::Ordering;

impl DisplayControl {
    /// True while this control holds the view's time-driver role
    pub fn is_time_driver(&self) -> bool {
        self.shared.is_time_driver.load(Ordering::SeqCst)
    }

    pub fn uses_time_driver(&self) -> bool {
        self.core().uses_time_driver
    }

    /// Consume the view's time-driver sequence. Ignored while this control
    /// is the driver itself. A ready control reloads right away.
    pub fn set_uses_time_driver(&self, uses: bool) -> Result<()> {
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        let reload = {
            let mut core = self.core();
            if self.is_removed() {
                return Err(ControlError::ControlRemoved(self.id().raw()));
            }
            if uses && core.wants_time_driver {
                tracing::warn!(
                    "{} is the time driver; not consuming its own sequence",
                    self.id()
                );
                return Ok(());
            }
            let changed = core.uses_time_driver != uses;
            core.uses_time_driver = uses;
            changed && core.state.is_ready()
        };
        if reload {
            self.reload()?;
        }
        Ok(())
    }

    /// Take or give up the driver role. Returns the control whose role was
    /// revoked, if any.
    pub fn set_time_driver(&self, driver: bool) -> Result<Option<ControlId>> {
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        if driver {
            self.become_time_driver()
        } else {
            self.release_time_driver();
            Ok(None)
        }
    }

    /// Claim the driver role of the primary view.
    ///
    /// Before `init` only the request is recorded; the claim is made once a
    /// view is bound.
    pub fn become_time_driver(&self) -> Result<Option<ControlId>> {
        if self.is_removed() {
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        let (view, claim) = {
            let mut guard = self.core();
            let core = &mut *guard;
            if self.is_removed() {
                return Err(ControlError::ControlRemoved(self.id().raw()));
            }
            core.wants_time_driver = true;
            if core.uses_time_driver {
                tracing::warn!(
                    "{} is becoming the time driver; no longer consuming the view sequence",
                    self.id()
                );
                core.uses_time_driver = false;
            }
            let Some(view) = core.primary_view().cloned() else {
                return Ok(None);
            };
            let claim = TimeDriverClaim::new(
                self.id(),
                self.shared.is_time_driver.clone(),
                Self::time_set(core),
            );
            core.driver_claim = Some(claim.clone());
            (view, claim)
        };
        // Granting fans out to listeners; never under the core lock
        let revoked = view.grant_time_driver(claim);
        // remove() released the role before the grant landed
        if self.is_removed() {
            view.release_time_driver(self.id());
            self.shared.is_time_driver.store(false, Ordering::SeqCst);
            return Err(ControlError::ControlRemoved(self.id().raw()));
        }
        tracing::info!("{} is the time driver of '{}'", self.id(), view.name());
        Ok(revoked)
    }

    /// Give up the driver role. Returns false when this control did not
    /// hold it.
    pub fn release_time_driver(&self) -> bool {
        if self.is_removed() {
            return false;
        }
        let (claim, view) = {
            let mut core = self.core();
            core.wants_time_driver = false;
            (core.driver_claim.take(), core.primary_view().cloned())
        };
        let released = match (claim, view) {
            (Some(_), Some(view)) => view.release_time_driver(self.id()),
            _ => false,
        };
        self.shared.is_time_driver.store(false, Ordering::SeqCst);
        released
    }

    /// Sorted union of the times of every data instance
    pub fn animation_times(&self) -> Vec<DateTime<Utc>> {
        Self::time_set(&self.core())
    }

    pub(super) fn time_set(core: &ControlCore) -> Vec<DateTime<Utc>> {
        merge_time_sets(
            core.binding
                .instances()
                .iter()
                .map(|i| i.data().times.as_slice()),
        )
    }

    /// Refresh the claim's sequence and tell the consumers
    pub(super) fn publish_driver_times(&self) {
        let view = {
            let core = self.core();
            match &core.driver_claim {
                Some(claim) if claim.is_active() => {
                    claim.set_times(Self::time_set(&core));
                    core.primary_view().cloned()
                }
                _ => None,
            }
        };
        if let Some(view) = view {
            view.publish_time_driver_event(TimeDriverEvent::TimesChanged(self.id()));
        }
    }

    // ==================== Labels ====================

    pub fn legend_template(&self) -> String {
        self.core().legend_template.clone()
    }

    pub fn menu_template(&self) -> String {
        self.core().menu_template.clone()
    }

    pub fn set_legend_template(&self, template: impl Into<String>) {
        self.set_template(template.into(), true);
    }

    pub fn set_menu_template(&self, template: impl Into<String>) {
        self.set_template(template.into(), false);
    }

    fn set_template(&self, template: String, legend: bool) {
        if self.is_removed() {
            return;
        }
        let mut guard = self.core();
        let core = &mut *guard;
        if self.is_removed() {
            return;
        }
        // Time macros need animation ticks; register lazily
        if has_time_macros(&template) && core.state.is_ready() {
            self.register_animation_listener(core);
        }
        if legend {
            core.legend_template = template;
        } else {
            core.menu_template = template;
        }
    }

    /// Legend text at the current animation time
    pub fn legend_label(&self) -> String {
        let core = self.core();
        let (formatter, ctx) = self.label_inputs(&core);
        formatter.expand(&core.legend_template, &ctx)
    }

    pub fn menu_label(&self) -> String {
        let core = self.core();
        let (formatter, ctx) = self.label_inputs(&core);
        formatter.expand(&core.menu_template, &ctx)
    }

    /// One legend label per animation time
    pub fn frame_labels(&self) -> Vec<String> {
        let core = self.core();
        let (formatter, ctx) = self.label_inputs(&core);
        formatter.frame_labels(&core.legend_template, &ctx, &Self::time_set(&core))
    }

    fn label_inputs(&self, core: &ControlCore) -> (LabelFormatter, LabelContext) {
        let view = core.primary_view();
        let time_zone = view.map(|v| v.time_zone()).unwrap_or_else(|| Utc.fix());
        let formatter = LabelFormatter::new(
            time_zone,
            self.shared.env.config.labels.timestamp_format.clone(),
        );

        let references = core.binding.references();
        let first = references.first();
        let times = Self::time_set(core);
        let primary = core.binding.primary();
        let ctx = LabelContext {
            short_name: first
                .map(|r| r.name.clone())
                .unwrap_or_else(|| core.display_name.clone()),
            long_name: first
                .map(|r| r.display_long_name().to_string())
                .unwrap_or_default(),
            display_name: core.display_name.clone(),
            display_unit: core
                .attrs
                .display_unit
                .as_ref()
                .or(core.defaults.display_unit.as_ref())
                .map(|u| u.name.clone()),
            data_source: first.and_then(|r| r.first_source().source_name.clone()),
            level: primary.and_then(|i| i.data().level).map(|l| l.to_string()),
            timestamp: view
                .and_then(|v| v.animation_time())
                .or_else(|| times.first().copied()),
            first_time: forecast_base_time(references, &times),
        };
        (formatter, ctx)
    }
}
