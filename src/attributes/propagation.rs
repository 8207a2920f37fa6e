//! Attribute propagation engine
//!
//! For every attribute category there is an `apply_*` operation that
//! computes the current value (falling back to a data-derived default the
//! first time), then pushes it to every registered visual flagged for that
//! category.
//!
//! # Failure handling
//!
//! A push that fails on one visual never stops the push to the others. When
//! at least one visual rejected the value and a different fallback exists,
//! the category switches to the fallback and pushes once more. Failures
//! never unwind past an `apply_*` call; they are logged and counted in the
//! returned [`ApplyReport`].
//!
//! # Full refresh
//!
//! [`Propagator::apply_all`] runs every category in a fixed order inside a
//! [`RenderingPause`] so views see a single visual update:
//!
//! ```text
//! color → display unit → color unit → contour → range → select range
//!       → color table → z position → fast rendering → line width
//!       → skip → texture quality → smoothing
//! ```

use super::flags::AttributeFlag;
use super::registry::VisualRegistry;
use super::state::{AttributeDefaults, AttributeState};
use crate::error::Result;
use crate::types::{SelectRange, Smoothing};
use crate::units::Unit;
use crate::view::{RenderingPause, SharedView};
use crate::visual::VisualObject;
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of one `apply_*` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    /// `None` for the category-less pushes (fast rendering, visibility)
    pub category: Option<AttributeFlag>,
    /// Visuals that accepted the final value
    pub pushed: usize,
    /// Visuals that rejected the final value
    pub failures: usize,
    /// Whether the category switched to its fallback value
    pub fell_back: bool,
    /// Nothing to push (no value and no default)
    pub skipped: bool,
}

impl ApplyReport {
    pub(crate) fn skipped(category: Option<AttributeFlag>) -> Self {
        Self {
            category,
            pushed: 0,
            failures: 0,
            fell_back: false,
            skipped: true,
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures == 0
    }
}

/// Reports of a full refresh
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    pub reports: Vec<ApplyReport>,
    /// The batch stopped early because the control was removed
    pub aborted: bool,
}

impl RefreshReport {
    pub fn failures(&self) -> usize {
        self.reports.iter().map(|r| r.failures).sum()
    }

    pub fn report(&self, category: AttributeFlag) -> Option<&ApplyReport> {
        self.reports.iter().find(|r| r.category == Some(category))
    }
}

#[derive(Debug, Default)]
struct PushOutcome {
    pushed: usize,
    failures: usize,
}

/// Pushes attribute state into a registry of flagged visuals
pub struct Propagator<'a> {
    registry: &'a VisualRegistry,
    defaults: &'a AttributeDefaults,
}

impl<'a> Propagator<'a> {
    pub fn new(registry: &'a VisualRegistry, defaults: &'a AttributeDefaults) -> Self {
        Self { registry, defaults }
    }

    fn push<F>(&self, category: AttributeFlag, push: F) -> PushOutcome
    where
        F: Fn(&dyn VisualObject) -> Result<()>,
    {
        let mut outcome = PushOutcome::default();
        for entry in self.registry.flagged(category) {
            match push(entry.visual.as_ref()) {
                Ok(()) => outcome.pushed += 1,
                Err(e) => {
                    tracing::warn!(
                        "Failed to apply {} to '{}': {}",
                        category,
                        entry.visual.name(),
                        e
                    );
                    outcome.failures += 1;
                }
            }
        }
        outcome
    }

    /// Push `value`; on any rejection switch to `fallback` (when it differs)
    /// and push once more. Returns the value that ended up applied.
    fn apply_value<T, F>(
        &self,
        category: AttributeFlag,
        value: T,
        fallback: Option<T>,
        push: F,
    ) -> (T, ApplyReport)
    where
        T: PartialEq + std::fmt::Debug,
        F: Fn(&dyn VisualObject, &T) -> Result<()>,
    {
        let first = self.push(category, |v| push(v, &value));
        let mut report = ApplyReport {
            category: Some(category),
            pushed: first.pushed,
            failures: first.failures,
            fell_back: false,
            skipped: false,
        };
        if first.failures == 0 {
            return (value, report);
        }
        match fallback {
            Some(fallback) if fallback != value => {
                tracing::warn!(
                    "{} of {} visuals rejected {:?}; retrying {} with {:?}",
                    first.failures,
                    first.pushed + first.failures,
                    value,
                    category,
                    fallback
                );
                let second = self.push(category, |v| push(v, &fallback));
                report.pushed = second.pushed;
                report.failures = second.failures;
                report.fell_back = true;
                (fallback, report)
            }
            _ => (value, report),
        }
    }

    pub fn apply_color(&self, state: &mut AttributeState) -> ApplyReport {
        let Some(color) = state.color.or(self.defaults.color) else {
            return ApplyReport::skipped(Some(AttributeFlag::Color));
        };
        let (applied, report) =
            self.apply_value(AttributeFlag::Color, color, self.defaults.color, |v, c| {
                v.set_color(*c)
            });
        state.color = Some(applied);
        report
    }

    /// Pushes the dimmed table; the stored table stays undimmed
    pub fn apply_color_table(&self, state: &mut AttributeState) -> ApplyReport {
        let Some(table) = state
            .color_table
            .clone()
            .or_else(|| self.defaults.color_table.clone())
        else {
            return ApplyReport::skipped(Some(AttributeFlag::ColorTable));
        };
        let dimness = state.dimness();
        let (applied, report) = self.apply_value(
            AttributeFlag::ColorTable,
            table,
            self.defaults.color_table.clone(),
            |v, t| v.set_color_table(&t.dimmed(dimness)),
        );
        state.color_table = Some(applied);
        report
    }

    pub fn apply_range(&self, state: &mut AttributeState) -> ApplyReport {
        let Some(range) = state.range.or(self.defaults.range) else {
            return ApplyReport::skipped(Some(AttributeFlag::Range));
        };
        let (applied, report) =
            self.apply_value(AttributeFlag::Range, range, self.defaults.range, |v, r| {
                v.set_range(*r)
            });
        state.range = Some(applied);
        report
    }

    /// Enabled: the stored range verbatim. Disabled: an unbounded range,
    /// leaving the stored bounds untouched.
    pub fn apply_select_range(&self, state: &mut AttributeState) -> ApplyReport {
        if state.select_range.range.is_none() {
            state.select_range.range = state.range.or(self.defaults.range);
        }
        let fallback = SelectRange {
            range: state.select_range.range,
            enabled: false,
        };
        let (applied, report) = self.apply_value(
            AttributeFlag::SelectRange,
            state.select_range,
            Some(fallback),
            |v, s| v.set_select_range(s.effective()),
        );
        state.select_range = applied;
        report
    }

    pub fn apply_contour(&self, state: &mut AttributeState) -> ApplyReport {
        let Some(contour) = state.contour.clone().or_else(|| self.defaults.contour()) else {
            return ApplyReport::skipped(Some(AttributeFlag::Contour));
        };
        let (applied, report) = self.apply_value(
            AttributeFlag::Contour,
            contour,
            self.defaults.contour(),
            |v, c| v.set_contour(c),
        );
        state.contour = Some(applied);
        report
    }

    /// Also feeds color-unit visuals while the color unit follows the
    /// display unit.
    pub fn apply_display_unit(&self, state: &mut AttributeState) -> ApplyReport {
        let unit = state
            .display_unit
            .clone()
            .or_else(|| self.defaults.display_unit.clone());
        let (applied, report) = self.apply_value(
            AttributeFlag::DisplayUnit,
            unit,
            Some(self.defaults.display_unit.clone()),
            |v, u: &Option<Unit>| v.set_display_unit(u.clone()),
        );
        state.display_unit = applied;
        if state.color_unit_follows_display() {
            let unit = state.display_unit.clone();
            self.push(AttributeFlag::ColorUnit, |v| v.set_color_unit(unit.clone()));
        }
        report
    }

    /// Skipped when the color unit is defined to equal the display unit
    pub fn apply_color_unit(&self, state: &mut AttributeState) -> ApplyReport {
        if state.color_unit_follows_display() {
            return ApplyReport::skipped(Some(AttributeFlag::ColorUnit));
        }
        let (applied, report) = self.apply_value(
            AttributeFlag::ColorUnit,
            state.color_unit.clone(),
            Some(None),
            |v, u: &Option<Unit>| v.set_color_unit(u.clone()),
        );
        state.color_unit = applied;
        if state.color_unit_follows_display() {
            let unit = state.display_unit.clone();
            self.push(AttributeFlag::ColorUnit, |v| v.set_color_unit(unit.clone()));
        }
        report
    }

    pub fn apply_z_position(&self, state: &mut AttributeState) -> ApplyReport {
        let (applied, report) =
            self.apply_value(AttributeFlag::ZPosition, state.z_position, Some(0.0), |v, z| {
                v.set_z_position(*z)
            });
        state.z_position = applied;
        report
    }

    pub fn apply_line_width(&self, state: &mut AttributeState) -> ApplyReport {
        let (applied, report) =
            self.apply_value(AttributeFlag::LineWidth, state.line_width, Some(1.0), |v, w| {
                v.set_line_width(*w)
            });
        state.line_width = applied;
        report
    }

    pub fn apply_skip(&self, state: &mut AttributeState) -> ApplyReport {
        let (applied, report) =
            self.apply_value(AttributeFlag::SkipFactor, state.skip, Some(0), |v, s| {
                v.set_skip(*s)
            });
        state.skip = applied;
        report
    }

    pub fn apply_texture_quality(&self, state: &mut AttributeState) -> ApplyReport {
        let (applied, report) = self.apply_value(
            AttributeFlag::TextureQuality,
            state.texture_quality,
            Some(1),
            |v, q| v.set_texture_quality(*q),
        );
        state.texture_quality = applied;
        report
    }

    pub fn apply_smoothing(&self, state: &mut AttributeState) -> ApplyReport {
        let (applied, report) = self.apply_value(
            AttributeFlag::Smoothing,
            state.smoothing,
            Some(Smoothing::default()),
            |v, s| v.set_smoothing(*s),
        );
        state.smoothing = applied;
        report
    }

    /// Fast rendering applies to every visual regardless of flags
    pub fn apply_fast_rendering(&self, state: &AttributeState) -> ApplyReport {
        self.push_to_all(|v| v.set_fast_rendering(state.fast_rendering))
    }

    /// Visibility applies to every visual regardless of flags
    pub fn apply_visibility(&self, visible: bool) -> ApplyReport {
        self.push_to_all(|v| v.set_visible(visible))
    }

    fn push_to_all<F>(&self, push: F) -> ApplyReport
    where
        F: Fn(&dyn VisualObject) -> Result<()>,
    {
        let mut report = ApplyReport {
            category: None,
            pushed: 0,
            failures: 0,
            fell_back: false,
            skipped: false,
        };
        for entry in self.registry.iter() {
            match push(entry.visual.as_ref()) {
                Ok(()) => report.pushed += 1,
                Err(e) => {
                    tracing::warn!("Failed to update '{}': {}", entry.visual.name(), e);
                    report.failures += 1;
                }
            }
        }
        report
    }

    /// Apply a single category
    pub fn apply(&self, category: AttributeFlag, state: &mut AttributeState) -> ApplyReport {
        match category {
            AttributeFlag::Color => self.apply_color(state),
            AttributeFlag::ColorTable => self.apply_color_table(state),
            AttributeFlag::Range => self.apply_range(state),
            AttributeFlag::SelectRange => self.apply_select_range(state),
            AttributeFlag::Contour => self.apply_contour(state),
            AttributeFlag::DisplayUnit => self.apply_display_unit(state),
            AttributeFlag::ColorUnit => self.apply_color_unit(state),
            AttributeFlag::ZPosition => self.apply_z_position(state),
            AttributeFlag::LineWidth => self.apply_line_width(state),
            AttributeFlag::SkipFactor => self.apply_skip(state),
            AttributeFlag::TextureQuality => self.apply_texture_quality(state),
            AttributeFlag::Smoothing => self.apply_smoothing(state),
        }
    }

    /// Full refresh in the fixed order, bracketed by a rendering pause on
    /// `views`. Stops between steps once `removed` is set.
    pub fn apply_all(
        &self,
        state: &mut AttributeState,
        views: &[SharedView],
        removed: &AtomicBool,
    ) -> RefreshReport {
        const ORDER: [Step; 13] = [
            Step::Category(AttributeFlag::Color),
            Step::Category(AttributeFlag::DisplayUnit),
            Step::Category(AttributeFlag::ColorUnit),
            Step::Category(AttributeFlag::Contour),
            Step::Category(AttributeFlag::Range),
            Step::Category(AttributeFlag::SelectRange),
            Step::Category(AttributeFlag::ColorTable),
            Step::Category(AttributeFlag::ZPosition),
            Step::FastRendering,
            Step::Category(AttributeFlag::LineWidth),
            Step::Category(AttributeFlag::SkipFactor),
            Step::Category(AttributeFlag::TextureQuality),
            Step::Category(AttributeFlag::Smoothing),
        ];

        let _pause = RenderingPause::new(views);
        let mut out = RefreshReport::default();
        for step in ORDER {
            if removed.load(Ordering::SeqCst) {
                out.aborted = true;
                break;
            }
            let report = match step {
                Step::Category(category) => self.apply(category, state),
                Step::FastRendering => self.apply_fast_rendering(state),
            };
            out.reports.push(report);
        }
        out
    }
}

#[derive(Clone, Copy)]
enum Step {
    Category(AttributeFlag),
    FastRendering,
}
