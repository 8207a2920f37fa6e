//! Label templates and macros
//!
//! Legend and menu labels are templates with `%name%` macros. Unknown
//! macros are left in place; known macros with no value expand to an empty
//! string.

use crate::data::DataReference;
use chrono::{DateTime, FixedOffset, Offset, Utc};

pub const MACRO_SHORT_NAME: &str = "%shortname%";
pub const MACRO_LONG_NAME: &str = "%longname%";
pub const MACRO_DISPLAY_NAME: &str = "%displayname%";
pub const MACRO_DISPLAY_UNIT: &str = "%displayunit%";
pub const MACRO_DATA_SOURCE: &str = "%datasourcename%";
pub const MACRO_TIMESTAMP: &str = "%timestamp%";
pub const MACRO_FORECAST_HOUR: &str = "%fhour%";
pub const MACRO_LEVEL: &str = "%level%";

/// Default legend template
pub const DEFAULT_LEGEND_TEMPLATE: &str = "%shortname% - %displayname%";

/// Default menu template
pub const DEFAULT_MENU_TEMPLATE: &str = "%shortname% - %displayname%";

/// Default `%timestamp%` format (chrono strftime syntax)
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M %:z";

/// True when `template` depends on the animation time
pub fn has_time_macros(template: &str) -> bool {
    template.contains(MACRO_TIMESTAMP) || template.contains(MACRO_FORECAST_HOUR)
}

/// Values substituted into a template
#[derive(Debug, Clone, Default)]
pub struct LabelContext {
    pub short_name: String,
    pub long_name: String,
    pub display_name: String,
    pub display_unit: Option<String>,
    pub data_source: Option<String>,
    pub level: Option<String>,
    /// Current animation time
    pub timestamp: Option<DateTime<Utc>>,
    /// Reference time for `%fhour%`
    pub first_time: Option<DateTime<Utc>>,
}

/// Renders [`LabelContext`]s into strings
#[derive(Debug, Clone)]
pub struct LabelFormatter {
    pub time_zone: FixedOffset,
    pub timestamp_format: String,
}

impl Default for LabelFormatter {
    fn default() -> Self {
        Self {
            time_zone: Utc.fix(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
        }
    }
}

impl LabelFormatter {
    pub fn new(time_zone: FixedOffset, timestamp_format: impl Into<String>) -> Self {
        Self {
            time_zone,
            timestamp_format: timestamp_format.into(),
        }
    }

    /// Substitute every macro in `template`. Substituted values are never
    /// scanned again, so names containing `%...%` stay literal.
    pub fn expand(&self, template: &str, ctx: &LabelContext) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('%') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let value = tail[1..]
                .find('%')
                .and_then(|end| self.macro_value(&tail[..end + 2], ctx).map(|v| (v, end + 2)));
            match value {
                Some((value, len)) => {
                    out.push_str(&value);
                    rest = &tail[len..];
                }
                None => {
                    out.push('%');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out.trim().to_string()
    }

    /// Value of one `%name%` macro, or None when the macro is unknown
    fn macro_value(&self, name: &str, ctx: &LabelContext) -> Option<String> {
        let value = match name {
            MACRO_SHORT_NAME => ctx.short_name.clone(),
            MACRO_LONG_NAME => ctx.long_name.clone(),
            MACRO_DISPLAY_NAME => ctx.display_name.clone(),
            MACRO_DISPLAY_UNIT => ctx.display_unit.clone().unwrap_or_default(),
            MACRO_DATA_SOURCE => ctx.data_source.clone().unwrap_or_default(),
            MACRO_LEVEL => ctx.level.clone().unwrap_or_default(),
            MACRO_TIMESTAMP => ctx
                .timestamp
                .map(|t| {
                    t.with_timezone(&self.time_zone)
                        .format(&self.timestamp_format)
                        .to_string()
                })
                .unwrap_or_default(),
            MACRO_FORECAST_HOUR => match (ctx.timestamp, ctx.first_time) {
                (Some(current), Some(first)) => forecast_hour(current, first).to_string(),
                _ => String::new(),
            },
            _ => return None,
        };
        Some(value)
    }

    /// One label per time in `times`
    pub fn frame_labels(
        &self,
        template: &str,
        ctx: &LabelContext,
        times: &[DateTime<Utc>],
    ) -> Vec<String> {
        let mut frame = ctx.clone();
        times
            .iter()
            .map(|t| {
                frame.timestamp = Some(*t);
                self.expand(template, &frame)
            })
            .collect()
    }
}

/// Whole hours from `first` to `current`, truncated toward zero
pub fn forecast_hour(current: DateTime<Utc>, first: DateTime<Utc>) -> i64 {
    (current - first).num_hours()
}

/// Reference time for `%fhour%`: the run time of the first non-derived
/// reference in the composition chain, else the first time of the set.
pub fn forecast_base_time(
    references: &[DataReference],
    times: &[DateTime<Utc>],
) -> Option<DateTime<Utc>> {
    references
        .first()
        .and_then(|r| r.first_source().run_time)
        .or_else(|| times.first().copied())
}

/// Sorted union of several time sequences, without duplicates
pub fn merge_time_sets<'a, I>(sets: I) -> Vec<DateTime<Utc>>
where
    I: IntoIterator<Item = &'a [DateTime<Utc>]>,
{
    let mut merged: Vec<DateTime<Utc>> = sets.into_iter().flatten().copied().collect();
    merged.sort();
    merged.dedup();
    merged
}
