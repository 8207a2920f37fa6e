//! Flagged visual object registry.
//!
//! The registry is the fan-out table the propagation engine walks: each
//! entry pairs a visual handle with the attribute categories that apply to
//! it.

use super::flags::{AttributeFlag, AttributeSet};
use crate::id::{ViewId, VisualId};
use crate::visual::SharedVisual;

/// A visual object plus the categories it accepts
#[derive(Clone)]
pub struct FlaggedVisual {
    pub visual: SharedVisual,
    /// Categories pushed to this object
    pub flags: AttributeSet,
    /// Categories that apply to this object but do not drive the shared UI
    /// widget for that attribute
    pub not_global: AttributeSet,
    /// Target view, `None` for the control's primary view
    pub view: Option<ViewId>,
    /// Index of the data instance this object renders, if any
    pub data_index: Option<usize>,
}

impl FlaggedVisual {
    pub fn new(visual: SharedVisual, flags: AttributeSet) -> Self {
        Self {
            visual,
            flags,
            not_global: AttributeSet::empty(),
            view: None,
            data_index: None,
        }
    }

    pub fn not_global(mut self, not_global: AttributeSet) -> Self {
        self.not_global = not_global;
        self
    }

    pub fn in_view(mut self, view: ViewId) -> Self {
        self.view = Some(view);
        self
    }

    pub fn with_data(mut self, index: usize) -> Self {
        self.data_index = Some(index);
        self
    }

    pub fn id(&self) -> VisualId {
        self.visual.id()
    }

    pub fn accepts(&self, flag: AttributeFlag) -> bool {
        self.flags.contains(flag)
    }
}

impl std::fmt::Debug for FlaggedVisual {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlaggedVisual")
            .field("id", &self.visual.id())
            .field("name", &self.visual.name())
            .field("flags", &self.flags)
            .field("not_global", &self.not_global)
            .field("view", &self.view)
            .finish()
    }
}

/// Ordered set of flagged visuals owned by one control
#[derive(Debug, Default)]
pub struct VisualRegistry {
    entries: Vec<FlaggedVisual>,
}

impl VisualRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a visual. Re-registering the same handle replaces its flags.
    pub fn add(&mut self, entry: FlaggedVisual) {
        let id = entry.id();
        if let Some(existing) = self.entries.iter_mut().find(|e| e.id() == id) {
            *existing = entry;
        } else {
            self.entries.push(entry);
        }
    }

    pub fn remove(&mut self, id: VisualId) -> Option<FlaggedVisual> {
        let pos = self.entries.iter().position(|e| e.id() == id)?;
        Some(self.entries.remove(pos))
    }

    pub fn get(&self, id: VisualId) -> Option<&FlaggedVisual> {
        self.entries.iter().find(|e| e.id() == id)
    }

    pub fn contains(&self, id: VisualId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlaggedVisual> {
        self.entries.iter()
    }

    /// Entries that accept `flag`, in registration order
    pub fn flagged(&self, flag: AttributeFlag) -> impl Iterator<Item = &FlaggedVisual> {
        self.entries.iter().filter(move |e| e.accepts(flag))
    }

    pub fn ids(&self) -> Vec<VisualId> {
        self.entries.iter().map(FlaggedVisual::id).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Categories that should show a shared UI widget
    pub fn widget_flags(&self) -> AttributeSet {
        self.entries
            .iter()
            .fold(AttributeSet::empty(), |acc, e| {
                acc.union(e.flags.difference(e.not_global))
            })
    }

    /// Remove and return every entry
    pub fn drain(&mut self) -> Vec<FlaggedVisual> {
        std::mem::take(&mut self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{RecordingVisual, VisualKind};
    use std::sync::Arc;

    fn entry(name: &str, flags: &[AttributeFlag]) -> FlaggedVisual {
        FlaggedVisual::new(
            Arc::new(RecordingVisual::new(VisualKind::Lines, name)),
            AttributeSet::of(flags),
        )
    }

    #[test]
    fn test_flagged_filters_by_category() {
        let mut reg = VisualRegistry::new();
        reg.add(entry("a", &[AttributeFlag::Color]));
        reg.add(entry("b", &[AttributeFlag::ColorTable]));
        reg.add(entry("c", &[AttributeFlag::Color, AttributeFlag::LineWidth]));

        let names: Vec<_> = reg
            .flagged(AttributeFlag::Color)
            .map(|e| e.visual.name())
            .collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn test_re_adding_replaces_flags() {
        let mut reg = VisualRegistry::new();
        let e = entry("a", &[AttributeFlag::Color]);
        let id = e.id();
        reg.add(e.clone());
        let mut updated = e;
        updated.flags = AttributeSet::of(&[AttributeFlag::ZPosition]);
        reg.add(updated);
        assert_eq!(reg.len(), 1);
        assert!(reg.get(id).unwrap().accepts(AttributeFlag::ZPosition));
    }

    #[test]
    fn test_widget_flags_skip_not_global() {
        let mut reg = VisualRegistry::new();
        reg.add(
            entry("a", &[AttributeFlag::Color, AttributeFlag::ColorTable])
                .not_global(AttributeSet::of(&[AttributeFlag::ColorTable])),
        );
        assert_eq!(reg.widget_flags(), AttributeSet::of(&[AttributeFlag::Color]));
    }

    #[test]
    fn test_remove_and_drain() {
        let mut reg = VisualRegistry::new();
        let a = entry("a", &[]);
        let id = a.id();
        reg.add(a);
        reg.add(entry("b", &[]));
        assert!(reg.remove(id).is_some());
        assert!(reg.remove(id).is_none());
        assert_eq!(reg.drain().len(), 1);
        assert!(reg.is_empty());
    }
}
