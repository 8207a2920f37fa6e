//! Headless in-memory view context.

use super::{AnimationEvent, AnimationListener, CameraEvent, CameraListener, ViewContext};
use crate::error::{ControlError, Result};
use crate::id::{ControlId, ListenerId, ViewId, VisualId};
use crate::time::{TimeDriverClaim, TimeDriverEvent, TimeDriverListener, TimeDriverSlot};
use crate::types::{LatLonBox, ScreenBounds};
use crate::visual::SharedVisual;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

struct ViewState {
    visuals: Vec<SharedVisual>,
    bounds: Option<LatLonBox>,
    screen: ScreenBounds,
    animating: bool,
    animation_time: Option<DateTime<Utc>>,
    animation_index: usize,
    camera_listeners: Vec<(ListenerId, CameraListener)>,
    animation_listeners: Vec<(ListenerId, AnimationListener)>,
    pause_depth: u32,
    render_pauses: usize,
    rejected_names: HashSet<String>,
    disposed: bool,
}

/// View context that keeps everything in memory and renders nothing
pub struct MemoryView {
    id: ViewId,
    name: String,
    time_zone: FixedOffset,
    state: Mutex<ViewState>,
    driver: TimeDriverSlot,
}

impl MemoryView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: ViewId::next(),
            name: name.into(),
            time_zone: Utc.fix(),
            state: Mutex::new(ViewState {
                visuals: Vec::new(),
                bounds: None,
                screen: ScreenBounds {
                    x: 0,
                    y: 0,
                    width: 800,
                    height: 600,
                },
                animating: false,
                animation_time: None,
                animation_index: 0,
                camera_listeners: Vec::new(),
                animation_listeners: Vec::new(),
                pause_depth: 0,
                render_pauses: 0,
                rejected_names: HashSet::new(),
                disposed: false,
            }),
            driver: TimeDriverSlot::new(),
        }
    }

    pub fn with_bounds(self, bounds: LatLonBox) -> Self {
        self.lock().bounds = Some(bounds);
        self
    }

    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = time_zone;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move the camera and notify camera listeners
    pub fn set_bounds(&self, bounds: LatLonBox) {
        let (event, listeners) = {
            let mut state = self.lock();
            state.bounds = Some(bounds);
            let event = CameraEvent {
                view: self.id,
                bounds: state.bounds,
                screen: state.screen,
            };
            let listeners: Vec<CameraListener> =
                state.camera_listeners.iter().map(|(_, l)| l.clone()).collect();
            (event, listeners)
        };
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn set_animating(&self, animating: bool) {
        self.lock().animating = animating;
    }

    /// Step the animation clock and notify animation listeners
    pub fn set_animation_time(&self, time: DateTime<Utc>, index: usize) {
        let listeners: Vec<AnimationListener> = {
            let mut state = self.lock();
            state.animation_time = Some(time);
            state.animation_index = index;
            state
                .animation_listeners
                .iter()
                .map(|(_, l)| l.clone())
                .collect()
        };
        let event = AnimationEvent {
            view: self.id,
            time: Some(time),
            index,
        };
        for listener in listeners {
            listener(&event);
        }
    }

    /// Make `add_visual` fail for visuals with this name
    pub fn reject_visual(&self, name: impl Into<String>) {
        self.lock().rejected_names.insert(name.into());
    }

    pub fn visual_ids(&self) -> Vec<VisualId> {
        self.lock().visuals.iter().map(|v| v.id()).collect()
    }

    pub fn contains(&self, visual: VisualId) -> bool {
        self.lock().visuals.iter().any(|v| v.id() == visual)
    }

    pub fn visual_count(&self) -> usize {
        self.lock().visuals.len()
    }

    pub fn is_rendering(&self) -> bool {
        self.lock().pause_depth == 0
    }

    /// Completed pause/resume cycles
    pub fn render_pauses(&self) -> usize {
        self.lock().render_pauses
    }

    /// Camera plus animation listeners
    pub fn listener_count(&self) -> usize {
        let state = self.lock();
        state.camera_listeners.len() + state.animation_listeners.len()
    }

    pub fn is_disposed(&self) -> bool {
        self.lock().disposed
    }
}

impl ViewContext for MemoryView {
    fn id(&self) -> ViewId {
        self.id
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn screen_bounds(&self) -> ScreenBounds {
        self.lock().screen
    }

    fn lat_lon_box(&self) -> Option<LatLonBox> {
        self.lock().bounds
    }

    fn add_visual(&self, visual: SharedVisual) -> Result<()> {
        let mut state = self.lock();
        if state.disposed {
            return Err(ControlError::View(format!("view '{}' is disposed", self.name)));
        }
        let name = visual.name();
        if state.rejected_names.contains(&name) {
            return Err(ControlError::View(format!(
                "view '{}' cannot display '{}'",
                self.name, name
            )));
        }
        if !state.visuals.iter().any(|v| v.id() == visual.id()) {
            state.visuals.push(visual);
        }
        Ok(())
    }

    fn remove_visual(&self, visual: VisualId) -> Result<()> {
        let mut state = self.lock();
        let before = state.visuals.len();
        state.visuals.retain(|v| v.id() != visual);
        if state.visuals.len() == before {
            return Err(ControlError::View(format!(
                "{} is not in view '{}'",
                visual, self.name
            )));
        }
        Ok(())
    }

    fn register_camera_listener(&self, listener: CameraListener) -> ListenerId {
        let id = ListenerId::next();
        self.lock().camera_listeners.push((id, listener));
        id
    }

    fn register_animation_listener(&self, listener: AnimationListener) -> ListenerId {
        let id = ListenerId::next();
        self.lock().animation_listeners.push((id, listener));
        id
    }

    fn register_time_driver_listener(&self, listener: TimeDriverListener) -> ListenerId {
        self.driver.subscribe(listener)
    }

    fn remove_listener(&self, id: ListenerId) {
        {
            let mut state = self.lock();
            state.camera_listeners.retain(|(l, _)| *l != id);
            state.animation_listeners.retain(|(l, _)| *l != id);
        }
        self.driver.unsubscribe(id);
    }

    fn is_animating(&self) -> bool {
        self.lock().animating
    }

    fn animation_time(&self) -> Option<DateTime<Utc>> {
        self.lock().animation_time
    }

    fn time_zone(&self) -> FixedOffset {
        self.time_zone
    }

    fn set_rendering_active(&self, active: bool) {
        let mut state = self.lock();
        if active {
            if state.pause_depth > 0 {
                state.pause_depth -= 1;
                if state.pause_depth == 0 {
                    state.render_pauses += 1;
                }
            }
        } else {
            state.pause_depth += 1;
        }
    }

    fn grant_time_driver(&self, claim: TimeDriverClaim) -> Option<ControlId> {
        self.driver.grant(claim)
    }

    fn release_time_driver(&self, control: ControlId) -> bool {
        self.driver.release(control)
    }

    fn time_driver(&self) -> Option<ControlId> {
        self.driver.holder()
    }

    fn time_driver_times(&self) -> Option<Vec<DateTime<Utc>>> {
        self.driver.times()
    }

    fn publish_time_driver_event(&self, event: TimeDriverEvent) {
        self.driver.publish(&event);
    }

    fn dispose(&self) -> Result<()> {
        let visuals = {
            let mut state = self.lock();
            state.disposed = true;
            state.camera_listeners.clear();
            state.animation_listeners.clear();
            std::mem::take(&mut state.visuals)
        };
        tracing::debug!(
            "Disposed view '{}' ({} visuals detached)",
            self.name,
            visuals.len()
        );
        Ok(())
    }
}

impl std::fmt::Debug for MemoryView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryView")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visual::{RecordingVisual, VisualKind, VisualObject};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_add_remove_visual() {
        let view = MemoryView::new("main");
        let v = RecordingVisual::shared(VisualKind::Points, "stations");
        view.add_visual(v.clone()).unwrap();
        view.add_visual(v.clone()).unwrap();
        assert_eq!(view.visual_count(), 1);
        view.remove_visual(v.id()).unwrap();
        assert!(view.remove_visual(v.id()).is_err());
    }

    #[test]
    fn test_rejected_visual() {
        let view = MemoryView::new("main");
        view.reject_visual("bad");
        let bad = RecordingVisual::shared(VisualKind::Points, "bad");
        assert!(view.add_visual(bad).is_err());
        assert_eq!(view.visual_count(), 0);
    }

    #[test]
    fn test_camera_listener_fires_and_unregisters() {
        let view = MemoryView::new("main");
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let id = view.register_camera_listener(Arc::new(move |e| {
            assert!(e.bounds.is_some());
            h.fetch_add(1, Ordering::SeqCst);
        }));
        view.set_bounds(LatLonBox::new(0.0, 1.0, 0.0, 1.0));
        view.remove_listener(id);
        view.set_bounds(LatLonBox::new(0.0, 2.0, 0.0, 2.0));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(view.listener_count(), 0);
    }

    #[test]
    fn test_dispose_rejects_new_visuals() {
        let view = MemoryView::new("aux");
        view.dispose().unwrap();
        assert!(view.is_disposed());
        let v = RecordingVisual::shared(VisualKind::Lines, "x");
        assert!(view.add_visual(v).is_err());
    }
}
