//! View contexts
//!
//! A view context owns a camera, a projection and an animation clock, and
//! hosts the visual objects of many controls. Controls talk to it only
//! through the [`ViewContext`] trait:
//!
//! - insert / remove visual objects
//! - camera, animation and time-driver listeners
//! - the time-driver role ([`crate::time::TimeDriverSlot`] semantics)
//! - rendering pause for attribute batches ([`RenderingPause`])
//!
//! [`MemoryView`] is a headless implementation used by the demo binary and
//! the tests. [`debounce`] holds the camera-change coalescer.

pub mod debounce;
pub mod memory;

pub use debounce::{DebounceConfig, ViewChangeCoalescer};
pub use memory::MemoryView;

use crate::error::Result;
use crate::id::{ControlId, ListenerId, ViewId, VisualId};
use crate::time::{TimeDriverClaim, TimeDriverEvent, TimeDriverListener};
use crate::types::{LatLonBox, ScreenBounds};
use crate::visual::SharedVisual;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;

/// Camera or projection change
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraEvent {
    pub view: ViewId,
    pub bounds: Option<LatLonBox>,
    pub screen: ScreenBounds,
}

/// Animation clock tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationEvent {
    pub view: ViewId,
    pub time: Option<DateTime<Utc>>,
    pub index: usize,
}

pub type CameraListener = Arc<dyn Fn(&CameraEvent) + Send + Sync>;
pub type AnimationListener = Arc<dyn Fn(&AnimationEvent) + Send + Sync>;

/// Collaborator interface of a view context
pub trait ViewContext: Send + Sync {
    fn id(&self) -> ViewId;

    fn name(&self) -> String;

    fn screen_bounds(&self) -> ScreenBounds;

    /// Visible geographic region, `None` for non-georeferenced views
    fn lat_lon_box(&self) -> Option<LatLonBox>;

    fn add_visual(&self, visual: SharedVisual) -> Result<()>;

    fn remove_visual(&self, visual: VisualId) -> Result<()>;

    fn register_camera_listener(&self, listener: CameraListener) -> ListenerId;

    fn register_animation_listener(&self, listener: AnimationListener) -> ListenerId;

    fn register_time_driver_listener(&self, listener: TimeDriverListener) -> ListenerId;

    /// Remove any listener registered above
    fn remove_listener(&self, id: ListenerId);

    /// True while the camera is being animated
    fn is_animating(&self) -> bool;

    fn animation_time(&self) -> Option<DateTime<Utc>>;

    /// Display time zone for labels
    fn time_zone(&self) -> FixedOffset;

    /// Nested pause/resume of rendering; rendering resumes when every
    /// pause has been matched.
    fn set_rendering_active(&self, active: bool);

    /// Make `claim` the single time driver, revoking any prior holder.
    /// Returns the revoked control.
    fn grant_time_driver(&self, claim: TimeDriverClaim) -> Option<ControlId>;

    fn release_time_driver(&self, control: ControlId) -> bool;

    fn time_driver(&self) -> Option<ControlId>;

    fn time_driver_times(&self) -> Option<Vec<DateTime<Utc>>>;

    /// Broadcast a time-driver event to the view's listeners
    fn publish_time_driver_event(&self, event: TimeDriverEvent);

    /// Tear the view down. Only called for views a control created itself.
    fn dispose(&self) -> Result<()>;
}

/// View handle shared between controls
pub type SharedView = Arc<dyn ViewContext>;

/// Scoped rendering pause over a set of views
///
/// Rendering is deactivated on construction and reactivated on drop, so an
/// early return or a panic inside the batch still resumes rendering.
pub struct RenderingPause<'a> {
    views: &'a [SharedView],
}

impl<'a> RenderingPause<'a> {
    pub fn new(views: &'a [SharedView]) -> Self {
        for view in views {
            view.set_rendering_active(false);
        }
        Self { views }
    }
}

impl Drop for RenderingPause<'_> {
    fn drop(&mut self) {
        for view in self.views {
            view.set_rendering_active(true);
        }
    }
}

/// One (control, view, visual) association
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewDisplayInfo {
    pub control: ControlId,
    pub view: ViewId,
    pub visual: VisualId,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendering_pause_restores_on_panic() {
        let view = Arc::new(MemoryView::new("main"));
        let views: Vec<SharedView> = vec![view.clone()];
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _pause = RenderingPause::new(&views);
            assert!(!view.is_rendering());
            panic!("batch failed");
        }));
        assert!(result.is_err());
        assert!(view.is_rendering());
        assert_eq!(view.render_pauses(), 1);
    }

    #[test]
    fn test_nested_pauses() {
        let view = Arc::new(MemoryView::new("main"));
        let views: Vec<SharedView> = vec![view.clone()];
        {
            let _outer = RenderingPause::new(&views);
            {
                let _inner = RenderingPause::new(&views);
            }
            assert!(!view.is_rendering());
        }
        assert!(view.is_rendering());
    }
}
