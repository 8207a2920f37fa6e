//! Identity types for controls, views, visual objects and data references.
//!
//! All IDs are newtypes over `u64` handed out by process-wide monotonic
//! counters, so two live objects never share an id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $counter:ident, $label:literal) => {
        static $counter: AtomicU64 = AtomicU64::new(1);

        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl $name {
            /// Allocate a fresh, never-before-used id
            pub fn next() -> Self {
                Self($counter.fetch_add(1, Ordering::Relaxed))
            }

            #[inline]
            pub fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

define_id!(
    /// Identifies a display control.
    ControlId,
    NEXT_CONTROL_ID,
    "ControlId"
);
define_id!(
    /// Identifies a view context.
    ViewId,
    NEXT_VIEW_ID,
    "ViewId"
);
define_id!(
    /// Identifies a visual object handle.
    VisualId,
    NEXT_VISUAL_ID,
    "VisualId"
);
define_id!(
    /// Identity of a data reference (distinct from its name).
    ReferenceId,
    NEXT_REFERENCE_ID,
    "ReferenceId"
);
define_id!(
    /// Handle for a registered listener or subscription.
    ListenerId,
    NEXT_LISTENER_ID,
    "ListenerId"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let a = ControlId::next();
        let b = ControlId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_id_debug_format() {
        assert_eq!(format!("{:?}", ViewId(7)), "ViewId(7)");
        assert_eq!(VisualId(3).to_string(), "VisualId(3)");
    }
}
