//! Time-driver role
//!
//! Each view has at most one time-driver control. A control asks for the
//! role with a [`TimeDriverClaim`]; the view's [`TimeDriverSlot`] installs
//! the claim and revokes whichever claim it held before, flipping the prior
//! holder's shared "is driver" flag to false.

use crate::error::ControlError;
use crate::id::{ControlId, ListenerId};
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Something that happened to a view's time-driver role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeDriverEvent {
    Granted(ControlId),
    Revoked(ControlId),
    Released(ControlId),
    /// The driver published a new time sequence
    TimesChanged(ControlId),
    /// The driver's data changed; consumers of its sequence should reload
    DataChanged(ControlId),
}

pub type TimeDriverListener = Arc<dyn Fn(&TimeDriverEvent) + Send + Sync>;

/// A control's request for (and hold on) the driver role
#[derive(Clone)]
pub struct TimeDriverClaim {
    control: ControlId,
    flag: Arc<AtomicBool>,
    times: Arc<Mutex<Vec<DateTime<Utc>>>>,
}

impl TimeDriverClaim {
    /// `flag` is the control's "is driver" flag; the slot owns its value
    /// from now on.
    pub fn new(control: ControlId, flag: Arc<AtomicBool>, times: Vec<DateTime<Utc>>) -> Self {
        Self {
            control,
            flag,
            times: Arc::new(Mutex::new(times)),
        }
    }

    pub fn control(&self) -> ControlId {
        self.control
    }

    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn times(&self) -> Vec<DateTime<Utc>> {
        lock(&self.times).clone()
    }

    pub fn set_times(&self, times: Vec<DateTime<Utc>>) {
        *lock(&self.times) = times;
    }

    fn activate(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    fn revoke(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

impl std::fmt::Debug for TimeDriverClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeDriverClaim")
            .field("control", &self.control)
            .field("active", &self.is_active())
            .finish()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// Contention for the role; the slot settles it by revoking `holder`
fn role_conflict(holder: ControlId, claimant: ControlId) -> ControlError {
    ControlError::ConcurrentRoleConflict {
        holder: holder.raw(),
        claimant: claimant.raw(),
    }
}

/// Single-holder driver slot owned by a view
#[derive(Default)]
pub struct TimeDriverSlot {
    holder: Mutex<Option<TimeDriverClaim>>,
    listeners: Mutex<Vec<(ListenerId, TimeDriverListener)>>,
}

impl TimeDriverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `claim` as the holder. Returns the control whose claim was
    /// revoked, if any.
    pub fn grant(&self, claim: TimeDriverClaim) -> Option<ControlId> {
        let control = claim.control();
        let previous = {
            let mut holder = lock(&self.holder);
            claim.activate();
            holder.replace(claim)
        };
        let revoked = previous.filter(|p| p.control() != control).map(|p| {
            p.revoke();
            p.control()
        });
        if let Some(prior) = revoked {
            tracing::info!("{}; revoking {}", role_conflict(prior, control), prior);
            self.publish(&TimeDriverEvent::Revoked(prior));
        }
        self.publish(&TimeDriverEvent::Granted(control));
        revoked
    }

    /// Give up the role. No-op unless `control` is the holder.
    pub fn release(&self, control: ControlId) -> bool {
        let released = {
            let mut holder = lock(&self.holder);
            match holder.as_ref() {
                Some(h) if h.control() == control => holder.take(),
                _ => None,
            }
        };
        match released {
            Some(claim) => {
                claim.revoke();
                self.publish(&TimeDriverEvent::Released(control));
                true
            }
            None => false,
        }
    }

    pub fn holder(&self) -> Option<ControlId> {
        lock(&self.holder).as_ref().map(TimeDriverClaim::control)
    }

    /// The driver's time sequence, if there is a driver
    pub fn times(&self) -> Option<Vec<DateTime<Utc>>> {
        lock(&self.holder).as_ref().map(TimeDriverClaim::times)
    }

    pub fn subscribe(&self, listener: TimeDriverListener) -> ListenerId {
        let id = ListenerId::next();
        lock(&self.listeners).push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    /// Deliver `event` to every subscriber, outside the slot's locks
    pub fn publish(&self, event: &TimeDriverEvent) {
        let listeners: Vec<TimeDriverListener> =
            lock(&self.listeners).iter().map(|(_, l)| l.clone()).collect();
        for listener in listeners {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claim(control: ControlId) -> (TimeDriverClaim, Arc<AtomicBool>) {
        let flag = Arc::new(AtomicBool::new(false));
        (TimeDriverClaim::new(control, flag.clone(), Vec::new()), flag)
    }

    #[test]
    fn test_grant_revokes_prior_holder() {
        let slot = TimeDriverSlot::new();
        let a = ControlId::next();
        let b = ControlId::next();
        let (ca, fa) = claim(a);
        let (cb, fb) = claim(b);

        assert_eq!(slot.grant(ca), None);
        assert!(fa.load(Ordering::SeqCst));
        assert_eq!(slot.grant(cb), Some(a));
        assert!(!fa.load(Ordering::SeqCst));
        assert!(fb.load(Ordering::SeqCst));
        assert_eq!(slot.holder(), Some(b));
    }

    #[test]
    fn test_role_conflict_names_both_controls() {
        let a = ControlId::next();
        let b = ControlId::next();
        let err = role_conflict(a, b);
        assert!(matches!(
            err,
            ControlError::ConcurrentRoleConflict { holder, claimant }
                if holder == a.raw() && claimant == b.raw()
        ));
        let message = err.to_string();
        assert!(message.contains(&a.raw().to_string()));
        assert!(message.contains(&b.raw().to_string()));
    }

    #[test]
    fn test_regrant_same_control_is_not_revocation() {
        let slot = TimeDriverSlot::new();
        let a = ControlId::next();
        let (c1, f1) = claim(a);
        slot.grant(c1.clone());
        assert_eq!(slot.grant(c1), None);
        assert!(f1.load(Ordering::SeqCst));
    }

    #[test]
    fn test_release_only_by_holder() {
        let slot = TimeDriverSlot::new();
        let a = ControlId::next();
        let (ca, fa) = claim(a);
        slot.grant(ca);
        assert!(!slot.release(ControlId::next()));
        assert!(slot.release(a));
        assert!(!fa.load(Ordering::SeqCst));
        assert_eq!(slot.holder(), None);
        assert!(slot.times().is_none());
    }

    #[test]
    fn test_events_published() {
        let slot = TimeDriverSlot::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        let id = slot.subscribe(Arc::new(move |e| s.lock().unwrap().push(e.clone())));
        let a = ControlId::next();
        let b = ControlId::next();
        slot.grant(claim(a).0);
        slot.grant(claim(b).0);
        assert!(slot.unsubscribe(id));
        slot.release(b);
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                TimeDriverEvent::Granted(a),
                TimeDriverEvent::Revoked(a),
                TimeDriverEvent::Granted(b),
            ]
        );
    }
}
