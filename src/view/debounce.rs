//! View-change debounce coalescer
//!
//! Camera drags produce a stream of change notifications. The coalescer
//! absorbs them and fires a single "viewpoint changed" callback once the
//! view has been still for one delay interval and is not animating.
//!
//! # Timing
//!
//! ```text
//! notify ─┬─ within tolerance of last bounds ──► ignored
//!         └─ record last_change
//!              ├─ pending ──► return (watcher already armed)
//!              └─ pending = true, arm watcher
//!
//! watcher: sleep until last_change + delay
//!          ├─ newer change arrived ──► sleep until new last_change + delay
//!          ├─ view animating       ──► sleep one more delay
//!          └─ settled              ──► pending = false, fire once
//! ```
//!
//! The watcher is one long-lived thread per coalescer, parked on a
//! crossbeam channel between settle periods. Callback errors and panics are
//! logged and never end the watcher.

use crate::error::Result;
use crate::types::LatLonBox;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Default settle delay
pub const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_millis(500);

/// Default relative bounds tolerance
pub const DEFAULT_BOUNDS_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DebounceConfig {
    pub delay: Duration,
    /// Relative per-axis tolerance under which bounds count as unchanged
    pub tolerance: f64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            delay: DEFAULT_DEBOUNCE_DELAY,
            tolerance: DEFAULT_BOUNDS_TOLERANCE,
        }
    }
}

#[derive(Debug, Default)]
struct DebounceState {
    pending: bool,
    last_change: Option<Instant>,
    last_checked: Option<Instant>,
    last_bounds: Option<LatLonBox>,
    fired: u64,
}

enum TimerMsg {
    Arm,
    Shutdown,
}

type AnimatingCheck = Box<dyn Fn() -> bool + Send + Sync>;
type SettledCallback = Box<dyn Fn() -> Result<()> + Send + Sync>;

struct Shared {
    config: DebounceConfig,
    state: Mutex<DebounceState>,
    is_animating: AnimatingCheck,
    on_settled: SettledCallback,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, DebounceState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn deadline_after(&self, from: Option<Instant>) -> Instant {
        from.unwrap_or_else(Instant::now) + self.config.delay
    }

    fn fire(&self) {
        match catch_unwind(AssertUnwindSafe(|| (self.on_settled)())) {
            Ok(Ok(())) => tracing::debug!("Viewpoint settled"),
            Ok(Err(e)) => tracing::error!("Viewpoint change handler failed: {}", e),
            Err(_) => tracing::error!("Viewpoint change handler panicked"),
        }
    }
}

/// Coalesces camera-change notifications into one settle callback
pub struct ViewChangeCoalescer {
    shared: Arc<Shared>,
    tx: Sender<TimerMsg>,
    handle: Option<JoinHandle<()>>,
}

impl ViewChangeCoalescer {
    /// Start the watcher thread.
    ///
    /// `is_animating` is polled after each delay; `on_settled` runs on the
    /// watcher thread and should hand heavy work off elsewhere.
    pub fn new<A, F>(config: DebounceConfig, is_animating: A, on_settled: F) -> Result<Self>
    where
        A: Fn() -> bool + Send + Sync + 'static,
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let shared = Arc::new(Shared {
            config,
            state: Mutex::new(DebounceState::default()),
            is_animating: Box::new(is_animating),
            on_settled: Box::new(on_settled),
        });
        let (tx, rx) = unbounded();
        let worker = shared.clone();
        let handle = std::thread::Builder::new()
            .name("view-debounce".to_string())
            .spawn(move || watch(worker, rx))?;
        Ok(Self {
            shared,
            tx,
            handle: Some(handle),
        })
    }

    pub fn config(&self) -> DebounceConfig {
        self.shared.config
    }

    /// Record the current bounds without counting it as a change
    pub fn seed(&self, bounds: Option<LatLonBox>) {
        self.shared.lock().last_bounds = bounds;
    }

    /// Camera or projection changed. Returns false when the new bounds are
    /// within tolerance of the last seen ones.
    pub fn notify(&self, bounds: Option<LatLonBox>) -> bool {
        let mut state = self.shared.lock();
        if let (Some(old), Some(new)) = (state.last_bounds, bounds) {
            if old.approx_eq(&new, self.shared.config.tolerance) {
                return false;
            }
        }
        if bounds.is_some() {
            state.last_bounds = bounds;
        }
        state.last_change = Some(Instant::now());
        if state.pending {
            return true;
        }
        state.pending = true;
        state.last_checked = state.last_change;
        drop(state);
        tracing::trace!("Arming viewpoint watcher");
        if self.tx.send(TimerMsg::Arm).is_err() {
            tracing::warn!("Viewpoint watcher is not running");
            self.shared.lock().pending = false;
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        self.shared.lock().pending
    }

    /// Number of settle callbacks fired so far
    pub fn fired(&self) -> u64 {
        self.shared.lock().fired
    }

    /// Stop the watcher. A pending settle is dropped. Idempotent.
    pub fn shutdown(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        let _ = self.tx.send(TimerMsg::Shutdown);
        if handle.thread().id() == std::thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            tracing::error!("Viewpoint watcher thread panicked");
        }
    }
}

impl Drop for ViewChangeCoalescer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn watch(shared: Arc<Shared>, rx: Receiver<TimerMsg>) {
    while let Ok(TimerMsg::Arm) = rx.recv() {
        if !settle(&shared, &rx) {
            break;
        }
    }
    tracing::debug!("Viewpoint watcher stopped");
}

/// Wait for the view to settle, then fire. Returns false on shutdown.
fn settle(shared: &Shared, rx: &Receiver<TimerMsg>) -> bool {
    let mut deadline = shared.deadline_after(shared.lock().last_change);
    loop {
        match rx.recv_deadline(deadline) {
            Ok(TimerMsg::Arm) => continue,
            Ok(TimerMsg::Shutdown) | Err(RecvTimeoutError::Disconnected) => return false,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let animating = (shared.is_animating)();
        {
            let mut state = shared.lock();
            if state.last_change != state.last_checked {
                state.last_checked = state.last_change;
                deadline = shared.deadline_after(state.last_change);
                continue;
            }
            if animating {
                deadline = shared.deadline_after(None);
                continue;
            }
            state.pending = false;
            state.fired += 1;
        }
        shared.fire();
        return true;
    }
}
