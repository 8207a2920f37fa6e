//! Bounded background worker pool
//!
//! Cross-thread entry points (data-changed notifications, the viewpoint
//! watcher, reloads triggered by the time driver) never mutate control
//! state on the caller's thread. They submit a job here instead. Jobs run
//! on a fixed set of threads fed by a bounded crossbeam channel; a panic in
//! one job is logged and the thread keeps serving the queue.

use crate::error::{ControlError, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Default number of worker threads
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed-size thread pool with a bounded job queue
pub struct WorkerPool {
    tx: Option<Sender<Job>>,
    handles: Vec<JoinHandle<()>>,
    /// Queued plus running jobs
    outstanding: Arc<AtomicUsize>,
}

impl WorkerPool {
    pub fn new(threads: usize, capacity: usize) -> Result<Self> {
        let threads = threads.max(1);
        let (tx, rx) = bounded::<Job>(capacity.max(1));
        let outstanding = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let rx = rx.clone();
            let outstanding = outstanding.clone();
            let handle = std::thread::Builder::new()
                .name(format!("displayctl-worker-{}", index))
                .spawn(move || run(rx, outstanding))?;
            handles.push(handle);
        }
        tracing::debug!("Started {} worker thread(s), queue capacity {}", threads, capacity);
        Ok(Self {
            tx: Some(tx),
            handles,
            outstanding,
        })
    }

    /// Queue a job. Fails instead of blocking when the queue is full.
    pub fn submit<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| ControlError::Worker("worker pool is shut down".to_string()))?;
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        match tx.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.outstanding.fetch_sub(1, Ordering::SeqCst);
                Err(match e {
                    TrySendError::Full(_) => ControlError::Worker("worker queue is full".to_string()),
                    TrySendError::Disconnected(_) => {
                        ControlError::Worker("worker pool is shut down".to_string())
                    }
                })
            }
        }
    }

    /// Queued plus running jobs
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn threads(&self) -> usize {
        self.handles.len()
    }

    /// Block until no job is queued or running, or `timeout` elapses.
    /// Returns true when the pool went idle.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.outstanding() > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        true
    }

    /// Close the queue and join every thread after it drains. Idempotent.
    pub fn shutdown(&mut self) {
        if self.tx.take().is_none() {
            return;
        }
        let current = std::thread::current().id();
        for handle in self.handles.drain(..) {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!("Worker thread panicked outside a job");
            }
        }
        tracing::debug!("Worker pool stopped");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(rx: Receiver<Job>, outstanding: Arc<AtomicUsize>) {
    for job in rx.iter() {
        if catch_unwind(AssertUnwindSafe(job)).is_err() {
            tracing::error!("Background job panicked");
        }
        outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_jobs_run() {
        let pool = WorkerPool::new(2, 16).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..10 {
            let c = count.clone();
            pool.submit(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert_eq!(count.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_job_does_not_kill_thread() {
        let pool = WorkerPool::new(1, 4).unwrap();
        pool.submit(|| panic!("job bug")).unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let r = ran.clone();
        pool.submit(move || r.store(true, Ordering::SeqCst)).unwrap();
        assert!(pool.wait_idle(Duration::from_secs(5)));
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_full_queue_rejects() {
        let pool = WorkerPool::new(1, 1).unwrap();
        let (gate_tx, gate_rx) = bounded::<()>(0);
        pool.submit(move || {
            let _ = gate_rx.recv();
        })
        .unwrap();
        // Wait for the blocker to be picked up so the queue slot is free
        while pool.outstanding() > 0 && pool.tx.as_ref().map_or(0, |t| t.len()) > 0 {
            std::thread::sleep(Duration::from_millis(1));
        }
        pool.submit(|| {}).unwrap();
        let err = pool.submit(|| {}).unwrap_err();
        assert!(matches!(err, ControlError::Worker(_)));
        gate_tx.send(()).unwrap();
        assert!(pool.wait_idle(Duration::from_secs(5)));
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut pool = WorkerPool::new(1, 4).unwrap();
        pool.shutdown();
        pool.shutdown();
        assert!(pool.submit(|| {}).is_err());
    }
}
