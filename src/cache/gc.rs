//! Single-flight garbage collection coordinator.
//!
//! ```text
//!   add() ──try_send(())──► [ depth-1 channel ] ──► gc thread: target.collect()
//!            │ Full: a pass is already pending, drop the signal
//!            └ no thread: collect inline on the caller
//! ```
//!
//! Exactly one thread per cache calls [`Collect::collect`]. Dropping the
//! [`Collector`] closes the channel and joins the thread, so the collected
//! state is released by the time the owning cache is gone.

use std::sync::Arc;
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use tracing::warn;

/// Work run by the collector thread whenever the cache is over its cap.
pub(crate) trait Collect: Send + Sync + 'static {
    fn collect(&self);
}

#[derive(Debug)]
pub(crate) struct Collector {
    tx: Option<SyncSender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl Collector {
    /// Spawns the collector thread for `target`.
    ///
    /// If the thread cannot be spawned the collector degrades to running
    /// passes inline on the requesting thread.
    pub(crate) fn spawn<T: Collect>(name: &str, target: &Arc<T>) -> Self {
        let (tx, rx) = mpsc::sync_channel::<()>(1);
        let worker = Arc::clone(target);
        let spawned = thread::Builder::new()
            .name(name.to_owned())
            .spawn(move || {
                while rx.recv().is_ok() {
                    worker.collect();
                }
            });
        match spawned {
            Ok(handle) => Self {
                tx: Some(tx),
                worker: Some(handle),
            },
            Err(err) => {
                warn!(thread = name, error = %err, "gc thread unavailable; collecting inline");
                Self {
                    tx: None,
                    worker: None,
                }
            },
        }
    }

    /// Requests one collection pass without blocking on a pending one.
    pub(crate) fn request<T: Collect>(&self, target: &T) {
        match &self.tx {
            Some(tx) => match tx.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {},
                Err(TrySendError::Disconnected(())) => target.collect(),
            },
            None => target.collect(),
        }
    }
}

impl Drop for Collector {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("gc thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    use super::*;

    #[derive(Default)]
    struct Counter {
        passes: AtomicUsize,
    }

    impl Collect for Counter {
        fn collect(&self) {
            self.passes.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn request_runs_a_pass_on_the_worker() {
        let target = Arc::new(Counter::default());
        let collector = Collector::spawn("gc-test", &target);
        collector.request(&*target);

        let deadline = Instant::now() + Duration::from_secs(5);
        while target.passes.load(Ordering::SeqCst) == 0 {
            assert!(Instant::now() < deadline, "gc pass never ran");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn drop_joins_worker_and_releases_target() {
        let target = Arc::new(Counter::default());
        let collector = Collector::spawn("gc-drop", &target);
        collector.request(&*target);
        drop(collector);
        assert_eq!(Arc::strong_count(&target), 1);
    }

    #[test]
    fn burst_of_requests_never_blocks() {
        let target = Arc::new(Counter::default());
        let collector = Collector::spawn("gc-burst", &target);
        for _ in 0..10_000 {
            collector.request(&*target);
        }
        drop(collector);
        assert!(target.passes.load(Ordering::SeqCst) <= 10_000);
    }

    #[test]
    fn inline_fallback_collects_on_caller() {
        let target = Counter::default();
        let collector = Collector {
            tx: None,
            worker: None,
        };
        collector.request(&target);
        collector.request(&target);
        assert_eq!(target.passes.load(Ordering::SeqCst), 2);
    }
}
