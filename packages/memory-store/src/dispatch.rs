//! Delivery of snapshots to observer callbacks.
//!
//! The database turns writes and registrations into `Job`s while it holds its
//! tree lock, so jobs enter the queue in the order the tree changed. They run
//! after the lock is released:
//! - `Inline`: on whichever caller thread gets to drain the queue first. A
//!   callback that writes only enqueues; the outer drain loop picks the new
//!   jobs up after the callback returns.
//! - `Queued`: on a dedicated thread fed through a tokio channel.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc as std_mpsc, Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use tokio::sync::mpsc;
use tracing::{trace, warn};
use typedtree_core::{Error, EventCallback, EventType, OnceCallback, Path, Snapshot};

use crate::config::DispatchMode;

/// Lock a mutex, recovering the data if a callback panicked while holding it.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A registered continuous observation.
pub struct Listener {
    pub id: u64,
    pub path: Path,
    pub event: EventType,
    active: AtomicBool,
    callback: Mutex<EventCallback>,
}

impl Listener {
    pub fn new(id: u64, path: Path, event: EventType, callback: EventCallback) -> Self {
        Self {
            id,
            path,
            event,
            active: AtomicBool::new(true),
            callback: Mutex::new(callback),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop further deliveries, including ones already queued.
    pub fn deactivate(&self) {
        self.active.store(false, Ordering::Release);
    }
}

pub enum Job {
    Each {
        listener: Arc<Listener>,
        snapshot: Snapshot,
    },
    Once {
        callback: OnceCallback,
        snapshot: Snapshot,
    },
    Flush(std_mpsc::SyncSender<()>),
}

impl Job {
    fn run(self) {
        match self {
            Job::Each { listener, snapshot } => {
                if !listener.is_active() {
                    trace!(id = listener.id, path = %snapshot.path, "dropping delivery for removed observer");
                    return;
                }
                trace!(id = listener.id, event = %listener.event, path = %snapshot.path, "delivering");
                let mut callback = lock(&listener.callback);
                (*callback)(snapshot);
            }
            Job::Once { callback, snapshot } => {
                trace!(path = %snapshot.path, "delivering once");
                callback(snapshot);
            }
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    /// Run the job, containing a panicking callback so the jobs behind it
    /// and the writer that queued it are unaffected.
    fn run_isolated(self) {
        if catch_unwind(AssertUnwindSafe(|| self.run())).is_err() {
            warn!("observer callback panicked");
        }
    }
}

pub enum Dispatcher {
    Inline {
        queue: Mutex<VecDeque<Job>>,
        draining: AtomicBool,
    },
    Queued {
        tx: mpsc::UnboundedSender<Job>,
        worker: ThreadId,
    },
}

impl Dispatcher {
    pub fn new(mode: DispatchMode) -> Result<Self, Error> {
        match mode {
            DispatchMode::Inline => Ok(Self::inline()),
            DispatchMode::Queued => Self::queued(),
        }
    }

    pub fn inline() -> Self {
        Dispatcher::Inline {
            queue: Mutex::new(VecDeque::new()),
            draining: AtomicBool::new(false),
        }
    }

    fn queued() -> Result<Self, Error> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let handle = thread::Builder::new()
            .name("typedtree-dispatch".to_string())
            .spawn(move || {
                while let Some(job) = rx.blocking_recv() {
                    job.run_isolated();
                }
            })
            .map_err(|e| Error::Other {
                message: format!("failed to start dispatch thread: {}", e),
            })?;

        Ok(Dispatcher::Queued {
            tx,
            worker: handle.thread().id(),
        })
    }

    /// Queue jobs behind everything already queued.
    pub fn enqueue(&self, jobs: impl IntoIterator<Item = Job>) {
        match self {
            Dispatcher::Inline { queue, .. } => lock(queue).extend(jobs),
            Dispatcher::Queued { tx, .. } => {
                for job in jobs {
                    // The thread only stops once every sender is gone.
                    let _ = tx.send(job);
                }
            }
        }
    }

    /// Run queued jobs on this thread unless another caller is already
    /// draining. No-op in queued mode.
    pub fn run(&self) {
        let Dispatcher::Inline { queue, draining } = self else {
            return;
        };

        loop {
            if draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return;
            }

            {
                let _guard = DrainGuard(draining);
                loop {
                    let job = lock(queue).pop_front();
                    match job {
                        Some(job) => job.run_isolated(),
                        None => break,
                    }
                }
            }

            // A job enqueued between the last pop and the guard dropping
            // would otherwise wait for the next write.
            if lock(queue).is_empty() {
                return;
            }
        }
    }

    /// Block until every job queued before this call has run.
    ///
    /// Called from a callback on the dispatch thread, returns immediately.
    pub fn flush(&self) {
        match self {
            Dispatcher::Inline { .. } => self.run(),
            Dispatcher::Queued { tx, worker } => {
                if thread::current().id() == *worker {
                    return;
                }
                let (done_tx, done_rx) = std_mpsc::sync_channel(1);
                if tx.send(Job::Flush(done_tx)).is_ok() {
                    let _ = done_rx.recv();
                }
            }
        }
    }
}

struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use typedtree_core::{path, Value};

    fn recorder() -> (Arc<Mutex<Vec<Value>>>, EventCallback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callback: EventCallback = Box::new(move |snap: Snapshot| {
            sink.lock().unwrap().push(snap.value);
        });
        (seen, callback)
    }

    fn each(listener: &Arc<Listener>, value: i64) -> Job {
        Job::Each {
            listener: listener.clone(),
            snapshot: Snapshot::new(listener.path.clone(), Value::from(value)),
        }
    }

    #[test]
    fn inline_runs_in_fifo_order() {
        let (seen, callback) = recorder();
        let listener = Arc::new(Listener::new(1, path!("a"), EventType::Value, callback));

        let dispatcher = Dispatcher::inline();
        dispatcher.enqueue(vec![each(&listener, 1), each(&listener, 2)]);
        dispatcher.enqueue(vec![each(&listener, 3)]);
        dispatcher.run();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)]
        );
    }

    #[test]
    fn inactive_listener_is_skipped() {
        let (seen, callback) = recorder();
        let listener = Arc::new(Listener::new(1, path!("a"), EventType::Value, callback));

        let dispatcher = Dispatcher::inline();
        dispatcher.enqueue(vec![each(&listener, 1)]);
        listener.deactivate();
        dispatcher.run();

        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn once_job_runs() {
        let hit = Arc::new(Mutex::new(None));
        let sink = hit.clone();
        let dispatcher = Dispatcher::inline();
        dispatcher.enqueue(vec![Job::Once {
            callback: Box::new(move |snap: Snapshot| *sink.lock().unwrap() = Some(snap.value)),
            snapshot: Snapshot::new(path!("x"), Value::from("v")),
        }]);
        dispatcher.flush();
        assert_eq!(*hit.lock().unwrap(), Some(Value::from("v")));
    }

    #[test]
    fn inline_survives_panicking_callback() {
        let dispatcher = Dispatcher::inline();
        let (seen, callback) = recorder();
        let listener = Arc::new(Listener::new(2, path!("a"), EventType::Value, callback));
        dispatcher.enqueue(vec![
            Job::Once {
                callback: Box::new(|_| panic!("boom")),
                snapshot: Snapshot::new(path!("x"), Value::Null),
            },
            each(&listener, 7),
        ]);
        dispatcher.run();
        dispatcher.enqueue(vec![each(&listener, 8)]);
        dispatcher.run();

        assert_eq!(
            *seen.lock().unwrap(),
            vec![Value::from(7i64), Value::from(8i64)]
        );
    }

    #[test]
    fn queued_flush_waits_for_earlier_jobs() {
        let (seen, callback) = recorder();
        let listener = Arc::new(Listener::new(1, path!("a"), EventType::Value, callback));

        let dispatcher = Dispatcher::new(DispatchMode::Queued).unwrap();
        dispatcher.enqueue((0..50).map(|i| each(&listener, i)));
        dispatcher.run();
        dispatcher.flush();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 50);
        assert_eq!(seen[49], Value::from(49i64));
    }

    #[test]
    fn queued_survives_panicking_callback() {
        let dispatcher = Dispatcher::new(DispatchMode::Queued).unwrap();
        dispatcher.enqueue(vec![Job::Once {
            callback: Box::new(|_| panic!("boom")),
            snapshot: Snapshot::new(path!("x"), Value::Null),
        }]);

        let (seen, callback) = recorder();
        let listener = Arc::new(Listener::new(2, path!("a"), EventType::Value, callback));
        dispatcher.enqueue(vec![each(&listener, 7)]);
        dispatcher.flush();

        assert_eq!(*seen.lock().unwrap(), vec![Value::from(7i64)]);
    }
}
