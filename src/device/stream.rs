//! Ordered asynchronous execution stream.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Sender};
use parking_lot::{Condvar, Mutex};
use tracing::debug;

use crate::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Shared {
    pending: Mutex<usize>,
    drained: Condvar,
    /// Set when a job panics; the stream then refuses further work.
    failed: AtomicBool,
}

struct StreamInner {
    tx: Option<Sender<Job>>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Drop for StreamInner {
    fn drop(&mut self) {
        // Closing the channel lets the worker drain outstanding jobs and
        // exit; join so no job outlives the last stream handle.
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// An ordered execution stream.
///
/// Jobs submitted to one stream execute on a dedicated worker in submission
/// order. [`submit`](DeviceStream::submit) does not block on completion;
/// only [`synchronize`](DeviceStream::synchronize) blocks, until every
/// previously submitted job has finished. Cloning produces another handle
/// to the same stream.
///
/// A job that panics marks the stream failed: the pending count still
/// drains (no caller is left blocked), and every later `submit` or
/// `synchronize` reports [`Error::LaunchFailed`].
///
/// There is no mid-job cancellation: once submitted, a job runs to
/// completion.
#[derive(Clone)]
pub struct DeviceStream {
    inner: Arc<StreamInner>,
}

impl DeviceStream {
    /// Create a stream with its own worker thread.
    ///
    /// Fails with [`Error::AllocationFailed`] if the worker thread cannot
    /// be spawned.
    pub fn new() -> Result<Self> {
        let (tx, rx) = unbounded::<Job>();
        let shared = Arc::new(Shared {
            pending: Mutex::new(0),
            drained: Condvar::new(),
            failed: AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let worker = std::thread::Builder::new()
            .name("gridrand-stream".into())
            .spawn(move || {
                for job in rx.iter() {
                    // The job owns all its captures; nothing outside it is
                    // observable mid-unwind, so suppressing UnwindSafe here
                    // is sound. The count must drain either way or a
                    // synchronizing caller blocks forever.
                    let outcome =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(job));
                    if outcome.is_err() {
                        worker_shared.failed.store(true, Ordering::SeqCst);
                    }
                    let mut pending = worker_shared.pending.lock();
                    *pending -= 1;
                    worker_shared.drained.notify_all();
                }
            })
            .map_err(|e| Error::AllocationFailed(e.to_string()))?;

        debug!("device stream created");
        Ok(Self {
            inner: Arc::new(StreamInner {
                tx: Some(tx),
                shared,
                worker: Some(worker),
            }),
        })
    }

    /// Submit a job for in-order execution.
    ///
    /// Returns [`Error::LaunchFailed`] if the stream worker is gone or a
    /// previous job panicked; the job is then never run.
    pub fn submit(&self, job: impl FnOnce() + Send + 'static) -> Result<()> {
        if self.inner.shared.failed.load(Ordering::SeqCst) {
            return Err(Error::LaunchFailed("a previous stream job panicked".into()));
        }
        let Some(tx) = self.inner.tx.as_ref() else {
            return Err(Error::LaunchFailed("stream is shut down".into()));
        };

        {
            let mut pending = self.inner.shared.pending.lock();
            *pending += 1;
        }
        tx.send(Box::new(job)).map_err(|_| {
            let mut pending = self.inner.shared.pending.lock();
            *pending -= 1;
            self.inner.shared.drained.notify_all();
            Error::LaunchFailed("stream worker has terminated".into())
        })
    }

    /// Block until every previously submitted job has completed.
    ///
    /// Returns [`Error::LaunchFailed`] if any job on this stream has
    /// panicked.
    pub fn synchronize(&self) -> Result<()> {
        let mut pending = self.inner.shared.pending.lock();
        while *pending > 0 {
            self.inner.shared.drained.wait(&mut pending);
        }
        drop(pending);

        if self.inner.shared.failed.load(Ordering::SeqCst) {
            return Err(Error::LaunchFailed("a previous stream job panicked".into()));
        }
        Ok(())
    }
}

impl std::fmt::Debug for DeviceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStream")
            .field("pending", &*self.inner.shared.pending.lock())
            .field("failed", &self.inner.shared.failed.load(Ordering::SeqCst))
            .finish()
    }
}
