//! Delivery contexts for polled values
//!
//! A polling session hands every transformed value to a [`Delivery`]. A plain
//! closure runs inline on the polling thread. [`Dispatched`] instead posts the
//! observer call to a [`Dispatcher`], a queue drained by whichever thread owns
//! it (the UI thread, typically), so observers always run there, one at a
//! time, in submission order.
//!
//! # Example
//!
//! ```rust
//! use property_client::{Delivery, Dispatched, Dispatcher};
//! use std::sync::mpsc;
//!
//! let dispatcher = Dispatcher::new();
//! let (tx, rx) = mpsc::channel();
//! let delivery = Dispatched::new(dispatcher.handle(), move |v: i32| {
//!     tx.send(v).unwrap();
//! });
//!
//! delivery.deliver(1);
//! delivery.deliver(2);
//! assert!(rx.try_recv().is_err()); // nothing runs until the owner drains
//!
//! assert_eq!(dispatcher.run_pending(), 2);
//! assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![1, 2]);
//! ```

use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::polling::SessionToken;

type Job = Box<dyn FnOnce() + Send>;

/// Receives values produced by a polling session
pub trait Delivery<T>: Send + 'static {
    fn deliver(&self, value: T);

    /// Deliver a value produced by `session`
    ///
    /// Nothing may reach the observer once the session has stopped. The
    /// default checks at hand-off; deliveries that run the observer later
    /// must check again at that point.
    fn deliver_for(&self, value: T, session: &SessionToken) {
        if session.is_active() {
            self.deliver(value);
        }
    }
}

impl<T, F> Delivery<T> for F
where
    F: Fn(T) + Send + 'static,
{
    fn deliver(&self, value: T) {
        self(value)
    }
}

/// Job queue owned by a designated thread
///
/// Jobs posted through any [`DispatchHandle`] run only when the owner calls
/// one of the `run_*` methods.
pub struct Dispatcher {
    tx: mpsc::Sender<Job>,
    rx: mpsc::Receiver<Job>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    /// A handle other threads can post jobs through
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every job queued right now, returning how many ran
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.rx.try_recv() {
            job();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one job and run it
    ///
    /// Returns `false` if nothing arrived in time.
    pub fn run_next_timeout(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(job) => {
                job();
                true
            }
            Err(_) => false,
        }
    }

    /// Keep running jobs as they arrive until `duration` has elapsed
    ///
    /// A duration too large to represent as a deadline runs jobs for good.
    pub fn run_for(&self, duration: Duration) -> usize {
        let Some(deadline) = Instant::now().checked_add(duration) else {
            let mut ran = 0;
            while let Ok(job) = self.rx.recv() {
                job();
                ran += 1;
            }
            return ran;
        };
        let mut ran = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if self.run_next_timeout(remaining) {
                ran += 1;
            }
        }
        ran
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher").finish_non_exhaustive()
    }
}

/// Cloneable, sendable side of a [`Dispatcher`]
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<Job>,
}

impl DispatchHandle {
    /// Queue `job` on the dispatcher's thread
    ///
    /// Returns `false` if the dispatcher has been dropped; the job is discarded.
    pub fn post<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.tx.send(Box::new(job)).is_ok()
    }
}

impl std::fmt::Debug for DispatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchHandle").finish_non_exhaustive()
    }
}

/// Delivers by posting the observer call to a [`Dispatcher`]
pub struct Dispatched<F> {
    handle: DispatchHandle,
    observer: Arc<F>,
}

impl<F> Dispatched<F> {
    pub fn new(handle: DispatchHandle, observer: F) -> Self {
        Self {
            handle,
            observer: Arc::new(observer),
        }
    }
}

impl<T, F> Delivery<T> for Dispatched<F>
where
    T: Send + 'static,
    F: Fn(T) + Send + Sync + 'static,
{
    fn deliver(&self, value: T) {
        let observer = Arc::clone(&self.observer);
        if !self.handle.post(move || observer(value)) {
            tracing::debug!("dispatcher dropped, discarding delivery");
        }
    }

    /// Queue the observer call; it is skipped if the session has stopped by
    /// the time the dispatcher runs it
    fn deliver_for(&self, value: T, session: &SessionToken) {
        let observer = Arc::clone(&self.observer);
        let session = session.clone();
        let posted = self.handle.post(move || {
            if session.is_active() {
                observer(value);
            } else {
                tracing::trace!(session = %session.session(), "dropping delivery queued before stop");
            }
        });
        if !posted {
            tracing::debug!("dispatcher dropped, discarding delivery");
        }
    }
}
