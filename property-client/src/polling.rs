//! Cancellable polling of a single property
//!
//! A [`PollingLoop`] owns at most one running [`PollingSession`]: a thread
//! that reads the target property, transforms the value and hands it to a
//! [`Delivery`], then waits for the interval. Waiting happens on a condvar,
//! so [`PollingLoop::stop`] wakes the thread immediately instead of letting
//! it sleep out the interval. A service call already in flight is not
//! interrupted; its result is dropped if a stop arrived meanwhile.
//!
//! ```text
//!  Idle ──start──▶ Running ──stop──▶ Stopped
//!                   │   ▲
//!                   └───┘ read ok / read failed
//! ```
//!
//! A stopped session never resumes; `start` again creates a new session.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::client::{PropertyClient, PropertyTarget};
use crate::delivery::Delivery;
use crate::error::PollingError;
use crate::value::PropertyValue;

/// Interval the vendor gauge is polled at
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies one polling session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "poll-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// No session has been started
    Idle,
    Running,
    /// The last session was stopped or its thread exited
    Stopped,
}

/// Stop flag the polling thread can sleep on
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    wake: Condvar,
}

impl StopSignal {
    /// Returns `true` if this call is the one that stopped the session
    fn stop(&self) -> bool {
        let mut stopped = self.stopped.lock();
        if *stopped {
            return false;
        }
        *stopped = true;
        self.wake.notify_all();
        true
    }

    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    /// Sleep for `timeout` unless stopped first; returns whether stopped
    ///
    /// A timeout too large to represent as a deadline waits for the stop.
    fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut stopped = self.stopped.lock();
        while !*stopped {
            match deadline {
                Some(deadline) => {
                    if self.wake.wait_until(&mut stopped, deadline).timed_out() {
                        break;
                    }
                }
                None => self.wake.wait(&mut stopped),
            }
        }
        *stopped
    }
}

/// Read-only view of whether a polling session is still running
///
/// Handed to [`Delivery::deliver_for`] so a delivery that defers the observer
/// call can drop it once the session has stopped.
#[derive(Debug, Clone)]
pub struct SessionToken {
    id: SessionId,
    signal: Arc<StopSignal>,
}

impl SessionToken {
    pub fn session(&self) -> SessionId {
        self.id
    }

    pub fn is_active(&self) -> bool {
        !self.signal.is_stopped()
    }
}

#[derive(Debug, Default)]
struct Counters {
    polls: AtomicU64,
    delivered: AtomicU64,
    errors: AtomicU64,
    consecutive_errors: AtomicU32,
    last_error: Mutex<Option<String>>,
}

/// Snapshot of a session's progress
#[derive(Debug, Clone, PartialEq)]
pub struct PollingStats {
    pub session: SessionId,
    pub target: PropertyTarget,
    pub interval: Duration,
    pub state: PollState,
    pub uptime: Duration,
    /// Reads attempted
    pub poll_count: u64,
    /// Values handed to the delivery
    pub delivered_count: u64,
    /// Failed reads over the whole session
    pub error_count: u64,
    /// Failed reads since the last successful one
    pub consecutive_errors: u32,
    pub last_error: Option<String>,
}

impl fmt::Display for PollingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({:?}, every {:?}): polls {}, delivered {}, errors {} ({} consecutive)",
            self.session,
            self.target,
            self.state,
            self.interval,
            self.poll_count,
            self.delivered_count,
            self.error_count,
            self.consecutive_errors
        )?;
        if let Some(err) = &self.last_error {
            write!(f, ", last error: {err}")?;
        }
        Ok(())
    }
}

/// One running (or finished) polling thread
#[derive(Debug)]
pub struct PollingSession {
    id: SessionId,
    target: PropertyTarget,
    interval: Duration,
    started_at: Instant,
    signal: Arc<StopSignal>,
    counters: Arc<Counters>,
    handle: Option<JoinHandle<()>>,
}

impl PollingSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn target(&self) -> PropertyTarget {
        self.target
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> PollState {
        let finished = self.handle.as_ref().map_or(true, JoinHandle::is_finished);
        if self.signal.is_stopped() || finished {
            PollState::Stopped
        } else {
            PollState::Running
        }
    }

    pub fn stats(&self) -> PollingStats {
        PollingStats {
            session: self.id,
            target: self.target,
            interval: self.interval,
            state: self.state(),
            uptime: self.started_at.elapsed(),
            poll_count: self.counters.polls.load(Ordering::Relaxed),
            delivered_count: self.counters.delivered.load(Ordering::Relaxed),
            error_count: self.counters.errors.load(Ordering::Relaxed),
            consecutive_errors: self.counters.consecutive_errors.load(Ordering::Relaxed),
            last_error: self.counters.last_error.lock().clone(),
        }
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        self.signal.stop();
    }
}

/// Runs at most one polling session at a time
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use property_client::{PollingLoop, PropertyClient, PropertyTarget, scale_to_percent};
/// use property_service::{InMemoryPropertyService, RawValue, AREA, I2C_CONTROL_INT};
///
/// let service = InMemoryPropertyService::new().with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(33));
/// let client = PropertyClient::new(service);
/// let (tx, rx) = std::sync::mpsc::channel();
///
/// let poller = PollingLoop::new();
/// poller
///     .start(
///         &client,
///         PropertyTarget::new(I2C_CONTROL_INT, AREA),
///         Duration::from_millis(20),
///         |raw: i32| scale_to_percent(raw),
///         move |percent: i32| { let _ = tx.send(percent); },
///     )
///     .unwrap();
///
/// assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 50);
/// poller.shutdown().unwrap();
/// ```
#[derive(Debug, Default)]
pub struct PollingLoop {
    session: Mutex<Option<PollingSession>>,
}

impl PollingLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start polling `target` every `interval`
    ///
    /// Each successful read is passed through `transform` and the result to
    /// `delivery`. Failed reads are logged and counted; the loop keeps going.
    pub fn start<V, T, F, D>(
        &self,
        client: &PropertyClient,
        target: PropertyTarget,
        interval: Duration,
        transform: F,
        delivery: D,
    ) -> Result<SessionId, PollingError>
    where
        V: PropertyValue,
        T: Send + 'static,
        F: FnMut(V) -> T + Send + 'static,
        D: Delivery<T>,
    {
        if interval.is_zero() {
            return Err(PollingError::InvalidInterval);
        }

        let mut slot = self.session.lock();
        if let Some(current) = slot.as_ref() {
            if current.state() == PollState::Running {
                return Err(PollingError::AlreadyRunning);
            }
        }

        let id = SessionId::next();
        let signal = Arc::new(StopSignal::default());
        let counters = Arc::new(Counters::default());

        let worker = Worker {
            id,
            client: client.clone(),
            target,
            interval,
            token: SessionToken {
                id,
                signal: Arc::clone(&signal),
            },
            counters: Arc::clone(&counters),
        };
        let handle = thread::Builder::new()
            .name(format!("vhal-{id}"))
            .spawn(move || worker.run::<V, T, F, D>(transform, delivery))?;

        tracing::info!(session = %id, property = %target.property, area = %target.area, ?interval, "polling started");

        *slot = Some(PollingSession {
            id,
            target,
            interval,
            started_at: Instant::now(),
            signal,
            counters,
            handle: Some(handle),
        });

        Ok(id)
    }

    /// Ask the running session to stop
    ///
    /// Returns immediately. An interval wait ends at once; a service call in
    /// flight finishes first and its value is discarded. Calling this with no
    /// session, or more than once, does nothing.
    pub fn stop(&self) {
        if let Some(session) = self.session.lock().as_ref() {
            if session.signal.stop() {
                tracing::info!(session = %session.id, "polling stop requested");
            }
        }
    }

    /// Stop and wait for the polling thread to exit
    ///
    /// Called from the polling thread itself (from an inline delivery) this
    /// only stops, since a thread cannot join itself.
    pub fn shutdown(&self) -> Result<(), PollingError> {
        let handle = {
            let mut slot = self.session.lock();
            match slot.as_mut() {
                Some(session) => {
                    session.signal.stop();
                    session.handle.take()
                }
                None => None,
            }
        };

        match handle {
            Some(handle) if handle.thread().id() != thread::current().id() => {
                handle.join().map_err(|_| PollingError::Join)
            }
            _ => Ok(()),
        }
    }

    pub fn state(&self) -> PollState {
        self.session
            .lock()
            .as_ref()
            .map_or(PollState::Idle, PollingSession::state)
    }

    pub fn is_running(&self) -> bool {
        self.state() == PollState::Running
    }

    /// Id of the current or most recent session
    pub fn session_id(&self) -> Option<SessionId> {
        self.session.lock().as_ref().map(PollingSession::id)
    }

    /// Stats of the current or most recent session
    pub fn stats(&self) -> Option<PollingStats> {
        self.session.lock().as_ref().map(PollingSession::stats)
    }
}

/// Everything the polling thread owns
struct Worker {
    id: SessionId,
    client: PropertyClient,
    target: PropertyTarget,
    interval: Duration,
    token: SessionToken,
    counters: Arc<Counters>,
}

impl Worker {
    fn run<V, T, F, D>(self, mut transform: F, delivery: D)
    where
        V: PropertyValue,
        F: FnMut(V) -> T,
        D: Delivery<T>,
    {
        loop {
            if !self.token.is_active() {
                break;
            }

            self.counters.polls.fetch_add(1, Ordering::Relaxed);

            match self.client.read::<V>(self.target) {
                Ok(raw) => {
                    self.counters.consecutive_errors.store(0, Ordering::Relaxed);
                    let mapped = transform(raw);

                    if !self.token.is_active() {
                        break;
                    }
                    delivery.deliver_for(mapped, &self.token);
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    let consecutive = self.counters.consecutive_errors.fetch_add(1, Ordering::Relaxed) + 1;
                    *self.counters.last_error.lock() = Some(e.to_string());

                    tracing::warn!(
                        session = %self.id,
                        property = %self.target.property,
                        area = %self.target.area,
                        consecutive,
                        error = %e,
                        "poll read failed"
                    );
                }
            }

            if self.token.signal.wait(self.interval) {
                break;
            }
        }

        tracing::info!(session = %self.id, property = %self.target.property, "polling stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use property_service::{InMemoryPropertyService, RawValue, AREA, I2C_CONTROL_INT};
    use std::sync::mpsc;

    fn client() -> (InMemoryPropertyService, PropertyClient) {
        let service = InMemoryPropertyService::new().with_property(I2C_CONTROL_INT, AREA, RawValue::Int32(33));
        (service.clone(), PropertyClient::new(service))
    }

    fn target() -> PropertyTarget {
        PropertyTarget::new(I2C_CONTROL_INT, AREA)
    }

    #[test]
    fn test_stop_signal_wakes_waiter() {
        let signal = Arc::new(StopSignal::default());
        let waiter = Arc::clone(&signal);

        let start = Instant::now();
        let handle = thread::spawn(move || waiter.wait(Duration::from_secs(10)));
        thread::sleep(Duration::from_millis(20));
        assert!(signal.stop());
        assert!(!signal.stop());

        assert!(handle.join().unwrap());
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_stop_signal_unbounded_wait() {
        let signal = Arc::new(StopSignal::default());
        let waiter = Arc::clone(&signal);

        let handle = thread::spawn(move || waiter.wait(Duration::MAX));
        thread::sleep(Duration::from_millis(20));
        signal.stop();

        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_token_follows_signal() {
        let signal = Arc::new(StopSignal::default());
        let token = SessionToken {
            id: SessionId::next(),
            signal: Arc::clone(&signal),
        };

        assert!(token.is_active());
        signal.stop();
        assert!(!token.clone().is_active());
    }

    #[test]
    fn test_stop_signal_times_out() {
        let signal = StopSignal::default();
        assert!(!signal.wait(Duration::from_millis(10)));
    }

    #[test]
    fn test_idle_before_start() {
        let poller = PollingLoop::new();

        assert_eq!(poller.state(), PollState::Idle);
        assert!(poller.stats().is_none());
        assert!(poller.session_id().is_none());
    }

    #[test]
    fn test_stop_before_start_is_noop() {
        let poller = PollingLoop::new();

        poller.stop();
        poller.stop();
        assert!(poller.shutdown().is_ok());
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let (_, client) = client();
        let poller = PollingLoop::new();

        let err = poller
            .start(&client, target(), Duration::ZERO, |v: i32| v, |_: i32| {})
            .unwrap_err();
        assert!(matches!(err, PollingError::InvalidInterval));
        assert_eq!(poller.state(), PollState::Idle);
    }

    #[test]
    fn test_second_start_while_running_fails() {
        let (_, client) = client();
        let poller = PollingLoop::new();

        poller
            .start(&client, target(), Duration::from_millis(20), |v: i32| v, |_: i32| {})
            .unwrap();
        let err = poller
            .start(&client, target(), Duration::from_millis(20), |v: i32| v, |_: i32| {})
            .unwrap_err();
        assert!(matches!(err, PollingError::AlreadyRunning));

        poller.shutdown().unwrap();
    }

    #[test]
    fn test_restart_creates_new_session() {
        let (_, client) = client();
        let poller = PollingLoop::new();

        let first = poller
            .start(&client, target(), Duration::from_millis(20), |v: i32| v, |_: i32| {})
            .unwrap();
        poller.shutdown().unwrap();
        assert_eq!(poller.state(), PollState::Stopped);

        let second = poller
            .start(&client, target(), Duration::from_millis(20), |v: i32| v, |_: i32| {})
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(poller.session_id(), Some(second));
        assert_eq!(poller.state(), PollState::Running);

        poller.shutdown().unwrap();
    }

    #[test]
    fn test_delivers_transformed_values() {
        let (service, client) = client();
        let poller = PollingLoop::new();
        let (tx, rx) = mpsc::channel();

        poller
            .start(
                &client,
                target(),
                Duration::from_millis(10),
                |raw: i32| raw * 2,
                move |v: i32| {
                    let _ = tx.send(v);
                },
            )
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 66);

        service.poke(I2C_CONTROL_INT, AREA, RawValue::Int32(10));
        let updated = (0..50)
            .filter_map(|_| rx.recv_timeout(Duration::from_secs(1)).ok())
            .find(|v| *v == 20);
        assert_eq!(updated, Some(20));

        poller.shutdown().unwrap();
    }

    #[test]
    fn test_stop_wakes_long_interval_immediately() {
        let (_, client) = client();
        let poller = PollingLoop::new();
        let (tx, rx) = mpsc::channel();

        poller
            .start(&client, target(), Duration::from_secs(30), |v: i32| v, move |v: i32| {
                let _ = tx.send(v);
            })
            .unwrap();
        rx.recv_timeout(Duration::from_secs(1)).unwrap();

        let start = Instant::now();
        poller.shutdown().unwrap();
        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(poller.state(), PollState::Stopped);
    }

    #[test]
    fn test_drop_stops_session() {
        let (service, client) = client();
        let poller = PollingLoop::new();

        poller
            .start(&client, target(), Duration::from_millis(10), |v: i32| v, |_: i32| {})
            .unwrap();
        thread::sleep(Duration::from_millis(50));
        drop(poller);

        thread::sleep(Duration::from_millis(50));
        let settled = service.get_count();
        thread::sleep(Duration::from_millis(100));
        assert_eq!(service.get_count(), settled);
    }

    #[test]
    fn test_stats_track_errors_and_recovery() {
        let (service, client) = client();
        service.fail_next_gets(3);
        let poller = PollingLoop::new();
        let (tx, rx) = mpsc::channel();

        poller
            .start(&client, target(), Duration::from_millis(5), |v: i32| v, move |v: i32| {
                let _ = tx.send(v);
            })
            .unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), 33);
        poller.shutdown().unwrap();

        let stats = poller.stats().unwrap();
        assert_eq!(stats.error_count, 3);
        assert_eq!(stats.consecutive_errors, 0);
        assert!(stats.delivered_count >= 1);
        assert!(stats.poll_count >= 4);
        assert!(stats.last_error.as_deref().unwrap().contains("injected read failure"));
        assert_eq!(stats.state, PollState::Stopped);
        assert!(stats.to_string().contains("errors 3"));
    }
}
