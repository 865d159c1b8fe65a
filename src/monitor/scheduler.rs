//! Poll scheduler worker.
//!
//! This module runs a [`MonitorSession`] on a dedicated timer thread and
//! forwards each tick's events to a bounded per-session stream. Forwarding
//! uses non-blocking `try_send`: a slow consumer drops events rather than
//! stalling the poll loop, and the drop count is observable on the handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::debug;

use crate::broker::session::BrokerSession;
use crate::error::{ScopeError, ScopeResult, StreamError};

use super::engine::{MonitorSession, StopHandle};
use super::events::{MonitorEvent, SessionId, SessionStatus};

#[allow(missing_docs)]
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between consecutive poll ticks.
    pub poll_interval: Duration,
    /// Per-session event stream buffer capacity.
    pub stream_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            stream_capacity: 1024,
        }
    }
}

/// Control handle for a scheduled session.
///
/// `stop` sets the session's own stop flag and wakes the worker. The flag
/// is the same one `poll_tick` checks before each destination, so a stop
/// lands within one in-flight browse latency and the interrupted tick's
/// results are discarded.
#[derive(Debug)]
pub struct MonitorHandle {
    session_id: SessionId,
    stop: StopHandle,
    wake_tx: Sender<()>,
    dropped_events: Arc<AtomicU64>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorHandle {
    /// The session this handle controls.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Requests a stop. Idempotent and non-blocking.
    pub fn stop(&self) {
        self.stop.request_stop();
        let _ = self.wake_tx.try_send(());
    }

    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stop.is_stop_requested()
    }

    /// Number of events dropped because the stream buffer was full.
    #[must_use]
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }

    /// Waits for the worker thread to exit. Call `stop` first, or this
    /// blocks until the stream side disconnects.
    pub fn join(&self) {
        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                let _ = handle.join();
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        // Request the stop, then detach. Joining here could block a caller
        // that still holds the stream; the worker exits on its own once it
        // observes the flag.
        self.stop();
        if let Ok(mut guard) = self.join.lock() {
            if let Some(handle) = guard.take() {
                drop(handle);
            }
        }
    }
}

/// A consumer stream of monitor events for one session.
///
/// Dropping this stream requests a best-effort stop of the session.
#[derive(Debug)]
pub struct EventStream {
    session_id: SessionId,
    rx: Receiver<MonitorEvent>,
    stop: StopHandle,
    wake_tx: Sender<()>,
}

impl EventStream {
    /// The session this stream belongs to.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Receive the next event (blocking).
    pub fn recv(&self) -> ScopeResult<MonitorEvent> {
        self.rx.recv().map_err(|_| {
            ScopeError::Stream(StreamError::Disconnected {
                path: "monitor_stream".to_string(),
            })
        })
    }

    /// Receive the next event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> ScopeResult<MonitorEvent> {
        self.rx.recv_timeout(timeout).map_err(|err| match err {
            RecvTimeoutError::Timeout => ScopeError::Stream(StreamError::Timeout {
                duration_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
            }),
            RecvTimeoutError::Disconnected => ScopeError::Stream(StreamError::Disconnected {
                path: "monitor_stream".to_string(),
            }),
        })
    }

    /// Non-blocking receive of any already-queued event.
    pub fn try_recv(&self) -> Option<MonitorEvent> {
        self.rx.try_recv().ok()
    }

    /// Best-effort explicit stop of the backing session.
    ///
    /// Non-blocking and idempotent. Events already queued remain readable
    /// until the stream disconnects.
    pub fn stop(&self) {
        self.stop.request_stop();
        let _ = self.wake_tx.try_send(());
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        // Best-effort: do not block on shutdown.
        self.stop.request_stop();
        let _ = self.wake_tx.try_send(());
    }
}

#[allow(missing_docs)]
#[derive(Debug)]
pub struct MonitorRegistration {
    pub handle: MonitorHandle,
    pub stream: EventStream,
}

/// Starts polling a session on a dedicated worker thread.
///
/// The session must be freshly created (running); the returned handle and
/// stream share its stop flag with the worker.
pub fn start_monitor(
    mut session: MonitorSession,
    broker: Arc<dyn BrokerSession>,
    config: SchedulerConfig,
) -> MonitorRegistration {
    let session_id = session.id();
    let stop = session.stop_handle();
    let dropped_events = Arc::new(AtomicU64::new(0));

    let (event_tx, event_rx) = bounded::<MonitorEvent>(config.stream_capacity.max(1));
    // Wake channel so `stop` interrupts the inter-tick sleep immediately.
    let (wake_tx, wake_rx) = bounded::<()>(1);

    let worker_dropped = Arc::clone(&dropped_events);
    let poll_interval = config.poll_interval;
    let join = thread::Builder::new()
        .name("queuescope-monitor".to_string())
        .spawn(move || {
            worker_loop(
                &mut session,
                &*broker,
                poll_interval,
                &worker_dropped,
                &event_tx,
                &wake_rx,
            );
        })
        .expect("failed to spawn queuescope monitor worker");

    MonitorRegistration {
        handle: MonitorHandle {
            session_id,
            stop: stop.clone(),
            wake_tx: wake_tx.clone(),
            dropped_events,
            join: Mutex::new(Some(join)),
        },
        stream: EventStream {
            session_id,
            rx: event_rx,
            stop,
            wake_tx,
        },
    }
}

fn worker_loop(
    session: &mut MonitorSession,
    broker: &dyn BrokerSession,
    poll_interval: Duration,
    dropped_events: &AtomicU64,
    event_tx: &Sender<MonitorEvent>,
    wake_rx: &Receiver<()>,
) {
    let stop = session.stop_handle();
    loop {
        if stop.is_stop_requested() {
            break;
        }

        // A stop landing mid-tick makes `poll_tick` discard the tick and
        // return nothing, so a partial tick never reaches the stream.
        let events = session.poll_tick(broker);

        for event in events {
            // Never block the poll thread: drop if the consumer is slow.
            match event_tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    dropped_events.fetch_add(1, Ordering::Relaxed);
                }
                Err(TrySendError::Disconnected(_)) => {
                    stop.request_stop();
                    debug!(session_id = %session.id(), "stream consumer gone, stopping session");
                    return;
                }
            }
        }

        // The session can also stop itself (connection loss); its final
        // failure events were just forwarded.
        if session.status() == SessionStatus::Stopped {
            debug!(session_id = %session.id(), "session stopped, worker exiting");
            break;
        }

        match wake_rx.recv_timeout(poll_interval) {
            // Woken by `stop`, or all handles dropped. Loop once more so
            // the flag check decides.
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {}
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.poll_interval, Duration::from_millis(500));
        assert_eq!(cfg.stream_capacity, 1024);
    }
}
