//! Per-view poll timers and the fetches they trigger.
//!
//! Each started view gets one tokio task that sleeps for the view's current interval
//! and posts [`AppEvent::PollDue`]. The interval and the suspended flag live in a
//! `watch` channel, so backoff changes and suspend/resume take effect without
//! restarting the task. Timers never fetch on their own: the control loop answers
//! `PollDue` by calling [`PollScheduler::tick`], which owns the one-in-flight rule.
//!
//! On consecutive failures the interval grows as `base × 2^failures`, capped at
//! `MAX_BACKOFF_MULTIPLIER × base`, and drops back to `base` after a success.

use crate::cache::ViewCache;
use crate::client::{self, FetchRequest, RemoteClient};
use crate::context::Context;
use crate::error::ErrorKind;
use crate::events::AppEvent;
use crate::view::ViewKey;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time;

/// A failing endpoint is retried at most every 8 base intervals (24s for lists).
pub const MAX_BACKOFF_MULTIPLIER: u32 = 8;

/// Compute the backed-off interval: `base × min(2^failures, MAX_BACKOFF_MULTIPLIER)`.
pub fn backoff_interval(base: Duration, failures: u32) -> Duration {
    let multiplier = 1u32
        .checked_shl(failures)
        .unwrap_or(u32::MAX)
        .min(MAX_BACKOFF_MULTIPLIER);
    base.saturating_mul(multiplier)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimerControl {
    interval: Duration,
    suspended: bool,
}

struct Timer {
    base: Duration,
    failures: u32,
    control: watch::Sender<TimerControl>,
    task: JoinHandle<()>,
    fetch: Option<(u64, AbortHandle)>,
    endpoint: Context,
    request: FetchRequest,
}

impl Timer {
    fn control(&self) -> TimerControl {
        *self.control.borrow()
    }

    fn abort(&mut self) {
        self.task.abort();
        if let Some((_, fetch)) = self.fetch.take() {
            fetch.abort();
        }
    }
}

/// Snapshot of one timer, for the header and for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    pub base: Duration,
    pub interval: Duration,
    pub failures: u32,
    pub suspended: bool,
    pub fetch_in_flight: bool,
    pub endpoint: Context,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Started(u64),
    /// The previous fetch for this view has not come back yet.
    SkippedInFlight,
    /// No timer, timer suspended, or no cache entry.
    Inactive,
}

pub struct PollScheduler {
    client: Arc<dyn RemoteClient>,
    tx: mpsc::UnboundedSender<AppEvent>,
    fetch_timeout: Duration,
    timers: HashMap<ViewKey, Timer>,
}

impl PollScheduler {
    pub fn new(
        client: Arc<dyn RemoteClient>,
        tx: mpsc::UnboundedSender<AppEvent>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            client,
            tx,
            fetch_timeout,
            timers: HashMap::new(),
        }
    }

    /// Start a recurring timer for `key`. Restarting an existing key replaces it.
    pub fn start(&mut self, key: ViewKey, interval: Duration, request: FetchRequest, endpoint: Context) {
        self.stop(key);
        let (control, control_rx) = watch::channel(TimerControl {
            interval,
            suspended: false,
        });
        let task = tokio::spawn(run_timer(key, control_rx, self.tx.clone()));
        tracing::debug!("timer {key} started: {request:?} every {interval:?} against {}", endpoint.url);
        self.timers.insert(
            key,
            Timer {
                base: interval,
                failures: 0,
                control,
                task,
                fetch: None,
                endpoint,
                request,
            },
        );
    }

    /// Stop the timer and abort its in-flight fetch, if any.
    pub fn stop(&mut self, key: ViewKey) {
        if let Some(mut timer) = self.timers.remove(&key) {
            timer.abort();
            tracing::debug!("timer {key} stopped");
        }
    }

    pub fn stop_all(&mut self) {
        for (_, mut timer) in self.timers.drain() {
            timer.abort();
        }
    }

    pub fn suspend(&mut self, key: ViewKey) {
        if let Some(timer) = self.timers.get(&key) {
            timer.control.send_modify(|c| c.suspended = true);
        }
    }

    pub fn resume(&mut self, key: ViewKey) {
        if let Some(timer) = self.timers.get(&key) {
            timer.control.send_modify(|c| c.suspended = false);
        }
    }

    /// Start a fetch for `key` unless one is already outstanding.
    pub fn tick(&mut self, key: ViewKey, cache: &mut ViewCache) -> TickOutcome {
        let Some(timer) = self.timers.get_mut(&key) else {
            return TickOutcome::Inactive;
        };
        if timer.control().suspended || !cache.contains(key) {
            return TickOutcome::Inactive;
        }
        let Some(seq) = cache.begin_fetch(key) else {
            return TickOutcome::SkippedInFlight;
        };

        let client = Arc::clone(&self.client);
        let endpoint = timer.endpoint.clone();
        let request = timer.request.clone();
        let timeout = self.fetch_timeout;
        let tx = self.tx.clone();
        let work = async move {
            let result = match time::timeout(timeout, client::fetch(client.as_ref(), &endpoint, &request)).await {
                Ok(result) => result,
                Err(_) => Err(ErrorKind::Network(format!(
                    "request to {} timed out after {}s",
                    endpoint.url,
                    timeout.as_secs()
                ))),
            };
            if tx.send(AppEvent::FetchComplete { key, seq, result }).is_err() {
                tracing::warn!("fetch {key}: channel closed");
            }
        };
        let abort = spawn_monitored(self.tx.clone(), key, seq, work);
        timer.fetch = Some((seq, abort));
        tracing::debug!("fetch {key} seq={seq} started");
        TickOutcome::Started(seq)
    }

    /// Abort the outstanding fetch (if any) and release the cache entry so the
    /// next tick can start a fresh one.
    pub fn cancel_fetch(&mut self, key: ViewKey, cache: &mut ViewCache) {
        if let Some(timer) = self.timers.get_mut(&key) {
            if let Some((seq, fetch)) = timer.fetch.take() {
                fetch.abort();
                tracing::debug!("fetch {key} seq={seq} cancelled");
            }
        }
        cache.release(key);
    }

    /// Record a completed fetch and adjust backoff.
    pub fn finish(&mut self, key: ViewKey, seq: u64, ok: bool) {
        let Some(timer) = self.timers.get_mut(&key) else {
            return;
        };
        if timer.fetch.as_ref().is_some_and(|(s, _)| *s == seq) {
            timer.fetch = None;
        }
        timer.failures = if ok { 0 } else { timer.failures.saturating_add(1) };
        let next = backoff_interval(timer.base, timer.failures);
        if next != timer.control().interval {
            tracing::debug!("timer {key} interval now {next:?} after {} failures", timer.failures);
            timer.control.send_modify(|c| c.interval = next);
        }
    }

    pub fn timer_state(&self, key: ViewKey) -> Option<TimerState> {
        self.timers.get(&key).map(|t| {
            let control = t.control();
            TimerState {
                base: t.base,
                interval: control.interval,
                failures: t.failures,
                suspended: control.suspended,
                fetch_in_flight: t.fetch.is_some(),
                endpoint: t.endpoint.clone(),
            }
        })
    }

    pub fn is_running(&self, key: ViewKey) -> bool {
        self.timers.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Endpoints captured by live timers.
    pub fn endpoints(&self) -> Vec<&Context> {
        self.timers.values().map(|t| &t.endpoint).collect()
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn run_timer(key: ViewKey, mut control: watch::Receiver<TimerControl>, tx: mpsc::UnboundedSender<AppEvent>) {
    loop {
        let current = *control.borrow_and_update();
        if current.suspended {
            if control.changed().await.is_err() {
                return;
            }
            continue;
        }
        tokio::select! {
            () = time::sleep(current.interval) => {
                if tx.send(AppEvent::PollDue(key)).is_err() {
                    return;
                }
            }
            changed = control.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// Run a fetch on its own task. If it panics, report a failed completion so the
/// cache entry does not stay in flight forever. Aborting the returned handle
/// cancels the fetch silently.
fn spawn_monitored(
    tx: mpsc::UnboundedSender<AppEvent>,
    key: ViewKey,
    seq: u64,
    fut: impl Future<Output = ()> + Send + 'static,
) -> AbortHandle {
    let handle = tokio::spawn(fut);
    let abort = handle.abort_handle();
    tokio::spawn(async move {
        if let Err(join_err) = handle.await {
            if join_err.is_cancelled() {
                return;
            }
            let msg = match join_err.into_panic().downcast::<String>() {
                Ok(s) => *s,
                Err(payload) => match payload.downcast::<&str>() {
                    Ok(s) => s.to_string(),
                    Err(_) => "unknown panic".to_string(),
                },
            };
            tracing::error!("fetch {key} panicked: {msg}");
            let result = Err(ErrorKind::Network(format!("fetch crashed: {msg}")));
            if tx.send(AppEvent::FetchComplete { key, seq, result }).is_err() {
                tracing::warn!("fetch {key}: channel closed while reporting panic");
            }
        }
    });
    abort
}
