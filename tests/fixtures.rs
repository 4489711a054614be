#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use plw::app::AppState;
use plw::cache::WriteOutcome;
use plw::client::RemoteClient;
use plw::context::{Context, ContextStore};
use plw::error::ErrorKind;
use plw::events::AppEvent;
use plw::model::{Pipeline, Run, RunDetail, RunStatus};
use plw::scheduler::PollScheduler;
use plw::view::{PollPolicy, ViewKey};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const STAGING_URL: &str = "https://staging.example.com/graphql";

pub fn run(id: &str, pipeline: &str, status: RunStatus) -> Run {
    let started = Utc::now() - ChronoDuration::minutes(5);
    Run {
        run_id: id.to_string(),
        pipeline_name: pipeline.to_string(),
        status,
        started_at: Some(started),
        ended_at: (!status.is_active()).then(|| started + ChronoDuration::seconds(90)),
    }
}

/// 30 runs, newest first, over a handful of pipelines. `run-05` belongs to
/// `build-failure-42`; no other id or pipeline contains "fail" as a subsequence.
pub fn sample_runs() -> Vec<Run> {
    let pipelines = ["deploy", "nightly_etl", "sync_users", "ingest_daily"];
    (0..30)
        .map(|i| {
            if i == 5 {
                run("run-05", "build-failure-42", RunStatus::Failure)
            } else {
                run(&format!("run-{i:02}"), pipelines[i % pipelines.len()], RunStatus::Success)
            }
        })
        .collect()
}

pub fn pipeline(name: &str) -> Pipeline {
    Pipeline {
        name: name.to_string(),
        repository: "repo".to_string(),
        location: "loc".to_string(),
        last_run_status: Some(RunStatus::Success),
    }
}

/// Decrements the active-fetch counter when a fetch finishes or is aborted.
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory server. Records every call's endpoint and tracks how many fetches
/// overlap.
pub struct MockClient {
    pub runs: Vec<Run>,
    pub pipelines: Vec<Pipeline>,
    pub delay: Duration,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
    /// `(url, runs_limit)` per call, in call order.
    pub seen: Mutex<Vec<(String, usize)>>,
}

impl MockClient {
    pub fn new(runs: Vec<Run>) -> Self {
        Self {
            runs,
            pipelines: vec![pipeline("deploy"), pipeline("nightly_etl")],
            delay: Duration::ZERO,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }

    async fn enter(&self, endpoint: &Context) -> Result<ActiveGuard<'_>, ErrorKind> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push((endpoint.url.clone(), endpoint.runs_limit));
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let guard = ActiveGuard(&self.active);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(ErrorKind::Network(format!("connection refused: {}", endpoint.url)));
        }
        Ok(guard)
    }
}

#[async_trait]
impl RemoteClient for MockClient {
    async fn fetch_runs(&self, endpoint: &Context, pipeline: Option<&str>) -> Result<Vec<Run>, ErrorKind> {
        let _guard = self.enter(endpoint).await?;
        Ok(self
            .runs
            .iter()
            .filter(|r| pipeline.map_or(true, |p| r.pipeline_name == p))
            .cloned()
            .collect())
    }

    async fn fetch_pipelines(&self, endpoint: &Context) -> Result<Vec<Pipeline>, ErrorKind> {
        let _guard = self.enter(endpoint).await?;
        Ok(self.pipelines.clone())
    }

    async fn fetch_run_detail(&self, endpoint: &Context, run_id: &str) -> Result<RunDetail, ErrorKind> {
        let _guard = self.enter(endpoint).await?;
        self.runs
            .iter()
            .find(|r| r.run_id == run_id)
            .map(|r| RunDetail {
                run: r.clone(),
                mode: Some("default".to_string()),
                tags: vec![("team".to_string(), "data".to_string())],
                run_config_yaml: "ops:\n  load:\n    config: {}\n".to_string(),
            })
            .ok_or_else(|| ErrorKind::Network(format!("Run {run_id} could not be found.")))
    }
}

pub fn two_contexts() -> ContextStore {
    ContextStore::new(
        vec![
            Context::new("default", "http://localhost:3000/graphql", 20),
            Context::new("staging", STAGING_URL, 20),
        ],
        Some("default"),
    )
}

/// App wired to `client`; the receiver plays the control loop's event channel.
/// Must be called inside a tokio runtime.
pub fn harness(
    client: Arc<MockClient>,
    contexts: ContextStore,
    policy: PollPolicy,
) -> (AppState, mpsc::UnboundedReceiver<AppEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = PollScheduler::new(client, tx, Duration::from_secs(10));
    (AppState::new(contexts, scheduler, policy, None), rx)
}

/// Dispatch events the way the control loop does until a fetch result lands.
pub async fn next_completion(
    state: &mut AppState,
    rx: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> (ViewKey, WriteOutcome) {
    loop {
        match rx.recv().await.expect("event channel closed") {
            AppEvent::PollDue(key) => state.on_poll_due(key),
            AppEvent::FetchComplete { key, seq, result } => {
                return (key, state.on_fetch_complete(key, seq, result));
            }
            AppEvent::Key(key) => state.handle_key(key),
            AppEvent::Tick => state.advance_spinner(),
            AppEvent::Error(msg) => state.set_error(msg),
        }
    }
}

/// Like [`next_completion`] but skips results for views that no longer exist.
pub async fn next_applied(state: &mut AppState, rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> ViewKey {
    loop {
        let (key, outcome) = next_completion(state, rx).await;
        if outcome == WriteOutcome::Applied {
            return key;
        }
    }
}
