mod fixtures;

use fixtures::*;
use plw::cache::{ViewCache, WriteOutcome};
use plw::client::parser;
use plw::command::Command;
use plw::config::ConfigFile;
use plw::error::ErrorKind;
use plw::filter;
use plw::input::InputMode;
use plw::model::{Item, Payload, RunStatus};
use plw::view::{PollPolicy, View, ViewKey};

use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn press(code: KeyCode) -> KeyEvent {
    KeyEvent {
        code,
        modifiers: KeyModifiers::NONE,
        kind: KeyEventKind::Press,
        state: KeyEventState::NONE,
    }
}

fn type_keys(state: &mut plw::app::AppState, text: &str) {
    for c in text.chars() {
        state.handle_key(press(KeyCode::Char(c)));
    }
}

fn fast_policy() -> PollPolicy {
    PollPolicy {
        list: Duration::from_secs(1),
        detail: Duration::from_secs(1),
    }
}

// ========== Scheduling ==========

#[tokio::test(start_paused = true)]
async fn ticks_faster_than_fetches_never_overlap() {
    let client = Arc::new(MockClient::new(sample_runs()).with_delay(Duration::from_secs(5)));
    let (mut state, mut rx) = harness(client.clone(), two_contexts(), fast_policy());

    for _ in 0..3 {
        next_applied(&mut state, &mut rx).await;
    }

    assert_eq!(client.max_active.load(Ordering::SeqCst), 1);
    // Four ticks per fetch were skipped; only completions start new fetches.
    assert_eq!(client.calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_endpoint_backs_off_and_keeps_rows() {
    let client = Arc::new(MockClient::new(sample_runs()));
    let (mut state, mut rx) = harness(client.clone(), two_contexts(), PollPolicy::default());
    let key = next_applied(&mut state, &mut rx).await;
    assert_eq!(state.entry(key).unwrap().items.len(), 20);

    client.fail.store(true, Ordering::SeqCst);
    next_applied(&mut state, &mut rx).await;
    next_applied(&mut state, &mut rx).await;

    let entry = state.entry(key).unwrap();
    assert!(matches!(entry.last_error, Some(ErrorKind::Network(_))));
    assert_eq!(entry.items.len(), 20);
    let timer = state.scheduler.timer_state(key).unwrap();
    assert_eq!(timer.failures, 2);
    assert_eq!(timer.interval, Duration::from_secs(12));

    client.fail.store(false, Ordering::SeqCst);
    next_applied(&mut state, &mut rx).await;
    assert!(state.entry(key).unwrap().last_error.is_none());
    assert_eq!(state.scheduler.timer_state(key).unwrap().interval, Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn slow_endpoint_times_out_as_network_failure() {
    let client = Arc::new(MockClient::new(sample_runs()).with_delay(Duration::from_secs(60)));
    let (mut state, mut rx) = harness(client.clone(), two_contexts(), PollPolicy::default());
    let key = next_applied(&mut state, &mut rx).await;

    let entry = state.entry(key).unwrap();
    match &entry.last_error {
        Some(ErrorKind::Network(msg)) => assert!(msg.contains("timed out after 10s"), "{msg}"),
        other => panic!("expected a network timeout, got {other:?}"),
    }
    assert!(entry.items.is_empty());
    assert!(!entry.in_flight);
    let timer = state.scheduler.timer_state(key).unwrap();
    assert_eq!(timer.failures, 1);
    assert_eq!(timer.interval, Duration::from_secs(6));
    assert_eq!(client.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn hidden_views_do_not_fetch() {
    let client = Arc::new(MockClient::new(sample_runs()));
    let (mut state, mut rx) = harness(client.clone(), two_contexts(), fast_policy());
    let root = next_applied(&mut state, &mut rx).await;

    state.push(View::RunDetail("run-03".into()));
    for _ in 0..3 {
        let key = next_applied(&mut state, &mut rx).await;
        assert_ne!(key, root);
    }
    assert!(state.scheduler.timer_state(root).unwrap().suspended);
}

// ========== Stale writes ==========

#[test]
fn older_result_cannot_overwrite_newer() {
    let mut cache = ViewCache::new();
    let key = ViewKey(7);
    cache.insert(key);

    let first = cache.begin_fetch(key).unwrap();
    cache.release(key);
    let second = cache.begin_fetch(key).unwrap();
    assert!(second > first);

    let now = Utc::now();
    let newer = Payload::Runs(vec![run("new", "deploy", RunStatus::Started)]);
    let older = Payload::Runs(vec![run("old", "deploy", RunStatus::Success)]);
    assert_eq!(cache.complete(key, second, Ok(newer), now), WriteOutcome::Applied);
    assert_eq!(cache.complete(key, first, Ok(older), now), WriteOutcome::Stale);
    assert_eq!(cache.get(key).unwrap().items[0].id(), "new");
}

#[tokio::test(start_paused = true)]
async fn result_for_popped_view_is_dropped() {
    let client = Arc::new(MockClient::new(sample_runs()).with_delay(Duration::from_secs(60)));
    let (mut state, _rx) = harness(client, two_contexts(), PollPolicy::default());
    let detail = state.push(View::RunDetail("run-01".into()));
    let seq = state.entry(detail).unwrap().pending_seq.unwrap();
    state.pop().unwrap();

    let outcome = state.on_fetch_complete(detail, seq, Ok(Payload::Runs(Vec::new())));
    assert_eq!(outcome, WriteOutcome::Orphaned);
    assert!(state.entry(detail).is_none());
}

// ========== Stack balance ==========

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Pop,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![(0u8..5).prop_map(Op::Push), Just(Op::Pop)]
}

fn view_for(n: u8) -> View {
    match n {
        0 => View::RunsList,
        1 => View::PipelinesList,
        2 => View::RunDetail("run-01".into()),
        3 => View::PipelineDetail("deploy".into()),
        _ => View::ContextManager,
    }
}

proptest! {
    #[test]
    fn stack_push_pop_stays_balanced(ops in prop::collection::vec(op(), 0..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let _guard = rt.enter();
        let client = Arc::new(MockClient::new(Vec::new()));
        let (mut state, _rx) = harness(client, two_contexts(), PollPolicy::default());
        let mut popped: Vec<ViewKey> = Vec::new();

        for op in ops {
            match op {
                Op::Push(n) => {
                    state.push(view_for(n));
                }
                Op::Pop => {
                    let was_root = state.at_root();
                    match state.pop() {
                        Ok(key) => popped.push(key),
                        Err(e) => {
                            prop_assert!(was_root);
                            prop_assert_eq!(e, ErrorKind::EmptyStack);
                        }
                    }
                }
            }

            let stack = state.stack();
            prop_assert!(!stack.is_empty());
            prop_assert_eq!(state.cache.len(), stack.len());
            let polling = stack.iter().filter(|f| f.view.polls()).count();
            prop_assert_eq!(state.scheduler.len(), polling);

            let top = state.current().key;
            for frame in stack {
                prop_assert!(state.entry(frame.key).is_some());
                if let Some(timer) = state.scheduler.timer_state(frame.key) {
                    prop_assert_eq!(timer.suspended, frame.key != top);
                }
            }
            for key in &popped {
                prop_assert!(state.entry(*key).is_none());
                prop_assert!(!state.scheduler.is_running(*key));
            }
        }
    }
}

// ========== Fuzzy filter ==========

#[test]
fn fuzzy_match_is_order_sensitive() {
    assert!(filter::score("ab", "cabbage").is_some());
    assert!(filter::score("ab", "bac").is_none());
}

proptest! {
    #[test]
    fn any_subsequence_matches(
        label in "[a-z_-]{1,20}",
        mask in prop::collection::vec(any::<bool>(), 20),
    ) {
        let query: String = label
            .chars()
            .zip(mask.iter())
            .filter(|(_, keep)| **keep)
            .map(|(c, _)| c)
            .collect();
        prop_assert!(filter::score(&query, &label).is_some());
    }
}

// ========== Contexts ==========

#[tokio::test(start_paused = true)]
async fn context_switch_leaves_nothing_on_old_endpoint() {
    let client = Arc::new(MockClient::new(sample_runs()));
    let (mut state, mut rx) = harness(client.clone(), two_contexts(), PollPolicy::default());
    next_applied(&mut state, &mut rx).await;
    state.run_command(Command::Pipelines).unwrap();
    next_applied(&mut state, &mut rx).await;

    let old_keys: Vec<ViewKey> = state.stack().iter().map(|f| f.key).collect();
    state.switch_context("staging").unwrap();

    assert_eq!(state.stack().len(), 1);
    assert_eq!(state.current().view, View::RunsList);
    assert!(!state.scheduler.endpoints().is_empty());
    for endpoint in state.scheduler.endpoints() {
        assert_eq!(endpoint.url, STAGING_URL);
    }
    for key in &old_keys {
        assert!(state.entry(*key).is_none());
        assert!(!state.scheduler.is_running(*key));
    }
    // A completion from before the switch cannot land on the rebuilt root.
    assert_eq!(
        state.on_fetch_complete(old_keys[0], 1, Ok(Payload::Runs(Vec::new()))),
        WriteOutcome::Orphaned
    );

    let key = next_applied(&mut state, &mut rx).await;
    assert_eq!(key, state.current().key);
    assert_eq!(client.urls().last().map(String::as_str), Some(STAGING_URL));
}

#[tokio::test(start_paused = true)]
async fn adhoc_url_rebuilds_and_switch_drops_it() {
    let client = Arc::new(MockClient::new(sample_runs()));
    let (mut state, mut rx) = harness(client.clone(), two_contexts(), PollPolicy::default());
    state
        .run_command(Command::Url("http://10.0.0.5:3000/graphql".into()))
        .unwrap();
    next_applied(&mut state, &mut rx).await;
    assert_eq!(
        client.urls().last().map(String::as_str),
        Some("http://10.0.0.5:3000/graphql")
    );

    state.switch_context("default").unwrap();
    assert!(state.contexts.adhoc().is_none());
    next_applied(&mut state, &mut rx).await;
    assert_eq!(
        client.urls().last().map(String::as_str),
        Some("http://localhost:3000/graphql")
    );
}

// ========== Wire to view ==========

#[test]
fn graphql_runs_response_feeds_filtered_list() {
    let json = r#"{
        "data": {
            "runsOrError": {
                "__typename": "Runs",
                "results": [
                    {"runId": "a1", "jobName": "deploy", "status": "SUCCESS", "startTime": 1717236000.0, "endTime": 1717236090.5},
                    {"runId": "b2", "jobName": "build-failure-42", "status": "FAILURE", "startTime": 1717236100.0, "endTime": null},
                    {"runId": "c3", "jobName": "nightly_etl", "status": "STARTED", "startTime": null, "endTime": null}
                ]
            }
        }
    }"#;
    let runs = parser::parse_runs(json).expect("parse should succeed");
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[1].status, RunStatus::Failure);

    let (items, _) = Payload::Runs(runs).into_parts();
    let mut filter = filter::FilterState {
        query: "fail".to_string(),
        ..Default::default()
    };
    let visible = filter.apply(&items);
    assert_eq!(visible, vec![1]);
    assert!(matches!(&items[1], Item::Run(r) if r.run_id == "b2"));
}

// ========== End to end ==========

#[tokio::test(start_paused = true)]
async fn watch_filter_and_switch_context() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        format!(
            r#"last_context = "default"

[contexts.default]
url = "http://localhost:3000/graphql"

[contexts.staging]
url = "{STAGING_URL}"
"#
        ),
    )
    .unwrap();

    let contexts = ConfigFile::load(&path).into_store();
    assert_eq!(contexts.active().runs_limit, 20);

    let client = Arc::new(MockClient::new(sample_runs()));
    let (mut state, mut rx) = harness(client.clone(), contexts, PollPolicy::default());
    state.config_path = Some(path.clone());

    // First tick fetches at most 20 runs from the default endpoint.
    let root = next_applied(&mut state, &mut rx).await;
    assert_eq!(state.entry(root).unwrap().items.len(), 20);
    assert_eq!(
        client.seen.lock().unwrap()[0],
        ("http://localhost:3000/graphql".to_string(), 20)
    );

    // `/fail` puts the failing pipeline first.
    state.handle_key(press(KeyCode::Char('/')));
    assert_eq!(state.mode, InputMode::Filter);
    type_keys(&mut state, "fail");
    let first = state.selected_item().expect("a match");
    assert_eq!(first.label(), "build-failure-42");

    // ESC drops the filter.
    state.handle_key(press(KeyCode::Esc));
    assert_eq!(state.mode, InputMode::Normal);
    assert_eq!(state.current().visible.len(), 20);

    // `:context staging` rebuilds the runs list against staging.
    state.handle_key(press(KeyCode::Char(':')));
    assert_eq!(state.current().view, View::CommandOverlay);
    type_keys(&mut state, "context staging");
    state.handle_key(press(KeyCode::Enter));

    assert_eq!(state.contexts.active_name(), "staging");
    assert_eq!(state.stack().len(), 1);
    assert_eq!(state.current().view, View::RunsList);
    assert_ne!(state.current().key, root);

    let key = next_applied(&mut state, &mut rx).await;
    assert_eq!(key, state.current().key);
    assert_eq!(client.urls().last().map(String::as_str), Some(STAGING_URL));

    // The switch was remembered.
    let saved = ConfigFile::load(&path);
    assert_eq!(saved.last_context.as_deref(), Some("staging"));
}
