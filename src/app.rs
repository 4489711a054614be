//! Application state: the view stack and everything the control loop mutates.
//!
//! `AppState` is owned by the single control loop. Background work (poll timers,
//! fetches, terminal input) only ever talks to it through `AppEvent`s, so nothing
//! here is shared or locked.

use crate::cache::{CacheEntry, ViewCache, WriteOutcome};
use crate::client::FetchRequest;
use crate::command::{self, Command};
use crate::config::ConfigFile;
use crate::context::{Context, ContextStore};
use crate::error::ErrorKind;
use crate::input::{self, Action, InputContext, InputMode};
use crate::model::{Detail, Item, Payload};
use crate::scheduler::PollScheduler;
use crate::view::{PollPolicy, View, ViewFrame, ViewKey};
use chrono::Utc;
use crossterm::event::KeyEvent;
use std::path::PathBuf;
use std::time::Instant;

// UI constants
pub const SPINNER_FRAME_COUNT: usize = 10;
pub const STATUS_TTL_SECS: u64 = 10;
pub const NARROW_WIDTH_THRESHOLD: u16 = 80;

#[derive(Debug, Clone)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
    pub at: Instant,
}

pub struct AppState {
    stack: Vec<ViewFrame>,
    pub cache: ViewCache,
    pub contexts: ContextStore,
    pub scheduler: PollScheduler,
    pub policy: PollPolicy,
    /// Where context changes are saved. `None` disables persistence.
    pub config_path: Option<PathBuf>,
    pub mode: InputMode,
    /// Command line or context form text being typed.
    pub input: String,
    pub status: Option<StatusMessage>,
    pub should_quit: bool,
    pub spinner_frame: usize,
    pub version_string: String,
    next_key: u64,
}

impl AppState {
    /// Builds the state and pushes the root runs list, which starts polling.
    /// Must be called inside a tokio runtime.
    pub fn new(
        contexts: ContextStore,
        scheduler: PollScheduler,
        policy: PollPolicy,
        config_path: Option<PathBuf>,
    ) -> Self {
        let mut state = Self {
            stack: Vec::new(),
            cache: ViewCache::new(),
            contexts,
            scheduler,
            policy,
            config_path,
            mode: InputMode::Normal,
            input: String::new(),
            status: None,
            should_quit: false,
            spinner_frame: 0,
            version_string: format!("plw v{}", env!("CARGO_PKG_VERSION")),
            next_key: 0,
        };
        state.push(View::RunsList);
        state
    }

    // ── View stack ──

    pub fn stack(&self) -> &[ViewFrame] {
        &self.stack
    }

    /// The visible view. The stack always holds at least the root.
    pub fn current(&self) -> &ViewFrame {
        &self.stack[self.stack.len() - 1]
    }

    fn current_mut(&mut self) -> &mut ViewFrame {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    pub fn at_root(&self) -> bool {
        self.stack.len() <= 1
    }

    pub fn entry(&self, key: ViewKey) -> Option<&CacheEntry> {
        self.cache.get(key)
    }

    pub fn current_entry(&self) -> Option<&CacheEntry> {
        self.cache.get(self.current().key)
    }

    pub fn push(&mut self, view: View) -> ViewKey {
        if let Some(top) = self.stack.last() {
            self.scheduler.suspend(top.key);
        }

        self.next_key += 1;
        let key = ViewKey(self.next_key);
        self.cache.insert(key);

        if let (Some(interval), Some(request)) = (self.policy.interval_for(&view), FetchRequest::for_view(&view)) {
            self.scheduler.start(key, interval, request, self.contexts.active());
            self.scheduler.tick(key, &mut self.cache);
        }

        tracing::debug!("push {key} {view:?} (depth {})", self.stack.len() + 1);
        self.stack.push(ViewFrame::new(key, view));
        key
    }

    /// Drop the top view, its timer, its fetch and its cache entry, then wake the
    /// view underneath.
    pub fn pop(&mut self) -> Result<ViewKey, ErrorKind> {
        if self.at_root() {
            tracing::error!("pop on root view refused");
            return Err(ErrorKind::EmptyStack);
        }
        let Some(frame) = self.stack.pop() else {
            return Err(ErrorKind::EmptyStack);
        };
        self.scheduler.stop(frame.key);
        self.cache.remove(frame.key);
        tracing::debug!("pop {} {:?}", frame.key, frame.view);

        let exposed = self.current().key;
        self.scheduler.resume(exposed);
        self.scheduler.tick(exposed, &mut self.cache);
        Ok(frame.key)
    }

    /// Push `view` unless it is already on top.
    fn show(&mut self, view: View) {
        if self.current().view != view {
            self.push(view);
        }
    }

    /// Stop every timer and fetch, drop every view and cache entry, and push a
    /// fresh root. The stack is never left empty.
    fn rebuild(&mut self) {
        self.scheduler.stop_all();
        self.cache.clear();
        self.stack.clear();
        self.mode = InputMode::Normal;
        self.input.clear();
        self.push(View::RunsList);
    }

    // ── Contexts ──

    /// Validate first, then tear down and rebuild against the new endpoint.
    pub fn switch_context(&mut self, name: &str) -> Result<(), ErrorKind> {
        self.contexts.switch_to(name)?;
        tracing::debug!("switched to context {name}");
        self.rebuild();
        self.persist();
        self.set_status(format!("Switched to context '{name}'"));
        Ok(())
    }

    pub fn set_adhoc_url(&mut self, url: &str) -> Result<(), ErrorKind> {
        self.contexts.set_adhoc_url(url)?;
        tracing::debug!("ad-hoc url {url}");
        self.rebuild();
        self.set_status(format!("Watching {url}"));
        Ok(())
    }

    pub fn add_context(&mut self, ctx: Context) -> Result<(), ErrorKind> {
        let name = ctx.name.clone();
        self.contexts.add(ctx)?;
        self.persist();
        self.set_status(format!("Added context '{name}'"));
        Ok(())
    }

    pub fn delete_context(&mut self, name: &str) -> Result<(), ErrorKind> {
        self.contexts.remove(name)?;
        self.persist();
        let len = self.contexts.list().len();
        self.current_mut().clamp_cursor(len);
        self.set_status(format!("Deleted context '{name}'"));
        Ok(())
    }

    fn persist(&mut self) {
        let Some(path) = self.config_path.clone() else {
            return;
        };
        if let Err(e) = ConfigFile::from_store(&self.contexts).save(&path) {
            tracing::warn!("config save failed: {e}");
            self.set_error(format!("Failed to save config: {e}"));
        }
    }

    // ── Status line ──

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = (self.spinner_frame + 1) % SPINNER_FRAME_COUNT;
    }

    pub fn set_status(&mut self, text: String) {
        self.status = Some(StatusMessage {
            text,
            is_error: false,
            at: Instant::now(),
        });
    }

    pub fn set_error(&mut self, text: String) {
        self.status = Some(StatusMessage {
            text,
            is_error: true,
            at: Instant::now(),
        });
    }

    pub fn prune_status(&mut self) {
        if let Some(status) = &self.status {
            if status.at.elapsed().as_secs() >= STATUS_TTL_SECS {
                self.status = None;
            }
        }
    }

    fn report(&mut self, err: &ErrorKind) {
        if err.is_transient() {
            self.set_error(err.to_string());
        } else {
            tracing::error!("{err}");
        }
    }

    // ── Events from the scheduler ──

    pub fn on_poll_due(&mut self, key: ViewKey) {
        if key != self.current().key {
            return;
        }
        self.scheduler.tick(key, &mut self.cache);
    }

    pub fn on_fetch_complete(&mut self, key: ViewKey, seq: u64, result: Result<Payload, ErrorKind>) -> WriteOutcome {
        if let Err(e) = &result {
            tracing::debug!("fetch {key} seq={seq} failed: {e}");
        }
        let ok = result.is_ok();
        let outcome = self.cache.complete(key, seq, result, Utc::now());
        match outcome {
            // A discarded result must not move backoff either.
            WriteOutcome::Orphaned | WriteOutcome::Stale => {
                tracing::debug!("fetch {key} seq={seq} discarded ({outcome:?})");
                return outcome;
            }
            WriteOutcome::Applied => {}
        }
        self.scheduler.finish(key, seq, ok);

        if let (Some(frame), Some(entry)) = (
            self.stack.iter_mut().find(|f| f.key == key),
            self.cache.get(key),
        ) {
            frame.refilter(&entry.items);
        }
        outcome
    }

    // ── Input ──

    pub fn input_context(&self) -> InputContext {
        let top = self.current();
        InputContext {
            mode: self.mode,
            view: top.view.clone(),
            at_root: self.at_root(),
            has_filter: top.filter.is_active() && !top.filter.editing,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        let action = input::map_key(key, &self.input_context());
        self.handle_action(action);
    }

    pub fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::Pop => {
                if let Err(e) = self.pop() {
                    self.report(&e);
                }
            }
            Action::MoveUp => self.move_up(),
            Action::MoveDown => self.move_down(),
            Action::MoveTop => self.current_mut().move_top(),
            Action::MoveBottom => {
                let len = self.current_len();
                let frame = self.current_mut();
                if matches!(frame.view, View::RunDetail(_)) {
                    frame.scroll = len.saturating_sub(1);
                } else {
                    frame.move_bottom(len);
                }
            }
            Action::ScrollLeft => {
                let frame = self.current_mut();
                frame.hscroll = frame.hscroll.saturating_sub(HSCROLL_STEP);
            }
            Action::ScrollRight => {
                let max = self.current_detail_width();
                let frame = self.current_mut();
                frame.hscroll = (frame.hscroll + HSCROLL_STEP).min(max);
            }
            Action::Select => self.select(),
            Action::Refresh => self.refresh(),
            Action::StartFilter => {
                self.current_mut().filter.editing = true;
                self.mode = InputMode::Filter;
            }
            Action::ClearFilter => {
                self.current_mut().filter.clear();
                self.refilter_current();
            }
            Action::StartCommand => {
                self.push(View::CommandOverlay);
                self.mode = InputMode::Command;
                self.input.clear();
            }
            Action::AddContext => {
                self.mode = InputMode::ContextForm;
                self.input.clear();
            }
            Action::DeleteContext => {
                if let Some(name) = self.selected_context_name() {
                    if let Err(e) = self.delete_context(&name) {
                        self.report(&e);
                    }
                }
            }
            Action::InputChar(c) => self.input_char(c),
            Action::InputBackspace => self.input_backspace(),
            Action::InputSubmit => self.input_submit(),
            Action::InputCancel => self.input_cancel(),
            Action::None => {}
        }
    }

    pub fn run_command(&mut self, cmd: Command) -> Result<(), ErrorKind> {
        tracing::debug!("command {cmd:?}");
        match cmd {
            Command::Runs => self.show(View::RunsList),
            Command::Pipelines => self.show(View::PipelinesList),
            Command::Contexts => self.show(View::ContextManager),
            Command::Context(name) => self.switch_context(&name)?,
            Command::Url(url) => self.set_adhoc_url(&url)?,
            Command::Quit => self.should_quit = true,
        }
        Ok(())
    }

    /// Abort whatever the visible view is fetching and fetch again now.
    pub fn refresh(&mut self) {
        let key = self.current().key;
        if !self.scheduler.is_running(key) {
            return;
        }
        self.scheduler.cancel_fetch(key, &mut self.cache);
        self.scheduler.tick(key, &mut self.cache);
    }

    fn refilter_current(&mut self) {
        let key = self.current().key;
        let last = self.stack.len() - 1;
        if let Some(entry) = self.cache.get(key) {
            self.stack[last].refilter(&entry.items);
        }
    }

    /// Rows (or scrollable lines) in the visible view.
    fn current_len(&self) -> usize {
        let frame = self.current();
        match &frame.view {
            View::ContextManager => self.contexts.list().len(),
            View::RunDetail(_) => match self.current_entry().and_then(|e| e.detail.as_ref()) {
                Some(Detail::Run(detail)) => detail.body().len(),
                _ => 0,
            },
            View::CommandOverlay => 0,
            _ => frame.visible.len(),
        }
    }

    fn current_detail_width(&self) -> usize {
        match self.current_entry().and_then(|e| e.detail.as_ref()) {
            Some(Detail::Run(detail)) => detail
                .body()
                .iter()
                .map(|l| unicode_width::UnicodeWidthStr::width(l.as_str()))
                .max()
                .unwrap_or(0),
            _ => 0,
        }
    }

    fn move_up(&mut self) {
        let frame = self.current_mut();
        if matches!(frame.view, View::RunDetail(_)) {
            frame.scroll = frame.scroll.saturating_sub(1);
        } else {
            frame.move_up();
        }
    }

    fn move_down(&mut self) {
        let len = self.current_len();
        let frame = self.current_mut();
        if matches!(frame.view, View::RunDetail(_)) {
            if frame.scroll + 1 < len {
                frame.scroll += 1;
            }
        } else {
            frame.move_down(len);
        }
    }

    pub fn selected_item(&self) -> Option<&Item> {
        let idx = self.current().selected_index()?;
        self.current_entry()?.items.get(idx)
    }

    fn selected_context_name(&self) -> Option<String> {
        if self.current().view != View::ContextManager {
            return None;
        }
        self.contexts
            .list()
            .get(self.current().cursor)
            .map(|c| c.name.clone())
    }

    fn select(&mut self) {
        if self.current().view == View::ContextManager {
            if let Some(name) = self.selected_context_name() {
                if let Err(e) = self.switch_context(&name) {
                    self.report(&e);
                }
            }
            return;
        }
        let next = match self.selected_item() {
            Some(Item::Run(run)) => View::RunDetail(run.run_id.clone()),
            Some(Item::Pipeline(p)) => View::PipelineDetail(p.name.clone()),
            None => return,
        };
        self.push(next);
    }

    fn input_char(&mut self, c: char) {
        match self.mode {
            InputMode::Filter => {
                self.current_mut().filter.query.push(c);
                self.refilter_current();
            }
            InputMode::Command | InputMode::ContextForm => self.input.push(c),
            InputMode::Normal => {}
        }
    }

    fn input_backspace(&mut self) {
        match self.mode {
            InputMode::Filter => {
                if self.current().filter.query.is_empty() {
                    self.current_mut().filter.editing = false;
                    self.mode = InputMode::Normal;
                } else {
                    self.current_mut().filter.query.pop();
                    self.refilter_current();
                }
            }
            InputMode::Command => {
                if self.input.pop().is_none() {
                    self.close_command();
                }
            }
            InputMode::ContextForm => {
                if self.input.pop().is_none() {
                    self.mode = InputMode::Normal;
                }
            }
            InputMode::Normal => {}
        }
    }

    fn input_submit(&mut self) {
        match self.mode {
            InputMode::Filter => {
                self.current_mut().filter.editing = false;
                self.mode = InputMode::Normal;
            }
            InputMode::Command => {
                let text = std::mem::take(&mut self.input);
                self.close_command();
                let result = command::parse(&text).and_then(|cmd| self.run_command(cmd));
                if let Err(e) = result {
                    self.report(&e);
                }
            }
            InputMode::ContextForm => {
                let text = std::mem::take(&mut self.input);
                self.mode = InputMode::Normal;
                let result = Context::parse_form(&text).and_then(|ctx| self.add_context(ctx));
                if let Err(e) = result {
                    self.report(&e);
                }
            }
            InputMode::Normal => {}
        }
    }

    fn input_cancel(&mut self) {
        match self.mode {
            InputMode::Filter => {
                self.current_mut().filter.clear();
                self.refilter_current();
                self.mode = InputMode::Normal;
            }
            InputMode::Command => {
                self.input.clear();
                self.close_command();
            }
            InputMode::ContextForm => {
                self.input.clear();
                self.mode = InputMode::Normal;
            }
            InputMode::Normal => {}
        }
    }

    fn close_command(&mut self) {
        self.mode = InputMode::Normal;
        if self.current().view == View::CommandOverlay {
            if let Err(e) = self.pop() {
                self.report(&e);
            }
        }
    }
}

/// Columns moved per `h`/`l` press.
const HSCROLL_STEP: usize = 4;
