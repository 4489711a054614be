//! View variants, the per-view frame, and how often each kind polls.

use crate::filter::FilterState;
use crate::model::Item;
use std::fmt;
use std::time::Duration;

/// List views change the most; 3s keeps run status transitions visible.
pub const LIST_POLL_INTERVAL: Duration = Duration::from_secs(3);
/// Run configs and tags rarely change once a run starts.
pub const DETAIL_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Identity of one pushed view. Handed out monotonically and never reused, so a
/// late completion for a popped view can never land on a newer one of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewKey(pub u64);

impl fmt::Display for ViewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    RunsList,
    PipelinesList,
    RunDetail(String),
    PipelineDetail(String),
    ContextManager,
    CommandOverlay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    List,
    Detail,
    Local,
}

impl View {
    pub fn kind(&self) -> ViewKind {
        match self {
            Self::RunsList | Self::PipelinesList | Self::PipelineDetail(_) => ViewKind::List,
            Self::RunDetail(_) => ViewKind::Detail,
            Self::ContextManager | Self::CommandOverlay => ViewKind::Local,
        }
    }

    /// Whether this view is backed by a remote resource.
    pub fn polls(&self) -> bool {
        self.kind() != ViewKind::Local
    }

    /// Whether the `/` filter applies.
    pub fn filterable(&self) -> bool {
        matches!(self, Self::RunsList | Self::PipelinesList | Self::PipelineDetail(_))
    }

    pub fn title(&self) -> String {
        match self {
            Self::RunsList => "Runs".to_string(),
            Self::PipelinesList => "Pipelines".to_string(),
            Self::RunDetail(id) => format!("Run {id}"),
            Self::PipelineDetail(name) => format!("Pipeline {name}"),
            Self::ContextManager => "Contexts".to_string(),
            Self::CommandOverlay => "Command".to_string(),
        }
    }
}

/// Base poll interval per view kind. `None` for views that never poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub list: Duration,
    pub detail: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            list: LIST_POLL_INTERVAL,
            detail: DETAIL_POLL_INTERVAL,
        }
    }
}

impl PollPolicy {
    pub fn interval_for(&self, view: &View) -> Option<Duration> {
        match view.kind() {
            ViewKind::List => Some(self.list),
            ViewKind::Detail => Some(self.detail),
            ViewKind::Local => None,
        }
    }
}

/// One entry of the view stack. Owns everything about the view except its data,
/// which lives in the cache under `key`.
#[derive(Debug, Clone)]
pub struct ViewFrame {
    pub key: ViewKey,
    pub view: View,
    pub cursor: usize,
    pub scroll: usize,
    pub hscroll: usize,
    pub filter: FilterState,
    /// Display order as indices into the cache entry's items (after filtering).
    pub visible: Vec<usize>,
}

impl ViewFrame {
    pub fn new(key: ViewKey, view: View) -> Self {
        Self {
            key,
            view,
            cursor: 0,
            scroll: 0,
            hscroll: 0,
            filter: FilterState::default(),
            visible: Vec::new(),
        }
    }

    /// Re-run the filter against fresh items and keep the cursor in range.
    pub fn refilter(&mut self, items: &[Item]) {
        self.visible = self.filter.apply(items);
        self.clamp_cursor(self.visible.len());
    }

    pub fn clamp_cursor(&mut self, len: usize) {
        if len == 0 {
            self.cursor = 0;
        } else if self.cursor >= len {
            self.cursor = len - 1;
        }
    }

    /// Cache index of the row under the cursor.
    pub fn selected_index(&self) -> Option<usize> {
        self.visible.get(self.cursor).copied()
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self, len: usize) {
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    pub fn move_top(&mut self) {
        self.cursor = 0;
        self.scroll = 0;
    }

    pub fn move_bottom(&mut self, len: usize) {
        self.cursor = len.saturating_sub(1);
    }
}
