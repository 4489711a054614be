//! Runs, pipelines and the payloads the remote service hands back.

use chrono::{DateTime, Utc};

// ── Shared formatting helpers ──

/// Format a duration in seconds into a human-readable string (e.g. "2m 5s").
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}

/// Relative time for the last 24 hours, absolute date beyond that. `-` when unknown.
pub fn format_timestamp(ts: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = ts else {
        return "-".to_string();
    };
    let ago = now.signed_duration_since(ts);
    if ago.num_seconds() >= 0 && ago.num_hours() < 24 {
        if ago.num_hours() > 0 {
            format!("{}h ago", ago.num_hours())
        } else if ago.num_minutes() > 0 {
            format!("{}m ago", ago.num_minutes())
        } else {
            format!("{}s ago", ago.num_seconds().max(1))
        }
    } else {
        ts.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// Unicode-width-aware truncation with ellipsis.
/// Returns `""` when `max_width` is 0.
pub fn truncate(s: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthStr;
    if max_width == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(s) <= max_width {
        s.to_string()
    } else {
        let mut result = String::new();
        let mut width = 0;
        for c in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
            if width + cw + 1 > max_width {
                result.push('\u{2026}');
                break;
            }
            result.push(c);
            width += cw;
        }
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Queued,
    NotStarted,
    Managed,
    Starting,
    Started,
    Success,
    Failure,
    Canceling,
    Canceled,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::Queued | Self::NotStarted | Self::Managed | Self::Starting | Self::Started | Self::Canceling
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::NotStarted => "NOT_STARTED",
            Self::Managed => "MANAGED",
            Self::Starting => "STARTING",
            Self::Started => "STARTED",
            Self::Success => "SUCCESS",
            Self::Failure => "FAILURE",
            Self::Canceling => "CANCELING",
            Self::Canceled => "CANCELED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub run_id: String,
    pub pipeline_name: String,
    pub status: RunStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Run {
    /// `Running` while started without an end, `-` if it never started.
    pub fn duration(&self, now: DateTime<Utc>) -> String {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => format_duration(end.signed_duration_since(start).num_seconds()),
            (Some(start), None) if self.status.is_active() => {
                format!("{} (running)", format_duration(now.signed_duration_since(start).num_seconds()))
            }
            _ => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunDetail {
    pub run: Run,
    pub mode: Option<String>,
    pub tags: Vec<(String, String)>,
    pub run_config_yaml: String,
}

impl RunDetail {
    /// Scrollable part of the run detail pane: tags, then the run config.
    pub fn body(&self) -> Vec<String> {
        let mut lines = vec!["Tags:".to_string()];
        if self.tags.is_empty() {
            lines.push("  (none)".to_string());
        } else {
            lines.extend(self.tags.iter().map(|(k, v)| format!("  {k} = {v}")));
        }
        lines.push(String::new());
        lines.push("Run config:".to_string());
        if self.run_config_yaml.trim().is_empty() {
            lines.push("  (empty)".to_string());
        } else {
            lines.extend(self.run_config_yaml.lines().map(|l| format!("  {l}")));
        }
        lines
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub name: String,
    pub repository: String,
    pub location: String,
    pub last_run_status: Option<RunStatus>,
}

/// A pipeline together with its most recent runs (bounded by the runs limit).
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDetail {
    pub name: String,
    pub runs: Vec<Run>,
}

/// Row in a list view.
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Run(Run),
    Pipeline(Pipeline),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Self::Run(r) => &r.run_id,
            Self::Pipeline(p) => &p.name,
        }
    }

    /// Text the fuzzy filter matches against (alongside `id`).
    pub fn label(&self) -> &str {
        match self {
            Self::Run(r) => &r.pipeline_name,
            Self::Pipeline(p) => &p.name,
        }
    }

    pub fn status(&self) -> Option<RunStatus> {
        match self {
            Self::Run(r) => Some(r.status),
            Self::Pipeline(p) => p.last_run_status,
        }
    }
}

/// Payload backing a detail pane.
#[derive(Debug, Clone, PartialEq)]
pub enum Detail {
    Run(RunDetail),
    Pipeline(PipelineDetail),
}

/// What a single fetch produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Runs(Vec<Run>),
    Pipelines(Vec<Pipeline>),
    RunDetail(RunDetail),
    PipelineDetail(PipelineDetail),
}

impl Payload {
    /// Split into list rows and an optional detail payload. A pipeline detail
    /// exposes its runs as rows so they can be filtered and drilled into.
    pub fn into_parts(self) -> (Vec<Item>, Option<Detail>) {
        match self {
            Self::Runs(runs) => (runs.into_iter().map(Item::Run).collect(), None),
            Self::Pipelines(pipelines) => (pipelines.into_iter().map(Item::Pipeline).collect(), None),
            Self::RunDetail(detail) => (Vec::new(), Some(Detail::Run(detail))),
            Self::PipelineDetail(detail) => {
                let items = detail.runs.iter().cloned().map(Item::Run).collect();
                (items, Some(Detail::Pipeline(detail)))
            }
        }
    }
}
