use crate::app::AppState;
use crate::cache::CacheEntry;
use crate::model::{format_timestamp, truncate, Item, Pipeline, Run, RunStatus};
use crate::tui::spinner;
use crate::view::{View, ViewFrame};
use chrono::{DateTime, Utc};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

const ID_WIDTH: usize = 8;
const STATUS_WIDTH: usize = 11;
const STARTED_WIDTH: usize = 19;
const DURATION_WIDTH: usize = 18;

/// Runs, pipelines, or the runs of one pipeline.
pub fn render(f: &mut Frame, area: Rect, state: &AppState, frame: &ViewFrame) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;
    let Some(entry) = state.entry(frame.key) else {
        return;
    };

    let area = error_banner(f, area, entry);

    if entry.is_loading() {
        let msg = format!("{} Loading…", spinner::frame(state.spinner_frame));
        let para = Paragraph::new(msg).style(Style::default().fg(Color::Yellow));
        f.render_widget(para, area);
        return;
    }

    if frame.visible.is_empty() {
        let msg = if frame.filter.is_active() {
            format!("No matches for '{}'", frame.filter.query)
        } else if entry.fetched_at.is_none() {
            String::new()
        } else {
            match frame.view {
                View::PipelinesList => "No pipelines found".to_string(),
                _ => "No runs found".to_string(),
            }
        };
        let para = Paragraph::new(msg)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::NONE));
        f.render_widget(para, area);
        return;
    }

    let max_width = area.width as usize;
    let mut lines: Vec<Line> = vec![column_header(&frame.view, narrow, max_width)];

    // Calculate visible window (scroll); one row is the column header
    let visible_height = (area.height as usize).saturating_sub(1);
    let scroll_offset = if frame.cursor >= visible_height {
        frame.cursor - visible_height + 1
    } else {
        0
    };

    let now = Utc::now();
    for (i, &idx) in frame
        .visible
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height)
    {
        let is_selected = i == frame.cursor;
        let line = match entry.items.get(idx) {
            Some(Item::Run(run)) => render_run_line(run, is_selected, narrow, max_width, now),
            Some(Item::Pipeline(p)) => render_pipeline_line(p, is_selected, narrow, max_width),
            None => continue,
        };
        lines.push(line);
    }

    f.render_widget(Paragraph::new(lines), area);
}

/// Failed refresh: keep the last good content under a one-line banner.
/// Returns the area left for the content.
pub fn error_banner(f: &mut Frame, area: Rect, entry: &CacheEntry) -> Rect {
    let Some(err) = &entry.last_error else {
        return area;
    };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    let banner = Paragraph::new(Line::from(vec![
        Span::styled("✗ ", Style::default().fg(Color::Red)),
        Span::styled(
            truncate(&err.to_string(), (area.width as usize).saturating_sub(2)),
            Style::default().fg(Color::Red),
        ),
    ]));
    f.render_widget(banner, chunks[0]);
    chunks[1]
}

pub fn status_icon(status: Option<RunStatus>) -> (&'static str, Color) {
    match status {
        Some(RunStatus::Success) => ("✓", Color::Green),
        Some(RunStatus::Failure) => ("✗", Color::Red),
        Some(RunStatus::Canceled) => ("⊘", Color::Yellow),
        Some(RunStatus::Canceling) => ("⊘", Color::DarkGray),
        Some(RunStatus::Started | RunStatus::Starting) => ("⟳", Color::Yellow),
        Some(RunStatus::Queued | RunStatus::NotStarted | RunStatus::Managed | RunStatus::Unknown)
        | None => ("·", Color::DarkGray),
    }
}

fn status_color(status: RunStatus) -> Color {
    status_icon(Some(status)).1
}

/// Truncate to `width` columns and pad with spaces.
fn cell(s: &str, width: usize) -> String {
    let t = truncate(s, width);
    let pad = width.saturating_sub(UnicodeWidthStr::width(t.as_str()));
    format!("{t}{}", " ".repeat(pad))
}

fn short_id(run_id: &str) -> &str {
    run_id.get(..ID_WIDTH).unwrap_or(run_id)
}

fn column_header(view: &View, narrow: bool, max_width: usize) -> Line<'static> {
    let text = match view {
        View::PipelinesList => {
            let name_width = max_width.saturating_sub(2 + 1 + 30) / 2;
            if narrow {
                "  NAME".to_string()
            } else {
                format!("  {}  {}", cell("NAME", name_width), "REPOSITORY @ LOCATION")
            }
        }
        _ => {
            let mut s = format!("  {}  {}  ", cell("RUN ID", ID_WIDTH), cell("STATUS", STATUS_WIDTH));
            if !narrow {
                s.push_str(&cell("STARTED", STARTED_WIDTH));
                s.push_str("  ");
                s.push_str(&cell("DURATION", DURATION_WIDTH));
                s.push_str("  ");
            }
            s.push_str("PIPELINE");
            s
        }
    };
    Line::from(Span::styled(
        truncate(&text, max_width),
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
    ))
}

fn render_run_line(
    run: &Run,
    is_selected: bool,
    narrow: bool,
    max_width: usize,
    now: DateTime<Utc>,
) -> Line<'static> {
    let (icon, icon_color) = status_icon(Some(run.status));

    let select_style = if is_selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };

    let mut spans = vec![
        Span::styled(format!("{icon} "), Style::default().fg(icon_color)),
        Span::styled(
            format!("{}  ", cell(short_id(&run.run_id), ID_WIDTH)),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(
            format!("{}  ", cell(run.status.label(), STATUS_WIDTH)),
            Style::default().fg(status_color(run.status)),
        ),
    ];
    let mut used = 2 + ID_WIDTH + 2 + STATUS_WIDTH + 2;

    if !narrow {
        spans.push(Span::styled(
            format!("{}  ", cell(&format_timestamp(run.started_at, now), STARTED_WIDTH)),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::styled(
            format!("{}  ", cell(&run.duration(now), DURATION_WIDTH)),
            Style::default().fg(Color::DarkGray),
        ));
        used += STARTED_WIDTH + 2 + DURATION_WIDTH + 2;
    }

    spans.push(Span::styled(
        truncate(&run.pipeline_name, max_width.saturating_sub(used)),
        select_style,
    ));
    Line::from(spans)
}

fn render_pipeline_line(
    pipeline: &Pipeline,
    is_selected: bool,
    narrow: bool,
    max_width: usize,
) -> Line<'static> {
    let (icon, icon_color) = status_icon(pipeline.last_run_status);

    let select_style = if is_selected {
        Style::default().add_modifier(Modifier::REVERSED)
    } else {
        Style::default()
    };

    let mut spans = vec![Span::styled(format!("{icon} "), Style::default().fg(icon_color))];
    if narrow {
        spans.push(Span::styled(
            truncate(&pipeline.name, max_width.saturating_sub(2)),
            select_style,
        ));
    } else {
        let name_width = max_width.saturating_sub(2 + 1 + 30) / 2;
        spans.push(Span::styled(cell(&pipeline.name, name_width), select_style));
        spans.push(Span::raw("  "));
        spans.push(Span::styled(
            truncate(
                &format!("{} @ {}", pipeline.repository, pipeline.location),
                max_width.saturating_sub(2 + name_width + 2),
            ),
            Style::default().fg(Color::Blue),
        ));
    }
    Line::from(spans)
}
