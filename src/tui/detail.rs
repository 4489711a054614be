use crate::app::AppState;
use crate::model::{format_timestamp, Detail, RunDetail};
use crate::tui::list::{error_banner, status_icon};
use crate::tui::spinner;
use crate::view::ViewFrame;
use chrono::Utc;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const LABEL_WIDTH: usize = 8;

pub fn render(f: &mut Frame, area: Rect, state: &AppState, frame: &ViewFrame) {
    let Some(entry) = state.entry(frame.key) else {
        return;
    };
    let area = error_banner(f, area, entry);

    let Some(Detail::Run(detail)) = &entry.detail else {
        let msg = if entry.in_flight {
            format!("{} Loading…", spinner::frame(state.spinner_frame))
        } else {
            String::new()
        };
        f.render_widget(
            Paragraph::new(msg).style(Style::default().fg(Color::Yellow)),
            area,
        );
        return;
    };

    let summary = summary_lines(detail);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(summary.len() as u16 + 1),
            Constraint::Min(0),
        ])
        .split(area);

    f.render_widget(
        Paragraph::new(summary).block(
            Block::default()
                .borders(Borders::BOTTOM)
                .border_style(Style::default().fg(Color::DarkGray)),
        ),
        chunks[0],
    );

    let body: Vec<Line> = detail
        .body()
        .into_iter()
        .map(|l| {
            if l.starts_with(' ') || l.is_empty() {
                Line::from(l)
            } else {
                Line::from(Span::styled(
                    l,
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                ))
            }
        })
        .collect();
    let offset = (
        u16::try_from(frame.scroll).unwrap_or(u16::MAX),
        u16::try_from(frame.hscroll).unwrap_or(u16::MAX),
    );
    f.render_widget(Paragraph::new(body).scroll(offset), chunks[1]);
}

fn summary_lines(detail: &RunDetail) -> Vec<Line<'static>> {
    let now = Utc::now();
    let run = &detail.run;
    let (icon, color) = status_icon(Some(run.status));
    vec![
        label_line("Run", Span::raw(run.run_id.clone())),
        label_line("Pipeline", Span::raw(run.pipeline_name.clone())),
        label_line(
            "Status",
            Span::styled(format!("{icon} {}", run.status.label()), Style::default().fg(color)),
        ),
        label_line(
            "Mode",
            Span::raw(detail.mode.clone().unwrap_or_else(|| "-".to_string())),
        ),
        label_line("Started", Span::raw(format_timestamp(run.started_at, now))),
        label_line("Ended", Span::raw(format_timestamp(run.ended_at, now))),
        label_line("Duration", Span::raw(run.duration(now))),
    ]
}

fn label_line(label: &str, value: Span<'static>) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{label:>LABEL_WIDTH$}  "),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        value,
    ])
}
