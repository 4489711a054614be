use crate::app::AppState;
use crate::model::truncate;
use crate::view::ViewFrame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

/// Saved endpoints; `*` marks the active one.
pub fn render(f: &mut Frame, area: Rect, state: &AppState, frame: &ViewFrame) {
    let max_width = area.width as usize;
    let active = state.contexts.active_name();
    let contexts = state.contexts.list();
    let name_width = contexts.iter().map(|c| c.name.len()).max().unwrap_or(0);

    let visible_height = area.height as usize;
    let scroll_offset = if frame.cursor >= visible_height {
        frame.cursor - visible_height + 1
    } else {
        0
    };

    let mut lines: Vec<Line> = Vec::new();
    for (i, ctx) in contexts
        .iter()
        .enumerate()
        .skip(scroll_offset)
        .take(visible_height)
    {
        let is_active = ctx.name == active;
        let select_style = if i == frame.cursor {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let marker = if is_active { "* " } else { "  " };
        let url_width = max_width.saturating_sub(2 + name_width + 2 + 12);
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(Color::Green)),
            Span::styled(format!("{:<name_width$}", ctx.name), select_style),
            Span::raw("  "),
            Span::styled(truncate(&ctx.url, url_width), Style::default().fg(Color::Blue)),
            Span::styled(
                format!("  limit {}", ctx.runs_limit),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    if let Some(adhoc) = state.contexts.adhoc() {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::styled("ad-hoc  ", Style::default().fg(Color::Magenta)),
            Span::raw(truncate(&adhoc.url, max_width.saturating_sub(8))),
            Span::styled(
                format!("  limit {}", adhoc.runs_limit),
                Style::default().fg(Color::DarkGray),
            ),
        ]));
    }

    f.render_widget(Paragraph::new(lines), area);
}
