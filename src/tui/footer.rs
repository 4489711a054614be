use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use crate::app::AppState;
use crate::input::InputMode;
use crate::tui::render::body_frame;
use crate::view::View;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let line = match state.mode {
        InputMode::Filter => prompt("/", &body_frame(state).filter.query),
        InputMode::Command => prompt(":", &state.input),
        InputMode::ContextForm => prompt("new context (name url [limit]): ", &state.input),
        InputMode::Normal => match &state.status {
            Some(status) if !status.is_error => Line::from(vec![
                Span::styled("★ ", Style::default().fg(Color::Yellow)),
                Span::styled(status.text.clone(), Style::default().fg(Color::Yellow)),
            ]),
            _ => hint_line(hints(&state.current().view, area.width, state.at_root())),
        },
    };

    let footer = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    f.render_widget(footer, area);
}

fn prompt<'a>(label: &'a str, text: &'a str) -> Line<'a> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Cyan)),
        Span::raw(text),
        Span::styled("▏", Style::default().fg(Color::Yellow)),
    ])
}

fn hints(view: &View, width: u16, at_root: bool) -> &'static [(&'static str, &'static str)] {
    let narrow = width < crate::app::NARROW_WIDTH_THRESHOLD;
    match view {
        View::ContextManager => &[
            ("Enter", "switch"),
            ("a", "add"),
            ("d", "delete"),
            ("Esc", "back"),
        ],
        View::RunDetail(_) if narrow => &[("j/k", "scroll"), ("h/l", "pan"), ("Esc", "back")],
        View::RunDetail(_) => &[
            ("↑↓/jk", "scroll"),
            ("←→/hl", "pan"),
            ("r", "refresh"),
            (":", "command"),
            ("Esc", "back"),
        ],
        _ if narrow => &[("j/k", "nav"), ("/", "filter"), (":", "cmd"), ("Enter", "open")],
        _ if at_root => &[
            ("↑↓/jk", "navigate"),
            ("Enter", "open"),
            ("/", "filter"),
            ("r", "refresh"),
            (":", "command"),
            ("q", "quit"),
        ],
        _ => &[
            ("↑↓/jk", "navigate"),
            ("Enter", "open"),
            ("/", "filter"),
            ("r", "refresh"),
            (":", "command"),
            ("Esc", "back"),
        ],
    }
}

fn hint_line(hints: &'static [(&'static str, &'static str)]) -> Line<'static> {
    let mut spans: Vec<Span> = Vec::new();
    for (i, (key, desc)) in hints.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw(" "));
        }
        spans.push(Span::styled(*key, Style::default().fg(Color::Cyan)));
        spans.push(Span::styled(
            format!(" {desc}"),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}
