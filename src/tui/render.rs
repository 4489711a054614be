use crate::app::AppState;
use crate::tui::{contexts, detail, footer, header, list};
use crate::view::{View, ViewFrame};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

pub fn render(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // header
            Constraint::Min(1),    // body
            Constraint::Length(2), // footer
        ])
        .split(f.area());

    let frame = body_frame(state);
    header::render(f, chunks[0], state);
    match &frame.view {
        View::RunDetail(_) => detail::render(f, chunks[1], state, frame),
        View::ContextManager => contexts::render(f, chunks[1], state, frame),
        _ => list::render(f, chunks[1], state, frame),
    }
    footer::render(f, chunks[2], state);

    if let Some(status) = state.status.as_ref().filter(|s| s.is_error) {
        render_error_box(f, &status.text);
    }
}

/// The frame whose content fills the body. The command overlay has no content of
/// its own, so the view underneath stays on screen while a command is typed.
pub fn body_frame(state: &AppState) -> &ViewFrame {
    let stack = state.stack();
    match stack {
        [.., below, top] if top.view == View::CommandOverlay => below,
        _ => state.current(),
    }
}

fn render_error_box(f: &mut Frame, text: &str) {
    let area = f.area();
    if area.height <= 6 || area.width < 4 {
        return;
    }
    let err_area = Rect {
        x: area.x + 1,
        y: area.y + area.height.saturating_sub(5),
        width: area.width.saturating_sub(2),
        height: 3,
    };
    let err_widget = Paragraph::new(text.to_owned())
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .title(" Error ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(err_widget, err_area);
}
