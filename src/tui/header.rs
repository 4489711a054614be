use crate::app::AppState;
use crate::tui::render::body_frame;
use crate::tui::spinner;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

pub fn render(f: &mut Frame, area: Rect, state: &AppState) {
    let narrow = area.width < crate::app::NARROW_WIDTH_THRESHOLD;
    let endpoint = state.contexts.active();

    let mut spans = vec![
        Span::styled(
            format!(" {} ", state.version_string),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("│ "),
        Span::styled(
            endpoint.name.clone(),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ),
    ];

    if !narrow {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            endpoint.url.clone(),
            Style::default().fg(Color::DarkGray),
        ));
    }
    if state.contexts.adhoc().is_some() {
        spans.push(Span::styled(" [ad-hoc]", Style::default().fg(Color::Magenta)));
    }

    // Breadcrumb of the view stack
    spans.push(Span::raw(" │ "));
    let titles: Vec<String> = state.stack().iter().map(|fr| fr.view.title()).collect();
    let crumbs = if narrow {
        titles.last().cloned().unwrap_or_default()
    } else {
        titles.join(" › ")
    };
    spans.push(Span::styled(crumbs, Style::default().fg(Color::Yellow)));

    let frame = body_frame(state);
    if frame.filter.is_active() && !frame.filter.editing {
        spans.push(Span::styled(
            format!(" [/{}]", frame.filter.query),
            Style::default().fg(Color::Magenta),
        ));
    }

    // Fetch spinner, or the backed-off interval after failures
    let entry = state.entry(frame.key);
    if entry.is_some_and(|e| e.in_flight) {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("{}", spinner::frame(state.spinner_frame)),
            Style::default().fg(Color::Yellow),
        ));
    } else if let Some(timer) = state.scheduler.timer_state(frame.key) {
        if timer.failures > 0 {
            spans.push(Span::styled(
                format!(" retry {}s", timer.interval.as_secs()),
                Style::default().fg(Color::DarkGray),
            ));
        }
    }

    // Error indicator
    if entry.is_some_and(|e| e.last_error.is_some()) {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            "!",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
    }

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(header, area);
}
