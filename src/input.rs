use crate::view::View;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Quit,
    Pop,
    MoveUp,
    MoveDown,
    MoveTop,
    MoveBottom,
    ScrollLeft,
    ScrollRight,
    Select,
    Refresh,
    StartFilter,
    ClearFilter,
    StartCommand,
    AddContext,
    DeleteContext,
    InputChar(char),
    InputBackspace,
    InputSubmit,
    InputCancel,
    None,
}

/// Where typed characters currently go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Normal,
    Filter,
    Command,
    ContextForm,
}

/// Captures the UI state needed to interpret a key press.
#[derive(Debug, Clone)]
pub struct InputContext {
    pub mode: InputMode,
    pub view: View,
    pub at_root: bool,
    /// A committed filter query is narrowing the current list.
    pub has_filter: bool,
}

impl Default for InputContext {
    fn default() -> Self {
        Self {
            mode: InputMode::Normal,
            view: View::RunsList,
            at_root: true,
            has_filter: false,
        }
    }
}

pub fn map_key(key: KeyEvent, ctx: &InputContext) -> Action {
    if key.kind != KeyEventKind::Press {
        return Action::None;
    }

    // Ctrl+C always quits
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }

    if ctx.mode != InputMode::Normal {
        return match key.code {
            KeyCode::Esc => Action::InputCancel,
            KeyCode::Enter => Action::InputSubmit,
            KeyCode::Backspace => Action::InputBackspace,
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => Action::InputChar(c),
            _ => Action::None,
        };
    }

    // Global
    match key.code {
        KeyCode::Char(':') => return Action::StartCommand,
        KeyCode::Char('q') => return if ctx.at_root { Action::Quit } else { Action::None },
        KeyCode::Esc => {
            return if ctx.has_filter {
                Action::ClearFilter
            } else if ctx.at_root {
                Action::None
            } else {
                Action::Pop
            };
        }
        KeyCode::Up | KeyCode::Char('k') => return Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') => return Action::MoveDown,
        KeyCode::Char('g') | KeyCode::Home => return Action::MoveTop,
        KeyCode::Char('G') | KeyCode::End => return Action::MoveBottom,
        _ => {}
    }

    match (&ctx.view, key.code) {
        (View::RunDetail(_), KeyCode::Left | KeyCode::Char('h')) => Action::ScrollLeft,
        (View::RunDetail(_), KeyCode::Right | KeyCode::Char('l')) => Action::ScrollRight,
        (View::ContextManager, KeyCode::Enter) => Action::Select,
        (View::ContextManager, KeyCode::Char('a')) => Action::AddContext,
        (View::ContextManager, KeyCode::Char('d')) => Action::DeleteContext,
        (View::ContextManager | View::CommandOverlay, _) => Action::None,
        (view, KeyCode::Char('/')) if view.filterable() => Action::StartFilter,
        (view, KeyCode::Enter) if view.filterable() => Action::Select,
        (_, KeyCode::Char('r')) => Action::Refresh,
        _ => Action::None,
    }
}
