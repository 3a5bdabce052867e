//! Key bindings - maps terminal key events to console commands

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Which pane receives keystrokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Prompt,
    Response,
    Output,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Editor => Self::Prompt,
            Self::Prompt => Self::Response,
            Self::Response => Self::Output,
            Self::Output => Self::Editor,
        }
    }
}

/// Text editing applied to the focused input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditAction {
    Insert(char),
    Newline,
    Backspace,
    Left,
    Right,
    Up,
    Down,
}

/// One user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    RunCode,
    GenerateCode,
    CopyBlock(usize),
    InsertBlock(usize),
    InsertAll,
    SelectNext,
    SelectPrev,
    ScrollUp(usize),
    ScrollDown(usize),
    CycleFocus,
    CycleLanguage,
    Save,
    Edit(EditAction),
    Quit,
}

const PAGE: usize = 10;

/// Resolve a key press. `selected` is the code block currently selected in
/// the response pane.
pub fn command_for(key: KeyEvent, focus: Focus, selected: usize) -> Option<Command> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    // Global shortcuts
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            // Terminals without enhanced key reporting send Ctrl+Enter as Ctrl+J
            KeyCode::Enter | KeyCode::Char('j') => Some(Command::RunCode),
            KeyCode::Char('g') => Some(Command::GenerateCode),
            KeyCode::Char('l') => Some(Command::CycleLanguage),
            KeyCode::Char('s') => Some(Command::Save),
            KeyCode::Char('c') | KeyCode::Char('q') => Some(Command::Quit),
            _ => None,
        };
    }

    match key.code {
        KeyCode::F(5) => return Some(Command::RunCode),
        KeyCode::Tab => return Some(Command::CycleFocus),
        _ => {}
    }

    match focus {
        Focus::Editor => match key.code {
            KeyCode::Char(c) => Some(Command::Edit(EditAction::Insert(c))),
            KeyCode::Enter => Some(Command::Edit(EditAction::Newline)),
            KeyCode::Backspace => Some(Command::Edit(EditAction::Backspace)),
            KeyCode::Left => Some(Command::Edit(EditAction::Left)),
            KeyCode::Right => Some(Command::Edit(EditAction::Right)),
            KeyCode::Up => Some(Command::Edit(EditAction::Up)),
            KeyCode::Down => Some(Command::Edit(EditAction::Down)),
            _ => None,
        },
        Focus::Prompt => match key.code {
            KeyCode::Char(c) => Some(Command::Edit(EditAction::Insert(c))),
            KeyCode::Backspace => Some(Command::Edit(EditAction::Backspace)),
            KeyCode::Enter => Some(Command::GenerateCode),
            _ => None,
        },
        Focus::Response => match key.code {
            KeyCode::Up | KeyCode::Char('k') => Some(Command::SelectPrev),
            KeyCode::Down | KeyCode::Char('j') => Some(Command::SelectNext),
            KeyCode::Char('c') => Some(Command::CopyBlock(selected)),
            KeyCode::Char('i') => Some(Command::InsertBlock(selected)),
            KeyCode::Char('a') => Some(Command::InsertAll),
            _ => None,
        },
        Focus::Output => match key.code {
            KeyCode::Up => Some(Command::ScrollUp(1)),
            KeyCode::Down => Some(Command::ScrollDown(1)),
            KeyCode::PageUp => Some(Command::ScrollUp(PAGE)),
            KeyCode::PageDown => Some(Command::ScrollDown(PAGE)),
            _ => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::CONTROL)
    }

    #[test]
    fn test_ctrl_enter_runs_from_any_pane() {
        for focus in [Focus::Editor, Focus::Prompt, Focus::Response, Focus::Output] {
            assert_eq!(command_for(ctrl(KeyCode::Enter), focus, 0), Some(Command::RunCode));
            assert_eq!(command_for(ctrl(KeyCode::Char('j')), focus, 0), Some(Command::RunCode));
            assert_eq!(command_for(key(KeyCode::F(5)), focus, 0), Some(Command::RunCode));
        }
    }

    #[test]
    fn test_plain_enter_edits_in_editor() {
        assert_eq!(
            command_for(key(KeyCode::Enter), Focus::Editor, 0),
            Some(Command::Edit(EditAction::Newline))
        );
    }

    #[test]
    fn test_enter_in_prompt_generates() {
        assert_eq!(
            command_for(key(KeyCode::Enter), Focus::Prompt, 0),
            Some(Command::GenerateCode)
        );
    }

    #[test]
    fn test_response_actions_use_selection() {
        assert_eq!(
            command_for(key(KeyCode::Char('c')), Focus::Response, 2),
            Some(Command::CopyBlock(2))
        );
        assert_eq!(
            command_for(key(KeyCode::Char('i')), Focus::Response, 1),
            Some(Command::InsertBlock(1))
        );
        assert_eq!(
            command_for(key(KeyCode::Char('a')), Focus::Response, 0),
            Some(Command::InsertAll)
        );
    }

    #[test]
    fn test_letters_type_in_editor() {
        assert_eq!(
            command_for(key(KeyCode::Char('c')), Focus::Editor, 0),
            Some(Command::Edit(EditAction::Insert('c')))
        );
    }

    #[test]
    fn test_release_events_ignored() {
        let mut event = key(KeyCode::Char('x'));
        event.kind = KeyEventKind::Release;
        assert_eq!(command_for(event, Focus::Editor, 0), None);
    }

    #[test]
    fn test_focus_cycle() {
        let mut focus = Focus::Editor;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert_eq!(focus, Focus::Editor);
        assert_eq!(command_for(key(KeyCode::Tab), Focus::Output, 0), Some(Command::CycleFocus));
    }

    #[test]
    fn test_quit() {
        assert_eq!(command_for(ctrl(KeyCode::Char('c')), Focus::Editor, 0), Some(Command::Quit));
        assert_eq!(command_for(ctrl(KeyCode::Char('q')), Focus::Prompt, 0), Some(Command::Quit));
    }
}
