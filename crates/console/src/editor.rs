//! Editor and language-selector collaborators
//!
//! The clients only ever read and replace the whole text; cursor handling
//! exists for the terminal console.

use shared::Language;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Text editor the run/generate clients read from and insert into
pub trait Editor: Send + Sync {
    fn text(&self) -> String;
    fn set_text(&self, text: &str);
    fn focus(&self);

    /// Append `snippet` on a new line: `old + "\n" + snippet`
    fn append_snippet(&self, snippet: &str) {
        let current = self.text();
        self.set_text(&format!("{}\n{}", current, snippet));
    }
}

#[derive(Debug, Default)]
struct EditorState {
    text: String,
    /// Byte offset, always on a char boundary
    cursor: usize,
    focused: bool,
}

/// In-memory editor buffer
#[derive(Debug, Default)]
pub struct BufferEditor {
    state: Mutex<EditorState>,
}

impl BufferEditor {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(EditorState {
                text: text.into(),
                cursor: 0,
                focused: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EditorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_focused(&self) -> bool {
        self.lock().focused
    }

    pub fn blur(&self) {
        self.lock().focused = false;
    }

    pub fn insert_char(&self, c: char) {
        let mut state = self.lock();
        let cursor = state.cursor;
        state.text.insert(cursor, c);
        state.cursor += c.len_utf8();
    }

    pub fn backspace(&self) {
        let mut state = self.lock();
        let cursor = state.cursor;
        if let Some((idx, _)) = state.text[..cursor].char_indices().next_back() {
            state.text.replace_range(idx..cursor, "");
            state.cursor = idx;
        }
    }

    pub fn move_left(&self) {
        let mut state = self.lock();
        let cursor = state.cursor;
        if let Some((idx, _)) = state.text[..cursor].char_indices().next_back() {
            state.cursor = idx;
        }
    }

    pub fn move_right(&self) {
        let mut state = self.lock();
        let cursor = state.cursor;
        if let Some(c) = state.text[cursor..].chars().next() {
            state.cursor += c.len_utf8();
        }
    }

    pub fn move_up(&self) {
        self.move_vertical(-1);
    }

    pub fn move_down(&self) {
        self.move_vertical(1);
    }

    fn move_vertical(&self, delta: isize) {
        let mut state = self.lock();
        let (row, col) = cursor_row_col(&state.text, state.cursor);
        let target = row as isize + delta;
        let line_count = state.text.split('\n').count() as isize;
        if target < 0 || target >= line_count {
            return;
        }
        state.cursor = offset_for(&state.text, target as usize, col);
    }

    /// Cursor as (row, column) in chars
    pub fn cursor_position(&self) -> (usize, usize) {
        let state = self.lock();
        cursor_row_col(&state.text, state.cursor)
    }
}

impl Editor for BufferEditor {
    fn text(&self) -> String {
        self.lock().text.clone()
    }

    fn set_text(&self, text: &str) {
        let mut state = self.lock();
        state.text = text.to_string();
        state.cursor = state.cursor.min(state.text.len());
        while !state.text.is_char_boundary(state.cursor) {
            state.cursor -= 1;
        }
    }

    fn focus(&self) {
        self.lock().focused = true;
    }
}

fn cursor_row_col(text: &str, cursor: usize) -> (usize, usize) {
    let before = &text[..cursor];
    let row = before.matches('\n').count();
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    (row, before[line_start..].chars().count())
}

fn offset_for(text: &str, row: usize, col: usize) -> usize {
    let mut offset = 0;
    for (i, line) in text.split('\n').enumerate() {
        if i == row {
            let within = line
                .char_indices()
                .nth(col)
                .map_or(line.len(), |(idx, _)| idx);
            return offset + within;
        }
        offset += line.len() + 1;
    }
    text.len()
}

/// The language selector next to the editor
#[derive(Debug, Default)]
pub struct LanguageSelect {
    selected: Mutex<Language>,
}

impl LanguageSelect {
    pub fn new(language: Language) -> Self {
        Self {
            selected: Mutex::new(language),
        }
    }

    pub fn get(&self) -> Language {
        *self.selected.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn cycle(&self) -> Language {
        let mut selected = self.selected.lock().unwrap_or_else(PoisonError::into_inner);
        *selected = selected.next();
        *selected
    }
}
