//! Output sinks - where run results and pushed output are written

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Destination for program output
pub trait OutputSink: Send + Sync {
    fn append(&self, text: &str);
    fn replace(&self, text: &str);
    /// Snap the view to the most recent content
    fn scroll_to_end(&self);
}

#[derive(Debug, Default)]
struct OutputState {
    text: String,
    /// First visible line
    scroll: usize,
}

/// Accumulating output panel buffer
#[derive(Debug, Default)]
pub struct OutputBuffer {
    state: Mutex<OutputState>,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, OutputState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn text(&self) -> String {
        self.lock().text.clone()
    }

    pub fn scroll_offset(&self) -> usize {
        self.lock().scroll
    }

    /// Total scrollable height in lines
    pub fn line_count(&self) -> usize {
        self.lock().text.lines().count()
    }

    pub fn scroll_up(&self, lines: usize) {
        let mut state = self.lock();
        state.scroll = state.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&self, lines: usize) {
        let mut state = self.lock();
        let max = state.text.lines().count();
        state.scroll = (state.scroll + lines).min(max);
    }
}

impl OutputSink for OutputBuffer {
    fn append(&self, text: &str) {
        self.lock().text.push_str(text);
    }

    fn replace(&self, text: &str) {
        let mut state = self.lock();
        state.text = text.to_string();
        state.scroll = 0;
    }

    fn scroll_to_end(&self) {
        let mut state = self.lock();
        state.scroll = state.text.lines().count();
    }
}

/// Writes output straight to stdout, for the line-oriented commands
#[derive(Debug, Default)]
pub struct PrintSink;

impl OutputSink for PrintSink {
    fn append(&self, text: &str) {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(text.as_bytes());
        let _ = stdout.flush();
    }

    fn replace(&self, text: &str) {
        self.append(text);
    }

    fn scroll_to_end(&self) {}
}
