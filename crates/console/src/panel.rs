//! AI response panel - rendered segments plus the per-block action labels

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::segment::{segment, Segment};

pub const THINKING: &str = "AI is thinking...";
pub const COPY_LABEL: &str = "Copy";
pub const COPIED_LABEL: &str = "Copied!";
pub const INSERT_LABEL: &str = "Insert";
pub const INSERTED_LABEL: &str = "Inserted!";
pub const INSERT_ALL_LABEL: &str = "Insert All Code";

/// Where rendered AI responses go
pub trait ResponseSink: Send + Sync {
    /// Segment and render a raw response
    fn show_response(&self, response: &str);
    /// Show a single error block with no actions
    fn show_error(&self, message: &str);
}

/// An actionable control in the panel. Code blocks are indexed in order of
/// appearance, counting code blocks only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionId {
    Copy(usize),
    Insert(usize),
    InsertAll,
}

impl ActionId {
    fn default_label(&self) -> &'static str {
        match self {
            Self::Copy(_) => COPY_LABEL,
            Self::Insert(_) => INSERT_LABEL,
            Self::InsertAll => INSERT_ALL_LABEL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockView {
    pub language: String,
    pub body: String,
    pub copy_label: &'static str,
    pub insert_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockView {
    /// Inert text, no actions
    Text(String),
    Code(CodeBlockView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedResponse {
    pub blocks: Vec<BlockView>,
    /// Present whenever the trimmed response is non-empty
    pub insert_all_label: Option<&'static str>,
}

impl RenderedResponse {
    pub fn from_response(response: &str) -> Self {
        let blocks = segment(response)
            .into_iter()
            .map(|seg| match seg {
                Segment::Text { body } => BlockView::Text(body),
                Segment::Code { language, body } => BlockView::Code(CodeBlockView {
                    language,
                    body,
                    copy_label: COPY_LABEL,
                    insert_label: INSERT_LABEL,
                }),
            })
            .collect();

        Self {
            blocks,
            insert_all_label: (!response.trim().is_empty()).then_some(INSERT_ALL_LABEL),
        }
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &CodeBlockView> {
        self.blocks.iter().filter_map(|block| match block {
            BlockView::Code(code) => Some(code),
            BlockView::Text(_) => None,
        })
    }

    fn code_block_mut(&mut self, index: usize) -> Option<&mut CodeBlockView> {
        self.blocks
            .iter_mut()
            .filter_map(|block| match block {
                BlockView::Code(code) => Some(code),
                BlockView::Text(_) => None,
            })
            .nth(index)
    }

    pub fn code_count(&self) -> usize {
        self.code_blocks().count()
    }

    /// Every code body followed by a blank line, text blocks excluded
    pub fn combined_code(&self) -> String {
        self.code_blocks()
            .map(|code| format!("{}\n\n", code.body))
            .collect()
    }

    fn set_label(&mut self, action: ActionId, label: &'static str) {
        match action {
            ActionId::Copy(i) => {
                if let Some(code) = self.code_block_mut(i) {
                    code.copy_label = label;
                }
            }
            ActionId::Insert(i) => {
                if let Some(code) = self.code_block_mut(i) {
                    code.insert_label = label;
                }
            }
            ActionId::InsertAll => {
                if self.insert_all_label.is_some() {
                    self.insert_all_label = Some(label);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PanelContent {
    #[default]
    Empty,
    Thinking,
    Error(String),
    Rendered(RenderedResponse),
}

#[derive(Debug)]
struct PanelState {
    content: PanelContent,
    visible: bool,
    generate_enabled: bool,
    /// Selected code block, for keyboard-driven actions
    selected: usize,
    /// Bumped whenever the content is replaced
    generation: u64,
}

impl Default for PanelState {
    fn default() -> Self {
        Self {
            content: PanelContent::Empty,
            visible: false,
            generate_enabled: true,
            selected: 0,
            generation: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct ResponsePanel {
    state: Mutex<PanelState>,
}

impl ResponsePanel {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn content(&self) -> PanelContent {
        self.lock().content.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.lock().visible
    }

    pub fn generate_enabled(&self) -> bool {
        self.lock().generate_enabled
    }

    pub fn set_generate_enabled(&self, enabled: bool) {
        self.lock().generate_enabled = enabled;
    }

    pub fn show_thinking(&self) {
        let mut state = self.lock();
        state.content = PanelContent::Thinking;
        state.visible = true;
        state.generation += 1;
    }

    pub fn selected(&self) -> usize {
        self.lock().selected
    }

    pub fn select_next(&self) {
        let mut state = self.lock();
        if let PanelContent::Rendered(rendered) = &state.content {
            let count = rendered.code_count();
            if state.selected + 1 < count {
                state.selected += 1;
            }
        }
    }

    pub fn select_prev(&self) {
        let mut state = self.lock();
        state.selected = state.selected.saturating_sub(1);
    }

    /// Body of the `index`-th code block currently rendered
    pub fn code_body(&self, index: usize) -> Option<String> {
        match &self.lock().content {
            PanelContent::Rendered(rendered) => {
                rendered.code_blocks().nth(index).map(|code| code.body.clone())
            }
            _ => None,
        }
    }

    /// Combined code for the bulk action, `None` if the action is not shown
    pub fn combined_code(&self) -> Option<String> {
        match &self.lock().content {
            PanelContent::Rendered(rendered) if rendered.insert_all_label.is_some() => {
                Some(rendered.combined_code())
            }
            _ => None,
        }
    }

    pub fn set_label(&self, action: ActionId, label: &'static str) {
        if let PanelContent::Rendered(rendered) = &mut self.lock().content {
            rendered.set_label(action, label);
        }
    }

    /// Current render generation, see [`ResponsePanel::reset_label`]
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Restore the default label, unless the content has been replaced since
    /// `generation`
    pub fn reset_label(&self, action: ActionId, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        if let PanelContent::Rendered(rendered) = &mut state.content {
            rendered.set_label(action, action.default_label());
        }
    }

    fn replace_content(&self, content: PanelContent) {
        let mut state = self.lock();
        state.content = content;
        state.visible = true;
        state.selected = 0;
        state.generation += 1;
    }
}

impl ResponseSink for ResponsePanel {
    fn show_response(&self, response: &str) {
        self.replace_content(PanelContent::Rendered(RenderedResponse::from_response(response)));
    }

    fn show_error(&self, message: &str) {
        self.replace_content(PanelContent::Error(message.to_string()));
    }
}

/// Plain-text rendering for line-oriented output. Code blocks are numbered
/// the same way the copy/insert actions index them.
pub fn format_content(content: &PanelContent) -> String {
    match content {
        PanelContent::Empty => String::new(),
        PanelContent::Thinking => format!("{}\n", THINKING),
        PanelContent::Error(message) => format!("{}\n", message),
        PanelContent::Rendered(rendered) => {
            let mut out = String::new();
            let mut code_index = 0;
            for block in &rendered.blocks {
                match block {
                    BlockView::Text(text) => out.push_str(text),
                    BlockView::Code(code) => {
                        code_index += 1;
                        if !out.is_empty() && !out.ends_with('\n') {
                            out.push('\n');
                        }
                        let language = if code.language.is_empty() {
                            "code"
                        } else {
                            code.language.as_str()
                        };
                        out.push_str(&format!("--- [{}] {} ---\n", code_index, language));
                        out.push_str(&code.body);
                        if !code.body.ends_with('\n') {
                            out.push('\n');
                        }
                        out.push_str("---\n");
                    }
                }
            }
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out
        }
    }
}
