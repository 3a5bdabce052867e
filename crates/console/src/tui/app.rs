//! Main TUI application for console mode

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{
        self, Event, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph, Wrap},
};
use tokio::runtime::Handle;
use tokio::sync::watch;

use super::keymap::{command_for, Command, EditAction, Focus};
use crate::assist::AiAssistClient;
use crate::connection::ConnectionState;
use crate::editor::{BufferEditor, Editor, LanguageSelect};
use crate::exec::ExecutionClient;
use crate::panel::{BlockView, PanelContent, ResponsePanel};
use crate::sink::OutputBuffer;

/// Everything the console drives, built by `main`
pub struct AppContext {
    pub editor: Arc<BufferEditor>,
    pub language: Arc<LanguageSelect>,
    pub output: Arc<OutputBuffer>,
    pub panel: Arc<ResponsePanel>,
    pub exec: ExecutionClient,
    pub assist: AiAssistClient,
    pub connection: watch::Receiver<ConnectionState>,
    /// File the editor was loaded from, target of Ctrl+S
    pub file: Option<PathBuf>,
}

/// Main TUI application state
pub struct App {
    ctx: AppContext,
    runtime: Handle,
    /// AI prompt input
    prompt: String,
    focus: Focus,
    /// One-line notice shown in the status bar
    notice: Option<String>,
    should_quit: bool,
}

impl App {
    pub fn new(ctx: AppContext, runtime: Handle) -> Self {
        ctx.editor.focus();
        Self {
            ctx,
            runtime,
            prompt: String::new(),
            focus: Focus::Editor,
            notice: None,
            should_quit: false,
        }
    }

    /// Run the TUI main loop
    pub fn run(&mut self) -> io::Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        // Needed to tell Ctrl+Enter apart from Enter
        let enhanced = supports_keyboard_enhancement().unwrap_or(false);
        if enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )?;
        }
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.event_loop(&mut terminal);

        // Restore terminal
        if enhanced {
            execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
        }
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            // Handle input with timeout so pushed output keeps rendering
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if let Some(command) = command_for(key, self.focus, self.ctx.panel.selected()) {
                        self.apply(command);
                    }
                }
            }
        }
        Ok(())
    }

    /// Execute one user action
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::RunCode => {
                let exec = self.ctx.exec.clone();
                self.runtime.spawn(async move {
                    exec.run_code().await;
                });
            }
            Command::GenerateCode => {
                if !self.ctx.panel.generate_enabled() {
                    return;
                }
                let assist = self.ctx.assist.clone();
                let prompt = self.prompt.clone();
                self.runtime.spawn(async move {
                    assist.generate_code(&prompt).await;
                });
            }
            Command::CopyBlock(index) => {
                let assist = self.ctx.assist.clone();
                self.runtime.spawn(async move {
                    assist.copy_block(index);
                });
            }
            Command::InsertBlock(index) => {
                let assist = self.ctx.assist.clone();
                self.runtime.spawn(async move {
                    assist.insert_block(index);
                });
            }
            Command::InsertAll => {
                let assist = self.ctx.assist.clone();
                self.runtime.spawn(async move {
                    assist.insert_all();
                });
            }
            Command::SelectNext => self.ctx.panel.select_next(),
            Command::SelectPrev => self.ctx.panel.select_prev(),
            Command::ScrollUp(lines) => self.ctx.output.scroll_up(lines),
            Command::ScrollDown(lines) => self.ctx.output.scroll_down(lines),
            Command::CycleFocus => {
                self.focus = self.focus.next();
                if self.focus == Focus::Editor {
                    self.ctx.editor.focus();
                } else {
                    self.ctx.editor.blur();
                }
            }
            Command::CycleLanguage => {
                let language = self.ctx.language.cycle();
                self.notice = Some(format!("Language: {}", language));
            }
            Command::Save => self.save(),
            Command::Edit(action) => self.edit(action),
            Command::Quit => self.should_quit = true,
        }
    }

    fn edit(&mut self, action: EditAction) {
        match self.focus {
            Focus::Editor => {
                let editor = &self.ctx.editor;
                match action {
                    EditAction::Insert(c) => editor.insert_char(c),
                    EditAction::Newline => editor.insert_char('\n'),
                    EditAction::Backspace => editor.backspace(),
                    EditAction::Left => editor.move_left(),
                    EditAction::Right => editor.move_right(),
                    EditAction::Up => editor.move_up(),
                    EditAction::Down => editor.move_down(),
                }
            }
            Focus::Prompt => match action {
                EditAction::Insert(c) => self.prompt.push(c),
                EditAction::Backspace => {
                    self.prompt.pop();
                }
                _ => {}
            },
            Focus::Response | Focus::Output => {}
        }
    }

    fn save(&mut self) {
        let Some(path) = self.ctx.file.clone() else {
            self.notice = Some("No file to save to (start with --file)".to_string());
            return;
        };
        match std::fs::write(&path, self.ctx.editor.text()) {
            Ok(()) => self.notice = Some(format!("Saved {}", path.display())),
            Err(e) => {
                tracing::error!("Failed to save {}: {}", path.display(), e);
                self.notice = Some(format!("Save failed: {}", e));
            }
        }
    }

    /// Draw the UI
    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();

        // Split into status bar and main content
        let main_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(area);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(main_layout[0]);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(columns[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(columns[1]);

        self.draw_editor(frame, left[0]);
        self.draw_output(frame, left[1]);
        self.draw_prompt(frame, right[0]);
        self.draw_response(frame, right[1]);
        self.draw_status_bar(frame, main_layout[1]);
    }

    fn pane_block(&self, title: String, pane: Focus) -> Block<'static> {
        let border_style = if self.focus == pane {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::Gray)
        };
        Block::default()
            .title(title)
            .borders(Borders::ALL)
            .border_style(border_style)
    }

    fn draw_editor(&self, frame: &mut Frame, area: Rect) {
        let title = format!(" Editor [{}] (Ctrl+Enter/F5: run) ", self.ctx.language.get());
        let block = self.pane_block(title, Focus::Editor);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let (row, col) = self.ctx.editor.cursor_position();
        let scroll = row.saturating_sub(inner.height.saturating_sub(1) as usize);
        let paragraph = Paragraph::new(self.ctx.editor.text()).scroll((scroll as u16, 0));
        frame.render_widget(paragraph, inner);

        if self.ctx.editor.is_focused() {
            let x = inner.x + (col as u16).min(inner.width.saturating_sub(1));
            let y = inner.y + (row - scroll) as u16;
            frame.set_cursor_position((x, y));
        }
    }

    fn draw_output(&self, frame: &mut Frame, area: Rect) {
        let block = self.pane_block(" Output ".to_string(), Focus::Output);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let paragraph = Paragraph::new(self.ctx.output.text()).wrap(Wrap { trim: false });

        // Long lines wrap, so the bottom is measured in rendered rows. An
        // offset at or past the last line (scroll_to_end) pins the view there.
        let rows = paragraph.line_count(inner.width);
        let max_scroll = rows.saturating_sub(inner.height as usize);
        let offset = self.ctx.output.scroll_offset();
        let scroll = if offset >= self.ctx.output.line_count() {
            max_scroll
        } else {
            offset.min(max_scroll)
        };

        frame.render_widget(paragraph.scroll((scroll as u16, 0)), inner);
    }

    fn draw_prompt(&self, frame: &mut Frame, area: Rect) {
        let title = if self.ctx.panel.generate_enabled() {
            " Ask AI (Enter/Ctrl+G) "
        } else {
            " Ask AI (generating...) "
        };
        let block = self.pane_block(title.to_string(), Focus::Prompt);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let input_text = if self.focus == Focus::Prompt {
            format!("{}_", self.prompt)
        } else {
            self.prompt.clone()
        };
        frame.render_widget(Paragraph::new(input_text), inner);
    }

    fn draw_response(&self, frame: &mut Frame, area: Rect) {
        let block = self.pane_block(" AI Response (c/i/a) ".to_string(), Focus::Response);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let lines = if self.ctx.panel.is_visible() {
            response_lines(&self.ctx.panel.content(), self.ctx.panel.selected())
        } else {
            vec![Line::from(Span::styled(
                "Type a prompt and press Enter",
                Style::default().fg(Color::DarkGray),
            ))]
        };

        let paragraph = Paragraph::new(lines).wrap(Wrap { trim: false });
        frame.render_widget(paragraph, inner);
    }

    /// Draw the status bar
    fn draw_status_bar(&self, frame: &mut Frame, area: Rect) {
        let state = *self.ctx.connection.borrow();
        let dot_color = match state {
            ConnectionState::Connected => Color::Green,
            ConnectionState::Connecting => Color::Yellow,
            ConnectionState::Disconnected => Color::Red,
        };

        let mut spans = vec![
            Span::styled(" ● ", Style::default().fg(dot_color)),
            Span::raw(format!("{} ", state.label())),
            Span::raw("| Tab: focus | Ctrl+L: language | Ctrl+S: save | Ctrl+Q: quit "),
        ];
        if let Some(notice) = &self.notice {
            spans.push(Span::styled(
                format!("| {} ", notice),
                Style::default().fg(Color::Yellow),
            ));
        }

        let paragraph = Paragraph::new(Line::from(spans))
            .style(Style::default().bg(Color::DarkGray).fg(Color::White));
        frame.render_widget(paragraph, area);
    }
}

/// Lines for the response pane
fn response_lines(content: &PanelContent, selected: usize) -> Vec<Line<'static>> {
    match content {
        PanelContent::Empty => Vec::new(),
        PanelContent::Thinking => vec![Line::from(Span::styled(
            crate::panel::THINKING,
            Style::default().add_modifier(Modifier::ITALIC),
        ))],
        PanelContent::Error(message) => message
            .lines()
            .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Red))))
            .collect(),
        PanelContent::Rendered(rendered) => {
            let mut lines = Vec::new();
            let mut code_index = 0;
            for block in &rendered.blocks {
                match block {
                    BlockView::Text(text) => {
                        lines.extend(text.lines().map(|l| Line::from(l.to_string())));
                    }
                    BlockView::Code(code) => {
                        let header_style = if code_index == selected {
                            Style::default().fg(Color::Black).bg(Color::Cyan)
                        } else {
                            Style::default().fg(Color::Cyan)
                        };
                        let language = if code.language.is_empty() {
                            "code"
                        } else {
                            code.language.as_str()
                        };
                        lines.push(Line::from(Span::styled(
                            format!(
                                "[{}] {}  [{}] [{}]",
                                code_index + 1,
                                language,
                                code.insert_label,
                                code.copy_label
                            ),
                            header_style,
                        )));
                        lines.extend(code.body.lines().map(|l| {
                            Line::from(Span::styled(
                                l.to_string(),
                                Style::default().fg(Color::LightGreen),
                            ))
                        }));
                        code_index += 1;
                    }
                }
            }
            if let Some(label) = rendered.insert_all_label {
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    format!("[{}]", label),
                    Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
                )));
            }
            lines
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClient;
    use crate::clipboard::SystemClipboard;
    use crate::endpoints::Endpoints;
    use crate::panel::{ResponseSink, INSERT_ALL_LABEL};
    use crate::sink::OutputSink;
    use ratatui::backend::TestBackend;

    fn app(file: Option<PathBuf>) -> App {
        let api = ApiClient::new(Endpoints::from_origin("http://127.0.0.1:9").unwrap());
        let editor = Arc::new(BufferEditor::new(""));
        let language = Arc::new(LanguageSelect::default());
        let output = Arc::new(OutputBuffer::new());
        let panel = Arc::new(ResponsePanel::new());
        let (_state_tx, connection) = watch::channel(ConnectionState::Disconnected);

        let ctx = AppContext {
            exec: ExecutionClient::new(api.clone(), editor.clone(), language.clone(), output.clone()),
            assist: AiAssistClient::new(
                api,
                editor.clone(),
                language.clone(),
                panel.clone(),
                Arc::new(SystemClipboard),
            ),
            editor,
            language,
            output,
            panel,
            connection,
            file,
        };
        App::new(ctx, Handle::current())
    }

    #[tokio::test]
    async fn test_editor_focused_on_load() {
        let app = app(None);
        assert!(app.ctx.editor.is_focused());
        assert_eq!(app.focus, Focus::Editor);
    }

    #[tokio::test]
    async fn test_typing_goes_to_focused_input() {
        let mut app = app(None);
        app.apply(Command::Edit(EditAction::Insert('x')));
        app.apply(Command::Edit(EditAction::Newline));
        assert_eq!(app.ctx.editor.text(), "x\n");

        app.apply(Command::CycleFocus);
        assert!(!app.ctx.editor.is_focused());
        app.apply(Command::Edit(EditAction::Insert('h')));
        app.apply(Command::Edit(EditAction::Insert('i')));
        app.apply(Command::Edit(EditAction::Backspace));
        assert_eq!(app.prompt, "h");
        assert_eq!(app.ctx.editor.text(), "x\n");
    }

    #[tokio::test]
    async fn test_cycle_language() {
        let mut app = app(None);
        app.apply(Command::CycleLanguage);
        assert_eq!(app.ctx.language.get(), shared::Language::JavaScript);
        assert_eq!(app.notice.as_deref(), Some("Language: javascript"));
    }

    #[tokio::test]
    async fn test_save_writes_editor_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.py");
        let mut app = app(Some(path.clone()));
        app.ctx.editor.set_text("print('hi')\n");
        app.apply(Command::Save);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "print('hi')\n");
    }

    #[tokio::test]
    async fn test_save_without_file_sets_notice() {
        let mut app = app(None);
        app.apply(Command::Save);
        assert!(app.notice.unwrap().starts_with("No file"));
    }

    #[tokio::test]
    async fn test_quit() {
        let mut app = app(None);
        app.apply(Command::Quit);
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_run_writes_output_through_exec() {
        let mut app = app(None);
        app.apply(Command::RunCode);
        // Nothing listens on the test origin, so the run ends in a transport error
        tokio::time::timeout(Duration::from_secs(5), async {
            while !app.ctx.output.text().starts_with("Error: ") {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[tokio::test]
    async fn test_output_pane_follows_wrapped_output() {
        let app = app(None);
        app.ctx.output.append("first\n");
        app.ctx
            .output
            .append(&format!("{}END_MARKER\n", "lorem ".repeat(100)));
        app.ctx.output.scroll_to_end();

        let screen = render(&app);
        assert!(screen.contains("END_MARKER"));
        assert!(!screen.contains("first"));
    }

    #[tokio::test]
    async fn test_output_pane_scrolled_to_top_shows_start() {
        let app = app(None);
        app.ctx.output.append("first\n");
        app.ctx
            .output
            .append(&format!("{}END_MARKER\n", "lorem ".repeat(100)));
        app.ctx.output.scroll_to_end();
        app.ctx.output.scroll_up(10);

        let screen = render(&app);
        assert!(screen.contains("first"));
        assert!(!screen.contains("END_MARKER"));
    }

    #[test]
    fn test_response_lines_mark_selected_block() {
        let panel = ResponsePanel::new();
        panel.show_response("intro\n```py\na\n```\n```\nb\n```");
        let lines = response_lines(&panel.content(), 1);
        let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();

        assert_eq!(text[0], "intro");
        assert_eq!(text[1], "[1] py  [Insert] [Copy]");
        assert_eq!(text[2], "a");
        // The newline between the fences is its own text block
        assert_eq!(text[3], "");
        assert_eq!(text[4], "[2] code  [Insert] [Copy]");
        assert_eq!(text.last().unwrap(), &format!("[{}]", INSERT_ALL_LABEL));
        assert_eq!(lines[4].spans[0].style.bg, Some(Color::Cyan));
        assert_eq!(lines[1].spans[0].style.bg, None);
    }
}
