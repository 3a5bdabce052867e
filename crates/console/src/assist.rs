//! AI-assisted generation and the actions attached to rendered code blocks

use shared::GenerateRequest;
use std::sync::Arc;
use std::time::Duration;

use crate::api::ApiClient;
use crate::clipboard::Clipboard;
use crate::editor::{Editor, LanguageSelect};
use crate::panel::{ActionId, ResponsePanel, ResponseSink, COPIED_LABEL, INSERTED_LABEL};

/// How long an acknowledgment label stays up
pub const ACK_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Blank prompt, nothing sent
    Skipped,
    Rendered,
    ServerError,
    TransportError,
}

#[derive(Clone)]
pub struct AiAssistClient {
    api: ApiClient,
    editor: Arc<dyn Editor>,
    language: Arc<LanguageSelect>,
    panel: Arc<ResponsePanel>,
    clipboard: Arc<dyn Clipboard>,
}

impl AiAssistClient {
    pub fn new(
        api: ApiClient,
        editor: Arc<dyn Editor>,
        language: Arc<LanguageSelect>,
        panel: Arc<ResponsePanel>,
        clipboard: Arc<dyn Clipboard>,
    ) -> Self {
        Self {
            api,
            editor,
            language,
            panel,
            clipboard,
        }
    }

    /// Ask the backend to generate code for `prompt`.
    ///
    /// A blank prompt is a no-op. The generate control is disabled while the
    /// request is in flight and re-enabled whatever the outcome.
    pub async fn generate_code(&self, prompt: &str) -> GenerateOutcome {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return GenerateOutcome::Skipped;
        }

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            language: self.language.get(),
            current_code: self.editor.text(),
        };

        self.panel.show_thinking();
        self.panel.set_generate_enabled(false);

        let outcome = match self.api.generate(&request).await {
            Ok(result) => match result.error_message() {
                Some(error) => {
                    self.panel.show_error(&format!("Error: {}", error));
                    GenerateOutcome::ServerError
                }
                None => {
                    self.show_response(result.response.as_deref().unwrap_or_default());
                    GenerateOutcome::Rendered
                }
            },
            Err(e) => {
                tracing::warn!("Generate request failed: {}", e);
                self.panel.show_error(&format!("Error: {}", e));
                GenerateOutcome::TransportError
            }
        };

        self.panel.set_generate_enabled(true);
        outcome
    }

    /// Render a raw response, also used for pushed AI responses
    pub fn show_response(&self, response: &str) {
        self.panel.show_response(response);
    }

    /// Copy the `index`-th code block to the clipboard
    pub fn copy_block(&self, index: usize) -> bool {
        let Some(body) = self.panel.code_body(index) else {
            return false;
        };

        if let Err(e) = self.clipboard.set_text(&body) {
            tracing::warn!("Copy failed: {}", e);
            return false;
        }

        self.acknowledge(ActionId::Copy(index), COPIED_LABEL);
        true
    }

    /// Append the `index`-th code block to the editor
    pub fn insert_block(&self, index: usize) -> bool {
        let Some(body) = self.panel.code_body(index) else {
            return false;
        };

        self.editor.append_snippet(&body);
        self.acknowledge(ActionId::Insert(index), INSERTED_LABEL);
        true
    }

    /// Append every rendered code block to the editor in one go
    pub fn insert_all(&self) -> bool {
        let Some(combined) = self.panel.combined_code() else {
            return false;
        };
        if combined.trim().is_empty() {
            return false;
        }

        self.editor.append_snippet(&combined);
        self.acknowledge(ActionId::InsertAll, INSERTED_LABEL);
        true
    }

    /// Flip the label now and put it back after [`ACK_DURATION`]. Earlier
    /// pending reverts are left running. A revert scheduled against a
    /// response that has since been replaced does nothing.
    fn acknowledge(&self, action: ActionId, label: &'static str) {
        let generation = self.panel.generation();
        self.panel.set_label(action, label);
        let panel = self.panel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(ACK_DURATION).await;
            panel.reset_label(action, generation);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardError;
    use crate::editor::BufferEditor;
    use crate::endpoints::Endpoints;
    use crate::panel::{BlockView, PanelContent, COPY_LABEL, INSERT_ALL_LABEL, THINKING};
    use shared::Language;
    use std::sync::Mutex;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct MemoryClipboard {
        copied: Mutex<Vec<String>>,
    }

    impl Clipboard for MemoryClipboard {
        fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
            self.copied.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl Clipboard for BrokenClipboard {
        fn set_text(&self, _text: &str) -> Result<(), ClipboardError> {
            Err(ClipboardError::Unavailable(arboard::Error::ClipboardNotSupported))
        }
    }

    struct Fixture {
        client: AiAssistClient,
        editor: Arc<BufferEditor>,
        panel: Arc<ResponsePanel>,
        clipboard: Arc<MemoryClipboard>,
    }

    fn fixture(origin: &str, code: &str) -> Fixture {
        let editor = Arc::new(BufferEditor::new(code));
        let panel = Arc::new(ResponsePanel::new());
        let clipboard = Arc::new(MemoryClipboard::default());
        let client = AiAssistClient::new(
            ApiClient::new(Endpoints::from_origin(origin).unwrap()),
            editor.clone(),
            Arc::new(LanguageSelect::new(Language::Python)),
            panel.clone(),
            clipboard.clone(),
        );
        Fixture {
            client,
            editor,
            panel,
            clipboard,
        }
    }

    fn copy_label(panel: &ResponsePanel, index: usize) -> &'static str {
        match panel.content() {
            PanelContent::Rendered(rendered) => rendered.code_blocks().nth(index).unwrap().copy_label,
            other => panic!("Expected rendered content, got {:?}", other),
        }
    }

    fn insert_all_label(panel: &ResponsePanel) -> Option<&'static str> {
        match panel.content() {
            PanelContent::Rendered(rendered) => rendered.insert_all_label,
            other => panic!("Expected rendered content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_prompt_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let f = fixture(&server.uri(), "");
        assert_eq!(f.client.generate_code("   \n\t").await, GenerateOutcome::Skipped);
        assert_eq!(f.client.generate_code("").await, GenerateOutcome::Skipped);
        assert_eq!(f.panel.content(), PanelContent::Empty);
        assert!(!f.panel.is_visible());
    }

    #[tokio::test]
    async fn test_generate_renders_segments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Hello\n```python\nprint(1)\n```\nBye",
                "error": null
            })))
            .expect(1)
            .mount(&server)
            .await;

        let f = fixture(&server.uri(), "x = 1");
        assert_eq!(f.client.generate_code("  say hi  ").await, GenerateOutcome::Rendered);
        assert!(f.panel.is_visible());
        assert!(f.panel.generate_enabled());

        let PanelContent::Rendered(rendered) = f.panel.content() else {
            panic!("Expected rendered content");
        };
        assert_eq!(rendered.blocks.len(), 3);
        assert_eq!(rendered.blocks[0], BlockView::Text("Hello\n".to_string()));
        assert_eq!(rendered.blocks[2], BlockView::Text("\nBye".to_string()));
        assert_eq!(rendered.code_blocks().next().unwrap().body, "print(1)\n");
        assert_eq!(rendered.insert_all_label, Some(INSERT_ALL_LABEL));
    }

    #[tokio::test]
    async fn test_generate_sends_trimmed_prompt_and_current_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/generate"))
            .and(wiremock::matchers::body_json(serde_json::json!({
                "prompt": "add tests",
                "language": "python",
                "currentCode": "def f(): pass"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"response": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let f = fixture(&server.uri(), "def f(): pass");
        assert_eq!(f.client.generate_code(" add tests\n").await, GenerateOutcome::Rendered);
    }

    #[tokio::test]
    async fn test_server_error_renders_error_block() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "OpenRouter API error: rate limited",
                "response": ""
            })))
            .mount(&server)
            .await;

        let f = fixture(&server.uri(), "");
        assert_eq!(f.client.generate_code("go").await, GenerateOutcome::ServerError);
        assert_eq!(
            f.panel.content(),
            PanelContent::Error("Error: OpenRouter API error: rate limited".to_string())
        );
        assert!(f.panel.generate_enabled());
    }

    #[tokio::test]
    async fn test_transport_failure_renders_error_and_reenables() {
        let f = fixture("http://127.0.0.1:9", "");
        assert_eq!(f.client.generate_code("go").await, GenerateOutcome::TransportError);
        match f.panel.content() {
            PanelContent::Error(message) => assert!(message.starts_with("Error: ")),
            other => panic!("Expected error content, got {:?}", other),
        }
        assert!(f.panel.generate_enabled());
    }

    #[tokio::test]
    async fn test_thinking_placeholder_while_in_flight() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/ai/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "done"}))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;

        let f = fixture(&server.uri(), "");
        let client = f.client.clone();
        let task = tokio::spawn(async move { client.generate_code("go").await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.panel.content(), PanelContent::Thinking);
        assert!(f.panel.is_visible());
        assert!(!f.panel.generate_enabled());
        assert_eq!(THINKING, "AI is thinking...");

        task.await.unwrap();
        assert!(f.panel.generate_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_block_flips_label_for_two_seconds() {
        let f = fixture("http://127.0.0.1:9", "");
        f.client.show_response("```js\nconsole.log(1)\n```");

        assert!(f.client.copy_block(0));
        assert_eq!(*f.clipboard.copied.lock().unwrap(), vec!["console.log(1)\n"]);
        assert_eq!(copy_label(&f.panel, 0), COPIED_LABEL);

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(copy_label(&f.panel, 0), COPIED_LABEL);

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(copy_label(&f.panel, 0), COPY_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_copy_failure_leaves_label() {
        let editor = Arc::new(BufferEditor::default());
        let panel = Arc::new(ResponsePanel::new());
        let client = AiAssistClient::new(
            ApiClient::new(Endpoints::from_origin("http://127.0.0.1:9").unwrap()),
            editor,
            Arc::new(LanguageSelect::default()),
            panel.clone(),
            Arc::new(BrokenClipboard),
        );
        client.show_response("```\nx```");
        assert!(!client.copy_block(0));
        assert_eq!(copy_label(&panel, 0), COPY_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_block_appends_on_new_line() {
        let f = fixture("http://127.0.0.1:9", "x = 1");
        f.client.show_response("text\n```python\nprint(x)\n```");

        assert!(f.client.insert_block(0));
        assert_eq!(f.editor.text(), "x = 1\nprint(x)\n");
        assert!(!f.client.insert_block(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_all_aggregates_code_only() {
        let f = fixture("http://127.0.0.1:9", "old");
        f.client.show_response("intro\n```\na```\nbetween\n```\nb```\noutro");

        assert!(f.client.insert_all());
        assert_eq!(f.editor.text(), "old\na\n\nb\n\n");
        assert_eq!(insert_all_label(&f.panel), Some(INSERTED_LABEL));

        tokio::time::sleep(ACK_DURATION + Duration::from_millis(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(insert_all_label(&f.panel), Some(INSERT_ALL_LABEL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_all_without_code_does_nothing() {
        let f = fixture("http://127.0.0.1:9", "old");
        f.client.show_response("Just use a dictionary.");

        assert!(!f.client.insert_all());
        assert_eq!(f.editor.text(), "old");
        assert_eq!(insert_all_label(&f.panel), Some(INSERT_ALL_LABEL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_from_previous_response_leaves_new_label() {
        let f = fixture("http://127.0.0.1:9", "");
        f.client.show_response("```\nfirst```");
        f.client.copy_block(0);

        tokio::time::sleep(Duration::from_millis(1000)).await;
        f.client.show_response("```\nsecond```");
        f.client.copy_block(0);

        // The first response's timer fires at 2s and must not touch the new block
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert_eq!(copy_label(&f.panel, 0), COPIED_LABEL);

        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        assert_eq!(copy_label(&f.panel, 0), COPY_LABEL);
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_copy_reverts_from_first_timer() {
        let f = fixture("http://127.0.0.1:9", "");
        f.client.show_response("```\nx```");

        f.client.copy_block(0);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        f.client.copy_block(0);

        // The first timer still fires and shortens the second flash
        tokio::time::sleep(Duration::from_millis(600)).await;
        tokio::task::yield_now().await;
        assert_eq!(copy_label(&f.panel, 0), COPY_LABEL);
    }
}
