//! Code execution - one request/response exchange per run

use shared::RunRequest;
use std::sync::Arc;

use crate::api::ApiClient;
use crate::editor::{Editor, LanguageSelect};
use crate::sink::OutputSink;

pub const RUNNING: &str = "Running...\n";
pub const NO_OUTPUT: &str = "No output";

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Output,
    ServerError,
    TransportError,
}

#[derive(Clone)]
pub struct ExecutionClient {
    api: ApiClient,
    editor: Arc<dyn Editor>,
    language: Arc<LanguageSelect>,
    output: Arc<dyn OutputSink>,
}

impl ExecutionClient {
    pub fn new(
        api: ApiClient,
        editor: Arc<dyn Editor>,
        language: Arc<LanguageSelect>,
        output: Arc<dyn OutputSink>,
    ) -> Self {
        Self {
            api,
            editor,
            language,
            output,
        }
    }

    /// Run the editor contents and write the result to the output sink.
    ///
    /// Overlapping runs are not cancelled: each one replaces the output when
    /// its response arrives, so the last response to land wins.
    pub async fn run_code(&self) -> RunOutcome {
        let request = RunRequest {
            code: self.editor.text(),
            language: self.language.get(),
        };

        self.output.replace(RUNNING);
        tracing::debug!("Running {} bytes of {}", request.code.len(), request.language);

        let (text, outcome) = match self.api.run(&request).await {
            Ok(result) => match result.error_message() {
                Some(error) => (format!("Error: {}\n", error), RunOutcome::ServerError),
                None => {
                    let output = result
                        .output
                        .filter(|o| !o.is_empty())
                        .unwrap_or_else(|| NO_OUTPUT.to_string());
                    (output, RunOutcome::Output)
                }
            },
            Err(e) => {
                tracing::warn!("Run request failed: {}", e);
                (format!("Error: {}\n", e), RunOutcome::TransportError)
            }
        };

        self.output.replace(&text);
        self.output.scroll_to_end();
        outcome
    }
}
