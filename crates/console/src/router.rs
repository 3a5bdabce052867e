//! Dispatches pushed events to the output and response sinks

use shared::InboundEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::panel::ResponseSink;
use crate::sink::OutputSink;

#[derive(Clone)]
pub struct MessageRouter {
    output: Arc<dyn OutputSink>,
    responses: Arc<dyn ResponseSink>,
}

impl MessageRouter {
    pub fn new(output: Arc<dyn OutputSink>, responses: Arc<dyn ResponseSink>) -> Self {
        Self { output, responses }
    }

    pub fn dispatch(&self, event: InboundEvent) {
        match event {
            InboundEvent::Output { content } => {
                self.output.append(&format!("{}\n", content));
                self.output.scroll_to_end();
            }
            InboundEvent::AiResponse { content } => {
                self.responses.show_response(&content);
            }
            InboundEvent::Error { content } => {
                self.output.append(&format!("Error: {}\n", content));
                self.output.scroll_to_end();
            }
            InboundEvent::Unknown => {
                tracing::debug!("Ignoring event with unknown type");
            }
        }
    }

    /// Dispatch events until every sender is gone
    pub async fn pump(self, mut events: mpsc::Receiver<InboundEvent>) {
        while let Some(event) = events.recv().await {
            self.dispatch(event);
        }
    }
}
