//! Clipboard helper for copying code blocks to the system clipboard
//!
//! Uses `arboard` for cross-platform support. The clipboard is created fresh
//! on every copy so no display-server handle is held between copies.

use arboard::Clipboard as SystemHandle;

#[derive(Debug, thiserror::Error)]
pub enum ClipboardError {
    #[error("failed to access clipboard: {0}")]
    Unavailable(#[source] arboard::Error),
    #[error("failed to set clipboard text: {0}")]
    Write(#[source] arboard::Error),
}

pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// The real desktop clipboard
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = SystemHandle::new().map_err(ClipboardError::Unavailable)?;
        clipboard
            .set_text(text.to_string())
            .map_err(ClipboardError::Write)?;
        Ok(())
    }
}
