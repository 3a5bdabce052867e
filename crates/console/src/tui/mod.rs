//! Terminal console
//!
//! Provides a split-screen interface with:
//! - Left: code editor over the output panel
//! - Right: AI prompt over the rendered AI response
//! - Bottom: connection status and key hints

mod app;
mod keymap;

pub use app::{App, AppContext};
