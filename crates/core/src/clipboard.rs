//! Clipboard access for the selection copy action.
//!
//! [`SystemClipboard`] uses the `arboard` crate for cross-platform clipboard
//! access. Anything else that can receive text (a test double, a remote
//! session) implements [`ClipboardSink`].

use crate::error::ClipboardError;
use arboard::Clipboard;

pub trait ClipboardSink {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// The operating system clipboard, opened lazily on first write.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.inner.is_none() {
            let clipboard = Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            self.inner = Some(clipboard);
        }

        let Some(clipboard) = self.inner.as_mut() else {
            return Err(ClipboardError::Unavailable("clipboard not initialized".to_string()));
        };

        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::CopyFailed(e.to_string()))
    }
}

/// In-memory clipboard that records every write.
#[derive(Debug, Default, Clone)]
pub struct MemoryClipboard {
    pub writes: Vec<String>,
}

impl MemoryClipboard {
    pub fn last(&self) -> Option<&str> {
        self.writes.last().map(String::as_str)
    }
}

impl ClipboardSink for MemoryClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        self.writes.push(text.to_string());
        Ok(())
    }
}
