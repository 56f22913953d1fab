use arboard::Clipboard;
use tracing::debug;

use crate::errors::Result;

/// Read-only access to the clipboard text.
pub trait ClipboardSource {
    /// Current clipboard text, trimmed. Empty when the clipboard holds no text.
    fn read_text(&mut self) -> Result<String>;
}

/// The system clipboard via arboard, opened on first use.
#[derive(Default)]
pub struct SystemClipboard {
    inner: Option<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ClipboardSource for SystemClipboard {
    fn read_text(&mut self) -> Result<String> {
        let mut clipboard = match self.inner.take() {
            Some(clipboard) => clipboard,
            None => Clipboard::new()?,
        };

        let text = match clipboard.get_text() {
            Ok(text) => text.trim().to_string(),
            Err(arboard::Error::ContentNotAvailable) => {
                debug!("clipboard holds no text");
                String::new()
            }
            Err(e) => return Err(e.into()),
        };

        self.inner = Some(clipboard);
        Ok(text)
    }
}

#[cfg(test)]
pub use scripted::ScriptedClipboard;
