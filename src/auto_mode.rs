//! Clipboard watcher: downloads every new URL copied to the clipboard.

use std::{path::Path, time::Duration};

use notify_rust::Notification;
use tracing::{debug, info, warn};

use crate::{
    downloader::{request::DownloadRequest, resolver::is_http_url, worker::Downloader},
    errors::Result,
    session::{download_with_progress, failure_reason},
    ui::console::Console,
    utils::{clipboard::ClipboardSource, display::short_url_label, interrupt::Interrupt},
};

/// Something that can tell the user a download finished.
pub trait Notifier {
    fn notify(&mut self, summary: &str, body: &str);
}

/// Desktop notifications via notify-rust. Failures are logged and ignored.
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&mut self, summary: &str, body: &str) {
        if let Err(e) = Notification::new().summary(summary).body(body).show() {
            warn!(error = %e, "desktop notification failed");
        }
    }
}

pub struct AutoMode<'a> {
    pub console: &'a mut dyn Console,
    pub clipboard: &'a mut dyn ClipboardSource,
    pub downloader: &'a mut dyn Downloader,
    pub notifier: Option<&'a mut dyn Notifier>,
    pub interrupt: &'a Interrupt,
    pub destination: &'a Path,
    pub hardware_encode: bool,
    pub poll_interval: Duration,
}

impl AutoMode<'_> {
    /// Polls until interrupted.
    ///
    /// A URL is downloaded once when it first shows up; it has to be replaced
    /// by another URL before it triggers again. Download and clipboard
    /// failures are reported and polling carries on.
    pub fn run(&mut self) -> Result<()> {
        self.console
            .say("🚀 Automatic Archival Mode Active (Clipboard Watcher)")?;
        self.console
            .say("Copy a video URL and it will download automatically! Press Ctrl+C to stop.")?;
        self.console.say("")?;

        let mut last_url = String::new();
        let mut clipboard_failing = false;

        while !self.interrupt.is_requested() {
            match self.clipboard.read_text() {
                Ok(text) => {
                    clipboard_failing = false;
                    if text != last_url && is_http_url(&text) {
                        last_url = text;
                        self.download(&last_url)?;
                    }
                }
                Err(e) if e.is_recoverable() => {
                    if !clipboard_failing {
                        warn!(error = %e, "clipboard unavailable, still watching");
                        clipboard_failing = true;
                    }
                }
                Err(e) => return Err(e),
            }

            if self.interrupt.sleep(self.poll_interval) {
                break;
            }
        }

        debug!("clipboard watcher stopped");
        self.console.say("👋 Exiting Automatic Mode")
    }

    fn download(&mut self, url: &str) -> Result<()> {
        self.console.say(&format!("Detected URL: {}", url))?;
        let request =
            DownloadRequest::automatic(url, self.destination.to_path_buf(), self.hardware_encode);
        info!(url, "automatic download");

        match download_with_progress(&mut *self.console, &mut *self.downloader, &request) {
            Ok(()) => {
                self.console.say("✅ Automatic download complete!")?;
                if let Some(notifier) = self.notifier.as_deref_mut() {
                    notifier.notify(
                        "NASA Downloader",
                        &format!(
                            "Downloaded {} to {}",
                            short_url_label(url),
                            self.destination.display()
                        ),
                    );
                }
            }
            Err(e) => {
                warn!(url, error = %e, "automatic download failed");
                self.console
                    .alert(&format!("❌ Download failed: {}", failure_reason(&e)))?;
            }
        }
        Ok(())
    }
}
