//! Projection of downloader status events onto a display percentage.

/// Status event emitted by the external downloader while it runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Bytes fetched so far; `total` is the reported size or estimate, if any
    Downloading { downloaded: u64, total: Option<u64> },
    Finished,
    Error(String),
}

/// Receives downloader events synchronously, from inside the download call.
pub trait ProgressObserver {
    fn on_event(&mut self, event: &ProgressEvent);
}

/// Progress of one download.
///
/// The percentage never goes down: multi-stream downloads restart the byte
/// counters for every stream, and those resets are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProgressState {
    pub completed_bytes: u64,
    pub total_bytes: Option<u64>,
    percentage: f64,
    failed: bool,
}

impl ProgressState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn percentage(&self) -> f64 {
        self.percentage
    }

    /// Whether the downloader reported an error event.
    pub fn failed(&self) -> bool {
        self.failed
    }

    pub fn is_finished(&self) -> bool {
        self.percentage >= 100.0
    }

    pub fn apply(&mut self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Downloading { downloaded, total } => {
                self.completed_bytes = *downloaded;
                // Unknown or zero total: keep the last value this tick
                let Some(total) = (*total).filter(|t| *t > 0) else {
                    return;
                };
                self.total_bytes = Some(total);
                let p = (*downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
                if p > self.percentage {
                    self.percentage = p;
                }
            }
            ProgressEvent::Finished => {
                self.percentage = 100.0;
                if let Some(total) = self.total_bytes {
                    self.completed_bytes = total;
                }
            }
            ProgressEvent::Error(_) => {
                self.failed = true;
            }
        }
    }
}

impl ProgressObserver for ProgressState {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.apply(event);
    }
}
