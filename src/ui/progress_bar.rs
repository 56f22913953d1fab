use std::fmt::Write as _;

use crossterm::style::Stylize;
use indicatif::{ProgressState as BarState, ProgressStyle};
use tracing::debug;

use crate::downloader::progress::{ProgressEvent, ProgressObserver, ProgressState};

use super::console::RAINBOW;

const BAR_WIDTH: u64 = 40;

/// Plain style, `████░░░░  50%`.
pub fn plain_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{bar:40} {percent:>3}%")
        .unwrap_or_else(|e| {
            debug!(error = %e, "bad progress template, using the default");
            ProgressStyle::default_bar()
        })
        .progress_chars("█░")
}

/// Same layout as [`plain_style`] with each filled cell in the next palette colour.
pub fn rainbow_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{rainbow_bar} {percent:>3}%")
        .map(|style| style.with_key("rainbow_bar", draw_rainbow_bar))
        .unwrap_or_else(|e| {
            debug!(error = %e, "bad progress template, using the plain bar");
            plain_style()
        })
}

fn draw_rainbow_bar(state: &BarState, out: &mut dyn std::fmt::Write) {
    let _ = out.write_str(&rainbow_cells(state.fraction()));
}

fn rainbow_cells(fraction: f32) -> String {
    let filled = (f64::from(fraction.clamp(0.0, 1.0)) * BAR_WIDTH as f64).round() as u64;
    let mut cells = String::new();
    for cell in 0..BAR_WIDTH {
        if cell < filled {
            let _ = write!(cells, "{}", '█'.with(RAINBOW[cell as usize % RAINBOW.len()]));
        } else {
            cells.push('░');
        }
    }
    cells
}

/// Draws a [`ProgressState`] on an indicatif bar while a download runs.
///
/// The bar runs from 0 to 100 and only moves forward. Call
/// [`ProgressBar::finish`] afterwards to clear the line.
pub struct ProgressBar {
    bar: indicatif::ProgressBar,
    state: ProgressState,
}

impl ProgressBar {
    pub fn new(bar: indicatif::ProgressBar) -> Self {
        bar.set_length(100);
        bar.set_position(0);
        Self {
            bar,
            state: ProgressState::new(),
        }
    }

    /// Clears the bar and hands back the final state.
    pub fn finish(self) -> ProgressState {
        self.bar.finish_and_clear();
        self.state
    }
}

impl ProgressObserver for ProgressBar {
    fn on_event(&mut self, event: &ProgressEvent) {
        self.state.apply(event);
        // indicatif throttles the redraw itself
        self.bar.set_position(self.state.percentage().floor() as u64);
    }
}
