//! Audio effect chain rendered as an ffmpeg `-af` filter graph.

use std::fmt;

/// Audio effects, applied in a fixed order: bass boost, loudness
/// normalization, fade-in, fade-out, trim.
///
/// Times are in seconds. Zero means "off" for every numeric stage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AudioEffects {
    pub bass_gain_db: f64,
    pub normalize: bool,
    pub fade_in: f64,
    pub fade_out: f64,
    pub trim_start: f64,
    pub trim_end: Option<f64>,
}

/// A non-empty filter-graph string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFilterChain(String);

impl fmt::Display for AudioFilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AudioEffects {
    /// Builds the filter graph, or `None` when no stage is active.
    ///
    /// Fade-out and trim need a known end time and are skipped without one.
    pub fn build(&self) -> Option<AudioFilterChain> {
        let mut filters = Vec::new();

        if self.bass_gain_db > 0.0 {
            filters.push(format!("bass=g={}", self.bass_gain_db));
        }
        if self.normalize {
            filters.push("loudnorm".to_string());
        }
        if self.fade_in > 0.0 {
            filters.push(format!("afade=t=in:st=0:d={}", self.fade_in));
        }
        if let Some(end) = self.trim_end.filter(|end| *end > 0.0) {
            if self.fade_out > 0.0 {
                let start = (end - self.fade_out).max(0.0);
                filters.push(format!("afade=t=out:st={}:d={}", start, self.fade_out));
            }
            filters.push(format!("atrim=start={}:end={}", self.trim_start.max(0.0), end));
        }

        if filters.is_empty() {
            None
        } else {
            Some(AudioFilterChain(filters.join(",")))
        }
    }
}
