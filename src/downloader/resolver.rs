//! Option resolution: raw prompt answers in, typed request pieces out.
//!
//! Nothing in here fails. Blank, malformed or out-of-range input is coerced to
//! the documented default so a bad answer never blocks the session.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::filters::AudioEffects;
use super::request::{
    AudioCodec, AudioOptions, Container, DEFAULT_BITRATE_KBPS, DownloadMode, QualityTier,
    VideoOptions,
};

const MAX_BITRATE_KBPS: u32 = 512;

/// Well-known folders offered by the folder menu, under the home directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellKnownFolder {
    Desktop,
    Downloads,
    Music,
    Videos,
    Documents,
}

impl WellKnownFolder {
    pub const fn all() -> &'static [WellKnownFolder] {
        &[
            WellKnownFolder::Desktop,
            WellKnownFolder::Downloads,
            WellKnownFolder::Music,
            WellKnownFolder::Videos,
            WellKnownFolder::Documents,
        ]
    }

    pub const fn name(&self) -> &'static str {
        match self {
            WellKnownFolder::Desktop => "Desktop",
            WellKnownFolder::Downloads => "Downloads",
            WellKnownFolder::Music => "Music",
            WellKnownFolder::Videos => "Videos",
            WellKnownFolder::Documents => "Documents",
        }
    }

    pub fn path_under(&self, home: &Path) -> PathBuf {
        home.join(self.name())
    }
}

/// Answer to the folder menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderChoice {
    WellKnown(WellKnownFolder),
    Custom,
}

/// Menu number of the custom-path entry.
pub const CUSTOM_FOLDER_CHOICE: usize = 6;

/// Blank selects Downloads. Unknown answers return `None` and the menu is shown again.
pub fn resolve_folder_choice(input: &str) -> Option<FolderChoice> {
    let input = input.trim();
    if input.is_empty() {
        return Some(FolderChoice::WellKnown(WellKnownFolder::Downloads));
    }
    match input.parse::<usize>().ok()? {
        CUSTOM_FOLDER_CHOICE => Some(FolderChoice::Custom),
        n @ 1..=5 => WellKnownFolder::all()
            .get(n - 1)
            .copied()
            .map(FolderChoice::WellKnown),
        _ => None,
    }
}

/// Expands a leading `~` to `home`. Blank input returns `None`.
pub fn resolve_custom_path(input: &str, home: &Path) -> Option<PathBuf> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if input == "~" {
        return Some(home.to_path_buf());
    }
    if let Some(rest) = input.strip_prefix("~/").or_else(|| input.strip_prefix("~\\")) {
        return Some(home.join(rest));
    }
    Some(PathBuf::from(input))
}

/// Top-level program mode picked after the folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Manual,
    Automatic,
}

pub fn resolve_run_mode(input: &str) -> RunMode {
    match input.trim() {
        "2" => RunMode::Automatic,
        _ => RunMode::Manual,
    }
}

/// Whether a URL points at a playlist or a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Playlist,
    SingleVideo,
}

impl ContentKind {
    pub const fn label(&self) -> &'static str {
        match self {
            ContentKind::Playlist => "Playlist",
            ContentKind::SingleVideo => "Single Video",
        }
    }
}

pub fn classify_url(url: &str) -> ContentKind {
    if url.contains("playlist") || url.contains("list=") {
        ContentKind::Playlist
    } else {
        ContentKind::SingleVideo
    }
}

/// Accepts only absolute `http`/`https` URLs with a host.
pub fn is_http_url(input: &str) -> bool {
    match url::Url::parse(input.trim()) {
        Ok(parsed) => {
            matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some()
        }
        Err(_) => false,
    }
}

/// Download type picked from the type menu, before its options are gathered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    VideoAndAudio,
    VideoOnly,
    AudioOnly,
    Playlist,
}

impl DownloadKind {
    pub const fn all() -> &'static [DownloadKind] {
        &[
            DownloadKind::VideoAndAudio,
            DownloadKind::VideoOnly,
            DownloadKind::AudioOnly,
            DownloadKind::Playlist,
        ]
    }

    pub const fn label(&self) -> &'static str {
        match self {
            DownloadKind::VideoAndAudio => "Video & Audio",
            DownloadKind::VideoOnly => "Video Only (No Audio)",
            DownloadKind::AudioOnly => "Audio Only (No Video)",
            DownloadKind::Playlist => "Entire Playlist (Video & Audio)",
        }
    }

    /// Default when the answer is blank or invalid.
    pub fn default_for(content: ContentKind) -> Self {
        match content {
            ContentKind::Playlist => DownloadKind::Playlist,
            ContentKind::SingleVideo => DownloadKind::VideoAndAudio,
        }
    }

    pub const fn needs_video(&self) -> bool {
        !matches!(self, DownloadKind::AudioOnly)
    }

    pub const fn needs_audio(&self) -> bool {
        !matches!(self, DownloadKind::VideoOnly)
    }

    /// Builds the mode, dropping whichever options this kind does not carry.
    /// Missing options fall back to their defaults.
    pub fn into_mode(self, video: Option<VideoOptions>, audio: Option<AudioOptions>) -> DownloadMode {
        match self {
            DownloadKind::VideoAndAudio => DownloadMode::VideoAndAudio {
                video: video.unwrap_or_default(),
                audio: audio.unwrap_or_default(),
            },
            DownloadKind::VideoOnly => DownloadMode::VideoOnly {
                video: video.unwrap_or_default(),
            },
            DownloadKind::AudioOnly => DownloadMode::AudioOnly {
                audio: audio.unwrap_or_default(),
            },
            DownloadKind::Playlist => DownloadMode::Playlist {
                video: video.unwrap_or_default(),
                audio: audio.unwrap_or_default(),
            },
        }
    }
}

pub fn resolve_download_kind(input: &str, content: ContentKind) -> DownloadKind {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| DownloadKind::all().get(idx).copied())
        .unwrap_or_else(|| DownloadKind::default_for(content))
}

/// Maps a 1-based quality menu answer to a tier; anything else is Best.
pub fn resolve_quality(input: &str) -> QualityTier {
    let tier = input
        .trim()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|idx| QualityTier::all().get(idx).copied());

    match tier {
        Some(tier) => tier,
        None => {
            if !input.trim().is_empty() {
                debug!(input, "quality choice out of range, using best available");
            }
            QualityTier::Best
        }
    }
}

pub fn resolve_container(input: &str) -> Container {
    let normalized = input.trim().trim_start_matches('.').to_ascii_lowercase();
    Container::all()
        .iter()
        .copied()
        .find(|c| c.extension() == normalized)
        .unwrap_or_default()
}

pub fn resolve_audio_codec(input: &str) -> AudioCodec {
    let normalized = input.trim().trim_start_matches('.').to_ascii_lowercase();
    match normalized.as_str() {
        "vorbis" => AudioCodec::Ogg,
        "aac" => AudioCodec::M4a,
        other => AudioCodec::all()
            .iter()
            .copied()
            .find(|c| c.to_string() == other)
            .unwrap_or_default(),
    }
}

/// Container for video muxed with `codec`: the chosen one when it can carry
/// the codec, mkv otherwise.
pub fn resolve_muxed_container(container: Container, codec: AudioCodec) -> Container {
    if container.carries(codec) {
        container
    } else {
        debug!(%container, %codec, "codec does not fit container, using mkv");
        Container::Mkv
    }
}

/// Bitrate in kbps. Accepts `256`, `256k` and `256kbps`; zero or anything
/// above 512 falls back to 192.
pub fn resolve_bitrate(input: &str) -> u32 {
    let normalized = input.trim().to_ascii_lowercase();
    let digits = normalized
        .strip_suffix("kbps")
        .or_else(|| normalized.strip_suffix('k'))
        .unwrap_or(&normalized)
        .trim();

    match digits.parse::<u32>() {
        Ok(kbps) if (1..=MAX_BITRATE_KBPS).contains(&kbps) => kbps,
        _ => DEFAULT_BITRATE_KBPS,
    }
}

pub fn resolve_yes(input: &str) -> bool {
    matches!(input.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Non-negative finite number of seconds (or dB); anything else is 0.
pub fn resolve_seconds(input: &str) -> f64 {
    match input.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Trim end time; blank, zero or malformed means "unknown".
pub fn resolve_end_time(input: &str) -> Option<f64> {
    let value = resolve_seconds(input);
    (value > 0.0).then_some(value)
}

/// Raw answers from the audio effects prompts.
#[derive(Debug, Clone, Default)]
pub struct EffectAnswers<'a> {
    pub bass: &'a str,
    pub normalize: &'a str,
    pub fade_in: &'a str,
    pub fade_out: &'a str,
    pub trim_start: &'a str,
    pub trim_end: &'a str,
}

pub fn resolve_effects(answers: &EffectAnswers<'_>) -> AudioEffects {
    AudioEffects {
        bass_gain_db: resolve_seconds(answers.bass),
        normalize: resolve_yes(answers.normalize),
        fade_in: resolve_seconds(answers.fade_in),
        fade_out: resolve_seconds(answers.fade_out),
        trim_start: resolve_seconds(answers.trim_start),
        trim_end: resolve_end_time(answers.trim_end),
    }
}

/// Shell-style split of the extra ffmpeg arguments prompt.
///
/// Malformed input (e.g. unclosed quotes) yields no extra arguments.
pub fn resolve_extra_args(input: &str) -> Vec<String> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    match shlex::split(input) {
        Some(args) => args,
        None => {
            warn!(input, "extra transcoder args have malformed shell syntax, ignoring");
            Vec::new()
        }
    }
}
