//! The resolved download request handed to the external downloader.
//!
//! Each download mode carries only the options it needs, so an audio-only
//! request cannot hold video settings and vice versa.

use std::fmt;
use std::path::PathBuf;

use super::filters::AudioFilterChain;

/// Quality tiers offered by the quality menu, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QualityTier {
    /// Let yt-dlp pick the best streams
    #[default]
    Best,
    UHD8K,
    UHD4K,
    P2160,
    P1440,
    P1080,
    P720,
    P480,
    P360,
    P144,
}

impl QualityTier {
    /// All tiers in the order they appear in the menu (1-based there).
    pub const fn all() -> &'static [QualityTier] {
        &[
            QualityTier::Best,
            QualityTier::UHD8K,
            QualityTier::UHD4K,
            QualityTier::P2160,
            QualityTier::P1440,
            QualityTier::P1080,
            QualityTier::P720,
            QualityTier::P480,
            QualityTier::P360,
            QualityTier::P144,
        ]
    }

    pub const fn label(&self) -> &'static str {
        match self {
            QualityTier::Best => "Best (auto)",
            QualityTier::UHD8K => "8K",
            QualityTier::UHD4K => "4K",
            QualityTier::P2160 => "2160p",
            QualityTier::P1440 => "1440p",
            QualityTier::P1080 => "1080p",
            QualityTier::P720 => "720p",
            QualityTier::P480 => "480p",
            QualityTier::P360 => "360p",
            QualityTier::P144 => "144p",
        }
    }

    /// Maximum video height for this tier, `None` for [`QualityTier::Best`].
    pub const fn max_height(&self) -> Option<u32> {
        match self {
            QualityTier::Best => None,
            QualityTier::UHD8K => Some(4320),
            QualityTier::UHD4K | QualityTier::P2160 => Some(2160),
            QualityTier::P1440 => Some(1440),
            QualityTier::P1080 => Some(1080),
            QualityTier::P720 => Some(720),
            QualityTier::P480 => Some(480),
            QualityTier::P360 => Some(360),
            QualityTier::P144 => Some(144),
        }
    }

    /// yt-dlp format-selection expression for this tier.
    ///
    /// With `with_audio` the best audio stream is muxed in; otherwise only the
    /// video stream is selected.
    pub fn format_expression(&self, with_audio: bool) -> String {
        match (self.max_height(), with_audio) {
            (None, true) => "bestvideo+bestaudio/best".to_string(),
            (None, false) => "bestvideo".to_string(),
            (Some(h), true) => format!("bestvideo[height<={h}]+bestaudio/best[height<={h}]"),
            (Some(h), false) => format!("bestvideo[height<={h}]"),
        }
    }
}

/// Video containers the user can pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Container {
    #[default]
    Mp4,
    Mkv,
    Mov,
    Avi,
}

impl Container {
    pub const fn all() -> &'static [Container] {
        &[Container::Mp4, Container::Mkv, Container::Mov, Container::Avi]
    }

    pub const fn extension(&self) -> &'static str {
        match self {
            Container::Mp4 => "mp4",
            Container::Mkv => "mkv",
            Container::Mov => "mov",
            Container::Avi => "avi",
        }
    }

    /// Whether ffmpeg can mux `codec` into this container.
    ///
    /// mp4 and mov only take mp3 and aac, avi adds PCM. mkv takes everything.
    pub const fn carries(&self, codec: AudioCodec) -> bool {
        match self {
            Container::Mkv => true,
            Container::Mp4 | Container::Mov => {
                matches!(codec, AudioCodec::Mp3 | AudioCodec::M4a)
            }
            Container::Avi => matches!(codec, AudioCodec::Mp3 | AudioCodec::M4a | AudioCodec::Wav),
        }
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Audio codecs the transcoder is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AudioCodec {
    #[default]
    Mp3,
    M4a,
    Flac,
    Wav,
    Ogg,
}

impl AudioCodec {
    pub const fn all() -> &'static [AudioCodec] {
        &[
            AudioCodec::Mp3,
            AudioCodec::M4a,
            AudioCodec::Flac,
            AudioCodec::Wav,
            AudioCodec::Ogg,
        ]
    }

    /// Name understood by `yt-dlp --audio-format`.
    pub const fn name(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::M4a => "m4a",
            AudioCodec::Flac => "flac",
            AudioCodec::Wav => "wav",
            AudioCodec::Ogg => "vorbis",
        }
    }

    /// ffmpeg encoder used when the audio is re-encoded inside a video container.
    pub const fn ffmpeg_encoder(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::M4a => "aac",
            AudioCodec::Flac => "flac",
            AudioCodec::Wav => "pcm_s16le",
            AudioCodec::Ogg => "libvorbis",
        }
    }

    /// Lossless codecs ignore the bitrate setting.
    pub const fn is_lossless(&self) -> bool {
        matches!(self, AudioCodec::Flac | AudioCodec::Wav)
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AudioCodec::Ogg => "ogg",
            other => other.name(),
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoOptions {
    pub quality: QualityTier,
    pub container: Container,
    /// Re-encode through the NVENC encoder. Only set when the probe found one.
    pub hardware_encode: bool,
}

impl Default for VideoOptions {
    fn default() -> Self {
        Self {
            quality: QualityTier::Best,
            container: Container::Mp4,
            hardware_encode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AudioOptions {
    pub codec: AudioCodec,
    pub bitrate_kbps: u32,
    pub filters: Option<AudioFilterChain>,
}

pub const DEFAULT_BITRATE_KBPS: u32 = 192;

impl Default for AudioOptions {
    fn default() -> Self {
        Self {
            codec: AudioCodec::Mp3,
            bitrate_kbps: DEFAULT_BITRATE_KBPS,
            filters: None,
        }
    }
}

/// What to fetch, with only the options that mode needs.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadMode {
    VideoAndAudio { video: VideoOptions, audio: AudioOptions },
    VideoOnly { video: VideoOptions },
    AudioOnly { audio: AudioOptions },
    /// Every entry of a playlist, video muxed with audio
    Playlist { video: VideoOptions, audio: AudioOptions },
}

impl DownloadMode {
    pub fn video(&self) -> Option<&VideoOptions> {
        match self {
            DownloadMode::VideoAndAudio { video, .. }
            | DownloadMode::VideoOnly { video }
            | DownloadMode::Playlist { video, .. } => Some(video),
            DownloadMode::AudioOnly { .. } => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioOptions> {
        match self {
            DownloadMode::VideoAndAudio { audio, .. }
            | DownloadMode::AudioOnly { audio }
            | DownloadMode::Playlist { audio, .. } => Some(audio),
            DownloadMode::VideoOnly { .. } => None,
        }
    }

    pub fn is_playlist(&self) -> bool {
        matches!(self, DownloadMode::Playlist { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            DownloadMode::VideoAndAudio { .. } => "Video & Audio",
            DownloadMode::VideoOnly { .. } => "Video Only",
            DownloadMode::AudioOnly { .. } => "Audio Only",
            DownloadMode::Playlist { .. } => "Playlist",
        }
    }
}

/// One download, built fresh for every loop iteration.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub destination: PathBuf,
    pub mode: DownloadMode,
    /// Extra ffmpeg arguments, in order
    pub extra_transcoder_args: Vec<String>,
}

impl DownloadRequest {
    /// The fixed configuration used by the clipboard watcher: best quality
    /// muxed to mp4, audio at mp3 320 kbps.
    pub fn automatic(url: impl Into<String>, destination: PathBuf, hardware_encode: bool) -> Self {
        Self {
            url: url.into(),
            destination,
            mode: DownloadMode::VideoAndAudio {
                video: VideoOptions {
                    quality: QualityTier::Best,
                    container: Container::Mp4,
                    hardware_encode,
                },
                audio: AudioOptions {
                    codec: AudioCodec::Mp3,
                    bitrate_kbps: 320,
                    filters: None,
                },
            },
            extra_transcoder_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_format_expression() {
        assert_eq!(
            QualityTier::Best.format_expression(true),
            "bestvideo+bestaudio/best"
        );
        assert_eq!(QualityTier::Best.format_expression(false), "bestvideo");
    }

    #[test]
    fn test_capped_format_expression() {
        assert_eq!(
            QualityTier::P1080.format_expression(true),
            "bestvideo[height<=1080]+bestaudio/best[height<=1080]"
        );
        assert_eq!(
            QualityTier::UHD8K.format_expression(false),
            "bestvideo[height<=4320]"
        );
    }

    #[test]
    fn test_quality_menu_has_ten_tiers() {
        let tiers = QualityTier::all();
        assert_eq!(tiers.len(), 10);
        assert_eq!(tiers[0], QualityTier::Best);
        assert_eq!(tiers[9], QualityTier::P144);
    }

    #[test]
    fn test_audio_only_has_no_video_fields() {
        let mode = DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        };
        assert!(mode.video().is_none());
        assert!(mode.audio().is_some());
    }

    #[test]
    fn test_video_only_has_no_audio_fields() {
        let mode = DownloadMode::VideoOnly {
            video: VideoOptions::default(),
        };
        assert!(mode.audio().is_none());
        assert!(mode.video().is_some());
    }

    #[test]
    fn test_automatic_request() {
        let request = DownloadRequest::automatic("https://example.com/v", PathBuf::from("/dl"), true);
        let audio = request.mode.audio().unwrap();
        assert_eq!(audio.codec, AudioCodec::Mp3);
        assert_eq!(audio.bitrate_kbps, 320);
        let video = request.mode.video().unwrap();
        assert_eq!(video.quality, QualityTier::Best);
        assert!(video.hardware_encode);
        assert!(!request.mode.is_playlist());
    }

    #[test]
    fn test_automatic_request_fits_its_container() {
        let request = DownloadRequest::automatic("https://example.com/v", PathBuf::from("/dl"), false);
        let video = request.mode.video().unwrap();
        let audio = request.mode.audio().unwrap();
        assert!(video.container.carries(audio.codec));
        assert!(!Container::Mp4.carries(AudioCodec::Wav));
    }

    #[test]
    fn test_ogg_maps_to_vorbis_for_ytdlp() {
        assert_eq!(AudioCodec::Ogg.name(), "vorbis");
        assert_eq!(AudioCodec::Ogg.to_string(), "ogg");
    }
}
