use tracing::warn;

use crate::utils::settings::Settings;

use super::progress_parser::progress_template;
use super::request::{AudioOptions, DownloadMode, DownloadRequest, VideoOptions};

const PLAYLIST_OUTPUT_TEMPLATE: &str = "%(playlist_title)s/%(playlist_index)s - %(title)s.%(ext)s";

/// NVENC H.264 encoder handed to ffmpeg when hardware encoding is on
const HARDWARE_VIDEO_ENCODER: &str = "h264_nvenc";

/// Stream-copy pass over the final file. Unlike the merger it also runs when
/// the format falls back to a single pre-muxed stream.
const AUDIO_TRANSCODE_POSTPROCESSOR: &str = "FFmpegCopyStream";
const AUDIO_TRANSCODE_ARGS_KEY: &str = "CopyStream";

/// Builds the yt-dlp argument list for one request.
///
/// # Parameters
///
/// * `settings` - Output template, fragment concurrency and custom args
/// * `request` - The resolved request
///
/// # Returns
///
/// All arguments for yt-dlp, with the URL last
pub fn build_ytdlp_command_args(settings: &Settings, request: &DownloadRequest) -> Vec<String> {
    let mut cmd_args = vec![
        "--newline".to_string(),
        "--no-warnings".to_string(),
        "--concurrent-fragments".to_string(),
        settings.concurrent_fragments.to_string(),
        "--output".to_string(),
        output_path(settings, request),
    ];

    cmd_args.push(if request.mode.is_playlist() {
        "--yes-playlist".to_string()
    } else {
        "--no-playlist".to_string()
    });

    match &request.mode {
        DownloadMode::VideoAndAudio { video, audio } | DownloadMode::Playlist { video, audio } => {
            push_video_args(&mut cmd_args, video, true);
            push_muxed_audio_args(&mut cmd_args, audio);
        }
        DownloadMode::VideoOnly { video } => {
            push_video_args(&mut cmd_args, video, false);
        }
        DownloadMode::AudioOnly { audio } => {
            push_extracted_audio_args(&mut cmd_args, audio);
        }
    }

    if !request.extra_transcoder_args.is_empty() {
        match shlex::try_join(request.extra_transcoder_args.iter().map(String::as_str)) {
            Ok(joined) => {
                cmd_args.push("--postprocessor-args".to_string());
                cmd_args.push(format!("ffmpeg:{}", joined));
            }
            Err(e) => warn!(error = %e, "extra transcoder args cannot be quoted, skipping them"),
        }
    }

    cmd_args.extend(settings.parse_custom_args());

    // Structured progress for the observer
    cmd_args.push("--progress-template".to_string());
    cmd_args.push(progress_template());

    cmd_args.push(request.url.clone());

    cmd_args
}

fn output_path(settings: &Settings, request: &DownloadRequest) -> String {
    let template = if request.mode.is_playlist() {
        PLAYLIST_OUTPUT_TEMPLATE
    } else {
        settings.output_template.as_str()
    };
    request
        .destination
        .join(template)
        .to_string_lossy()
        .to_string()
}

fn push_video_args(cmd_args: &mut Vec<String>, video: &VideoOptions, with_audio: bool) {
    let container = video.container.extension().to_string();

    cmd_args.push("--format".to_string());
    cmd_args.push(video.quality.format_expression(with_audio));

    if with_audio {
        cmd_args.push("--merge-output-format".to_string());
        cmd_args.push(container.clone());
    }

    if video.hardware_encode {
        cmd_args.push("--recode-video".to_string());
        cmd_args.push(container);
        cmd_args.push("--postprocessor-args".to_string());
        cmd_args.push(format!("VideoConvertor:-c:v {}", HARDWARE_VIDEO_ENCODER));
    } else if !with_audio {
        cmd_args.push("--remux-video".to_string());
        cmd_args.push(container);
    }
}

/// Audio muxed into the video container, re-encoded in a final copy pass
/// that keeps the video stream as is.
fn push_muxed_audio_args(cmd_args: &mut Vec<String>, audio: &AudioOptions) {
    let mut transcode = format!(
        "{}:-c:v copy -c:a {}",
        AUDIO_TRANSCODE_ARGS_KEY,
        audio.codec.ffmpeg_encoder()
    );
    if !audio.codec.is_lossless() {
        transcode.push_str(&format!(" -b:a {}k", audio.bitrate_kbps));
    }
    if let Some(filters) = &audio.filters {
        transcode.push_str(&format!(" -af {}", filters));
    }
    cmd_args.push("--use-postprocessor".to_string());
    cmd_args.push(AUDIO_TRANSCODE_POSTPROCESSOR.to_string());
    cmd_args.push("--postprocessor-args".to_string());
    cmd_args.push(transcode);
}

fn push_extracted_audio_args(cmd_args: &mut Vec<String>, audio: &AudioOptions) {
    cmd_args.push("--format".to_string());
    cmd_args.push("bestaudio/best".to_string());
    cmd_args.push("--extract-audio".to_string());
    cmd_args.push("--audio-format".to_string());
    cmd_args.push(audio.codec.name().to_string());
    cmd_args.push("--audio-quality".to_string());
    cmd_args.push(format!("{}K", audio.bitrate_kbps));

    if let Some(filters) = &audio.filters {
        cmd_args.push("--postprocessor-args".to_string());
        cmd_args.push(format!("ExtractAudio:-af {}", filters));
        cmd_args.push("--embed-metadata".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::filters::AudioEffects;
    use crate::downloader::progress_parser::{PROGRESS_MARKER_END, PROGRESS_MARKER_START};
    use crate::downloader::request::{AudioCodec, Container, QualityTier};
    use std::path::PathBuf;

    fn request(mode: DownloadMode) -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/watch?v=abc".to_string(),
            destination: PathBuf::from("/downloads"),
            mode,
            extra_transcoder_args: Vec::new(),
        }
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        let idx = args.iter().position(|a| a == flag)?;
        args.get(idx + 1).map(String::as_str)
    }

    fn has(args: &[String], value: &str) -> bool {
        args.iter().any(|a| a == value)
    }

    // ==================== Basic Command Building ====================

    #[test]
    fn test_url_is_last() {
        let req = request(DownloadMode::VideoAndAudio {
            video: VideoOptions::default(),
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);
        assert_eq!(args.last().map(String::as_str), Some("https://example.com/watch?v=abc"));
    }

    #[test]
    fn test_output_template_in_destination() {
        let req = request(DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);
        let output = value_after(&args, "--output").unwrap();
        assert!(output.starts_with("/downloads"));
        assert!(output.ends_with("%(title)s.%(ext)s"));
    }

    #[test]
    fn test_progress_template_and_newline() {
        let req = request(DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);
        assert!(has(&args, "--newline"));
        let template = value_after(&args, "--progress-template").unwrap();
        assert!(template.contains(PROGRESS_MARKER_START));
        assert!(template.contains(PROGRESS_MARKER_END));
        assert_eq!(value_after(&args, "--concurrent-fragments"), Some("4"));
    }

    // ==================== Mode Gating ====================

    #[test]
    fn test_audio_only_has_no_video_args() {
        let req = request(DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        assert_eq!(value_after(&args, "--format"), Some("bestaudio/best"));
        assert!(has(&args, "--extract-audio"));
        assert_eq!(value_after(&args, "--audio-format"), Some("mp3"));
        assert_eq!(value_after(&args, "--audio-quality"), Some("192K"));
        assert!(!has(&args, "--merge-output-format"));
        assert!(!has(&args, "--remux-video"));
        assert!(has(&args, "--no-playlist"));
    }

    #[test]
    fn test_video_only_has_no_audio_args() {
        let req = request(DownloadMode::VideoOnly {
            video: VideoOptions {
                quality: QualityTier::P720,
                container: Container::Mkv,
                hardware_encode: false,
            },
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        assert_eq!(value_after(&args, "--format"), Some("bestvideo[height<=720]"));
        assert_eq!(value_after(&args, "--remux-video"), Some("mkv"));
        assert!(!has(&args, "--extract-audio"));
        assert!(!args.iter().any(|a| a.starts_with("CopyStream:")));
        assert!(!has(&args, "--use-postprocessor"));
    }

    #[test]
    fn test_video_and_audio_muxes_with_codec() {
        let req = request(DownloadMode::VideoAndAudio {
            video: VideoOptions::default(),
            audio: AudioOptions {
                codec: AudioCodec::M4a,
                bitrate_kbps: 256,
                filters: None,
            },
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        assert_eq!(value_after(&args, "--format"), Some("bestvideo+bestaudio/best"));
        assert_eq!(value_after(&args, "--merge-output-format"), Some("mp4"));
        assert_eq!(value_after(&args, "--use-postprocessor"), Some("FFmpegCopyStream"));
        assert!(has(&args, "CopyStream:-c:v copy -c:a aac -b:a 256k"));
        assert!(!has(&args, "--extract-audio"));
    }

    #[test]
    fn test_lossless_codec_skips_bitrate() {
        let req = request(DownloadMode::VideoAndAudio {
            video: VideoOptions::default(),
            audio: AudioOptions {
                codec: AudioCodec::Flac,
                bitrate_kbps: 320,
                filters: None,
            },
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);
        assert!(has(&args, "CopyStream:-c:v copy -c:a flac"));
    }

    #[test]
    fn test_playlist_mode() {
        let req = request(DownloadMode::Playlist {
            video: VideoOptions::default(),
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        assert!(has(&args, "--yes-playlist"));
        assert!(!has(&args, "--no-playlist"));
        let output = value_after(&args, "--output").unwrap();
        assert!(output.contains("%(playlist_title)s"));
        assert!(output.contains("%(playlist_index)s"));
    }

    // ==================== Post-processing ====================

    #[test]
    fn test_hardware_encode_recodes_with_nvenc() {
        let req = request(DownloadMode::VideoAndAudio {
            video: VideoOptions {
                hardware_encode: true,
                ..Default::default()
            },
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        assert_eq!(value_after(&args, "--recode-video"), Some("mp4"));
        assert!(has(&args, "VideoConvertor:-c:v h264_nvenc"));
    }

    #[test]
    fn test_muxed_audio_settings_survive_single_file_fallback() {
        let filters = AudioEffects {
            bass_gain_db: 4.0,
            ..Default::default()
        }
        .build();
        let req = request(DownloadMode::VideoAndAudio {
            video: VideoOptions {
                container: Container::Mkv,
                ..Default::default()
            },
            audio: AudioOptions {
                codec: AudioCodec::Ogg,
                bitrate_kbps: 160,
                filters,
            },
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        // "/best" may skip the merge, so nothing audio-related rides on the merger
        assert!(value_after(&args, "--format").unwrap().ends_with("/best"));
        assert!(!args.iter().any(|a| a.starts_with("Merger:")));
        assert_eq!(value_after(&args, "--use-postprocessor"), Some("FFmpegCopyStream"));
        assert!(has(&args, "CopyStream:-c:v copy -c:a libvorbis -b:a 160k -af bass=g=4"));
    }

    #[test]
    fn test_audio_filters_attached_to_extraction() {
        let filters = AudioEffects {
            normalize: true,
            ..Default::default()
        }
        .build();
        let req = request(DownloadMode::AudioOnly {
            audio: AudioOptions {
                filters,
                ..Default::default()
            },
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        assert!(has(&args, "ExtractAudio:-af loudnorm"));
        assert!(has(&args, "--embed-metadata"));
    }

    #[test]
    fn test_no_filters_no_metadata_directive() {
        let req = request(DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&Settings::default(), &req);
        assert!(!has(&args, "--embed-metadata"));
        assert!(!args.iter().any(|a| a.starts_with("ExtractAudio:")));
    }

    #[test]
    fn test_extra_transcoder_args_are_quoted() {
        let mut req = request(DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        });
        req.extra_transcoder_args = vec!["-metadata".into(), "title=My Song".into()];
        let args = build_ytdlp_command_args(&Settings::default(), &req);

        let joined = args
            .iter()
            .find_map(|a| a.strip_prefix("ffmpeg:"))
            .unwrap();
        assert_eq!(
            shlex::split(joined).unwrap(),
            vec!["-metadata", "title=My Song"]
        );
    }

    #[test]
    fn test_custom_args_from_settings() {
        let settings = Settings {
            custom_ytdlp_args: "--limit-rate 2M".to_string(),
            ..Default::default()
        };
        let req = request(DownloadMode::AudioOnly {
            audio: AudioOptions::default(),
        });
        let args = build_ytdlp_command_args(&settings, &req);
        assert_eq!(value_after(&args, "--limit-rate"), Some("2M"));
    }
}
