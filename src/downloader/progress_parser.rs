//! Parser for yt-dlp output lines.
//!
//! Understands the structured progress template we pass on the command line
//! as well as yt-dlp's regular `[download]` output, and turns both into
//! [`ProgressEvent`]s.

use super::progress::ProgressEvent;

/// Represents a parsed line from yt-dlp output
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    /// Status update for the progress observer
    Progress(ProgressEvent),
    /// Post-processing status (merging, extracting audio, converting)
    PostProcess(String),
    /// Destination file path
    Destination(String),
    /// Already on disk, nothing fetched
    AlreadyDownloaded(String),
    /// Error message
    Error(String),
    /// Other informational output
    Info(String),
    /// Output that should be ignored (not logged)
    Ignore,
}

/// Custom progress template markers
pub const PROGRESS_MARKER_START: &str = "|PROGRESS|";
pub const PROGRESS_MARKER_END: &str = "|PROGRESS_END|";

/// Value for `--progress-template`.
///
/// Format: |PROGRESS|status|downloaded|total|total_estimate|PROGRESS_END|
pub fn progress_template() -> String {
    format!(
        "download:{}%(progress.status)s|%(progress.downloaded_bytes)s|%(progress.total_bytes)s|%(progress.total_bytes_estimate)s{}",
        PROGRESS_MARKER_START, PROGRESS_MARKER_END
    )
}

/// Parses a line of yt-dlp output
pub fn parse_ytdlp_line(line: &str) -> ParsedOutput {
    let line = line.trim();

    if line.is_empty() {
        return ParsedOutput::Ignore;
    }

    if line.contains(PROGRESS_MARKER_START)
        && line.contains(PROGRESS_MARKER_END)
        && let Some(event) = parse_progress_template(line)
    {
        return ParsedOutput::Progress(event);
    }

    if line.starts_with("[download]") {
        return parse_download_line(line);
    }

    if line.starts_with("[Merger]")
        || line.starts_with("[ffmpeg]")
        || line.starts_with("[ExtractAudio]")
        || line.starts_with("[VideoRemuxer]")
        || line.starts_with("[VideoConvertor]")
        || line.starts_with("[Metadata]")
    {
        return ParsedOutput::PostProcess(line.to_string());
    }

    if line.contains("Destination:") {
        return ParsedOutput::Destination(line.to_string());
    }

    if line.starts_with("ERROR:") || line.contains("ERROR") {
        return ParsedOutput::Error(line.to_string());
    }

    if line.starts_with("[youtube]")
        || line.starts_with("[info]")
        || line.starts_with("[debug]")
        || line.starts_with("[generic]")
        || line.starts_with("WARNING:")
    {
        return ParsedOutput::Ignore;
    }

    ParsedOutput::Info(line.to_string())
}

/// Parses our custom progress template format
fn parse_progress_template(line: &str) -> Option<ProgressEvent> {
    let start = line.find(PROGRESS_MARKER_START)? + PROGRESS_MARKER_START.len();
    let end = line.find(PROGRESS_MARKER_END)?;

    if end <= start {
        return None;
    }

    let parts: Vec<&str> = line[start..end].split('|').collect();
    if parts.len() < 4 {
        return None;
    }

    match parts[0].trim() {
        "downloading" => {
            let downloaded = parse_optional_bytes(parts[1]).unwrap_or(0);
            let total = parse_optional_bytes(parts[2]).or_else(|| parse_optional_bytes(parts[3]));
            Some(ProgressEvent::Downloading { downloaded, total })
        }
        "finished" => Some(ProgressEvent::Finished),
        "error" => Some(ProgressEvent::Error("download reported an error".to_string())),
        _ => None,
    }
}

/// Parses regular `[download]` lines from yt-dlp
fn parse_download_line(line: &str) -> ParsedOutput {
    if line.contains("has already been downloaded") {
        return ParsedOutput::AlreadyDownloaded(line.to_string());
    }

    // "[download] 100% of 50.00MiB in 00:10"
    if line.contains("100%") && line.contains(" of ") {
        return ParsedOutput::Progress(ProgressEvent::Finished);
    }

    // "[download]  45.2% of 100.00MiB at 1.50MiB/s ETA 00:35"
    if let Some(event) = parse_percent_progress(line) {
        return ParsedOutput::Progress(event);
    }

    if line.contains("Destination:") {
        return ParsedOutput::Destination(line.to_string());
    }

    ParsedOutput::Info(line.to_string())
}

/// Turns a percentage line into byte counts using the reported size.
fn parse_percent_progress(line: &str) -> Option<ProgressEvent> {
    let percent_end = line.find('%')?;
    let percent_start = line[..percent_end]
        .rfind(|c: char| !c.is_ascii_digit() && c != '.')?
        + 1;
    let percent: f64 = line[percent_start..percent_end].trim().parse().ok()?;

    if percent >= 100.0 {
        return Some(ProgressEvent::Finished);
    }

    let of_idx = line.find(" of ")?;
    // estimates are prefixed with '~', sometimes followed by padding
    let size_field = line[of_idx + 4..]
        .split_whitespace()
        .map(|field| field.trim_start_matches('~'))
        .find(|field| !field.is_empty())?;
    let total = parse_size_string(size_field)?;
    let downloaded = (total as f64 * percent / 100.0) as u64;

    Some(ProgressEvent::Downloading {
        downloaded,
        total: Some(total),
    })
}

/// Parses a byte count field (handles "NA", "None", empty and float estimates)
fn parse_optional_bytes(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || s == "NA" || s == "N/A" || s == "None" {
        return None;
    }
    let value: f64 = s.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value as u64)
}

/// Parses a size string like "100.50MiB" to bytes
fn parse_size_string(s: &str) -> Option<u64> {
    let s = s.trim();

    let num_end = s
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(s.len());
    let num: f64 = s[..num_end].parse().ok()?;

    let suffix = s[num_end..].to_lowercase();
    let multiplier: f64 = match suffix.as_str() {
        "b" | "" => 1.0,
        "kib" | "kb" | "k" => 1024.0,
        "mib" | "mb" | "m" => 1024.0 * 1024.0,
        "gib" | "gb" | "g" => 1024.0 * 1024.0 * 1024.0,
        "tib" | "tb" | "t" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    Some((num * multiplier) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_template_downloading() {
        let line = "|PROGRESS|downloading|47368421|104857600|NA|PROGRESS_END|";
        assert_eq!(
            parse_ytdlp_line(line),
            ParsedOutput::Progress(ProgressEvent::Downloading {
                downloaded: 47368421,
                total: Some(104857600),
            })
        );
    }

    #[test]
    fn test_parse_progress_template_uses_estimate() {
        let line = "|PROGRESS|downloading|1024|NA|4096.5|PROGRESS_END|";
        assert_eq!(
            parse_ytdlp_line(line),
            ParsedOutput::Progress(ProgressEvent::Downloading {
                downloaded: 1024,
                total: Some(4096),
            })
        );
    }

    #[test]
    fn test_parse_progress_template_unknown_total() {
        let line = "|PROGRESS|downloading|1024|NA|NA|PROGRESS_END|";
        assert_eq!(
            parse_ytdlp_line(line),
            ParsedOutput::Progress(ProgressEvent::Downloading {
                downloaded: 1024,
                total: None,
            })
        );
    }

    #[test]
    fn test_parse_progress_template_finished() {
        let line = "|PROGRESS|finished|104857600|104857600|NA|PROGRESS_END|";
        assert_eq!(
            parse_ytdlp_line(line),
            ParsedOutput::Progress(ProgressEvent::Finished)
        );
    }

    #[test]
    fn test_parse_traditional_progress() {
        let line = "[download]  50.0% of 100.00MiB at 1.50MiB/s ETA 00:35";
        match parse_ytdlp_line(line) {
            ParsedOutput::Progress(ProgressEvent::Downloading { downloaded, total }) => {
                assert_eq!(total, Some(100 * 1024 * 1024));
                assert_eq!(downloaded, 50 * 1024 * 1024);
            }
            other => panic!("Expected Progress, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_estimated_size() {
        let expected = ParsedOutput::Progress(ProgressEvent::Downloading {
            downloaded: 512,
            total: Some(2048),
        });

        let line = "[download]  25.0% of ~2.00KiB at 1.00KiB/s ETA 00:02";
        assert_eq!(parse_ytdlp_line(line), expected);

        let line = "[download]  25.0% of ~   2.00KiB at 1.00KiB/s ETA 00:02";
        assert_eq!(parse_ytdlp_line(line), expected);
    }

    #[test]
    fn test_parse_100_percent() {
        let line = "[download] 100% of 50.00MiB in 00:10";
        assert_eq!(
            parse_ytdlp_line(line),
            ParsedOutput::Progress(ProgressEvent::Finished)
        );
    }

    #[test]
    fn test_parse_error() {
        let line = "ERROR: Unable to download webpage";
        match parse_ytdlp_line(line) {
            ParsedOutput::Error(msg) => assert!(msg.contains("Unable to download")),
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_post_process() {
        let line = "[ExtractAudio] Destination: song.mp3";
        assert!(matches!(parse_ytdlp_line(line), ParsedOutput::PostProcess(_)));

        let line = "[Merger] Merging formats into \"video.mp4\"";
        assert!(matches!(parse_ytdlp_line(line), ParsedOutput::PostProcess(_)));
    }

    #[test]
    fn test_already_downloaded() {
        let line = "[download] /home/user/Music/song.mp3 has already been downloaded";
        assert!(matches!(
            parse_ytdlp_line(line),
            ParsedOutput::AlreadyDownloaded(_)
        ));
    }

    #[test]
    fn test_noise_is_ignored() {
        assert_eq!(parse_ytdlp_line("   "), ParsedOutput::Ignore);
        assert_eq!(
            parse_ytdlp_line("[youtube] abc: Downloading webpage"),
            ParsedOutput::Ignore
        );
    }

    #[test]
    fn test_template_contains_markers() {
        let template = progress_template();
        assert!(template.starts_with("download:"));
        assert!(template.contains(PROGRESS_MARKER_START));
        assert!(template.ends_with(PROGRESS_MARKER_END));
    }
}
