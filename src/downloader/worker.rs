use std::{
    io::{self, BufRead, BufReader},
    path::PathBuf,
    process::{Command, Stdio},
    thread,
};

use tracing::{debug, info, warn};

use crate::{
    errors::{AppError, Result},
    utils::{interrupt::Interrupt, settings::Settings},
};

use super::{
    common::build_ytdlp_command_args,
    progress::{ProgressEvent, ProgressObserver},
    progress_parser::{ParsedOutput, parse_ytdlp_line},
    request::DownloadRequest,
};

/// The external downloader, as seen by the session and auto loops.
///
/// `download` blocks until the download has finished or failed, reporting
/// status events to `observer` along the way.
pub trait Downloader {
    fn download(
        &mut self,
        request: &DownloadRequest,
        observer: &mut dyn ProgressObserver,
    ) -> Result<()>;
}

/// Runs the `yt-dlp` binary.
pub struct YtDlp {
    program: PathBuf,
    /// Arguments placed before ours, e.g. `-m yt_dlp` when running through python
    leading_args: Vec<String>,
    settings: Settings,
    interrupt: Interrupt,
}

impl YtDlp {
    pub fn new(settings: Settings, interrupt: Interrupt) -> Self {
        Self {
            program: PathBuf::from("yt-dlp"),
            leading_args: Vec::new(),
            settings,
            interrupt,
        }
    }

    /// Run yt-dlp through another program, e.g. `sh fake-yt-dlp.sh`.
    #[cfg(test)]
    pub fn with_command(mut self, program: impl Into<PathBuf>, leading_args: Vec<String>) -> Self {
        self.program = program.into();
        self.leading_args = leading_args;
        self
    }
}

impl Downloader for YtDlp {
    fn download(
        &mut self,
        request: &DownloadRequest,
        observer: &mut dyn ProgressObserver,
    ) -> Result<()> {
        let args = build_ytdlp_command_args(&self.settings, request);
        debug!(program = %self.program.display(), ?args, "spawning yt-dlp");
        info!(url = %request.url, mode = request.mode.label(), "starting download");

        let mut child = Command::new(&self.program)
            .args(&self.leading_args)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AppError::Download(format!(
                    "failed to start {}: {}",
                    self.program.display(),
                    e
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AppError::Download("yt-dlp stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| AppError::Download("yt-dlp stderr was not captured".to_string()))?;

        // Drain stderr on the side so a chatty child cannot block on a full pipe
        let stderr_reader = thread::spawn(move || {
            let mut reader = BufReader::new(stderr);
            let mut buf = Vec::new();
            let mut lines = Vec::new();
            while let Ok(Some(line)) = read_lossy_line(&mut reader, &mut buf) {
                lines.push(line);
            }
            lines
        });

        let mut last_error: Option<String> = None;
        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();

        loop {
            let line = match read_lossy_line(&mut reader, &mut buf) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "lost yt-dlp output");
                    break;
                }
            };
            if self.interrupt.is_requested() {
                let _ = child.kill();
                break;
            }

            match parse_ytdlp_line(&line) {
                ParsedOutput::Progress(event) => observer.on_event(&event),
                ParsedOutput::Error(msg) => {
                    observer.on_event(&ProgressEvent::Error(msg.clone()));
                    last_error = Some(msg);
                }
                ParsedOutput::Destination(msg) | ParsedOutput::PostProcess(msg) => {
                    debug!("{}", msg)
                }
                ParsedOutput::AlreadyDownloaded(msg) => {
                    info!("{}", msg);
                    observer.on_event(&ProgressEvent::Finished);
                }
                ParsedOutput::Info(msg) => debug!("{}", msg),
                ParsedOutput::Ignore => {}
            }
        }

        let status = child.wait()?;

        let stderr_lines = stderr_reader.join().unwrap_or_default();
        for line in &stderr_lines {
            if let ParsedOutput::Error(msg) = parse_ytdlp_line(line) {
                observer.on_event(&ProgressEvent::Error(msg.clone()));
                last_error = Some(msg);
            }
        }

        if self.interrupt.is_requested() {
            return Err(AppError::Download("interrupted".to_string()));
        }

        if status.success() {
            info!(url = %request.url, "download finished");
            Ok(())
        } else {
            let reason = last_error
                .or_else(|| stderr_lines.last().cloned())
                .unwrap_or_else(|| format!("yt-dlp exited with {}", status));
            warn!(url = %request.url, %reason, "download failed");
            Err(AppError::Download(reason))
        }
    }
}

/// Reads one line into `buf`, replacing invalid UTF-8 (file names in the
/// local code page) instead of failing. `None` at end of stream.
fn read_lossy_line<R: BufRead>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>> {
    buf.clear();
    if reader.read_until(b'\n', buf)? == 0 {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf);
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

#[cfg(test)]
pub use fake::FakeDownloader;


#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::progress::ProgressState;
    use crate::downloader::request::{AudioOptions, DownloadMode};

    fn request() -> DownloadRequest {
        DownloadRequest {
            url: "https://example.com/watch?v=abc".to_string(),
            destination: std::env::temp_dir(),
            mode: DownloadMode::AudioOnly {
                audio: AudioOptions::default(),
            },
            extra_transcoder_args: Vec::new(),
        }
    }

    #[test]
    fn test_missing_binary_is_a_download_error() {
        let mut downloader = YtDlp::new(Settings::default(), Interrupt::new())
            .with_command("definitely-not-a-real-yt-dlp-binary", Vec::new());
        let mut progress = ProgressState::new();

        let err = downloader.download(&request(), &mut progress).unwrap_err();
        assert!(matches!(err, AppError::Download(_)));
        assert!(err.is_recoverable());
        assert_eq!(progress.percentage(), 0.0);
    }

    /// Runs `script` through `sh`, standing in for yt-dlp.
    #[cfg(unix)]
    fn fake_ytdlp(dir: &tempfile::TempDir, script: &str) -> YtDlp {
        let path = dir.path().join("fake-yt-dlp.sh");
        std::fs::write(&path, script).unwrap();
        YtDlp::new(Settings::default(), Interrupt::new())
            .with_command("sh", vec![path.to_string_lossy().to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn test_stdout_progress_reaches_observer() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloader = fake_ytdlp(
            &dir,
            "echo '|PROGRESS|downloading|50|200|NA|PROGRESS_END|'\n\
             echo '|PROGRESS|downloading|150|200|NA|PROGRESS_END|'\n\
             echo '|PROGRESS|finished|200|200|NA|PROGRESS_END|'\n",
        );
        let mut progress = ProgressState::new();

        downloader.download(&request(), &mut progress).unwrap();
        assert_eq!(progress.percentage(), 100.0);
        assert!(!progress.failed());
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_output_does_not_stop_reading() {
        let dir = tempfile::tempdir().unwrap();
        // a Latin-1 file name, then enough output to fill the pipe if unread
        let mut downloader = fake_ytdlp(
            &dir,
            "printf '[download] Destination: caf\\351.mp4\\n'\n\
             i=0\n\
             while [ $i -lt 2000 ]; do\n\
               echo '|PROGRESS|downloading|100|200|NA|PROGRESS_END|'\n\
               i=$((i + 1))\n\
             done\n\
             echo '|PROGRESS|finished|200|200|NA|PROGRESS_END|'\n",
        );
        let mut progress = ProgressState::new();

        downloader.download(&request(), &mut progress).unwrap();
        assert_eq!(progress.percentage(), 100.0);
    }

    #[test]
    fn test_lossy_lines_keep_invalid_bytes_readable() {
        let mut reader = &b"caf\xe9.mp4\r\nnext\n"[..];
        let mut buf = Vec::new();
        assert_eq!(
            read_lossy_line(&mut reader, &mut buf).unwrap(),
            Some("caf\u{FFFD}.mp4".to_string())
        );
        assert_eq!(read_lossy_line(&mut reader, &mut buf).unwrap(), Some("next".to_string()));
        assert_eq!(read_lossy_line(&mut reader, &mut buf).unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-yt-dlp.sh");
        std::fs::write(
            &path,
            "echo '|PROGRESS|downloading|10|100|NA|PROGRESS_END|'\n\
             exec sleep 30\n\
             echo '|PROGRESS|finished|100|100|NA|PROGRESS_END|'\n",
        )
        .unwrap();
        let interrupt = Interrupt::new();
        interrupt.request();
        let mut downloader = YtDlp::new(Settings::default(), interrupt)
            .with_command("sh", vec![path.to_string_lossy().to_string()]);
        let mut progress = ProgressState::new();

        let started = std::time::Instant::now();
        let err = downloader.download(&request(), &mut progress).unwrap_err();
        assert!(matches!(err, AppError::Download(ref reason) if reason == "interrupted"));
        assert!(started.elapsed() < std::time::Duration::from_secs(20));
        assert_eq!(progress.percentage(), 0.0);
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_child_reports_last_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut downloader = fake_ytdlp(
            &dir,
            "echo '|PROGRESS|downloading|10|100|NA|PROGRESS_END|'\n\
             echo 'ERROR: [generic] Unable to download webpage' >&2\n\
             exit 1\n",
        );
        let mut progress = ProgressState::new();

        let err = downloader.download(&request(), &mut progress).unwrap_err();
        match err {
            AppError::Download(reason) => assert!(reason.contains("Unable to download webpage")),
            other => panic!("Expected Download error, got {:?}", other),
        }
        assert!(progress.failed());
        assert!((progress.percentage() - 10.0).abs() < f64::EPSILON);
    }
}
