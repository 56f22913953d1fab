//! The interactive prompts: startup menus and the manual download loop.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{
    downloader::{
        filters::AudioEffects,
        request::{AudioOptions, Container, DownloadRequest, QualityTier, VideoOptions},
        resolver::{
            CUSTOM_FOLDER_CHOICE, ContentKind, DownloadKind, EffectAnswers, FolderChoice, RunMode,
            WellKnownFolder, classify_url, is_http_url, resolve_audio_codec, resolve_bitrate,
            resolve_container, resolve_custom_path, resolve_download_kind, resolve_effects,
            resolve_extra_args, resolve_folder_choice, resolve_muxed_container, resolve_quality,
            resolve_run_mode, resolve_yes,
        },
        worker::Downloader,
    },
    errors::{AppError, Result},
    ui::{console::Console, progress_bar::ProgressBar},
    utils::{clipboard::ClipboardSource, dependencies::Capabilities, interrupt::Interrupt},
};

pub const TITLE: &str = "NASA DOWNLOADER";
pub const SUBTITLE: &str = "Networked Audio & Stream Acquirer";
pub const FAREWELL: &str = "Goodbye 👋";

const EFFECT_PROMPTS: [&str; 6] = [
    "Bass boost in dB (blank for none): ",
    "Normalize loudness? [y/n]: ",
    "Fade in seconds (blank for none): ",
    "Fade out seconds (blank for none): ",
    "Trim start in seconds (blank for 0): ",
    "Trim end in seconds (blank to keep the full length): ",
];

/// Narrowest box that still fits the subtitle with some margin.
const MIN_BANNER_WIDTH: usize = 41;

/// Inner width of the banner box for a terminal `columns` wide.
fn banner_width(columns: Option<u16>) -> usize {
    columns
        .map(|cols| usize::from(cols).saturating_sub(2))
        .unwrap_or(MIN_BANNER_WIDTH)
        .max(MIN_BANNER_WIDTH)
}

pub fn show_banner(console: &mut dyn Console) -> Result<()> {
    let columns = crossterm::terminal::size().ok().map(|(cols, _)| cols);
    let width = banner_width(columns);
    let border = "═".repeat(width);
    console.say(&format!("╔{}╗", border))?;
    console.say(&format!("║{:^width$}║", TITLE))?;
    console.say(&format!("╚{}╝", border))?;
    console.say(&format!(" {:^width$}", SUBTITLE))?;
    console.say("")
}

/// Folder menu. Repeats until the answer names a folder; `None` at end of input.
pub fn choose_folder(console: &mut dyn Console, home: &Path) -> Result<Option<PathBuf>> {
    console.say("Select download folder:")?;
    for (i, folder) in WellKnownFolder::all().iter().enumerate() {
        console.say(&format!("{}) {}", i + 1, folder.name()))?;
    }
    console.say(&format!("{}) Custom folder", CUSTOM_FOLDER_CHOICE))?;

    loop {
        let Some(answer) = console.ask("Choose folder [1-6, default 2]: ")? else {
            return Ok(None);
        };
        match resolve_folder_choice(&answer) {
            Some(FolderChoice::WellKnown(folder)) => return Ok(Some(folder.path_under(home))),
            Some(FolderChoice::Custom) => {
                let Some(path) = console.ask("Enter full custom path: ")? else {
                    return Ok(None);
                };
                match resolve_custom_path(&path, home) {
                    Some(path) => return Ok(Some(path)),
                    None => console.say("Please enter a path")?,
                }
            }
            None => debug!(answer, "unknown folder choice"),
        }
    }
}

pub fn report_capabilities(console: &mut dyn Console, capabilities: &Capabilities) -> Result<()> {
    console.say(&format!("[SYSTEM] Device: {}", capabilities.device))?;
    console.say(&format!("[SYSTEM] NVENC Available: {}", capabilities.nvenc))?;
    console.say("")
}

/// Mode menu; anything but `2` is manual. `None` at end of input.
pub fn choose_run_mode(console: &mut dyn Console) -> Result<Option<RunMode>> {
    console.say("Select Mode:")?;
    console.say("1) Manual Interactive Mode")?;
    console.say("2) Automatic Archival Mode (Clipboard Watcher)")?;
    Ok(console
        .ask("Choose mode [1-2, default 1]: ")?
        .map(|answer| resolve_run_mode(&answer)))
}

/// Runs one download with a progress bar, cleared when it ends.
pub fn download_with_progress(
    console: &mut dyn Console,
    downloader: &mut dyn Downloader,
    request: &DownloadRequest,
) -> Result<()> {
    let mut bar = ProgressBar::new(console.progress_bar());
    let outcome = downloader.download(request, &mut bar);
    let state = bar.finish();
    debug!(
        finished = state.is_finished(),
        failed = state.failed(),
        percentage = state.percentage(),
        bytes = state.completed_bytes,
        "download ended"
    );
    outcome
}

/// The message shown for a failed download.
pub fn failure_reason(err: &AppError) -> String {
    match err {
        AppError::Download(reason) => reason.clone(),
        other => other.to_string(),
    }
}

/// The manual mode loop: URL, options, download, again?
pub struct ManualSession<'a> {
    pub console: &'a mut dyn Console,
    pub clipboard: &'a mut dyn ClipboardSource,
    pub downloader: &'a mut dyn Downloader,
    pub interrupt: &'a Interrupt,
    pub capabilities: &'a Capabilities,
    pub destination: &'a Path,
}

impl ManualSession<'_> {
    /// Runs until the user declines another download, input ends, or an
    /// interrupt arrives. Failed downloads are reported and never end the loop.
    pub fn run(&mut self) -> Result<()> {
        loop {
            let Some(url) = self.prompt_url()? else {
                break;
            };
            let Some(request) = self.prompt_request(url)? else {
                break;
            };

            info!(
                url = %request.url,
                mode = request.mode.label(),
                container = ?request.mode.video().map(|v| v.container),
                codec = ?request.mode.audio().map(|a| a.codec),
                "manual download"
            );
            match download_with_progress(&mut *self.console, &mut *self.downloader, &request) {
                Ok(()) => self.console.say("✅ Download complete!")?,
                Err(e) => {
                    warn!(error = %e, "manual download failed");
                    self.console
                        .alert(&format!("❌ Download failed: {}", failure_reason(&e)))?;
                }
            }

            if self.interrupt.is_requested() {
                break;
            }
            self.console.say("")?;
            match self.console.ask("Download another? (y/n): ")? {
                Some(answer) if resolve_yes(&answer) => continue,
                _ => break,
            }
        }

        self.console.say(FAREWELL)
    }

    /// Asks until a well-formed http(s) URL is given. Blank input takes the clipboard.
    fn prompt_url(&mut self) -> Result<Option<String>> {
        loop {
            let Some(answer) = self
                .console
                .ask("Enter video URL (press Enter for clipboard): ")?
            else {
                return Ok(None);
            };

            let mut url = answer.trim().to_string();
            if url.is_empty() {
                url = match self.clipboard.read_text() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "could not read clipboard");
                        String::new()
                    }
                };
                self.console.say(&format!("Using clipboard URL: {}", url))?;
            }

            if is_http_url(&url) {
                return Ok(Some(url));
            }
            self.console.say("Invalid URL format")?;
            self.console.say("")?;
        }
    }

    fn prompt_request(&mut self, url: String) -> Result<Option<DownloadRequest>> {
        let content = classify_url(&url);
        self.console
            .say(&format!("Detected: {}", content.label()))?;

        let Some(kind) = self.prompt_kind(content)? else {
            return Ok(None);
        };

        let mut video = if kind.needs_video() {
            let Some(video) = self.prompt_video()? else {
                return Ok(None);
            };
            Some(video)
        } else {
            None
        };

        let audio = if kind.needs_audio() {
            let Some(audio) = self.prompt_audio()? else {
                return Ok(None);
            };
            Some(audio)
        } else {
            None
        };

        if let (Some(video), Some(audio)) = (video.as_mut(), audio.as_ref()) {
            let container = resolve_muxed_container(video.container, audio.codec);
            if container != video.container {
                self.console.say(&format!(
                    "{} audio does not fit in {}, saving as {}",
                    audio.codec, video.container, container
                ))?;
                video.container = container;
            }
        }

        let Some(extra) = self
            .console
            .ask("Extra FFmpeg args (leave blank for none): ")?
        else {
            return Ok(None);
        };

        Ok(Some(DownloadRequest {
            url,
            destination: self.destination.to_path_buf(),
            mode: kind.into_mode(video, audio),
            extra_transcoder_args: resolve_extra_args(&extra),
        }))
    }

    fn prompt_kind(&mut self, content: ContentKind) -> Result<Option<DownloadKind>> {
        let default = DownloadKind::default_for(content);
        self.console.say("Select Download Type:")?;
        for (i, kind) in DownloadKind::all().iter().enumerate() {
            let marker = if *kind == default { " (Default)" } else { "" };
            self.console
                .say(&format!("{}) {}{}", i + 1, kind.label(), marker))?;
        }
        let position = DownloadKind::all()
            .iter()
            .position(|k| *k == default)
            .map_or(1, |idx| idx + 1);

        Ok(self
            .console
            .ask(&format!("Choose type [1-4, default {}]: ", position))?
            .map(|answer| resolve_download_kind(&answer, content)))
    }

    fn prompt_video(&mut self) -> Result<Option<VideoOptions>> {
        self.console.say("Select Video Quality (8K+ where available):")?;
        for (i, tier) in QualityTier::all().iter().enumerate() {
            self.console.say(&format!("{}) {}", i + 1, tier.label()))?;
        }
        let Some(quality) = self.console.ask("Choose quality [1-10, default 1]: ")? else {
            return Ok(None);
        };

        let containers = Container::all()
            .iter()
            .map(|c| c.extension())
            .collect::<Vec<_>>()
            .join("/");
        let Some(container) = self.console.ask(&format!(
            "Video container ({}) leave blank for mp4: ",
            containers
        ))?
        else {
            return Ok(None);
        };

        let Some(gpu) = self.console.ask("Use GPU encoding (NVENC) if available? [y/n]: ")? else {
            return Ok(None);
        };
        let wants_gpu = resolve_yes(&gpu);
        if wants_gpu && !self.capabilities.nvenc {
            self.console
                .say("NVENC not available, using the source encoding")?;
        }

        Ok(Some(VideoOptions {
            quality: resolve_quality(&quality),
            container: resolve_container(&container),
            hardware_encode: wants_gpu && self.capabilities.nvenc,
        }))
    }

    fn prompt_audio(&mut self) -> Result<Option<AudioOptions>> {
        let Some(codec) = self
            .console
            .ask("mp3/m4a/flac/wav/ogg leave blank for mp3: ")?
        else {
            return Ok(None);
        };
        let Some(bitrate) = self.console.ask("Bitrate kbps (192 default): ")? else {
            return Ok(None);
        };
        let Some(pro) = self.console.ask("Apply pro audio effects? [y/n]: ")? else {
            return Ok(None);
        };

        let effects = if resolve_yes(&pro) {
            let Some(effects) = self.prompt_effects()? else {
                return Ok(None);
            };
            effects
        } else {
            AudioEffects::default()
        };

        Ok(Some(AudioOptions {
            codec: resolve_audio_codec(&codec),
            bitrate_kbps: resolve_bitrate(&bitrate),
            filters: effects.build(),
        }))
    }

    fn prompt_effects(&mut self) -> Result<Option<AudioEffects>> {
        let mut answers = Vec::with_capacity(EFFECT_PROMPTS.len());
        for prompt in EFFECT_PROMPTS {
            let Some(answer) = self.console.ask(prompt)? else {
                return Ok(None);
            };
            answers.push(answer);
        }

        let effects = resolve_effects(&EffectAnswers {
            bass: &answers[0],
            normalize: &answers[1],
            fade_in: &answers[2],
            fade_out: &answers[3],
            trim_start: &answers[4],
            trim_end: &answers[5],
        });
        if effects.trim_end.is_none() && effects.fade_out > 0.0 {
            self.console
                .say("Fade out needs a trim end time, skipping it")?;
        }
        Ok(Some(effects))
    }
}
