use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
};
use tracing::warn;

/// Flags that conflict with the arguments we build for every download
const CONFLICTING_FLAGS: &[&str] = &[
    "--output",
    "-o",
    "--progress-template",
    "--newline",
    "--format",
    "-f",
];

pub const DEFAULT_OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Persisted settings for nasa-downloader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Seconds between clipboard checks in automatic mode
    pub poll_interval_secs: u64,
    /// Fragments yt-dlp fetches in parallel for segmented streams
    pub concurrent_fragments: u32,
    /// yt-dlp output template, relative to the chosen folder
    pub output_template: String,
    /// Colour prompts and the progress bar with the rainbow palette
    pub rainbow_output: bool,
    /// Desktop notification after each automatic download
    pub desktop_notifications: bool,
    /// Custom yt-dlp arguments (shell-style, validated for conflicts)
    pub custom_ytdlp_args: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 2,
            concurrent_fragments: 4,
            output_template: DEFAULT_OUTPUT_TEMPLATE.to_string(),
            rainbow_output: true,
            desktop_notifications: true,
            custom_ytdlp_args: String::new(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    fn get_settings_path() -> PathBuf {
        let mut config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.push("nasa-downloader");
        config_dir.push("settings.json");
        config_dir
    }

    /// Validate custom yt-dlp arguments for conflicts
    ///
    /// Returns Ok(()) if valid, or Err with a description of the conflict.
    pub fn validate_custom_args(args: &str) -> std::result::Result<(), String> {
        if args.trim().is_empty() {
            return Ok(());
        }

        let parsed = match shlex::split(args) {
            Some(args) => args,
            None => return Err("Invalid argument syntax (unmatched quotes)".to_string()),
        };

        for arg in &parsed {
            for conflict in CONFLICTING_FLAGS {
                if arg == *conflict || arg.starts_with(&format!("{}=", conflict)) {
                    return Err(format!(
                        "'{}' conflicts with nasa-downloader's internal handling",
                        conflict
                    ));
                }
            }
        }

        Ok(())
    }

    /// Custom arguments split into words, or nothing if they fail validation.
    pub fn parse_custom_args(&self) -> Vec<String> {
        if let Err(reason) = Self::validate_custom_args(&self.custom_ytdlp_args) {
            warn!(args = %self.custom_ytdlp_args, %reason, "ignoring custom yt-dlp args");
            return Vec::new();
        }
        shlex::split(&self.custom_ytdlp_args).unwrap_or_default()
    }

    /// Clamp values that would stall the watcher or yt-dlp.
    fn sanitized(mut self) -> Self {
        if self.poll_interval_secs == 0 {
            warn!("poll_interval_secs must be at least 1, using 2");
            self.poll_interval_secs = 2;
        }
        if self.concurrent_fragments == 0 {
            self.concurrent_fragments = 1;
        }
        if self.output_template.trim().is_empty() {
            self.output_template = DEFAULT_OUTPUT_TEMPLATE.to_string();
        }
        self
    }

    /// Load settings from disk, creating default settings if none exist
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_settings_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let default_settings = Self::default();
            default_settings.save_to(path)?;
            return Ok(default_settings);
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open settings file: {:?}", path))?;
        let reader = BufReader::new(file);

        let settings: Settings = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse settings file: {:?}", path))?;
        Ok(settings.sanitized())
    }

    /// Save settings to disk using atomic write (write to temp file, then rename).
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        let temp_path = path.with_extension("json.tmp");
        let settings_json = serde_json::to_string_pretty(self)?;

        fs::write(&temp_path, &settings_json)
            .with_context(|| format!("Failed to write temp settings file: {:?}", temp_path))?;

        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to rename temp settings to: {:?}", path))
    }
}
