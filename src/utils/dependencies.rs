use std::{
    fmt,
    process::{Command, Stdio},
};

use tracing::{debug, info};

use crate::errors::{AppError, Result};

/// An external tool we need, with where to get it.
struct Tool {
    program: &'static str,
    version_arg: &'static str,
    hint: &'static str,
}

const REQUIRED_TOOLS: &[Tool] = &[
    Tool {
        program: "yt-dlp",
        version_arg: "--version",
        hint: "install it with `pip install yt-dlp` or from https://github.com/yt-dlp/yt-dlp",
    },
    Tool {
        program: "ffmpeg",
        version_arg: "-version",
        hint: "install it from https://ffmpeg.org/download.html or your package manager",
    },
];

/// Verifies that yt-dlp and ffmpeg are installed and runnable.
///
/// Every missing tool is listed in the returned [`AppError::Dependency`],
/// each with an installation hint.
pub fn check_dependencies() -> Result<()> {
    let missing: Vec<String> = REQUIRED_TOOLS
        .iter()
        .filter(|tool| !responds(tool.program, tool.version_arg))
        .map(|tool| format!("{} is not installed or not accessible ({})", tool.program, tool.hint))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Dependency(missing.join("; ")))
    }
}

fn responds(program: &str, arg: &str) -> bool {
    let ok = Command::new(program)
        .arg(arg)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false);
    debug!(program, ok, "dependency check");
    ok
}

/// What the startup probe found out about video encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capabilities {
    /// GPU name, or the CPU architecture when there is no NVIDIA GPU
    pub device: String,
    /// ffmpeg can encode with NVENC
    pub nvenc: bool,
}

impl fmt::Display for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device: {} | NVENC Available: {}", self.device, self.nvenc)
    }
}

/// Looks for an NVIDIA GPU and an NVENC-capable ffmpeg.
///
/// ffmpeg is only asked for its encoder list when `nvidia-smi` reports a GPU.
pub fn detect_gpu() -> Capabilities {
    let gpu_name = command_stdout("nvidia-smi", &["--query-gpu=name", "--format=csv,noheader"]);
    let nvenc = gpu_name.is_some()
        && command_stdout("ffmpeg", &["-hide_banner", "-encoders"])
            .is_some_and(|encoders| lists_nvenc(&encoders));

    let capabilities = Capabilities {
        device: describe_device(gpu_name.as_deref(), std::env::consts::ARCH),
        nvenc,
    };
    info!(device = %capabilities.device, nvenc, "capability probe");
    capabilities
}

/// Stdout of a successful run, if it printed anything.
fn command_stdout(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!stdout.is_empty()).then_some(stdout)
}

fn describe_device(gpu_name: Option<&str>, fallback: &str) -> String {
    // nvidia-smi prints one line per GPU
    let name = gpu_name
        .and_then(|names| names.lines().map(str::trim).find(|line| !line.is_empty()))
        .unwrap_or(fallback);
    if name.to_uppercase().contains("NVIDIA") {
        name.to_string()
    } else {
        format!("{} (Not NVIDIA)", name)
    }
}

fn lists_nvenc(encoders: &str) -> bool {
    encoders.contains("h264_nvenc") || encoders.contains("hevc_nvenc")
}
