use clap::Parser;
use std::path::PathBuf;

/// Every flag is optional: a bare invocation walks through the interactive menus.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Skip the mode menu and start the clipboard watcher
    #[arg(short, long)]
    pub auto: bool,
    /// Download directory (skips the folder menu)
    #[arg(short, long)]
    pub download_dir: Option<PathBuf>,
    /// Log debug output to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Default tracing filter directive when `RUST_LOG` is not set.
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "warn" }
    }
}
