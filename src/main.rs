mod args;
mod auto_mode;
mod downloader;
mod errors;
mod session;
mod ui;
mod utils;

use std::{
    io::{self, BufRead, Write},
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    args::Args,
    auto_mode::{AutoMode, DesktopNotifier, Notifier},
    downloader::{resolver::RunMode, worker::YtDlp},
    session::{
        FAREWELL, ManualSession, choose_folder, choose_run_mode, report_capabilities, show_banner,
    },
    ui::console::{Console, TerminalConsole},
    utils::{
        clipboard::SystemClipboard,
        dependencies::{check_dependencies, detect_gpu},
        file::{ensure_dir, home_dir},
        interrupt::Interrupt,
        settings::Settings,
    },
};

fn main() {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    if let Err(e) = run(&args) {
        error!("{:#}", e);
        eprintln!("[ERROR] {:?}", e);
        wait_for_enter();
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let settings = Settings::load().unwrap_or_else(|e| {
        warn!("{:#}, using default settings", e);
        Settings::default()
    });
    let interrupt = Interrupt::install(FAREWELL)?;
    let mut console = TerminalConsole::new(settings.rainbow_output, interrupt.clone());

    show_banner(&mut console)?;

    let destination = match &args.download_dir {
        Some(dir) => dir.clone(),
        None => match choose_folder(&mut console, &home_dir())? {
            Some(folder) => folder,
            None => {
                console.say(FAREWELL)?;
                return Ok(());
            }
        },
    };
    ensure_dir(&destination).with_context(|| {
        format!(
            "Failed to create download folder {}",
            destination.display()
        )
    })?;
    info!(folder = %destination.display(), "download folder ready");

    check_dependencies()?;
    let capabilities = detect_gpu();
    info!(%capabilities, "hardware probed");
    report_capabilities(&mut console, &capabilities)?;

    let mode = if args.auto {
        RunMode::Automatic
    } else {
        match choose_run_mode(&mut console)? {
            Some(mode) => mode,
            None => {
                console.say(FAREWELL)?;
                return Ok(());
            }
        }
    };

    let mut clipboard = SystemClipboard::new();
    let mut downloader = YtDlp::new(settings.clone(), interrupt.clone());

    match mode {
        RunMode::Manual => ManualSession {
            console: &mut console,
            clipboard: &mut clipboard,
            downloader: &mut downloader,
            interrupt: &interrupt,
            capabilities: &capabilities,
            destination: &destination,
        }
        .run()?,
        RunMode::Automatic => {
            let mut desktop = DesktopNotifier;
            AutoMode {
                console: &mut console,
                clipboard: &mut clipboard,
                downloader: &mut downloader,
                notifier: settings
                    .desktop_notifications
                    .then_some(&mut desktop as &mut dyn Notifier),
                interrupt: &interrupt,
                destination: &destination,
                hardware_encode: capabilities.nvenc,
                poll_interval: Duration::from_secs(settings.poll_interval_secs),
            }
            .run()?
        }
    }

    Ok(())
}

/// Keeps the window open when launched outside a terminal.
fn wait_for_enter() {
    let mut stdout = io::stdout();
    let _ = write!(stdout, "Press Enter to exit...");
    let _ = stdout.flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}
