//! Ctrl+C handling, passed explicitly to the loops that need it.

use std::{
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use tracing::debug;

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared interrupt flag.
///
/// While the session is blocked reading a prompt (`awaiting_input`), an
/// interrupt exits the process right away with the farewell message, since
/// the blocking read would otherwise swallow it. Everywhere else it only sets
/// the flag and the loops wind down at their next check.
#[derive(Clone, Default)]
pub struct Interrupt {
    requested: Arc<AtomicBool>,
    awaiting_input: Arc<AtomicBool>,
}

impl Interrupt {
    /// A handle that is not wired to any signal, for tests.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the process-wide Ctrl+C handler.
    pub fn install(farewell: &'static str) -> Result<Self> {
        let interrupt = Self::new();
        let handler = interrupt.clone();
        ctrlc::set_handler(move || {
            debug!("interrupt received");
            handler.request();
            if handler.awaiting_input.load(Ordering::SeqCst) {
                let mut stdout = std::io::stdout();
                let _ = writeln!(stdout, "\n{}", farewell);
                let _ = stdout.flush();
                std::process::exit(0);
            }
        })
        .context("Failed to install Ctrl+C handler")?;
        Ok(interrupt)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn set_awaiting_input(&self, waiting: bool) {
        self.awaiting_input.store(waiting, Ordering::SeqCst);
    }

    /// Sleeps for `duration`, waking early on interrupt.
    ///
    /// Returns `true` if the sleep was cut short by an interrupt.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_requested() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}
