//! Prompting and coloured output.
//!
//! Everything the session shows or asks goes through [`Console`], so the
//! loops can be driven by a script in tests.

use std::io::{self, BufRead, Write};

use crossterm::{
    queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use indicatif::{ProgressBar, ProgressDrawTarget};

use crate::{
    errors::{AppError, Result},
    utils::interrupt::Interrupt,
};

use super::progress_bar::{plain_style, rainbow_style};

/// Magenta, cyan, green, yellow, orange, red
pub const RAINBOW: [Color; 6] = [
    Color::Rgb { r: 0xFF, g: 0x00, b: 0xFF },
    Color::Rgb { r: 0x00, g: 0xFF, b: 0xFF },
    Color::Rgb { r: 0x00, g: 0xFF, b: 0x00 },
    Color::Rgb { r: 0xFF, g: 0xFF, b: 0x00 },
    Color::Rgb { r: 0xFF, g: 0x66, b: 0x00 },
    Color::Rgb { r: 0xFF, g: 0x00, b: 0x00 },
];

const ALERT_COLOR: Color = Color::Rgb { r: 0xFF, g: 0x00, b: 0x00 };

pub trait Console {
    /// Shows `prompt` and reads one line without its line ending.
    ///
    /// Returns `None` at end of input.
    fn ask(&mut self, prompt: &str) -> Result<Option<String>>;

    fn say(&mut self, message: &str) -> Result<()>;

    /// Error output, e.g. a failed download.
    fn alert(&mut self, message: &str) -> Result<()>;

    /// A fresh 0-100 bar drawn wherever this console writes.
    fn progress_bar(&mut self) -> ProgressBar;
}

/// Writes `text` with each visible character in the next palette colour.
pub fn write_rainbow<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    for (i, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            queue!(out, Print(ch))?;
        } else {
            queue!(out, SetForegroundColor(RAINBOW[i % RAINBOW.len()]), Print(ch))?;
        }
    }
    queue!(out, ResetColor)
}

/// Console on stdin/stdout.
pub struct TerminalConsole {
    rainbow: bool,
    interrupt: Interrupt,
}

impl TerminalConsole {
    pub fn new(rainbow: bool, interrupt: Interrupt) -> Self {
        Self { rainbow, interrupt }
    }

    fn write_text<W: Write>(&self, out: &mut W, text: &str) -> io::Result<()> {
        if self.rainbow {
            write_rainbow(out, text)
        } else {
            queue!(out, Print(text))
        }
    }
}

impl Console for TerminalConsole {
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        self.write_text(&mut stdout, prompt)?;
        stdout.flush()?;
        drop(stdout);

        let mut line = String::new();
        self.interrupt.set_awaiting_input(true);
        let read = io::stdin().lock().read_line(&mut line);
        self.interrupt.set_awaiting_input(false);

        match read {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(line.trim_end_matches(['\r', '\n']).to_string())),
            Err(e) => Err(AppError::Prompt(e.to_string())),
        }
    }

    fn say(&mut self, message: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        self.write_text(&mut stdout, message)?;
        queue!(stdout, Print('\n'))?;
        stdout.flush()?;
        Ok(())
    }

    fn alert(&mut self, message: &str) -> Result<()> {
        let mut stdout = io::stdout().lock();
        queue!(
            stdout,
            SetForegroundColor(ALERT_COLOR),
            Print(message),
            ResetColor,
            Print('\n')
        )?;
        stdout.flush()?;
        Ok(())
    }

    fn progress_bar(&mut self) -> ProgressBar {
        let style = if self.rainbow {
            rainbow_style()
        } else {
            plain_style()
        };
        ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stdout()).with_style(style)
    }
}

#[cfg(test)]
pub use scripted::ScriptedConsole;
