//! What the user reads. Diagnostics go through `tracing`; this is for results
//! and instructions.

use colored::{Color, Colorize};
use std::fmt::{Debug, Display};

#[derive(Debug, Clone, Copy)]
pub struct Console {
    color: bool,
    verbose: bool,
}

impl Console {
    pub fn new(color: bool, verbose: bool) -> Self {
        Self { color, verbose }
    }

    /// A finished step.
    pub fn done(&self, message: impl Display) {
        println!("{}", self.paint(message, Color::BrightGreen, true));
    }

    /// Something the user should look at, but not a failure.
    pub fn warn(&self, message: impl Display) {
        eprintln!("{}", self.paint(message, Color::BrightYellow, true));
    }

    pub fn plain(&self, message: impl Display) {
        println!("{message}");
    }

    /// Only shown with `--verbose`.
    pub fn detail(&self, message: impl Display) {
        if self.verbose {
            println!("{message}");
        }
    }

    /// The whole error tree of a failed command.
    pub fn error(&self, error: &impl Debug) {
        eprintln!("{} {error:?}", self.paint("error:", Color::Red, true));
    }

    pub fn paint(&self, text: impl Display, color: Color, bold: bool) -> String {
        let text = text.to_string();
        if !self.color {
            return text;
        }
        match bold {
            true => text.color(color).bold().to_string(),
            false => text.color(color).to_string(),
        }
    }
}
