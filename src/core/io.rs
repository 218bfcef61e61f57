// src/core/io.rs

use crate::constants::YELL_WIDTH;
use colored::{Color, Colorize};

/// Output settings shared by the runner, the dispatch layer and the units.
///
/// Messages for the user go to stdout, failures to stderr. `quiet` silences
/// `say` but never errors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Io {
    pub quiet: bool,
    pub verbosity: u8,
}

impl Io {
    /// Applies the global `--quiet`, `--verbose` and `--no-ansi` flags.
    pub fn configure(&mut self, quiet: bool, verbosity: u8, no_ansi: bool) {
        self.quiet = quiet;
        self.verbosity = verbosity;
        if no_ansi {
            colored::control::set_override(false);
        }
    }

    /// Whether `-v` or more was given.
    pub fn is_verbose(&self) -> bool {
        self.verbosity > 0 && !self.quiet
    }

    /// Prints a progress line prefixed with a marker.
    pub fn say(&self, text: &str) {
        if !self.quiet {
            println!("{}  {}", "➜".green(), text);
        }
    }

    /// Prints a plain line unless quiet.
    pub fn writeln(&self, text: &str) {
        if !self.quiet {
            println!("{}", text);
        }
    }

    /// Prints an error line on stderr.
    pub fn error(&self, text: &str) {
        eprintln!("{}", text.red());
    }

    /// Prints `text` inside a highlighted block at least `width` columns wide.
    pub fn yell(&self, text: &str, width: usize, color: Color) {
        for line in yell_lines(text, width) {
            println!("{}", line.white().bold().on_color(color));
        }
    }

    /// Shorthand for a yell with the default width.
    pub fn warn_block(&self, text: &str, color: Color) {
        self.yell(text, YELL_WIDTH, color);
    }

    /// Writes a formatted fatal error with its origin.
    pub fn error_block(&self, message: &str, location: Option<(&str, u32)>) {
        let body = match location {
            Some((file, line)) => format!("ERROR: {} \nin {}:{}\n", message, file, line),
            None => format!("ERROR: {}\n", message),
        };
        for line in body.lines() {
            eprintln!("{}", line.white().on_red());
        }
    }
}

/// Lays out the lines of a yell block: a blank band, the padded text, another blank band.
fn yell_lines(text: &str, width: usize) -> Vec<String> {
    let text_width = text.chars().count() + 4;
    let width = width.max(text_width);
    let blank = " ".repeat(width);
    let padded = format!("  {}{}", text, " ".repeat(width - text_width + 2));
    vec![blank.clone(), padded, blank]
}
