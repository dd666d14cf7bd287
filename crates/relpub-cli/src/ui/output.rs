//! Human-facing console output.
//!
//! Everything here goes to stderr. Stdout carries only machine-readable
//! results (workflow commands, resolved URLs, mirrored daemon output).

use crossterm::style::Stylize;

/// A cheap, copyable handle for status messages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    quiet: bool,
}

impl Output {
    /// Create a new output handle. `quiet` hides everything but errors.
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Prints a visual section header for an operation phase.
    pub fn section(&self, title: &str) {
        if !self.quiet {
            eprintln!("{} {}", "==>".blue().bold(), title.bold());
        }
    }

    /// Prints an informational message to the console.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            eprintln!("    {msg}");
        }
    }

    /// Prints a success message to the console.
    pub fn success(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "  ✓".green());
        }
    }

    /// Prints a warning message to the console.
    pub fn warning(&self, msg: &str) {
        if !self.quiet {
            eprintln!("{} {msg}", "  !".yellow());
        }
    }

    /// Prints an error message to the console.
    pub fn error(&self, msg: &str) {
        eprintln!("{} {msg}", "  ✗".red());
    }
}
