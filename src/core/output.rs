//! Colored terminal reporting for mirror builds
//!
//! Uses owo-colors for terminal colors. Everything the pipeline tells the
//! user goes through here so the binary and the library speak with one voice.

use indicatif::HumanBytes;
use owo_colors::OwoColorize;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable `debug` output.
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print an action header (blue, bold)
/// Example: "==> Building mirror from https://.../setup.ini"
pub fn action(message: &str) {
    println!("{} {}", "==>".blue().bold(), message.bold());
}

/// Print a file action with counter
/// Example: "(3/41) bash-4.4.tar.xz (1.2 MiB)"
pub fn action_numbered(current: usize, total: usize, message: &str) {
    println!(
        "{} {}",
        format!("({}/{})", current, total).cyan(),
        message
    );
}

/// Print a detail line (dimmed)
pub fn detail(message: &str) {
    println!("     {}", message.dimmed());
}

/// Print a success message (green)
pub fn success(message: &str) {
    println!("{} {}", "==>".green().bold(), message.green());
}

/// Print an info message (cyan)
pub fn info(message: &str) {
    println!("{} {}", "::".cyan(), message);
}

/// Print a warning message (yellow)
pub fn warning(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

/// Print an error message (red)
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message.red());
}

/// Print a debug message, only in verbose mode
pub fn debug(message: &str) {
    if is_verbose() {
        eprintln!("{} {}", "debug:".dimmed(), message.dimmed());
    }
}

/// Print a skip message (dimmed)
/// Example: "==> bash-4.4.tar.xz already present, skipping"
pub fn skip(message: &str) {
    println!("{} {}", "==>".dimmed(), message.dimmed());
}

/// Print a failed file with its cause indented below
pub fn file_failed(name: &str, cause: &str) {
    eprintln!("  {} {}", "FAILED".red().bold(), name);
    for line in cause.lines() {
        eprintln!("    -- {}", line.red());
    }
}

/// Render a byte count for humans
pub fn format_size(bytes: u64) -> String {
    HumanBytes(bytes).to_string()
}
