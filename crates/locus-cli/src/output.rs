// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! CLI output formatting with colors and styling.
//!
//! Respects NO_COLOR and FORCE_COLOR unless `--color` says otherwise.

use colored::{ColoredString, Colorize};
use locus_sim::CommEvent;

use crate::ColorChoice;

/// Call once at startup.
pub fn init(choice: ColorChoice) {
    match choice {
        ColorChoice::Always => colored::control::set_override(true),
        ColorChoice::Never => colored::control::set_override(false),
        ColorChoice::Auto => {
            if std::env::var("NO_COLOR").is_ok() {
                colored::control::set_override(false);
            } else if std::env::var("FORCE_COLOR").is_ok() {
                colored::control::set_override(true);
            }
        }
    }
}

pub fn error_label() -> ColoredString {
    "error".red().bold()
}

pub fn banner_ok(phase: &str) -> String {
    format!("{} {} {}", "===".dimmed(), format!("{} OK", phase).green().bold(), "===".dimmed())
}

pub fn label(name: &str) -> ColoredString {
    format!("{name}:").cyan()
}

pub fn comm_event(e: &CommEvent) -> String {
    format!(
        "  {:<28} locale {:<3} raddr {:<10} size {:<6} id {}",
        e.func.symbol().yellow(),
        e.locale,
        format!("{:#x}", e.raddr),
        e.size,
        e.comm_id
    )
}
