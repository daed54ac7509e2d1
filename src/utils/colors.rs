// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Status lines
//!
//! One symbol per outcome so build, publish and delete read alike.

use colored::Colorize;

/// Whether output should be colored
///
/// Respects `NO_COLOR`.
pub fn should_use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && console::colors_enabled()
}

/// Print a bold title followed by a blank line
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!();
}

/// Something is starting
pub fn print_step(msg: &str) {
    println!("  {} {}", "→".blue(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Nothing needed doing
pub fn print_skipped(msg: &str, reason: &str) {
    println!(
        "  {} {} {}",
        "○".dimmed(),
        msg.dimmed(),
        format!("({})", reason).dimmed()
    );
}

pub fn print_failure(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

/// Closing line of a command
pub fn print_summary(msg: &str, success: bool) {
    println!();
    if success {
        println!("{}", msg.green());
    } else {
        println!("{}", msg.red());
    }
}
