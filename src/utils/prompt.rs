// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Confirmation prompts
//!
//! Anything destructive asks first. The question is behind a trait so the
//! engines can be driven by `--force` or by tests.

use std::io::{self, Write};

/// Asks the operator a yes/no question
pub trait Confirm: Send + Sync {
    /// `true` only on an explicit yes
    fn confirm(&self, prompt: &str) -> bool;
}

/// Asks on the terminal, defaulting to no
pub struct TerminalConfirm;

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if !console::user_attended() {
            tracing::warn!("Not running on a terminal, treating confirmation as declined");
            return false;
        }

        print!("{} [y/N] ", prompt);
        io::stdout().flush().ok();

        let mut input = String::new();
        io::stdin().read_line(&mut input).ok();

        input.trim().eq_ignore_ascii_case("y")
    }
}

/// Answers yes without asking (`--force`)
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::debug!("Confirmation skipped: {}", prompt);
        true
    }
}

/// Answers no without asking
pub struct NeverConfirm;

impl Confirm for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> bool {
        false
    }
}

/// Pick the prompt implementation for a `--force` flag
pub fn confirmer(force: bool) -> Box<dyn Confirm> {
    if force {
        Box::new(AlwaysConfirm)
    } else {
        Box::new(TerminalConfirm)
    }
}
