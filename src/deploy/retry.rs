// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 defflow contributors

//! Bounded retry for remote calls

use std::future::Future;
use std::time::Duration;

use crate::errors::{DefflowError, DefflowResult};

/// How the wait between attempts grows
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed,
    Exponential { multiplier: f64, max_delay: Duration },
}

/// Attempts and waits for one kind of remote call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Wait before the second attempt
    pub delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Template validation: one extra attempt, immediately
    pub fn validation() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Publisher deletion while child resources finish tearing down
    pub fn publisher_delete() -> Self {
        Self {
            max_attempts: 6,
            delay: Duration::from_secs(30),
            backoff: Backoff::Fixed,
        }
    }

    /// Registry pushes of template artifacts, which fail transiently while
    /// a fresh manifest's repository is still being provisioned
    pub fn artifact_push() -> Self {
        Self {
            max_attempts: 21,
            delay: Duration::from_secs(3),
            backoff: Backoff::Fixed,
        }
    }

    /// Registry credential requests dropped before the service answered
    pub fn credential() -> Self {
        Self {
            max_attempts: 2,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
            backoff: Backoff::Fixed,
        }
    }

    /// Same attempts, no waiting
    pub fn without_delay(mut self) -> Self {
        self.delay = Duration::ZERO;
        self
    }

    /// Wait after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential {
                multiplier,
                max_delay,
            } => {
                let exponent = attempt.saturating_sub(1) as i32;
                let secs = self.delay.as_secs_f64() * multiplier.powi(exponent);
                Duration::from_secs_f64(secs.min(max_delay.as_secs_f64()))
            }
        }
    }

    /// Run `op` until it succeeds, fails with an error `retryable` rejects,
    /// or attempts run out; the last error is returned
    pub async fn run<T, F, Fut, R>(&self, label: &str, mut op: F, retryable: R) -> DefflowResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DefflowResult<T>>,
        R: Fn(&DefflowError) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_attempts && retryable(&e) => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        "{} failed (attempt {}/{}): {}; retrying in {}s",
                        label,
                        attempt,
                        self.max_attempts,
                        e,
                        delay.as_secs()
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
