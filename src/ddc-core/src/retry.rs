// SPDX-FileCopyrightText: 2025 Stanislaw Grams <stanislawgrams@gmail.com>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Bounded retry for bus operations.
//!
//! Exhaustion is reported as its own outcome so callers can never mistake the
//! last failed attempt for a result.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tracing::debug;

use crate::error::DdcError;

/// Policy for retrying failed operations.
pub trait RetryPolicy: Send + Sync {
    /// Determine if another attempt should follow `attempt` failed ones.
    fn should_retry(&self, attempt: u32, error: &DdcError) -> bool;

    /// Get the delay before the next attempt.
    fn delay(&self, attempt: u32) -> Duration;

    /// Get the maximum number of attempts allowed.
    fn max_attempts(&self) -> u32;
}

/// Fixed attempt budget with a constant (usually zero) gap between attempts.
#[derive(Debug, Clone)]
pub struct FixedAttempts {
    max_attempts: u32,
    delay: Duration,
}

impl FixedAttempts {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Three immediate attempts, enough for displays that NACK while waking.
    pub fn default_ddc() -> Self {
        Self::new(3, Duration::ZERO)
    }
}

impl Default for FixedAttempts {
    fn default() -> Self {
        Self::default_ddc()
    }
}

impl RetryPolicy for FixedAttempts {
    fn should_retry(&self, attempt: u32, error: &DdcError) -> bool {
        attempt < self.max_attempts && error.is_transient()
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Result of a bounded retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome<T> {
    Success { value: T, attempts: u32 },
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: DdcError },
    /// An attempt failed with an error the policy refused to retry.
    Aborted { attempts: u32, error: DdcError },
}

pub type AttemptFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, DdcError>> + Send + 'a>>;

/// Run `op` against `target` until it succeeds or the policy gives up.
pub async fn retry_bounded<S, T, F>(
    policy: &dyn RetryPolicy,
    target: &mut S,
    mut op: F,
) -> RetryOutcome<T>
where
    S: ?Sized,
    F: for<'a> FnMut(&'a mut S) -> AttemptFuture<'a, T>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op(&mut *target).await {
            Ok(value) => {
                return RetryOutcome::Success {
                    value,
                    attempts: attempt,
                }
            }
            Err(error) => {
                if !error.is_transient() {
                    return RetryOutcome::Aborted {
                        attempts: attempt,
                        error,
                    };
                }
                if !policy.should_retry(attempt, &error) {
                    return RetryOutcome::Exhausted {
                        attempts: attempt,
                        last: error,
                    };
                }
                debug!("Attempt {} failed ({}), retrying", attempt, error);
                let delay = policy.delay(attempt);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
