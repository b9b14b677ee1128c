// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Bounded retries with capped exponential backoff

use std::future::Future;
use std::time::Duration;

use crate::error::ClientError;

/// Delay policy between attempts: `base * 2^(attempt - 1)`, capped at
/// `max`, plus up to 10% jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base: Duration,
    pub max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(500),
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    pub const fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    /// Delay before retrying after failed attempt number `attempt` (1-based),
    /// without jitter
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base.saturating_mul(1u32 << shift).min(self.max)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.delay(attempt);
        let spread = delay.as_millis() as u64 / 10;
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::random::<u64>() % (spread + 1))
    }
}

/// Run `op` up to `trials` times, stopping at the first success.
///
/// `op` receives the 1-based attempt number. When every attempt fails the
/// last error is returned. A `trials` of zero still makes one attempt.
pub async fn with_retries<F, Fut, T>(
    trials: u32,
    backoff: Backoff,
    op_name: &str,
    mut op: F,
) -> Result<T, ClientError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let trials = trials.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(v) => return Ok(v),
            Err(e) if attempt >= trials => {
                tracing::warn!(op = op_name, attempts = attempt, error = %e, "Giving up");
                return Err(e);
            }
            Err(e) => {
                let delay = backoff.jittered(attempt);
                tracing::info!(
                    op = op_name,
                    attempt,
                    trials,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Attempt failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
