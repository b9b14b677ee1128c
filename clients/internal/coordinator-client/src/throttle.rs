// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Bandwidth throttle for streamed uploads

use std::time::Duration;

use tokio::time::Instant;

/// Paces a byte stream to an average of at most `bytes_per_sec`.
///
/// Tokens accrue continuously from the first call; a chunk is released
/// once enough have accrued to cover it. There is no burst allowance, so
/// after S bytes at least S / rate seconds have elapsed.
#[derive(Debug)]
pub struct Throttle {
    bytes_per_sec: u64,
    started: Option<Instant>,
    consumed: u64,
}

impl Throttle {
    pub fn new(bytes_per_sec: u64) -> Self {
        Self {
            bytes_per_sec: bytes_per_sec.max(1),
            started: None,
            consumed: 0,
        }
    }

    pub fn bytes_per_sec(&self) -> u64 {
        self.bytes_per_sec
    }

    /// Wait until `n` more bytes may be released
    pub async fn consume(&mut self, n: usize) {
        let started = *self.started.get_or_insert_with(Instant::now);
        self.consumed += n as u64;
        let due = started + Duration::from_secs_f64(self.consumed as f64 / self.bytes_per_sec as f64);
        tokio::time::sleep_until(due).await;
    }
}
