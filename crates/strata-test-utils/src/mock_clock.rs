// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pinned, manually advanced clock for deterministic timestamps.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};

use strata_core::Clock;

/// A clock frozen at a configurable instant.
pub struct MockClock {
    now: Mutex<DateTime<Utc>>,
}

impl MockClock {
    /// Pin the clock at the given instant.
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Pin the clock at a fixed reference date (2026-03-01 12:00:00 UTC).
    pub fn default_instant() -> Self {
        Self::at(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock lock poisoned");
        *now += by;
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("clock lock poisoned")
    }
}
