//! Server Clock
//!
//! Wall-clock time with an optional fixed override. Settlement timestamps
//! and progress records go through this so tests (and event reruns) can
//! pin the server to a known instant.

use chrono::{DateTime, TimeZone, Utc};

/// The server's notion of "now".
///
/// By default this is the wall clock; a fixed override makes every
/// time-dependent operation deterministic.
#[derive(Clone, Debug, Default)]
pub struct GameClock {
    override_time: Option<DateTime<Utc>>,
}

impl GameClock {
    /// A clock that follows the wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// A clock pinned to a fixed instant.
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self {
            override_time: Some(at),
        }
    }

    /// A clock pinned to a unix epoch second.
    pub fn fixed_epoch(epoch_secs: i64) -> Self {
        Self {
            override_time: Utc.timestamp_opt(epoch_secs, 0).single(),
        }
    }

    /// Pin or unpin the clock.
    pub fn set_override(&mut self, at: Option<DateTime<Utc>>) {
        self.override_time = at;
    }

    /// Current server time as a `DateTime`.
    pub fn server_date(&self) -> DateTime<Utc> {
        self.override_time.unwrap_or_else(Utc::now)
    }

    /// Current server time as a unix epoch in seconds.
    pub fn server_time(&self) -> i64 {
        self.server_date().timestamp()
    }
}
