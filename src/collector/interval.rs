//! Sample time and interval inference.
//!
//! The interval of a record is the distance to the previous parsed
//! timestamp when that distance lies within `[0, MAX_INFERRED_INTERVAL]`.
//! Backward jumps and long gaps (writer restarts, clock steps) fall back to
//! the configured interval instead.

use tracing::trace;

use crate::util::{TimeParseError, parse_timestamp};

/// Largest gap, in seconds, accepted as a sampling interval.
pub const MAX_INFERRED_INTERVAL: i64 = 300;

/// Epoch and interval resolved for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub epoch: i64,
    pub interval: u64,
}

/// Timestamp history carried across records and stream resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampState {
    last_epoch: Option<i64>,
    current_interval: u64,
    configured_interval: u64,
}

impl TimestampState {
    pub fn new(configured_interval: u64) -> Self {
        Self {
            last_epoch: None,
            current_interval: configured_interval,
            configured_interval,
        }
    }

    /// Parses `text` and records it. On failure the state is unchanged.
    pub fn observe_text(&mut self, text: &str) -> Result<Sample, TimeParseError> {
        let epoch = parse_timestamp(text)?;
        Ok(self.observe(epoch))
    }

    /// Records a parsed timestamp and returns the interval it implies.
    pub fn observe(&mut self, epoch: i64) -> Sample {
        let delta = self.last_epoch.and_then(|last| epoch.checked_sub(last));
        let interval = match delta {
            Some(d) if (0..=MAX_INFERRED_INTERVAL).contains(&d) => d as u64,
            _ => self.configured_interval,
        };
        trace!(
            "timestamp {} (previous {:?}): interval {}s",
            epoch, self.last_epoch, interval
        );
        self.last_epoch = Some(epoch);
        self.current_interval = interval;
        Sample { epoch, interval }
    }

    /// Changes the fallback interval. Takes effect immediately when no
    /// interval has been inferred yet.
    pub fn set_configured_interval(&mut self, secs: u64) {
        if self.current_interval == self.configured_interval {
            self.current_interval = secs;
        }
        self.configured_interval = secs;
    }

    pub fn last_epoch(&self) -> Option<i64> {
        self.last_epoch
    }

    pub fn current_interval(&self) -> u64 {
        self.current_interval
    }

    pub fn configured_interval(&self) -> u64 {
        self.configured_interval
    }
}
