//! Ledger-local timestamps.
//!
//! The gateway stamps every transaction with the local time of a fixed
//! time zone. The timestamp is the first column of every record key, so
//! two identical requests only collide when they land on the same
//! nanosecond-resolution string.

use chrono::{DateTime, FixedOffset, Utc};

/// Rendering used for record timestamps, e.g.
/// `2026-10-16 09:30:00.123456789 +0800`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f %z";

/// Renders a timestamp in [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(at: &DateTime<FixedOffset>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Source of the current time for the gateway.
pub trait Clock: Send + Sync {
    /// The current instant in the clock's time zone.
    fn now(&self) -> DateTime<FixedOffset>;

    /// The current instant rendered as a record timestamp.
    fn timestamp(&self) -> String {
        format_timestamp(&self.now())
    }
}

/// Wall clock pinned to a fixed UTC offset.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    offset: FixedOffset,
}

impl SystemClock {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Builds a clock from an offset in minutes east of UTC.
    ///
    /// Returns `None` when the offset is a day or more.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        FixedOffset::east_opt(minutes.checked_mul(60)?).map(Self::new)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.offset)
    }
}

/// A clock frozen at one instant. Handy whenever two requests must share a
/// timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<FixedOffset>,
}

impl FixedClock {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self { at }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.at
    }
}
