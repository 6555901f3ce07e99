//! Bookkeeping that turns per-frame durations into the start timestamps libwebp expects.

use std::os::raw::c_int;
use std::time::Duration;

use crate::error::EncodeError;

/// Longest display time of a single frame. The container stores durations in 24 bits.
pub const MAX_FRAME_DURATION_MS: u64 = (1 << 24) - 1;

/// Running total of the display time of all frames added so far, in whole milliseconds.
///
/// libwebp records each frame by its *start* time, so the timestamp for a new frame
/// is the total before that frame's own duration is added.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Timeline {
    elapsed_ms: u64,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Timestamp at which the next frame starts.
    /// Also the closing timestamp once the last frame has been added.
    pub fn next_timestamp(&self) -> Result<c_int, EncodeError> {
        c_int::try_from(self.elapsed_ms).map_err(|_| EncodeError::TimestampOverflow {
            elapsed_ms: self.elapsed_ms,
        })
    }

    /// Moves the timeline past a frame shown for `duration`.
    ///
    /// Sub-millisecond remainders are dropped, so the timeline drifts
    /// by less than one millisecond per frame.
    pub fn advance(&mut self, duration: Duration) {
        self.elapsed_ms = self.elapsed_ms.saturating_add(to_millis(duration));
    }
}

/// Rejects a frame duration the container cannot store.
pub fn check_frame_duration(duration: Duration) -> Result<u64, EncodeError> {
    let duration_ms = to_millis(duration);
    if duration_ms > MAX_FRAME_DURATION_MS {
        return Err(EncodeError::DurationTooLong {
            duration_ms,
            max_ms: MAX_FRAME_DURATION_MS,
        });
    }
    Ok(duration_ms)
}

/// Floor-converts a duration to the millisecond timestamp unit.
pub fn to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
