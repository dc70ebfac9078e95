//! Time and duration utilities.
//!
//! Positions reported by the media element as floating point seconds are
//! sanitized here.

use std::time::Duration;

/// Display helpers for Duration.
pub trait DurationExt {
    /// Format as `m:ss` for display next to lyric lines.
    fn clock(&self) -> String;
}

impl DurationExt for Duration {
    fn clock(&self) -> String {
        let total = self.as_secs();
        format!("{}:{:02}", total / 60, total % 60)
    }
}

/// Convert a media position in seconds to a Duration.
///
/// Returns `None` for NaN, infinite or negative input, which media elements
/// report before metadata is loaded.
#[must_use]
pub fn position_from_secs(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock() {
        assert_eq!(Duration::ZERO.clock(), "0:00");
        assert_eq!(Duration::from_millis(62_500).clock(), "1:02");
        assert_eq!(Duration::from_secs(3600).clock(), "60:00");
    }

    #[test]
    fn test_position_from_secs() {
        assert_eq!(position_from_secs(62.5), Some(Duration::from_millis(62_500)));
        assert_eq!(position_from_secs(0.0), Some(Duration::ZERO));
        assert_eq!(position_from_secs(-1.0), None);
        assert_eq!(position_from_secs(f64::NAN), None);
        assert_eq!(position_from_secs(f64::INFINITY), None);
    }
}
