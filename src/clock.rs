//! Time source for freshness decisions.
//!
//! All "now" reads in the set pipeline go through a [`Clock`], so tests can
//! pin the reference time instead of racing the wall clock.

use std::time::SystemTime;

pub trait Clock {
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// A clock stopped at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub SystemTime);

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        self.0
    }
}

/// Whole seconds since the Unix epoch; instants before the epoch clamp to 0.
pub fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn fixed_clock_does_not_move() {
        let t = UNIX_EPOCH + Duration::from_secs(1_000);
        let clock = FixedClock(t);
        assert_eq!(clock.now(), t);
        assert_eq!(clock.now(), t);
    }

    #[test]
    fn unix_secs_truncates() {
        let t = UNIX_EPOCH + Duration::from_millis(2_999);
        assert_eq!(unix_secs(t), 2);
    }

    #[test]
    fn unix_secs_before_epoch_is_zero() {
        let t = UNIX_EPOCH - Duration::from_secs(10);
        assert_eq!(unix_secs(t), 0);
    }
}
