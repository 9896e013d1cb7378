//! Adaptive-interval scheduling for the background learning loop.
//!
//! A node just joining the network, or one that recently lost touch with
//! a chunk of the fleet, wants to poll peers aggressively until it catches
//! up; a node whose fleet-state checksum has matched its peers' for a
//! while should back off so steady-state gossip doesn't waste bandwidth.

use std::time::Duration;

/// Tracks how long to wait before the next learning round.
#[derive(Debug, Clone, Copy)]
pub struct LearningSchedule {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl LearningSchedule {
    /// Build a schedule starting at its most aggressive interval.
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        assert!(floor <= ceiling, "learning schedule floor must not exceed its ceiling");
        Self { floor, ceiling, current: floor }
    }

    /// The interval to wait before the next round.
    pub fn interval(&self) -> Duration {
        self.current
    }

    /// Call after a round that learned at least one new or updated node:
    /// resets back to the floor, since there's likely more to catch up on.
    pub fn record_progress(&mut self) {
        self.current = self.floor;
    }

    /// Call after a round that learned nothing new: doubles the interval,
    /// capped at the ceiling.
    pub fn record_no_progress(&mut self) {
        self.current = (self.current * 2).min(self.ceiling);
    }
}

impl Default for LearningSchedule {
    fn default() -> Self {
        Self::new(Duration::from_secs(5), Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backs_off_on_repeated_silence() {
        let mut schedule = LearningSchedule::new(Duration::from_secs(1), Duration::from_secs(16));
        assert_eq!(schedule.interval(), Duration::from_secs(1));
        schedule.record_no_progress();
        assert_eq!(schedule.interval(), Duration::from_secs(2));
        schedule.record_no_progress();
        schedule.record_no_progress();
        schedule.record_no_progress();
        schedule.record_no_progress();
        assert_eq!(schedule.interval(), Duration::from_secs(16));
    }

    #[test]
    fn progress_resets_to_the_floor() {
        let mut schedule = LearningSchedule::new(Duration::from_secs(1), Duration::from_secs(16));
        schedule.record_no_progress();
        schedule.record_no_progress();
        schedule.record_progress();
        assert_eq!(schedule.interval(), Duration::from_secs(1));
    }
}
