//! Debounced fine-quality rebuild - delays the bilinear pass while
//! gestures stream.
//!
//! During a drag/rotate/scale the dirty region redraws every tick at
//! draft quality (nearest-neighbor) to stay responsive. Flooding the
//! canvas with bilinear redraws per pointer event would be wasted work,
//! so instead:
//! 1. Each gesture redraws the region at draft quality immediately
//! 2. After a configurable settle delay, one fine-quality pass runs
//!
//! Re-scheduling an already-pending region resets its timer (debounce).

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Per-region settle timer for the fine rebuild pass.
#[derive(Debug, Clone)]
pub struct FinePassDebouncer {
    /// Delay before a settled region gets its fine pass.
    delay: Duration,
    /// Pending fine passes: region name -> trigger time.
    pending: HashMap<String, Instant>,
}

impl Default for FinePassDebouncer {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(120),
            pending: HashMap::new(),
        }
    }
}

impl FinePassDebouncer {
    /// Create with custom delay.
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            pending: HashMap::new(),
        }
    }

    pub fn delay_ms(&self) -> u64 {
        self.delay.as_millis() as u64
    }

    /// Schedule a fine pass for a region; resets the timer if one is
    /// already pending.
    pub fn schedule(&mut self, region: &str) {
        let trigger_at = Instant::now() + self.delay;
        self.pending.insert(region.to_string(), trigger_at);
        log::trace!(
            "FinePassDebouncer: scheduled '{}' in {}ms",
            region,
            self.delay.as_millis()
        );
    }

    /// Cancel a pending pass (region was cleared).
    pub fn cancel(&mut self, region: &str) {
        if self.pending.remove(region).is_some() {
            log::trace!("FinePassDebouncer: cancelled '{}'", region);
        }
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    /// Regions whose settle delay has elapsed. Triggered regions are
    /// removed from the pending set.
    pub fn tick(&mut self) -> Vec<String> {
        let now = Instant::now();
        let due: Vec<String> = self
            .pending
            .iter()
            .filter(|(_, trigger_at)| now >= **trigger_at)
            .map(|(name, _)| name.clone())
            .collect();
        for name in &due {
            self.pending.remove(name);
            log::trace!("FinePassDebouncer: triggering '{}'", name);
        }
        due
    }

    pub fn is_pending(&self, region: &str) -> bool {
        self.pending.contains_key(region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_no_trigger() {
        let mut debouncer = FinePassDebouncer::new(100);
        debouncer.schedule("front");
        assert!(debouncer.is_pending("front"));
        assert!(debouncer.tick().is_empty());
    }

    #[test]
    fn test_trigger_after_delay() {
        let mut debouncer = FinePassDebouncer::new(10);
        debouncer.schedule("front");
        std::thread::sleep(Duration::from_millis(15));

        assert_eq!(debouncer.tick(), vec!["front".to_string()]);
        assert!(!debouncer.is_pending("front"));
    }

    #[test]
    fn test_reschedule_resets_timer() {
        let mut debouncer = FinePassDebouncer::new(50);
        debouncer.schedule("front");
        std::thread::sleep(Duration::from_millis(30));

        // Another gesture arrives - timer resets.
        debouncer.schedule("front");
        assert!(debouncer.tick().is_empty());
    }

    #[test]
    fn test_cancel() {
        let mut debouncer = FinePassDebouncer::new(1);
        debouncer.schedule("back");
        debouncer.cancel("back");
        std::thread::sleep(Duration::from_millis(5));
        assert!(debouncer.tick().is_empty());
    }

    /// Independent timers per region.
    #[test]
    fn test_per_region_timers() {
        let mut debouncer = FinePassDebouncer::new(10);
        debouncer.schedule("front");
        std::thread::sleep(Duration::from_millis(15));
        debouncer.schedule("back");

        let due = debouncer.tick();
        assert_eq!(due, vec!["front".to_string()]);
        assert!(debouncer.is_pending("back"));
    }
}
