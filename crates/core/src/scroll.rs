//! Infinite-scroll trigger.

/// Distance from the bottom (in layout units) below which the next page loads.
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 100.0;

/// Scroll position of a list container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub viewport_height: f64,
    pub content_height: f64,
}

impl ScrollMetrics {
    /// Remaining distance between the bottom of the viewport and the end of
    /// the content. Never negative.
    #[must_use]
    pub fn remaining(&self) -> f64 {
        (self.content_height - self.scroll_top - self.viewport_height).max(0.0)
    }
}

/// Fires once each time the remaining distance crosses below the threshold.
///
/// After firing the trigger stays disarmed until [`ScrollTrigger::settle`]
/// is called (the request it started has resolved). Scroll events that
/// arrive in between are ignored.
#[derive(Debug, Clone)]
pub struct ScrollTrigger {
    threshold: f64,
    armed: bool,
}

impl Default for ScrollTrigger {
    fn default() -> Self {
        Self::new(DEFAULT_SCROLL_THRESHOLD)
    }
}

impl ScrollTrigger {
    #[must_use]
    pub const fn new(threshold: f64) -> Self {
        Self {
            threshold,
            armed: true,
        }
    }

    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.threshold
    }

    #[must_use]
    pub const fn is_armed(&self) -> bool {
        self.armed
    }

    /// Feed a scroll event. Returns `true` if the next page should load.
    pub fn observe(&mut self, metrics: ScrollMetrics) -> bool {
        if !self.armed || metrics.remaining() >= self.threshold {
            return false;
        }
        self.armed = false;
        true
    }

    /// Re-arm after the triggered request resolved.
    pub const fn settle(&mut self) {
        self.armed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(scroll_top: f64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top,
            viewport_height: 600.0,
            content_height: 1200.0,
        }
    }

    #[test]
    fn test_remaining() {
        assert!((at(500.0).remaining() - 100.0).abs() < f64::EPSILON);
        assert!(at(900.0).remaining().abs() < f64::EPSILON);
    }

    #[test]
    fn test_fires_once_per_crossing() {
        let mut trigger = ScrollTrigger::default();
        assert!(!trigger.observe(at(400.0)));
        assert!(!trigger.observe(at(500.0)));
        assert!(trigger.observe(at(520.0)));
        assert!(!trigger.observe(at(560.0)));
        assert!(!trigger.observe(at(600.0)));

        trigger.settle();
        assert!(trigger.observe(at(600.0)));
    }

    #[test]
    fn test_custom_threshold() {
        let mut trigger = ScrollTrigger::new(300.0);
        assert!(trigger.observe(at(350.0)));
    }
}
