use std::time::{Duration, Instant};

/// Measures the time between rendered frames.
///
/// Delta time is clamped so a stall (window drag, debugger) does not fling the
/// camera or the orbit forward in one step.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Option<Instant>,
    max_dt: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_max_dt(Duration::from_millis(250))
    }

    pub fn with_max_dt(max_dt: Duration) -> Self {
        Self { last: None, max_dt }
    }

    /// Seconds since the previous tick; zero on the first tick.
    pub fn tick(&mut self) -> f32 {
        self.tick_at(Instant::now())
    }

    fn tick_at(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map(|last| now.saturating_duration_since(last).min(self.max_dt))
            .unwrap_or_default();
        self.last = Some(now);
        dt.as_secs_f32()
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_is_zero_and_stalls_are_clamped() {
        let mut clock = FrameClock::with_max_dt(Duration::from_millis(100));
        let start = Instant::now();
        assert_eq!(clock.tick_at(start), 0.0);

        let dt = clock.tick_at(start + Duration::from_millis(16));
        assert!((dt - 0.016).abs() < 1e-6);

        let dt = clock.tick_at(start + Duration::from_secs(5));
        assert!((dt - 0.1).abs() < 1e-6);
    }
}
