use std::time::{Duration, Instant};

/// Timing of one scheduler tick.
#[derive(Debug, Copy, Clone)]
pub struct FrameTime {
    /// Seconds since the previous tick, clamped.
    pub dt: f32,

    /// Timestamp of the tick.
    pub now: Instant,

    /// Monotonic tick counter, starting at 0.
    pub frame_index: u64,
}

impl FrameTime {
    /// Frame time in milliseconds.
    pub fn dt_ms(&self) -> f64 {
        f64::from(self.dt) * 1000.0
    }
}

/// Produces [`FrameTime`]s for a frame scheduler.
///
/// Delta time is clamped so a stalled host (debugger, minimized window)
/// does not hand callbacks a multi-second frame.
#[derive(Debug, Clone)]
pub struct FrameClock {
    last: Instant,
    frame_index: u64,
    dt_min: Duration,
    dt_max: Duration,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::with_clamps(Duration::from_micros(100), Duration::from_millis(250))
    }

    pub fn with_clamps(dt_min: Duration, dt_max: Duration) -> Self {
        debug_assert!(dt_min <= dt_max);
        Self::starting_at(Instant::now(), dt_min, dt_max)
    }

    /// Clock whose first tick measures from `start`. Lets tests drive time explicitly.
    pub fn starting_at(start: Instant, dt_min: Duration, dt_max: Duration) -> Self {
        Self {
            last: start,
            frame_index: 0,
            dt_min,
            dt_max,
        }
    }

    pub fn reset(&mut self) {
        self.last = Instant::now();
    }

    pub fn tick(&mut self) -> FrameTime {
        self.tick_at(Instant::now())
    }

    /// Advances the clock to `now`.
    pub fn tick_at(&mut self, now: Instant) -> FrameTime {
        let dt = now
            .saturating_duration_since(self.last)
            .clamp(self.dt_min, self.dt_max);
        self.last = now;

        let time = FrameTime {
            dt: dt.as_secs_f32(),
            now,
            frame_index: self.frame_index,
        };
        self.frame_index = self.frame_index.wrapping_add(1);
        time
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
    fn dt_is_clamped_both_ways() {
        let start = Instant::now();
        let mut clock =
            FrameClock::starting_at(start, Duration::from_millis(1), Duration::from_millis(100));

        let first = clock.tick_at(start);
        assert_eq!(first.frame_index, 0);
        assert!((first.dt_ms() - 1.0).abs() < 1e-3);

        let second = clock.tick_at(start + Duration::from_secs(5));
        assert_eq!(second.frame_index, 1);
        assert!((second.dt_ms() - 100.0).abs() < 1e-3);
    }

    #[test]
    fn dt_tracks_real_spacing() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start, Duration::ZERO, Duration::from_secs(1));
        let t = clock.tick_at(start + Duration::from_millis(16));
        assert!((t.dt_ms() - 16.0).abs() < 1e-3);
    }
}
