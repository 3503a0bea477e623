//! Frame pacing.

use std::time::{Duration, Instant};

use crate::config::MIN_FRAME_MS;

/// Result of asking the limiter for a new frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameTick {
    /// Render, advancing the simulation by `dt` seconds.
    Ready { dt: f32 },
    /// Too soon since the last frame; wait this long and skip.
    TooEarly(Duration),
}

/// Caps the frame rate by enforcing a minimum interval between frames.
#[derive(Debug, Clone)]
pub struct FrameLimiter {
    min_interval: Duration,
    last: Option<Instant>,
}

impl FrameLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: None,
        }
    }

    pub fn from_millis(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// The first tick always renders with `dt == 0`.
    pub fn tick(&mut self, now: Instant) -> FrameTick {
        let Some(last) = self.last else {
            self.last = Some(now);
            return FrameTick::Ready { dt: 0.0 };
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.min_interval {
            return FrameTick::TooEarly(self.min_interval - elapsed);
        }

        self.last = Some(now);
        FrameTick::Ready {
            dt: elapsed.as_secs_f32(),
        }
    }

    /// Forgets the previous frame so the next tick does not integrate the
    /// time spent paused.
    pub fn reset(&mut self) {
        self.last = None;
    }
}

impl Default for FrameLimiter {
    fn default() -> Self {
        Self::from_millis(MIN_FRAME_MS)
    }
}

/// Counts presented frames and reports the rate once per second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    last_fps: f32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            last_fps: 0.0,
        }
    }

    /// Records one frame. Returns the frame rate when a full second has
    /// elapsed since the last report.
    pub fn record(&mut self, now: Instant) -> Option<f32> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < Duration::from_secs(1) {
            return None;
        }

        self.last_fps = self.frames as f32 / elapsed.as_secs_f32();
        self.frames = 0;
        self.window_start = now;
        Some(self.last_fps)
    }

    pub fn fps(&self) -> f32 {
        self.last_fps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_first_tick_is_ready() {
        let mut limiter = FrameLimiter::default();
        assert_eq!(limiter.tick(Instant::now()), FrameTick::Ready { dt: 0.0 });
    }

    #[test]
    fn test_too_early_reports_remaining_time() {
        let start = Instant::now();
        let mut limiter = FrameLimiter::from_millis(2);
        limiter.tick(start);

        match limiter.tick(start + Duration::from_micros(500)) {
            FrameTick::TooEarly(wait) => assert_eq!(wait, Duration::from_micros(1500)),
            other => panic!("expected a skip, got {other:?}"),
        }
    }

    #[test]
    fn test_skipped_tick_does_not_advance() {
        let start = Instant::now();
        let mut limiter = FrameLimiter::from_millis(2);
        limiter.tick(start);
        limiter.tick(start + Duration::from_millis(1));

        match limiter.tick(start + Duration::from_millis(16)) {
            FrameTick::Ready { dt } => assert!(approx_eq(dt, 0.016)),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_restarts_timing() {
        let start = Instant::now();
        let mut limiter = FrameLimiter::default();
        limiter.tick(start);
        limiter.reset();
        assert_eq!(
            limiter.tick(start + Duration::from_secs(5)),
            FrameTick::Ready { dt: 0.0 }
        );
    }

    #[test]
    fn test_fps_counter_reports_once_per_second() {
        let start = Instant::now();
        let mut counter = FpsCounter::new(start);
        for i in 1..60 {
            assert_eq!(counter.record(start + Duration::from_millis(i * 16)), None);
        }
        let fps = counter.record(start + Duration::from_secs(1)).unwrap();
        assert!(approx_eq(fps, 60.0));
        assert!(approx_eq(counter.fps(), 60.0));
        assert_eq!(counter.record(start + Duration::from_millis(1016)), None);
    }
}
