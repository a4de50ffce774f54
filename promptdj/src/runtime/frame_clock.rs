use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// One scheduled animation frame.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameTick {
    pub frame: u64,
    pub delta: Duration,
    /// Whole frame periods that elapsed without a tick. They are skipped,
    /// never replayed.
    pub dropped: u32,
}

/// Stand-in for a display's animation-frame callback on hosts that only have
/// a clock: yields at most one frame per refresh period and drops frames when
/// the caller falls behind.
#[derive(Debug)]
pub struct FrameClock {
    fps: f32,
    frame_count: u64,
    last_frame: Instant,
    frame_intervals: VecDeque<Duration>,
    max_intervals: usize,
}

impl FrameClock {
    pub fn new(fps: f32) -> Self {
        Self::with_start(fps, Instant::now())
    }

    pub fn with_start(fps: f32, now: Instant) -> Self {
        Self {
            fps: fps.max(1.0),
            frame_count: 0,
            last_frame: now,
            frame_intervals: VecDeque::new(),
            max_intervals: 90,
        }
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_secs_f32(1.0 / self.fps)
    }

    pub fn next_deadline(&self) -> Instant {
        self.last_frame + self.frame_duration()
    }

    /// Time left until the next frame is due, zero if already due.
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next_deadline().saturating_duration_since(now)
    }

    pub fn average_fps(&self) -> f32 {
        if self.frame_intervals.is_empty() {
            return 0.0;
        }

        let sum: Duration = self.frame_intervals.iter().copied().sum();
        let avg = sum / self.frame_intervals.len() as u32;

        if avg.is_zero() {
            return 0.0;
        }

        1.0 / avg.as_secs_f32()
    }

    pub fn tick(&mut self, now: Instant) -> Option<FrameTick> {
        let delta = now.saturating_duration_since(self.last_frame);
        let period = self.frame_duration();

        if delta < period {
            return None;
        }

        let periods = delta.as_nanos() / period.as_nanos().max(1);
        self.last_frame = now;
        self.frame_count += 1;
        self.record_interval(delta);

        Some(FrameTick {
            frame: self.frame_count,
            delta,
            dropped: u32::try_from(periods.saturating_sub(1))
                .unwrap_or(u32::MAX),
        })
    }

    fn record_interval(&mut self, interval: Duration) {
        self.frame_intervals.push_back(interval);
        if self.frame_intervals.len() > self.max_intervals {
            self.frame_intervals.pop_front();
        }
    }
}
