//! Practice tempo ramps
//!
//! A ramp raises the tempo by a fixed step every interval until a ceiling is
//! reached, over a practice session of fixed length.

use super::tempo::Tempo;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoRamp {
    start: Tempo,
    duration: Duration,
    increment: f64,
    interval: Duration,
    ceiling: Tempo,
}

impl TempoRamp {
    /// A session of `duration` starting at `start`, with no tempo increase
    pub fn new(start: Tempo, duration: Duration) -> Self {
        Self {
            start,
            duration,
            increment: 0.0,
            interval: Duration::from_secs(60),
            ceiling: Tempo::new(f64::INFINITY),
        }
    }

    /// Add `bpm` to the tempo every `interval`
    pub fn with_increment(mut self, bpm: f64, interval: Duration) -> Self {
        self.increment = bpm.max(0.0);
        self.interval = interval;
        self
    }

    /// Never go faster than `ceiling`
    pub fn with_ceiling(mut self, ceiling: Tempo) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn start(&self) -> Tempo {
        self.start
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Tempo that should be playing `elapsed` into the session
    pub fn target_tempo(&self, elapsed: Duration) -> Tempo {
        if self.increment <= 0.0 || self.interval.is_zero() {
            return self.start;
        }

        let steps = (elapsed.as_secs_f64() / self.interval.as_secs_f64()).floor();
        let bpm = self.start.bpm() + self.increment * steps;
        Tempo::new(bpm.min(self.ceiling.bpm().max(self.start.bpm())))
    }

    pub fn is_complete(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }

    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.duration.saturating_sub(elapsed)
    }
}
