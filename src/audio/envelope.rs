//! Click envelope: linear attack followed by an exponential decay
//!
//! The linear rise lasts `ATTACK_SECONDS`. The exponential tail reaches the
//! absolute level `DECAY_FLOOR` on the last sample of the click.
//!
//! # Example
//! ```ignore
//! let mut env = ClickEnvelope::new(0.8, 0.06, 48_000.0);
//! while !env.is_finished() {
//!     let amplitude = env.next_sample();
//! }
//! ```

use tapcat_core::types::voice::{ATTACK_SECONDS, DECAY_FLOOR};

/// Per-sample amplitude envelope of one click
#[derive(Debug, Clone)]
pub struct ClickEnvelope {
    peak: f32,
    level: f32,
    position: usize,
    attack_samples: usize,
    total_samples: usize,
    decay_coeff: f32,
}

impl ClickEnvelope {
    /// Envelope rising to `peak` and lasting `duration` seconds in total
    pub fn new(peak: f32, duration: f32, sample_rate: f32) -> Self {
        let total_samples = ((duration * sample_rate).round() as usize).max(2);
        let attack_samples =
            ((ATTACK_SECONDS * sample_rate).round() as usize).clamp(1, total_samples - 1);
        let decay_samples = (total_samples - attack_samples) as f32;

        // level(n) = peak * (floor / peak)^((n - attack) / decay)
        let decay_coeff = if peak > 0.0 {
            (DECAY_FLOOR / peak).powf(1.0 / decay_samples)
        } else {
            0.0
        };

        Self {
            peak: peak.max(0.0),
            level: 0.0,
            position: 0,
            attack_samples,
            total_samples,
            decay_coeff,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }

        let n = self.position;
        self.position += 1;

        if n <= self.attack_samples {
            self.level = self.peak * n as f32 / self.attack_samples as f32;
        } else {
            self.level *= self.decay_coeff;
        }
        self.level
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    /// Length in samples
    pub fn len(&self) -> usize {
        self.total_samples
    }
}
