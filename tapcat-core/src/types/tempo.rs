//! Tempo representation and tap-tempo detection
//!
//! Tempo is always kept inside the playable range: out-of-range values are
//! clamped rather than rejected so the scheduler never sees an unusable BPM.

use std::fmt;
use std::time::Duration;

/// Slowest supported tempo
pub const MIN_BPM: f64 = 20.0;
/// Fastest supported tempo
pub const MAX_BPM: f64 = 300.0;
/// Tempo used when nothing else has been configured
pub const DEFAULT_BPM: f64 = 120.0;

/// Beats per minute, clamped to `MIN_BPM..=MAX_BPM`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "f64", into = "f64"))]
pub struct Tempo(f64);

impl Tempo {
    /// Create a tempo, clamping into the supported range.
    /// Non-finite input falls back to the default tempo.
    pub fn new(bpm: f64) -> Self {
        if !bpm.is_finite() {
            return Self(DEFAULT_BPM);
        }
        Self(bpm.clamp(MIN_BPM, MAX_BPM))
    }

    /// The tempo in beats per minute
    pub fn bpm(&self) -> f64 {
        self.0
    }

    /// Length of one beat in seconds
    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.0
    }

    /// Length of one subdivision tick in seconds
    pub fn seconds_per_tick(&self, ticks_per_beat: usize) -> f64 {
        self.seconds_per_beat() / ticks_per_beat.max(1) as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self(DEFAULT_BPM)
    }
}

impl From<f64> for Tempo {
    fn from(bpm: f64) -> Self {
        Self::new(bpm)
    }
}

impl From<Tempo> for f64 {
    fn from(tempo: Tempo) -> Self {
        tempo.0
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} BPM", self.0)
    }
}

/// Number of taps averaged when estimating a tempo
pub const TAP_HISTORY: usize = 4;

/// A gap longer than this between taps starts a new tap sequence
pub const TAP_RESET: Duration = Duration::from_secs(2);

/// Tap-tempo estimator
///
/// Timestamps are supplied by the caller (any monotonic origin works), which
/// keeps the estimator free of clocks and trivially testable.
#[derive(Debug, Clone, Default)]
pub struct TapTempo {
    taps: Vec<Duration>,
}

impl TapTempo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tap at `at` and return the estimated tempo, if any.
    ///
    /// At least two taps are needed. Estimates outside the supported tempo
    /// range are discarded (the taps are still remembered).
    pub fn tap(&mut self, at: Duration) -> Option<Tempo> {
        if let Some(&last) = self.taps.last() {
            if at < last || at - last > TAP_RESET {
                self.taps.clear();
            }
        }

        self.taps.push(at);
        if self.taps.len() > TAP_HISTORY {
            self.taps.remove(0);
        }

        if self.taps.len() < 2 {
            return None;
        }

        let first = self.taps[0];
        let last = self.taps[self.taps.len() - 1];
        let mean_interval_ms = (last - first).as_secs_f64() * 1000.0 / (self.taps.len() - 1) as f64;
        if mean_interval_ms <= 0.0 {
            return None;
        }

        let bpm = (60_000.0 / mean_interval_ms).round();
        (MIN_BPM..=MAX_BPM).contains(&bpm).then(|| Tempo::new(bpm))
    }

    /// Forget all taps
    pub fn reset(&mut self) {
        self.taps.clear();
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }
}
