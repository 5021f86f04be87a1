//! Audio clock
//!
//! The only time reference the scheduler trusts. It counts frames actually
//! rendered by the output stream, so it advances in buffer-sized steps at
//! exactly the sample rate, independent of how the host schedules threads.
//!
//! Frames handed to the device are heard some time later. The device backend
//! records that output latency so notifications can wait for the click to be
//! audible, not merely rendered.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

/// A monotonic clock in seconds
pub trait AudioClock: Send + Sync {
    /// Current audio time in seconds
    fn now(&self) -> f64;
}

/// Frame counter advanced by the mixer after every rendered buffer
#[derive(Debug)]
pub struct FrameClock {
    frames: AtomicU64,
    sample_rate: AtomicU32,
    latency_nanos: AtomicU64,
}

impl FrameClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: AtomicU64::new(0),
            sample_rate: AtomicU32::new(sample_rate.max(1)),
            latency_nanos: AtomicU64::new(0),
        }
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Acquire)
    }

    /// Set by the backend once the device has told us its real rate.
    /// Only valid before any frame has been rendered.
    pub(crate) fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate.max(1), Ordering::Release);
    }

    /// Delay between rendering a frame and hearing it, in seconds
    pub fn output_latency(&self) -> f64 {
        Duration::from_nanos(self.latency_nanos.load(Ordering::Acquire)).as_secs_f64()
    }

    /// Updated from the output callback's playback timestamp
    pub(crate) fn set_output_latency(&self, latency: Duration) {
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.latency_nanos.store(nanos, Ordering::Release);
    }

    /// Audio time currently reaching the listener. Trails [`now`] by the
    /// output latency and is negative until the first frame is heard.
    ///
    /// [`now`]: AudioClock::now
    pub fn audible_now(&self) -> f64 {
        self.now() - self.output_latency()
    }

    pub(crate) fn advance(&self, frames: u64) {
        self.frames.fetch_add(frames, Ordering::AcqRel);
    }

    /// Frame on which something scheduled for `seconds` must start
    pub fn frame_at(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate() as f64).round() as u64
    }
}

impl AudioClock for FrameClock {
    fn now(&self) -> f64 {
        self.frames() as f64 / self.sample_rate() as f64
    }
}
