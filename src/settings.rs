//! Engine settings
//!
//! Everything about how the engine runs, as opposed to what it plays (that is
//! `MetronomeConfig`). Deserializes from camelCase JSON; every field is
//! optional and falls back to its default.

use crate::audio::backend::ActivationPolicy;
use crate::audio::scheduler::{LOOKAHEAD, SCHEDULE_INTERVAL};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Rate used before a device has reported its own, and by offline backends
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineSettings {
    /// How far ahead of the audio clock clicks are committed
    pub lookahead_ms: u64,
    /// Scheduler wake-up period
    pub schedule_interval_ms: u64,
    pub sample_rate: u32,
    pub activation: ActivationPolicy,
    /// Directory holding the woodblock samples
    pub asset_dir: PathBuf,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            lookahead_ms: LOOKAHEAD.as_millis() as u64,
            schedule_interval_ms: SCHEDULE_INTERVAL.as_millis() as u64,
            sample_rate: DEFAULT_SAMPLE_RATE,
            activation: ActivationPolicy::default(),
            asset_dir: PathBuf::from("sounds"),
        }
    }
}

impl EngineSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead_ms = lookahead.as_millis() as u64;
        self
    }

    pub fn with_schedule_interval(mut self, interval: Duration) -> Self {
        self.schedule_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Refuse to open audio until `activate()` has been called
    pub fn with_activation(mut self, activation: ActivationPolicy) -> Self {
        self.activation = activation;
        self
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Lookahead window, never shorter than one wake-up
    pub fn lookahead(&self) -> Duration {
        Duration::from_millis(self.lookahead_ms.max(self.schedule_interval_ms))
    }

    /// Wake-up period, at least 1 ms
    pub fn schedule_interval(&self) -> Duration {
        Duration::from_millis(self.schedule_interval_ms.max(1))
    }
}
