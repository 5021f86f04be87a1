//! Metronome configuration and partial updates
//!
//! `MetronomeConfig` is the complete, always-valid configuration the
//! scheduler reads. External control surfaces push `ConfigUpdate`s: every
//! field is optional and omitted fields keep their previous value. Invalid
//! values are clamped into range when the update is applied.

use super::accent::AccentMap;
use super::meter::{Subdivision, TimeSignature};
use super::tempo::Tempo;

/// Which sound source renders clicks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum VoiceKind {
    /// Sine tone bursts generated on the fly
    #[default]
    #[cfg_attr(feature = "serde", serde(alias = "synth"))]
    Synthesized,
    /// Pre-recorded woodblock samples
    #[cfg_attr(feature = "serde", serde(alias = "woodblock"))]
    Sampled,
}

impl VoiceKind {
    /// Parse a voice kind from a string (case-insensitive)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "synthesized" | "synth" | "tone" => Some(VoiceKind::Synthesized),
            "sampled" | "sample" | "woodblock" => Some(VoiceKind::Sampled),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            VoiceKind::Synthesized => "synthesized",
            VoiceKind::Sampled => "sampled",
        }
    }
}

/// Clamp a gain into `0.0..=1.0`; NaN becomes silence
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Complete metronome configuration
///
/// On the wire a configuration is a full [`ConfigUpdate`]. Deserializing
/// applies it to the defaults, so missing fields keep their default values
/// and out-of-range ones are clamped exactly as [`apply`](Self::apply) does.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "ConfigUpdate", into = "ConfigUpdate"))]
pub struct MetronomeConfig {
    pub tempo: Tempo,
    pub time_signature: TimeSignature,
    pub subdivision: Subdivision,
    pub accents: AccentMap,
    /// Gain for accented clicks, `0.0..=1.0`
    pub accent_volume: f32,
    /// Gain for regular clicks, `0.0..=1.0`
    pub click_volume: f32,
    pub voice_kind: VoiceKind,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            tempo: Tempo::default(),
            time_signature: TimeSignature::default(),
            subdivision: Subdivision::default(),
            accents: AccentMap::default(),
            accent_volume: 1.0,
            click_volume: 0.7,
            voice_kind: VoiceKind::default(),
        }
    }
}

impl From<ConfigUpdate> for MetronomeConfig {
    fn from(update: ConfigUpdate) -> Self {
        Self::from_update(&update)
    }
}

impl From<MetronomeConfig> for ConfigUpdate {
    fn from(config: MetronomeConfig) -> Self {
        Self::full(&config)
    }
}

impl MetronomeConfig {
    /// Default configuration with `update` applied on top
    pub fn from_update(update: &ConfigUpdate) -> Self {
        let mut config = Self::default();
        config.apply(update);
        config
    }

    /// Merge a partial update into this configuration.
    ///
    /// A subdivision change regenerates the accent map before any accent
    /// pattern carried by the same update is applied, so a full update from
    /// a UI store lands exactly as sent.
    pub fn apply(&mut self, update: &ConfigUpdate) -> ConfigChanges {
        let mut changes = ConfigChanges::default();

        if let Some(bpm) = update.bpm {
            let tempo = Tempo::new(bpm);
            changes.tempo = tempo != self.tempo;
            self.tempo = tempo;
        }

        if update.beats_per_measure.is_some() || update.beat_unit.is_some() {
            let time_signature = TimeSignature::new(
                update
                    .beats_per_measure
                    .unwrap_or(self.time_signature.beats_per_measure),
                update.beat_unit.unwrap_or(self.time_signature.beat_unit),
            );
            changes.time_signature = time_signature != self.time_signature;
            self.time_signature = time_signature;
        }

        if let Some(count) = update.subdivision {
            let subdivision = Subdivision::from_count(count);
            if subdivision != self.subdivision {
                self.subdivision = subdivision;
                self.accents = AccentMap::for_subdivision(subdivision);
                changes.subdivision = true;
                changes.accents = true;
            }
        }

        if let Some(pattern) = &update.accent_pattern {
            let accents = AccentMap::from_pattern(pattern, self.subdivision);
            changes.accents |= accents != self.accents;
            self.accents = accents;
        }

        if let Some(volume) = update.accent_volume {
            let volume = clamp_volume(volume);
            changes.volumes |= volume != self.accent_volume;
            self.accent_volume = volume;
        }

        if let Some(volume) = update.click_volume {
            let volume = clamp_volume(volume);
            changes.volumes |= volume != self.click_volume;
            self.click_volume = volume;
        }

        if let Some(kind) = update.voice_kind {
            changes.voice_kind = kind != self.voice_kind;
            self.voice_kind = kind;
        }

        changes
    }

    /// Flip the accent flag of one pulse; returns false for an invalid index
    pub fn toggle_accent(&mut self, index: usize) -> bool {
        self.accents.toggle(index)
    }
}

/// A partial configuration; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct ConfigUpdate {
    pub bpm: Option<f64>,
    pub beats_per_measure: Option<u32>,
    pub beat_unit: Option<u32>,
    pub subdivision: Option<u8>,
    pub accent_pattern: Option<Vec<bool>>,
    pub accent_volume: Option<f32>,
    pub click_volume: Option<f32>,
    pub voice_kind: Option<VoiceKind>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// A full update carrying every field of `config`
    pub fn full(config: &MetronomeConfig) -> Self {
        Self {
            bpm: Some(config.tempo.bpm()),
            beats_per_measure: Some(config.time_signature.beats_per_measure),
            beat_unit: Some(config.time_signature.beat_unit),
            subdivision: Some(config.subdivision.count() as u8),
            accent_pattern: Some(config.accents.as_slice().to_vec()),
            accent_volume: Some(config.accent_volume),
            click_volume: Some(config.click_volume),
            voice_kind: Some(config.voice_kind),
        }
    }

    pub fn with_bpm(mut self, bpm: f64) -> Self {
        self.bpm = Some(bpm);
        self
    }

    pub fn with_time_signature(mut self, beats_per_measure: u32, beat_unit: u32) -> Self {
        self.beats_per_measure = Some(beats_per_measure);
        self.beat_unit = Some(beat_unit);
        self
    }

    pub fn with_subdivision(mut self, subdivision: u8) -> Self {
        self.subdivision = Some(subdivision);
        self
    }

    pub fn with_accent_pattern(mut self, pattern: Vec<bool>) -> Self {
        self.accent_pattern = Some(pattern);
        self
    }

    pub fn with_accent_volume(mut self, volume: f32) -> Self {
        self.accent_volume = Some(volume);
        self
    }

    pub fn with_click_volume(mut self, volume: f32) -> Self {
        self.click_volume = Some(volume);
        self
    }

    pub fn with_voice_kind(mut self, kind: VoiceKind) -> Self {
        self.voice_kind = Some(kind);
        self
    }
}

/// Which parts of a configuration actually changed during `apply`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChanges {
    pub tempo: bool,
    pub time_signature: bool,
    pub subdivision: bool,
    pub accents: bool,
    pub volumes: bool,
    pub voice_kind: bool,
}

impl ConfigChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// A new meter invalidates the running position
    pub fn resets_position(&self) -> bool {
        self.time_signature
    }
}
