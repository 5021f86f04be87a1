//! Click events and their musical classification
//!
//! Every scheduled pulse is classified into a `ClickRole` (which voice
//! sounds) and a gain. Classification is a pure function of the position and
//! the configuration, so it can be tested without any timing involved.

use super::config::MetronomeConfig;
use std::fmt;

/// Gain multiplier for unaccented intra-beat pulses relative to the click
/// volume
pub const SUBDIVISION_GAIN: f32 = 0.6;

/// Position of a pulse within the measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Position {
    /// Beat within the measure, `0..beats_per_measure`
    pub beat: u32,
    /// Pulse within the beat, `0..subdivision`
    pub subdivision: u32,
}

impl Position {
    pub const ZERO: Position = Position {
        beat: 0,
        subdivision: 0,
    };

    pub fn new(beat: u32, subdivision: u32) -> Self {
        Self { beat, subdivision }
    }

    /// First pulse of the first beat
    pub fn is_downbeat(&self) -> bool {
        self.beat == 0 && self.subdivision == 0
    }

    /// First pulse of any beat
    pub fn is_beat_start(&self) -> bool {
        self.subdivision == 0
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.beat + 1, self.subdivision + 1)
    }
}

/// The voice a pulse sounds with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ClickRole {
    Accent,
    Click,
    Subdivision,
}

impl ClickRole {
    pub const ALL: [ClickRole; 3] = [ClickRole::Accent, ClickRole::Click, ClickRole::Subdivision];

    pub fn name(&self) -> &'static str {
        match self {
            ClickRole::Accent => "accent",
            ClickRole::Click => "click",
            ClickRole::Subdivision => "subdivision",
        }
    }

    /// Stable index for per-role tables
    pub fn index(&self) -> usize {
        match self {
            ClickRole::Accent => 0,
            ClickRole::Click => 1,
            ClickRole::Subdivision => 2,
        }
    }
}

/// Result of classifying one pulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub role: ClickRole,
    pub gain: f32,
    /// Value of the accent map at this pulse
    pub accented: bool,
    pub downbeat: bool,
}

/// Decide voice and gain for the pulse at `position`.
///
/// The downbeat always uses the accent voice at accent volume, whatever the
/// accent map says at index 0.
pub fn classify(position: Position, config: &MetronomeConfig) -> Classification {
    let downbeat = position.is_downbeat();
    let accented = config.accents.is_accented(position.subdivision as usize);

    let (role, gain) = if downbeat {
        (ClickRole::Accent, config.accent_volume)
    } else if position.is_beat_start() {
        if accented {
            (ClickRole::Accent, config.accent_volume)
        } else {
            (ClickRole::Click, config.click_volume)
        }
    } else if accented {
        (ClickRole::Click, config.click_volume)
    } else {
        (ClickRole::Subdivision, config.click_volume * SUBDIVISION_GAIN)
    };

    Classification {
        role,
        gain,
        accented,
        downbeat,
    }
}

/// A pulse committed to the audio clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    pub position: Position,
    /// Audio-clock time in seconds at which the click starts
    pub time: f64,
    pub role: ClickRole,
    pub gain: f32,
    pub accented: bool,
    pub downbeat: bool,
}

impl ClickEvent {
    pub fn new(position: Position, time: f64, classification: Classification) -> Self {
        Self {
            position,
            time,
            role: classification.role,
            gain: classification.gain,
            accented: classification.accented,
            downbeat: classification.downbeat,
        }
    }

    /// Whether an observer should highlight this pulse as accented
    pub fn is_emphasized(&self) -> bool {
        self.accented || self.downbeat
    }
}
