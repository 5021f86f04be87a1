//! Time signature and beat subdivision

use std::fmt;

/// Beats per measure over the note value that gets one beat (e.g. 6/8)
///
/// Only positivity is enforced; zero components are raised to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", from = "SignatureParts"))]
pub struct TimeSignature {
    pub beats_per_measure: u32,
    pub beat_unit: u32,
}

/// Unchecked wire form of a time signature
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureParts {
    beats_per_measure: u32,
    beat_unit: u32,
}

#[cfg(feature = "serde")]
impl From<SignatureParts> for TimeSignature {
    fn from(parts: SignatureParts) -> Self {
        Self::new(parts.beats_per_measure, parts.beat_unit)
    }
}

impl TimeSignature {
    pub fn new(beats_per_measure: u32, beat_unit: u32) -> Self {
        Self {
            beats_per_measure: beats_per_measure.max(1),
            beat_unit: beat_unit.max(1),
        }
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats_per_measure, self.beat_unit)
    }
}

/// How many equal pulses make up one beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "u8", into = "u8"))]
pub enum Subdivision {
    /// One pulse per beat
    #[default]
    Single,
    /// Two pulses per beat (eighths in 4/4)
    Duplet,
    /// Three pulses per beat
    Triplet,
    /// Four pulses per beat (sixteenths in 4/4)
    Quadruplet,
}

impl Subdivision {
    pub const ALL: [Subdivision; 4] = [
        Subdivision::Single,
        Subdivision::Duplet,
        Subdivision::Triplet,
        Subdivision::Quadruplet,
    ];

    /// Map a pulse count onto the supported set, clamping to 1..=4
    pub fn from_count(count: u8) -> Self {
        match count {
            0 | 1 => Subdivision::Single,
            2 => Subdivision::Duplet,
            3 => Subdivision::Triplet,
            _ => Subdivision::Quadruplet,
        }
    }

    /// Number of pulses per beat
    pub fn count(&self) -> usize {
        match self {
            Subdivision::Single => 1,
            Subdivision::Duplet => 2,
            Subdivision::Triplet => 3,
            Subdivision::Quadruplet => 4,
        }
    }
}

impl From<u8> for Subdivision {
    fn from(count: u8) -> Self {
        Self::from_count(count)
    }
}

impl From<Subdivision> for u8 {
    fn from(subdivision: Subdivision) -> Self {
        subdivision.count() as u8
    }
}
