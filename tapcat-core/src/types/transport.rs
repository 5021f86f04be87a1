//! Transport position and the per-pulse advance step
//!
//! The transport always points at the *next* pulse to be scheduled: its
//! position and the audio-clock time at which that pulse must sound.

use super::config::MetronomeConfig;
use super::event::Position;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transport {
    position: Position,
    next_event_time: f64,
}

impl Transport {
    /// A transport whose first pulse (the downbeat) sounds at `time`
    pub fn anchored(time: f64) -> Self {
        Self {
            position: Position::ZERO,
            next_event_time: time,
        }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Audio-clock time of the next pulse, in seconds
    pub fn next_event_time(&self) -> f64 {
        self.next_event_time
    }

    /// Move past the current pulse.
    ///
    /// Tempo, meter and subdivision are read now, so a configuration change
    /// only affects intervals computed after it.
    pub fn advance(&mut self, config: &MetronomeConfig) {
        let ticks_per_beat = config.subdivision.count();
        self.next_event_time += config.tempo.seconds_per_tick(ticks_per_beat);

        self.position.subdivision += 1;
        if self.position.subdivision as usize >= ticks_per_beat {
            self.position.subdivision = 0;
            self.position.beat += 1;
            if self.position.beat >= config.time_signature.beats_per_measure {
                self.position.beat = 0;
            }
        }
    }

    /// Go back to the start of the measure without touching the clock
    pub fn rewind(&mut self) {
        self.position = Position::ZERO;
    }

    /// Bring the position back into range after the subdivision or meter
    /// shrank. A pulse index that no longer exists snaps to the start of the
    /// next beat; a beat past the end of the measure wraps to 0.
    pub fn conform(&mut self, config: &MetronomeConfig) {
        let beats = config.time_signature.beats_per_measure;
        if self.position.subdivision as usize >= config.subdivision.count() {
            self.position.subdivision = 0;
            self.position.beat += 1;
        }
        if self.position.beat >= beats {
            self.position.beat = 0;
        }
    }
}

impl Default for Transport {
    fn default() -> Self {
        Self::anchored(0.0)
    }
}
