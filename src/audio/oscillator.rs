//! Sine tone bursts for synthesized clicks
//!
//! `ToneBurst` pairs a phase-accumulator sine with a `ClickEnvelope`.

use super::envelope::ClickEnvelope;
use std::f32::consts::PI;
use tapcat_core::types::SynthVoice;

/// Phase-accumulator sine oscillator
#[derive(Debug, Clone)]
pub struct SineOscillator {
    frequency: f32,
    phase: f32,
    sample_rate: f32,
}

impl SineOscillator {
    pub fn new(frequency: f32, sample_rate: f32) -> Self {
        Self {
            frequency,
            phase: 0.0,
            sample_rate,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let value = (2.0 * PI * self.phase).sin();

        self.phase += self.frequency / self.sample_rate;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        value
    }
}

/// One synthesized click: a sine shaped by a click envelope
#[derive(Debug, Clone)]
pub struct ToneBurst {
    oscillator: SineOscillator,
    envelope: ClickEnvelope,
}

impl ToneBurst {
    pub fn new(voice: SynthVoice, gain: f32, sample_rate: f32) -> Self {
        Self {
            oscillator: SineOscillator::new(voice.frequency, sample_rate),
            envelope: ClickEnvelope::new(gain, voice.duration, sample_rate),
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        self.oscillator.next_sample() * self.envelope.next_sample()
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }
}
