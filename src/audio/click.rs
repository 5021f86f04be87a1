//! Click voice rendering
//!
//! Turns a `(voice kind, role, time, gain)` request into a concrete voice and
//! hands it to the mixer, stamped with the frame it must start on.

use super::clock::FrameClock;
use super::mixer::ScheduledVoice;
use super::oscillator::ToneBurst;
use super::samples::{DecodedSample, SampleBank};
use crossbeam_channel::Sender;
use std::sync::Arc;
use tapcat_core::types::{resolve_voice, ClickRole, SynthVoice, VoiceKind, VoiceSource};

/// Playback cursor over a decoded sample
#[derive(Debug, Clone)]
pub struct SamplePlayback {
    sample: Arc<DecodedSample>,
    cursor: usize,
    gain: f32,
}

impl SamplePlayback {
    pub fn new(sample: Arc<DecodedSample>, gain: f32) -> Self {
        Self {
            sample,
            cursor: 0,
            gain,
        }
    }

    pub fn next_sample(&mut self) -> f32 {
        let value = self.sample.frames.get(self.cursor).copied().unwrap_or(0.0);
        self.cursor += 1;
        value * self.gain
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= self.sample.frames.len()
    }
}

/// A sounding click
#[derive(Debug, Clone)]
pub enum ClickVoice {
    Tone(ToneBurst),
    Sample(SamplePlayback),
}

impl ClickVoice {
    pub fn next_sample(&mut self) -> f32 {
        match self {
            ClickVoice::Tone(tone) => tone.next_sample(),
            ClickVoice::Sample(sample) => sample.next_sample(),
        }
    }

    pub fn is_finished(&self) -> bool {
        match self {
            ClickVoice::Tone(tone) => tone.is_finished(),
            ClickVoice::Sample(sample) => sample.is_finished(),
        }
    }

    pub fn is_sample(&self) -> bool {
        matches!(self, ClickVoice::Sample(_))
    }
}

/// Anything the scheduler can render clicks into
pub trait ClickSink {
    /// Schedule one click of `role` to begin at audio time `at_time`
    fn render(&mut self, voice: VoiceKind, role: ClickRole, at_time: f64, gain: f32);
}

/// Resolves voices against the sample bank and queues them on the mixer
#[derive(Clone)]
pub struct ClickRenderer {
    voices: Sender<ScheduledVoice>,
    clock: Arc<FrameClock>,
    bank: Arc<SampleBank>,
}

impl ClickRenderer {
    pub fn new(
        voices: Sender<ScheduledVoice>,
        clock: Arc<FrameClock>,
        bank: Arc<SampleBank>,
    ) -> Self {
        Self { voices, clock, bank }
    }

    /// Build the voice for a click without queueing it
    pub fn voice_for(&self, kind: VoiceKind, role: ClickRole, gain: f32) -> ClickVoice {
        let sample_rate = self.clock.sample_rate();
        let sample = match kind {
            VoiceKind::Sampled => self.bank.get(role, sample_rate),
            VoiceKind::Synthesized => None,
        };

        let rate = sample_rate as f32;
        match (resolve_voice(kind, role, sample.is_some()), sample) {
            (VoiceSource::Sample(_), Some(sample)) => {
                ClickVoice::Sample(SamplePlayback::new(sample, gain))
            }
            (VoiceSource::Synth(synth), _) => ClickVoice::Tone(ToneBurst::new(synth, gain, rate)),
            (VoiceSource::Sample(_), None) => {
                ClickVoice::Tone(ToneBurst::new(SynthVoice::for_role(role), gain, rate))
            }
        }
    }
}

impl ClickSink for ClickRenderer {
    fn render(&mut self, voice: VoiceKind, role: ClickRole, at_time: f64, gain: f32) {
        let scheduled = ScheduledVoice {
            start_frame: self.clock.frame_at(at_time),
            voice: self.voice_for(voice, role, gain),
        };
        // Receiver is gone only once the backend has been closed
        let _ = self.voices.send(scheduled);
    }
}
