//! Voice resolution: which concrete sound renders a click
//!
//! Two tiers: the sampled voice when it is selected and its buffer for the
//! role is resident, otherwise the synthesized tone for the role.

use super::config::VoiceKind;
use super::event::ClickRole;

/// Linear rise time of a synthesized click, in seconds
pub const ATTACK_SECONDS: f32 = 0.002;

/// Level the exponential decay reaches at the end of a synthesized click
pub const DECAY_FLOOR: f32 = 0.001;

/// Parameters of a synthesized tone burst
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthVoice {
    /// Sine frequency in Hz
    pub frequency: f32,
    /// Total length in seconds, attack included
    pub duration: f32,
}

impl SynthVoice {
    pub fn for_role(role: ClickRole) -> Self {
        match role {
            ClickRole::Accent => Self {
                frequency: 880.0,
                duration: 0.08,
            },
            ClickRole::Click => Self {
                frequency: 440.0,
                duration: 0.06,
            },
            ClickRole::Subdivision => Self {
                frequency: 660.0,
                duration: 0.04,
            },
        }
    }
}

/// A resolved sound source for one click
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VoiceSource {
    Synth(SynthVoice),
    /// Play the decoded sample for this role
    Sample(ClickRole),
}

/// Pick the sound for `role`. `sample_resident` says whether the decoded
/// sample for that role is available right now; it is never waited for.
pub fn resolve_voice(kind: VoiceKind, role: ClickRole, sample_resident: bool) -> VoiceSource {
    match kind {
        VoiceKind::Sampled if sample_resident => VoiceSource::Sample(role),
        _ => VoiceSource::Synth(SynthVoice::for_role(role)),
    }
}
