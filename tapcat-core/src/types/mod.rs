// tapcat-core/src/types/mod.rs

pub mod accent;
pub mod config;
pub mod event;
pub mod meter;
pub mod ramp;
pub mod tempo;
pub mod transport;
pub mod voice;

pub use accent::AccentMap;
pub use config::{ConfigChanges, ConfigUpdate, MetronomeConfig, VoiceKind};
pub use event::{classify, Classification, ClickEvent, ClickRole, Position, SUBDIVISION_GAIN};
pub use meter::{Subdivision, TimeSignature};
pub use ramp::TempoRamp;
pub use tempo::{TapTempo, Tempo};
pub use transport::Transport;
pub use voice::{resolve_voice, SynthVoice, VoiceSource};
