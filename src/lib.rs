//! # TapCat
//!
//! A metronome engine with sample-accurate click timing. Clicks are scheduled
//! against the audio clock a short window ahead of time, so the sound stays
//! steady no matter how late the scheduling thread wakes up.
//!
//! ## Modules
//!
//! - `audio`: The audio side. Output backend over cpal, frame clock, mixer,
//!   synthesized and sampled click voices, the lookahead scheduler, its
//!   repeating timer and the beat notifier.
//! - `engine`: `MetronomeEngine`, the control surface tying it all together.
//! - `settings`: Runtime settings such as lookahead, wake-up interval and
//!   asset location.
//!
//! Musical types (tempo, meter, accents, configuration) live in
//! `tapcat-core` and are re-exported here.
//!
//! ## Example
//!
//! ```no_run
//! use tapcat::{ConfigUpdate, EngineSettings, MetronomeEngine};
//!
//! let engine = MetronomeEngine::new(EngineSettings::default())?;
//! engine.on_beat(|beat| println!("beat {} accented: {}", beat.beat + 1, beat.accented));
//! engine.update_config(&ConfigUpdate::new().with_bpm(96.0).with_time_signature(3, 4));
//! engine.start()?;
//! # Ok::<(), tapcat::BackendError>(())
//! ```

pub mod audio;
pub mod engine;
pub mod settings;

pub use crate::audio::{ActivationPolicy, AudioBackend, BackendError, BackendState, BeatEvent};
pub use crate::engine::MetronomeEngine;
pub use crate::settings::EngineSettings;
pub use tapcat_core::types::{
    ConfigChanges, ConfigUpdate, MetronomeConfig, Position, Subdivision, TapTempo, Tempo, TempoRamp,
    TimeSignature, VoiceKind,
};
