//! # TapCat Core
//!
//! Device-free building blocks for the TapCat metronome engine.
//! Everything here is plain data and pure functions: tempo and meter types,
//! the accent map, configuration with partial updates, the transport
//! position and its advance step, event classification and voice
//! resolution. The audio engine in the `tapcat` crate drives these types
//! from its scheduling thread.
//!
//! ## Features
//!
//! - **serde**: Deserialize configuration updates from camelCase JSON
//!
//! ## Example
//!
//! ```
//! use tapcat_core::types::{classify, ClickRole, MetronomeConfig, Transport};
//!
//! let config = MetronomeConfig::default();
//! let mut transport = Transport::anchored(0.0);
//!
//! let first = classify(transport.position(), &config);
//! assert_eq!(first.role, ClickRole::Accent);
//!
//! transport.advance(&config);
//! assert!((transport.next_event_time() - 0.5).abs() < 1e-9);
//! ```

pub mod types;

// Re-export commonly used types
pub use types::{
    AccentMap, ClickEvent, ClickRole, ConfigUpdate, MetronomeConfig, Position, Subdivision,
    Tempo, TimeSignature, Transport, VoiceKind,
};
