pub mod backend;
pub mod click;
pub mod clock;
pub mod envelope;
pub mod mixer;
pub mod notifier;
pub mod oscillator;
pub mod samples;
pub mod scheduler;
pub mod timer;

pub use backend::{ActivationPolicy, AudioBackend, BackendError, BackendState};
pub use clock::{AudioClock, FrameClock};
pub use notifier::{BeatCallback, BeatEvent};
pub use samples::{AssetSource, DirectorySource, SampleError};
pub use scheduler::{LookaheadScheduler, LOOKAHEAD, SCHEDULE_INTERVAL};
