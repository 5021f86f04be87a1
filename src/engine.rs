//! Metronome engine
//!
//! The control surface. Owns the audio backend, the lookahead scheduler and
//! the repeating timer that drives it, the sample loader and the beat
//! notifier, and wires them together:
//!
//! ```text
//! timer --tick--> scheduler --click--> renderer --voice--> mixer (audio thread)
//!                          \--event--> notifier --beat--> observers
//! ```
//!
//! Every method takes `&self`; the engine can be shared behind an `Arc`.
//! Locks are always taken in the order timer, backend, scheduler.

use crate::audio::backend::{AudioBackend, BackendError, BackendState};
use crate::audio::click::{ClickRenderer, ClickSink};
use crate::audio::clock::{AudioClock, FrameClock};
use crate::audio::notifier::{BeatEvent, BeatNotifier, NotifierHandle};
use crate::audio::samples::{AssetSource, DirectorySource, SampleLoader};
use crate::audio::scheduler::LookaheadScheduler;
use crate::audio::timer::RepeatingTimer;
use crate::settings::EngineSettings;
use anyhow::anyhow;
use crossbeam_channel::Receiver;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tapcat_core::types::{ConfigChanges, ConfigUpdate, MetronomeConfig, Position, Tempo, TempoRamp};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct MetronomeEngine {
    settings: EngineSettings,
    backend: Mutex<AudioBackend>,
    clock: Arc<FrameClock>,
    scheduler: Arc<Mutex<LookaheadScheduler>>,
    renderer: ClickRenderer,
    loader: SampleLoader,
    notifier: Mutex<BeatNotifier>,
    notify: NotifierHandle,
    timer: Mutex<Option<RepeatingTimer>>,
    disposed: AtomicBool,
}

impl MetronomeEngine {
    /// Engine on the default output device, loading samples from
    /// `settings.asset_dir`
    pub fn new(settings: EngineSettings) -> Result<Self, BackendError> {
        let backend = AudioBackend::device(settings.activation, settings.sample_rate);
        let source = Arc::new(DirectorySource::new(settings.asset_dir.clone()));
        Self::with_backend(settings, backend, source)
    }

    /// Engine on an offline backend, rendered through [`render`](Self::render)
    pub fn offline(settings: EngineSettings) -> Result<Self, BackendError> {
        let backend = AudioBackend::offline(settings.sample_rate, settings.activation);
        let source = Arc::new(DirectorySource::new(settings.asset_dir.clone()));
        Self::with_backend(settings, backend, source)
    }

    /// Engine on `backend`, loading samples from `source`. Fails only if the
    /// notifier thread cannot be started.
    pub fn with_backend(
        settings: EngineSettings,
        backend: AudioBackend,
        source: Arc<dyn AssetSource>,
    ) -> Result<Self, BackendError> {
        let notifier =
            BeatNotifier::new().map_err(|e| anyhow!("Failed to start notifier thread: {}", e))?;
        let notify = notifier.handle();

        let clock = backend.clock();
        let loader = SampleLoader::new(source, clock.clone());
        let renderer =
            ClickRenderer::new(backend.voice_sender(), clock.clone(), loader.bank());
        let scheduler = LookaheadScheduler::new(MetronomeConfig::default())
            .with_lookahead(settings.lookahead());

        Ok(Self {
            settings,
            backend: Mutex::new(backend),
            clock,
            scheduler: Arc::new(Mutex::new(scheduler)),
            renderer,
            loader,
            notifier: Mutex::new(notifier),
            notify,
            timer: Mutex::new(None),
            disposed: AtomicBool::new(false),
        })
    }

    /// Start clicking from the top of the measure.
    ///
    /// Opens audio output on first use. The downbeat is committed before this
    /// returns. Calling `start` while running does nothing.
    pub fn start(&self) -> Result<(), BackendError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(BackendError::Closed);
        }

        let mut timer = lock(&self.timer);
        lock(&self.backend).resume()?;

        let mut scheduler = lock(&self.scheduler);
        self.loader.ensure_loaded(scheduler.config().voice_kind);
        if !scheduler.start(self.clock.now()) {
            return Ok(());
        }
        log::debug!("Metronome started at {}", scheduler.config().tempo);

        let mut renderer = self.renderer.clone();
        drain(&mut scheduler, &self.clock, &mut renderer, &self.notify);
        drop(scheduler);

        let shared = self.scheduler.clone();
        let clock = self.clock.clone();
        let notify = self.notify.clone();
        let started = RepeatingTimer::start(self.settings.schedule_interval(), move || {
            drain(&mut lock(&shared), &clock, &mut renderer, &notify);
        });

        match started {
            Ok(handle) => {
                *timer = Some(handle);
                Ok(())
            }
            Err(e) => {
                lock(&self.scheduler).stop();
                Err(anyhow!("Failed to start scheduler thread: {}", e).into())
            }
        }
    }

    /// Stop clicking and rewind to the top of the measure. Clicks already
    /// handed to the audio thread still sound; pending beat notifications are
    /// dropped.
    pub fn stop(&self) {
        let mut timer = lock(&self.timer);
        if let Some(mut handle) = timer.take() {
            handle.cancel();
        }
        if lock(&self.scheduler).stop() {
            lock(&self.notifier).clear();
            log::debug!("Metronome stopped");
        }
    }

    /// Merge a partial configuration; effective from the next click
    pub fn update_config(&self, update: &ConfigUpdate) -> ConfigChanges {
        let (changes, voice_kind) = {
            let mut scheduler = lock(&self.scheduler);
            let changes = scheduler.update(update);
            (changes, scheduler.config().voice_kind)
        };

        if !changes.is_empty() {
            log::debug!("Configuration changed: {:?}", changes);
        }
        if changes.voice_kind {
            self.loader.ensure_loaded(voice_kind);
        }
        changes
    }

    pub fn set_tempo(&self, bpm: f64) -> Tempo {
        self.update_config(&ConfigUpdate::new().with_bpm(bpm));
        self.config().tempo
    }

    /// Flip one accent flag; false if `index` is not a valid pulse
    pub fn toggle_accent(&self, index: usize) -> bool {
        lock(&self.scheduler).toggle_accent(index)
    }

    /// Move the tempo to where `ramp` says it should be after `elapsed`
    pub fn apply_ramp(&self, ramp: &TempoRamp, elapsed: Duration) -> Tempo {
        let target = ramp.target_tempo(elapsed);
        if lock(&self.scheduler).set_tempo(target) {
            log::debug!("Practice ramp moved tempo to {}", target);
        }
        target
    }

    /// Run one scheduling pass now instead of waiting for the timer
    pub fn tick(&self) -> usize {
        let mut renderer = self.renderer.clone();
        drain(&mut lock(&self.scheduler), &self.clock, &mut renderer, &self.notify)
    }

    pub fn config(&self) -> MetronomeConfig {
        lock(&self.scheduler).config().clone()
    }

    /// Next position to be scheduled
    pub fn position(&self) -> Position {
        lock(&self.scheduler).position()
    }

    pub fn is_running(&self) -> bool {
        lock(&self.scheduler).is_running()
    }

    /// Call `callback` for every click when it sounds. Replaces any earlier
    /// callback.
    pub fn on_beat<F>(&self, callback: F)
    where
        F: FnMut(BeatEvent) + Send + 'static,
    {
        lock(&self.notifier).set_observer(Some(Box::new(callback)));
    }

    pub fn clear_observer(&self) {
        lock(&self.notifier).set_observer(None);
    }

    pub fn subscribe(&self) -> Receiver<BeatEvent> {
        lock(&self.notifier).subscribe()
    }

    /// Record a user gesture, allowing audio to open
    pub fn activate(&self) {
        lock(&self.backend).activate();
    }

    pub fn backend_state(&self) -> BackendState {
        lock(&self.backend).state()
    }

    /// Current audio time in seconds
    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    /// Render a mono buffer from an offline engine; see [`AudioBackend::render`]
    pub fn render(&self, out: &mut [f32]) -> usize {
        lock(&self.backend).render(out)
    }

    pub fn samples(&self) -> &SampleLoader {
        &self.loader
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Stop, close audio and shut down the notifier. Idempotent; the engine
    /// cannot be started again.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.stop();
        lock(&self.backend).close();
        lock(&self.notifier).shutdown();
        log::debug!("Metronome disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for MetronomeEngine {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One scheduling pass: render every click inside the window and queue its
/// notification
fn drain(
    scheduler: &mut LookaheadScheduler,
    clock: &FrameClock,
    renderer: &mut ClickRenderer,
    notify: &NotifierHandle,
) -> usize {
    let now = clock.now();
    let heard = clock.audible_now();
    let voice = scheduler.config().voice_kind;
    scheduler.drain(now, |event| {
        renderer.render(voice, event.role, event.time, event.gain);
        notify.notify(event, heard);
    })
}
