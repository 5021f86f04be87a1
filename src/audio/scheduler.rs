//! Lookahead scheduler
//!
//! Wakes up every few milliseconds and commits every click whose start time
//! falls inside a short window ahead of the audio clock. Clicks are rendered
//! against audio time, not wake-up time, so timer jitter never reaches the
//! output as long as a wake-up happens at least once per window.
//!
//! The scheduler itself is a plain state machine; the engine owns the timer
//! and decides what "emit" means.

use std::time::Duration;
use tapcat_core::types::{
    classify, ClickEvent, ConfigChanges, ConfigUpdate, MetronomeConfig, Position, Tempo, Transport,
};

/// How far ahead of the audio clock clicks are committed
pub const LOOKAHEAD: Duration = Duration::from_millis(100);

/// How often the scheduler wakes up
pub const SCHEDULE_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone)]
pub struct LookaheadScheduler {
    config: MetronomeConfig,
    transport: Transport,
    running: bool,
    lookahead: f64,
}

impl LookaheadScheduler {
    pub fn new(config: MetronomeConfig) -> Self {
        Self {
            config,
            transport: Transport::default(),
            running: false,
            lookahead: LOOKAHEAD.as_secs_f64(),
        }
    }

    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead.as_secs_f64();
        self
    }

    /// Begin at (0, 0) with the first click at `now`. Returns false if
    /// already running.
    pub fn start(&mut self, now: f64) -> bool {
        if self.running {
            return false;
        }
        self.transport = Transport::anchored(now);
        self.running = true;
        true
    }

    /// Stop producing clicks and rewind to (0, 0). Returns false if not
    /// running.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.transport.rewind();
        true
    }

    /// Merge a partial configuration. Takes effect from the next click.
    pub fn update(&mut self, update: &ConfigUpdate) -> ConfigChanges {
        let changes = self.config.apply(update);
        if changes.resets_position() {
            self.transport.rewind();
        } else if changes.subdivision {
            self.transport.conform(&self.config);
        }
        changes
    }

    pub fn set_tempo(&mut self, tempo: Tempo) -> bool {
        let changed = self.config.tempo != tempo;
        self.config.tempo = tempo;
        changed
    }

    pub fn toggle_accent(&mut self, index: usize) -> bool {
        self.config.toggle_accent(index)
    }

    /// Commit every click starting before `now + lookahead`, in order, and
    /// return how many were emitted.
    pub fn drain<F>(&mut self, now: f64, mut emit: F) -> usize
    where
        F: FnMut(&ClickEvent),
    {
        if !self.running {
            return 0;
        }

        let horizon = now + self.lookahead;
        let mut emitted = 0;
        while self.transport.next_event_time() < horizon {
            let position = self.transport.position();
            let event = ClickEvent::new(
                position,
                self.transport.next_event_time(),
                classify(position, &self.config),
            );
            emit(&event);
            self.transport.advance(&self.config);
            emitted += 1;
        }
        emitted
    }

    pub fn config(&self) -> &MetronomeConfig {
        &self.config
    }

    /// The next position to be scheduled
    pub fn position(&self) -> Position {
        self.transport.position()
    }

    pub fn next_event_time(&self) -> f64 {
        self.transport.next_event_time()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_secs_f64(self.lookahead)
    }
}

impl Default for LookaheadScheduler {
    fn default() -> Self {
        Self::new(MetronomeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapcat_core::types::ClickRole;

    fn scheduler(update: ConfigUpdate) -> LookaheadScheduler {
        LookaheadScheduler::new(MetronomeConfig::from_update(&update))
    }

    /// Drain as a 25ms timer would until `until`, collecting every click
    fn run(s: &mut LookaheadScheduler, from: f64, until: f64) -> Vec<ClickEvent> {
        let mut events = Vec::new();
        let mut now = from;
        while now < until {
            s.drain(now, |e| events.push(*e));
            now += SCHEDULE_INTERVAL.as_secs_f64();
        }
        events
    }

    #[test]
    fn test_not_running_emits_nothing() {
        let mut s = LookaheadScheduler::default();
        assert_eq!(s.drain(0.0, |_| panic!("should not emit")), 0);
    }

    #[test]
    fn test_first_drain_covers_lookahead_only() {
        let mut s = scheduler(ConfigUpdate::new().with_bpm(120.0));
        assert!(s.start(1.0));

        let mut events = Vec::new();
        assert_eq!(s.drain(1.0, |e| events.push(*e)), 1);
        assert_eq!(events[0].time, 1.0);
        assert_eq!(events[0].position, Position::ZERO);

        // Nothing new until the next click enters the window
        assert_eq!(s.drain(1.35, |_| {}), 0);
        assert_eq!(s.drain(1.41, |_| {}), 1);
    }

    #[test]
    fn test_interval_is_constant() {
        for (bpm, sub) in [(120.0, 1), (97.0, 3), (300.0, 4), (20.0, 2)] {
            let mut s = scheduler(ConfigUpdate::new().with_bpm(bpm).with_subdivision(sub));
            s.start(0.0);

            let expected = 60.0 / bpm / sub as f64;
            let events = run(&mut s, 0.0, expected * 130.0);
            assert!(events.len() >= 100);
            for pair in events.windows(2) {
                let interval = pair[1].time - pair[0].time;
                assert!((interval - expected).abs() < 1e-9, "bpm {} sub {}", bpm, sub);
            }
        }
    }

    #[test]
    fn test_positions_cycle_row_major() {
        let mut s = scheduler(ConfigUpdate::new().with_time_signature(3, 4).with_subdivision(2));
        s.start(0.0);

        let events = run(&mut s, 0.0, 6.0);
        let positions: Vec<(u32, u32)> = events
            .iter()
            .take(8)
            .map(|e| (e.position.beat, e.position.subdivision))
            .collect();
        assert_eq!(
            positions,
            vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1), (0, 0), (0, 1)]
        );

        // Wraps every beats * subdivision events
        for (i, e) in events.iter().enumerate() {
            assert_eq!(e.position.is_downbeat(), i % 6 == 0);
        }
    }

    #[test]
    fn test_quarter_notes_at_120() {
        // Plain clicks between downbeats need index 0 unaccented
        let mut s = scheduler(ConfigUpdate::new().with_accent_pattern(vec![false]));
        s.start(0.0);

        let events = run(&mut s, 0.0, 1.6);
        let times: Vec<f64> = events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![0.0, 0.5, 1.0, 1.5]);

        assert!(events[0].downbeat);
        assert_eq!(events[0].role, ClickRole::Accent);
        assert_eq!(events[0].gain, 1.0);
        for e in &events[1..] {
            assert!(e.position.is_beat_start());
            assert_eq!(e.role, ClickRole::Click);
            assert_eq!(e.gain, 0.7);
        }
    }

    #[test]
    fn test_default_map_accents_every_beat() {
        let mut s = LookaheadScheduler::default();
        s.start(0.0);
        let events = run(&mut s, 0.0, 1.6);
        assert!(events.iter().all(|e| e.role == ClickRole::Accent));
        assert!(events[1..].iter().all(|e| !e.downbeat && e.accented));
    }

    #[test]
    fn test_eighths_at_60() {
        let mut s = scheduler(
            ConfigUpdate::new()
                .with_bpm(60.0)
                .with_subdivision(2)
                .with_accent_pattern(vec![true, false]),
        );
        s.start(0.0);

        let events = run(&mut s, 0.0, 1.8);
        assert_eq!(events.len(), 4);
        for e in &events {
            if e.position.subdivision == 0 {
                assert_eq!(e.role, ClickRole::Accent);
                assert_eq!(e.gain, 1.0);
            } else {
                assert_eq!(e.role, ClickRole::Subdivision);
                assert!((e.gain - 0.42).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn test_downbeat_forced_to_accent() {
        let mut s = scheduler(
            ConfigUpdate::new()
                .with_bpm(60.0)
                .with_subdivision(2)
                .with_accent_pattern(vec![false, false])
                .with_accent_volume(0.8),
        );
        s.start(0.0);

        let events = run(&mut s, 0.0, 1.1);
        assert_eq!(events[0].role, ClickRole::Accent);
        assert_eq!(events[0].gain, 0.8);
        assert_eq!(events[2].role, ClickRole::Click);
    }

    #[test]
    fn test_stop_then_start_rewinds() {
        let mut s = LookaheadScheduler::default();
        s.start(0.0);
        run(&mut s, 0.0, 1.2);
        assert_ne!(s.position(), Position::ZERO);

        assert!(s.stop());
        assert_eq!(s.position(), Position::ZERO);
        assert!(!s.stop());

        assert!(s.start(5.0));
        let mut first = None;
        s.drain(5.0, |e| {
            first.get_or_insert(*e);
        });
        let first = first.unwrap();
        assert_eq!(first.position, Position::ZERO);
        assert_eq!(first.time, 5.0);
    }

    #[test]
    fn test_start_twice_is_noop() {
        let mut s = LookaheadScheduler::default();
        assert!(s.start(0.0));
        run(&mut s, 0.0, 1.0);
        let position = s.position();
        assert!(!s.start(3.0));
        assert_eq!(s.position(), position);
    }

    #[test]
    fn test_tempo_change_affects_next_interval_only() {
        let mut s = LookaheadScheduler::default();
        s.start(0.0);

        let mut events = run(&mut s, 0.0, 0.45);
        // Event at 0.5 is already committed
        assert_eq!(events.last().unwrap().time, 0.5);
        s.update(&ConfigUpdate::new().with_bpm(60.0));

        events.extend(run(&mut s, 0.45, 3.0));
        let times: Vec<f64> = events.iter().map(|e| e.time).collect();
        assert_eq!(&times[..4], &[0.0, 0.5, 1.0, 2.0]);
    }

    #[test]
    fn test_meter_change_rewinds_position() {
        let mut s = LookaheadScheduler::default();
        s.start(0.0);
        run(&mut s, 0.0, 0.6);
        assert_eq!(s.position(), Position::new(2, 0));

        let changes = s.update(&ConfigUpdate::new().with_time_signature(3, 4));
        assert!(changes.time_signature);
        assert_eq!(s.position(), Position::ZERO);

        // Same signature again leaves the position alone
        run(&mut s, 0.6, 1.1);
        let position = s.position();
        s.update(&ConfigUpdate::new().with_time_signature(3, 4));
        assert_eq!(s.position(), position);
    }

    #[test]
    fn test_volume_update_keeps_position() {
        let mut s = LookaheadScheduler::default();
        s.start(0.0);
        run(&mut s, 0.0, 0.6);
        let position = s.position();
        s.update(&ConfigUpdate::new().with_click_volume(0.2).with_bpm(90.0));
        assert_eq!(s.position(), position);
        assert_eq!(s.config().click_volume, 0.2);
    }

    #[test]
    fn test_subdivision_change_resets_accents_and_snaps() {
        let mut s = scheduler(ConfigUpdate::new().with_subdivision(4));
        s.start(0.0);
        // 0.125s per pulse, committed through 0.25
        s.drain(0.2, |_| {});
        assert_eq!(s.position(), Position::new(0, 3));

        s.update(&ConfigUpdate::new().with_subdivision(2));
        assert_eq!(s.config().accents.as_slice(), &[true, false]);
        assert_eq!(s.position(), Position::new(1, 0));
    }

    #[test]
    fn test_toggle_accent() {
        let mut s = scheduler(ConfigUpdate::new().with_subdivision(3));
        assert!(s.toggle_accent(2));
        assert_eq!(s.config().accents.as_slice(), &[true, false, true]);
        assert!(!s.toggle_accent(3));
        assert_eq!(s.config().accents.as_slice(), &[true, false, true]);
    }
}
