#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};
    use std::sync::Arc;
    use std::time::Duration;
    use tapcat::audio::samples::AssetSource;
    use tapcat::{
        ActivationPolicy, AudioBackend, BackendError, BackendState, BeatEvent, ConfigUpdate,
        EngineSettings, MetronomeEngine, Position, VoiceKind,
    };
    use tapcat_core::types::ClickRole;

    const RATE: u32 = 48_000;

    fn offline() -> MetronomeEngine {
        MetronomeEngine::offline(EngineSettings::default().with_sample_rate(RATE)).unwrap()
    }

    fn frames(seconds: f64) -> usize {
        (seconds * RATE as f64).round() as usize
    }

    /// Mono 32-bit float WAV holding a constant level
    fn constant_wav(level: f32, seconds: f64) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: RATE,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..frames(seconds) {
                writer.write_sample(level).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// Serves a constant-level recording for every role except the accent
    struct NoAccentSource;

    impl AssetSource for NoAccentSource {
        fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
            if name.contains("accent") {
                Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()))
            } else {
                Ok(constant_wav(0.5, 0.05))
            }
        }
    }

    #[test]
    fn test_silent_until_started() {
        let engine = offline();
        let mut buffer = vec![1.0; frames(0.1)];
        assert_eq!(engine.render(&mut buffer), 0);
        assert!(buffer.iter().all(|s| *s == 0.0));
        assert_eq!(engine.now(), 0.0);
    }

    #[test]
    fn test_downbeat_sounds_immediately() {
        let engine = offline();
        engine.start().unwrap();

        let mut buffer = vec![0.0; frames(0.1)];
        assert_eq!(engine.render(&mut buffer), buffer.len());

        let peak = buffer.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.5, "downbeat peak {}", peak);
        // 80ms accent tone, then silence
        assert!(buffer[frames(0.085)..].iter().all(|s| *s == 0.0));
    }

    #[test]
    fn test_clicks_land_on_the_beat() {
        let engine = offline();
        engine.update_config(&ConfigUpdate::new().with_bpm(120.0));
        engine.start().unwrap();

        let mut first = vec![0.0; frames(0.45)];
        engine.render(&mut first);
        engine.tick();

        let mut second = vec![0.0; frames(0.15)];
        engine.render(&mut second);

        let onset = frames(0.05);
        assert!(second[..onset].iter().all(|s| *s == 0.0));
        assert!(second[onset + 1..onset + frames(0.01)].iter().any(|s| *s != 0.0));
        assert_eq!(engine.position(), Position::new(2, 0));
    }

    #[test]
    fn test_stop_then_start_resumes_at_downbeat() {
        let engine = offline();
        engine.start().unwrap();

        let mut buffer = vec![0.0; frames(0.95)];
        engine.render(&mut buffer);
        engine.tick();
        assert_eq!(engine.position(), Position::new(3, 0));

        engine.stop();
        assert!(!engine.is_running());
        assert_eq!(engine.position(), Position::ZERO);

        let events = engine.subscribe();
        engine.start().unwrap();
        let first = events.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!((first.beat, first.subdivision), (0, 0));
        assert!(first.downbeat);
    }

    #[test]
    fn test_redundant_calls_are_noops() {
        let engine = offline();
        engine.stop();
        assert!(!engine.is_running());

        engine.start().unwrap();
        let position = engine.position();
        engine.start().unwrap();
        assert_eq!(engine.position(), position);

        engine.stop();
        engine.stop();
        assert_eq!(engine.position(), Position::ZERO);
    }

    #[test]
    fn test_stopped_clicks_play_out() {
        let engine = offline();
        engine.start().unwrap();
        engine.stop();

        let mut buffer = vec![0.0; frames(0.1)];
        engine.render(&mut buffer);
        assert!(buffer.iter().any(|s| *s != 0.0));
    }

    #[test]
    fn test_observer_sees_accented_downbeat() {
        let engine = offline();
        let (tx, rx) = crossbeam_channel::unbounded();
        engine.on_beat(move |event| {
            let _ = tx.send(event);
        });

        engine.start().unwrap();
        let event = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(
            event,
            BeatEvent {
                beat: 0,
                subdivision: 0,
                accented: true,
                downbeat: true,
            }
        );
    }

    #[test]
    fn test_stop_drops_pending_notifications() {
        let settings = EngineSettings::default()
            .with_sample_rate(RATE)
            .with_lookahead(Duration::from_millis(500));
        let engine = MetronomeEngine::offline(settings).unwrap();
        let events = engine.subscribe();

        engine.start().unwrap();
        assert!(events.recv_timeout(Duration::from_secs(2)).unwrap().downbeat);

        // Commit the click at 0.5s while the clock reads 0.05s
        let mut buffer = vec![0.0; frames(0.05)];
        engine.render(&mut buffer);
        engine.tick();
        assert_eq!(engine.position(), Position::new(2, 0));
        engine.stop();

        assert!(events.recv_timeout(Duration::from_millis(700)).is_err());
    }

    #[test]
    fn test_activation_gesture_required() {
        let settings = EngineSettings::default().with_activation(ActivationPolicy::RequireGesture);
        let engine = MetronomeEngine::offline(settings).unwrap();

        assert!(matches!(engine.start(), Err(BackendError::ActivationRequired)));
        assert!(!engine.is_running());
        assert_eq!(engine.backend_state(), BackendState::Uninitialized);

        engine.activate();
        engine.start().unwrap();
        assert!(engine.is_running());
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let engine = offline();
        engine.start().unwrap();

        engine.dispose();
        engine.dispose();
        assert!(engine.is_disposed());
        assert!(!engine.is_running());
        assert_eq!(engine.backend_state(), BackendState::Closed);
        assert!(matches!(engine.start(), Err(BackendError::Closed)));
    }

    #[test]
    fn test_missing_accent_sample_only_affects_accents() {
        let backend = AudioBackend::offline(RATE, ActivationPolicy::Automatic);
        let source = Arc::new(NoAccentSource);
        let engine =
            MetronomeEngine::with_backend(EngineSettings::default(), backend, source).unwrap();

        engine.update_config(
            &ConfigUpdate::new()
                .with_accent_pattern(vec![false])
                .with_voice_kind(VoiceKind::Sampled),
        );
        engine.samples().wait_idle();

        let bank = engine.samples().bank();
        assert!(!bank.is_resident(ClickRole::Accent, RATE));
        assert!(bank.is_resident(ClickRole::Click, RATE));
        assert!(bank.is_resident(ClickRole::Subdivision, RATE));

        engine.start().unwrap();
        let mut first = vec![0.0; frames(0.45)];
        engine.render(&mut first);
        engine.tick();
        let mut second = vec![0.0; frames(0.15)];
        engine.render(&mut second);

        // Downbeat falls back to the synthesized accent: a sine crosses zero
        assert!(first[..frames(0.08)].iter().any(|s| *s < -0.1));

        // Beat two is a plain click played from the recording at click volume
        let onset = frames(0.05);
        for s in &second[onset + 10..onset + frames(0.04)] {
            assert!((s - 0.35).abs() < 1e-4, "sample level {}", s);
        }
    }
}
