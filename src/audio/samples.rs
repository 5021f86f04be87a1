//! Sampled click voices
//!
//! Three woodblock recordings, one per click role, fetched from an
//! [`AssetSource`], decoded with symphonia, downmixed to mono and resampled to
//! the output rate. Loading happens on a background thread; the renderer only
//! ever looks at what is resident in the [`SampleBank`] and never waits.

use super::clock::FrameClock;
use arc_swap::ArcSwapOption;
use rubato::{FftFixedIn, Resampler as _};
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use symphonia::core::{
    audio::SampleBuffer,
    codecs::DecoderOptions,
    errors::Error as SymphoniaError,
    formats::FormatOptions,
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
};
use tapcat_core::types::{ClickRole, VoiceKind};
use thiserror::Error;

/// File name of the recording for `role`
pub fn asset_name(role: ClickRole) -> &'static str {
    match role {
        ClickRole::Accent => "woodblock-accent.mp3",
        ClickRole::Click => "woodblock-click.mp3",
        ClickRole::Subdivision => "woodblock-sub.mp3",
    }
}

#[derive(Debug, Error)]
pub enum SampleError {
    #[error("failed to fetch {name}: {source}")]
    Fetch {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode audio: {0}")]
    Decode(#[from] SymphoniaError),
    #[error("no decodable audio track")]
    NoTrack,
    #[error("unknown sample rate")]
    UnknownRate,
    #[error("failed to resample: {0}")]
    Resample(String),
}

/// Where sample bytes come from
pub trait AssetSource: Send + Sync {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>>;
}

/// Reads assets from files in a directory
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirectorySource {
    fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
        std::fs::read(self.root.join(name))
    }
}

/// Mono audio at a known rate
#[derive(Debug)]
pub struct DecodedSample {
    pub frames: Arc<[f32]>,
    pub sample_rate: u32,
}

impl DecodedSample {
    pub fn new(frames: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            frames: frames.into(),
            sample_rate,
        }
    }

    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate.max(1) as f64
    }
}

/// Decoded samples shared with the audio thread, one slot per role
#[derive(Debug, Default)]
pub struct SampleBank {
    slots: [ArcSwapOption<DecodedSample>; 3],
}

impl SampleBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample for `role`, if one is resident at `sample_rate`
    pub fn get(&self, role: ClickRole, sample_rate: u32) -> Option<Arc<DecodedSample>> {
        self.slots[role.index()]
            .load_full()
            .filter(|sample| sample.sample_rate == sample_rate)
    }

    pub fn is_resident(&self, role: ClickRole, sample_rate: u32) -> bool {
        self.get(role, sample_rate).is_some()
    }

    pub fn store(&self, role: ClickRole, sample: DecodedSample) {
        self.slots[role.index()].store(Some(Arc::new(sample)));
    }

    pub fn clear(&self) {
        for slot in &self.slots {
            slot.store(None);
        }
    }
}

#[derive(Default)]
struct LoadState {
    /// Output rate of the last load attempt
    attempted_rate: Option<u32>,
    workers: Vec<JoinHandle<()>>,
}

/// Background loader filling a [`SampleBank`]
pub struct SampleLoader {
    source: Arc<dyn AssetSource>,
    bank: Arc<SampleBank>,
    clock: Arc<FrameClock>,
    state: Mutex<LoadState>,
}

impl SampleLoader {
    pub fn new(source: Arc<dyn AssetSource>, clock: Arc<FrameClock>) -> Self {
        Self {
            source,
            bank: Arc::new(SampleBank::new()),
            clock,
            state: Mutex::new(LoadState::default()),
        }
    }

    pub fn bank(&self) -> Arc<SampleBank> {
        self.bank.clone()
    }

    /// Start loading the samples if `kind` needs them and no attempt has been
    /// made at the current output rate. Returns immediately.
    pub fn ensure_loaded(&self, kind: VoiceKind) {
        if kind != VoiceKind::Sampled {
            return;
        }

        let rate = self.clock.sample_rate();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.attempted_rate == Some(rate) {
            return;
        }
        self.spawn(&mut state, rate);
    }

    /// Retry every role that is not resident
    pub fn reload(&self) {
        let rate = self.clock.sample_rate();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        self.spawn(&mut state, rate);
    }

    /// Block until every started load has finished
    pub fn wait_idle(&self) {
        let workers = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut state.workers)
        };
        for worker in workers {
            let _ = worker.join();
        }
    }

    fn spawn(&self, state: &mut LoadState, rate: u32) {
        state.attempted_rate = Some(rate);
        state.workers.retain(|w| !w.is_finished());

        let source = self.source.clone();
        let bank = self.bank.clone();
        let spawned = thread::Builder::new()
            .name("tapcat-samples".into())
            .spawn(move || load_all(source.as_ref(), &bank, rate));

        match spawned {
            Ok(handle) => state.workers.push(handle),
            Err(e) => log::warn!("Failed to start sample loader: {}", e),
        }
    }
}

fn load_all(source: &dyn AssetSource, bank: &SampleBank, rate: u32) {
    for role in ClickRole::ALL {
        if bank.is_resident(role, rate) {
            continue;
        }
        let name = asset_name(role);
        match load_one(source, name, rate) {
            Ok(sample) => {
                log::info!("Loaded {} ({:.0} ms)", name, sample.duration() * 1000.0);
                bank.store(role, sample);
            }
            Err(e) => log::warn!("Sample {} unavailable, using synthesized voice: {}", name, e),
        }
    }
}

fn load_one(
    source: &dyn AssetSource,
    name: &str,
    rate: u32,
) -> Result<DecodedSample, SampleError> {
    let bytes = source.fetch(name).map_err(|source| SampleError::Fetch {
        name: name.to_string(),
        source,
    })?;
    let extension = Path::new(name).extension().and_then(|e| e.to_str());
    decode(bytes, extension, rate)
}

/// Decode an encoded file to mono at `target_rate`
pub fn decode(
    bytes: Vec<u8>,
    extension: Option<&str>,
    target_rate: u32,
) -> Result<DecodedSample, SampleError> {
    let mut hint = Hint::new();
    if let Some(extension) = extension {
        hint.with_extension(extension);
    }

    let stream = MediaSourceStream::new(
        Box::new(Cursor::new(bytes)),
        MediaSourceStreamOptions::default(),
    );
    let mut format = symphonia::default::get_probe()
        .format(
            &hint,
            stream,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?
        .format;

    let track = format.default_track().ok_or(SampleError::NoTrack)?;
    let track_id = track.id;
    let file_rate = track.codec_params.sample_rate.ok_or(SampleError::UnknownRate)?;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut mono = Vec::new();
    let mut sample_buffer: Option<SampleBuffer<f32>> = None;

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }

        let audio_buf = match decoder.decode(&packet) {
            Ok(buf) => buf,
            Err(SymphoniaError::DecodeError(e)) => {
                log::debug!("Skipping corrupt packet: {}", e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *audio_buf.spec();
        let channels = spec.channels.count().max(1);
        let buf = sample_buffer
            .get_or_insert_with(|| SampleBuffer::new(audio_buf.capacity() as u64, spec));
        buf.copy_interleaved_ref(audio_buf);

        mono.extend(
            buf.samples()
                .chunks(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32),
        );
    }

    let frames = resample(mono, file_rate, target_rate)?;
    Ok(DecodedSample::new(frames, target_rate))
}

/// Resample a mono signal between two rates
pub fn resample(input: Vec<f32>, from: u32, to: u32) -> Result<Vec<f32>, SampleError> {
    if from == to || input.is_empty() {
        return Ok(input);
    }

    let mut fft = FftFixedIn::<f32>::new(from as usize, to as usize, 1024, 2, 1)
        .map_err(|e| SampleError::Resample(e.to_string()))?;

    let expected = (input.len() as f64 * to as f64 / from as f64).ceil() as usize;
    let delay = fft.output_delay();
    let mut output = Vec::with_capacity(expected + delay);
    let mut remaining = input.as_slice();

    // Feed zero-padded chunks until the delayed tail has come out
    while output.len() < expected + delay {
        let needed = fft.input_frames_next();
        let take = needed.min(remaining.len());
        let mut chunk = remaining[..take].to_vec();
        chunk.resize(needed, 0.0);
        remaining = &remaining[take..];

        let out = fft
            .process(&[chunk], None)
            .map_err(|e| SampleError::Resample(e.to_string()))?;
        output.extend_from_slice(&out[0]);
    }

    Ok(output.into_iter().skip(delay).take(expected).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Interleaved 32-bit float WAV, one closure call per frame
    fn wav(channels: u16, rate: u32, frames: usize, frame: impl Fn(usize) -> Vec<f32>) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                for sample in frame(i) {
                    writer.write_sample(sample).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// Serves a short mono recording, failing the first `failures` fetches
    struct FlakySource {
        failures: usize,
        fetches: AtomicUsize,
    }

    impl FlakySource {
        fn new(failures: usize) -> Self {
            Self {
                failures,
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl AssetSource for FlakySource {
        fn fetch(&self, name: &str) -> io::Result<Vec<u8>> {
            if self.fetches.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(io::Error::new(io::ErrorKind::NotFound, name.to_string()));
            }
            Ok(wav(1, 48_000, 2400, |_| vec![0.25]))
        }
    }

    #[test]
    fn test_asset_names() {
        let names: Vec<_> = ClickRole::ALL.iter().map(|r| asset_name(*r)).collect();
        assert_eq!(
            names,
            vec!["woodblock-accent.mp3", "woodblock-click.mp3", "woodblock-sub.mp3"]
        );
    }

    #[test]
    fn test_bank_filters_by_rate() {
        let bank = SampleBank::new();
        assert!(!bank.is_resident(ClickRole::Accent, 48_000));

        bank.store(ClickRole::Accent, DecodedSample::new(vec![0.0; 10], 48_000));
        assert!(bank.is_resident(ClickRole::Accent, 48_000));
        assert!(!bank.is_resident(ClickRole::Accent, 44_100));
        assert!(!bank.is_resident(ClickRole::Click, 48_000));

        bank.clear();
        assert!(!bank.is_resident(ClickRole::Accent, 48_000));
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(input.clone(), 48_000, 48_000).unwrap(), input);
    }

    #[test]
    fn test_resample_changes_length() {
        let input: Vec<f32> = (0..4410).map(|i| (i as f32 * 0.05).sin() * 0.5).collect();
        let output = resample(input, 44_100, 48_000).unwrap();
        assert_eq!(output.len(), 4800);
        assert!(output.iter().all(|s| s.abs() < 1.0));
    }

    #[test]
    fn test_decode_garbage_fails() {
        let result = decode(vec![0u8; 64], Some("mp3"), 48_000);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_downmixes_and_resamples() {
        let bytes = wav(2, 44_100, 4410, |_| vec![1.0, 0.0]);
        let sample = decode(bytes, Some("wav"), 48_000).unwrap();

        assert_eq!(sample.sample_rate, 48_000);
        let expected = 4410 * 48_000 / 44_100;
        assert!(sample.frames.len().abs_diff(expected) <= 1, "{} frames", sample.frames.len());

        // Away from the edges the resampled level is the channel average
        for s in &sample.frames[400..expected - 400] {
            assert!((s - 0.5).abs() < 0.02, "level {}", s);
        }
    }

    #[test]
    fn test_decode_at_file_rate_keeps_frames() {
        let bytes = wav(2, 48_000, 480, |i| vec![0.2, if i % 2 == 0 { 0.4 } else { 0.0 }]);
        let sample = decode(bytes, Some("wav"), 48_000).unwrap();

        assert_eq!(sample.frames.len(), 480);
        assert!((sample.frames[0] - 0.3).abs() < 1e-6);
        assert!((sample.frames[1] - 0.1).abs() < 1e-6);
        assert!((sample.duration() - 0.01).abs() < 1e-9);
    }

    #[test]
    fn test_reload_retries_failed_roles() {
        let source = Arc::new(FlakySource::new(1));
        let loader = SampleLoader::new(source.clone(), Arc::new(FrameClock::new(48_000)));
        let bank = loader.bank();

        loader.ensure_loaded(VoiceKind::Sampled);
        loader.wait_idle();
        assert!(!bank.is_resident(ClickRole::Accent, 48_000));
        assert!(bank.is_resident(ClickRole::Click, 48_000));
        assert!(bank.is_resident(ClickRole::Subdivision, 48_000));

        // Already attempted at this rate
        loader.ensure_loaded(VoiceKind::Sampled);
        loader.wait_idle();
        assert_eq!(source.fetches(), 3);

        // Only the missing role is fetched again
        loader.reload();
        loader.wait_idle();
        assert!(bank.is_resident(ClickRole::Accent, 48_000));
        assert_eq!(source.fetches(), 4);
    }

    #[test]
    fn test_rate_change_loads_again() {
        let source = Arc::new(FlakySource::new(0));
        let clock = Arc::new(FrameClock::new(48_000));
        let loader = SampleLoader::new(source.clone(), clock.clone());
        let bank = loader.bank();

        loader.ensure_loaded(VoiceKind::Synthesized);
        loader.wait_idle();
        assert_eq!(source.fetches(), 0);

        loader.ensure_loaded(VoiceKind::Sampled);
        loader.wait_idle();
        assert_eq!(source.fetches(), 3);

        clock.set_sample_rate(44_100);
        assert!(!bank.is_resident(ClickRole::Click, 44_100));

        loader.ensure_loaded(VoiceKind::Sampled);
        loader.wait_idle();
        assert_eq!(source.fetches(), 6);
        for role in ClickRole::ALL {
            assert!(bank.is_resident(role, 44_100));
        }
        assert_eq!(bank.get(ClickRole::Click, 44_100).unwrap().frames.len(), 2205);
    }

    #[test]
    fn test_directory_source_missing_file() {
        let source = DirectorySource::new("/nonexistent/tapcat");
        assert!(source.fetch("woodblock-accent.mp3").is_err());
    }
}
