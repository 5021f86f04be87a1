//! Audio backend
//!
//! An explicit handle over the output device with a small lifecycle:
//!
//! ```text
//! Uninitialized --resume--> Running <--suspend/resume--> Suspended
//!        \________________________\_____________________/--close--> Closed
//! ```
//!
//! The first `resume` opens the device. Under [`ActivationPolicy::RequireGesture`]
//! it refuses to do so until [`AudioBackend::activate`] has recorded a user
//! gesture. A device backend drives the mixer from a cpal output stream; an
//! offline backend renders only when asked, which makes its clock fully
//! deterministic.

use super::clock::FrameClock;
use super::mixer::{Mixer, ScheduledVoice};
use anyhow::anyhow;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Uninitialized,
    Suspended,
    Running,
    Closed,
}

impl fmt::Display for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            BackendState::Uninitialized => "uninitialized",
            BackendState::Suspended => "suspended",
            BackendState::Running => "running",
            BackendState::Closed => "closed",
        };
        write!(f, "{}", name)
    }
}

/// Whether the first activation needs a recorded user gesture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivationPolicy {
    #[default]
    Automatic,
    RequireGesture,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("audio output needs a user gesture before it can start")]
    ActivationRequired,
    #[error("audio backend is closed")]
    Closed,
    #[error("no output device available")]
    NoDevice,
    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),
    #[error("audio thread is gone")]
    Disconnected,
    #[error(transparent)]
    Device(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Device,
    Offline,
}

pub struct AudioBackend {
    kind: BackendKind,
    state: BackendState,
    policy: ActivationPolicy,
    gesture: bool,
    clock: Arc<FrameClock>,
    voice_tx: Sender<ScheduledVoice>,
    mixer: Arc<Mutex<Mixer>>,
    device: Option<DeviceHandle>,
}

impl AudioBackend {
    /// Backend for the default output device. `fallback_rate` is used until
    /// the device reports its own rate.
    pub fn device(policy: ActivationPolicy, fallback_rate: u32) -> Self {
        Self::with_kind(BackendKind::Device, policy, fallback_rate)
    }

    /// Backend with no device; audio advances only through [`render`](Self::render)
    pub fn offline(sample_rate: u32, policy: ActivationPolicy) -> Self {
        Self::with_kind(BackendKind::Offline, policy, sample_rate)
    }

    fn with_kind(kind: BackendKind, policy: ActivationPolicy, sample_rate: u32) -> Self {
        let clock = Arc::new(FrameClock::new(sample_rate));
        let (voice_tx, voice_rx) = unbounded();
        let mixer = Mixer::new(clock.clone(), voice_rx);

        Self {
            kind,
            state: BackendState::Uninitialized,
            policy,
            gesture: false,
            clock,
            voice_tx,
            mixer: Arc::new(Mutex::new(mixer)),
            device: None,
        }
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn is_offline(&self) -> bool {
        self.kind == BackendKind::Offline
    }

    pub fn clock(&self) -> Arc<FrameClock> {
        self.clock.clone()
    }

    pub fn sample_rate(&self) -> u32 {
        self.clock.sample_rate()
    }

    /// Where rendered voices are queued for the mixer
    pub fn voice_sender(&self) -> Sender<ScheduledVoice> {
        self.voice_tx.clone()
    }

    /// Record that a user gesture happened
    pub fn activate(&mut self) {
        self.gesture = true;
    }

    /// Bring the backend to `Running`, opening the device the first time
    pub fn resume(&mut self) -> Result<(), BackendError> {
        match self.state {
            BackendState::Running => Ok(()),
            BackendState::Closed => Err(BackendError::Closed),
            BackendState::Uninitialized => {
                if self.policy == ActivationPolicy::RequireGesture && !self.gesture {
                    return Err(BackendError::ActivationRequired);
                }
                if self.kind == BackendKind::Device {
                    let device = DeviceHandle::open(self.mixer.clone(), self.clock.clone())?;
                    device.play()?;
                    self.device = Some(device);
                }
                self.transition(BackendState::Running);
                Ok(())
            }
            BackendState::Suspended => {
                if let Some(device) = &self.device {
                    device.play()?;
                }
                self.transition(BackendState::Running);
                Ok(())
            }
        }
    }

    /// Pause output. The clock stops with it.
    pub fn suspend(&mut self) -> Result<(), BackendError> {
        if self.state != BackendState::Running {
            return Ok(());
        }
        if let Some(device) = &self.device {
            device.pause()?;
        }
        self.transition(BackendState::Suspended);
        Ok(())
    }

    /// Release the device and drop every queued voice. Idempotent.
    pub fn close(&mut self) {
        if self.state == BackendState::Closed {
            return;
        }
        if let Some(mut device) = self.device.take() {
            device.close();
        }
        self.mixer.lock().unwrap_or_else(PoisonError::into_inner).clear();
        self.transition(BackendState::Closed);
    }

    /// Render one mono buffer on an offline backend. Returns the number of
    /// frames rendered; anything but a running offline backend produces
    /// silence and leaves the clock alone.
    pub fn render(&mut self, out: &mut [f32]) -> usize {
        if self.kind != BackendKind::Offline || self.state != BackendState::Running {
            out.fill(0.0);
            return 0;
        }
        self.mixer.lock().unwrap_or_else(PoisonError::into_inner).process(out);
        out.len()
    }

    fn transition(&mut self, to: BackendState) {
        log::info!("Audio backend {} -> {}", self.state, to);
        self.state = to;
    }
}

impl Drop for AudioBackend {
    fn drop(&mut self) {
        self.close();
    }
}

/// Commands for the thread that owns the cpal stream
enum DeviceCommand {
    Play(Sender<anyhow::Result<()>>),
    Pause(Sender<anyhow::Result<()>>),
    Close,
}

/// Control side of the device thread. `cpal::Stream` is not `Send`, so the
/// stream lives and dies on its own thread.
struct DeviceHandle {
    command_tx: Sender<DeviceCommand>,
    thread: Option<JoinHandle<()>>,
}

impl DeviceHandle {
    fn open(mixer: Arc<Mutex<Mixer>>, clock: Arc<FrameClock>) -> Result<Self, BackendError> {
        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded::<Result<u32, BackendError>>(1);

        let thread = thread::Builder::new()
            .name("tapcat-audio".into())
            .spawn(move || {
                let stream = match open_stream(mixer, clock) {
                    Ok((stream, rate)) => {
                        let _ = ready_tx.send(Ok(rate));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_device(stream, command_rx);
            })
            .map_err(|e| anyhow!("Failed to spawn audio thread: {}", e))?;

        let rate = ready_rx.recv().map_err(|_| BackendError::Disconnected)??;
        log::info!("Opened output device at {} Hz", rate);

        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    fn play(&self) -> Result<(), BackendError> {
        self.request(DeviceCommand::Play)
    }

    fn pause(&self) -> Result<(), BackendError> {
        self.request(DeviceCommand::Pause)
    }

    fn request(
        &self,
        command: fn(Sender<anyhow::Result<()>>) -> DeviceCommand,
    ) -> Result<(), BackendError> {
        let (reply_tx, reply_rx) = bounded(1);
        self.command_tx
            .send(command(reply_tx))
            .map_err(|_| BackendError::Disconnected)?;
        reply_rx.recv().map_err(|_| BackendError::Disconnected)??;
        Ok(())
    }

    fn close(&mut self) {
        let _ = self.command_tx.send(DeviceCommand::Close);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn run_device(stream: Stream, command_rx: Receiver<DeviceCommand>) {
    while let Ok(command) = command_rx.recv() {
        match command {
            DeviceCommand::Play(reply) => {
                let played = stream.play();
                let _ = reply.send(played.map_err(|e| anyhow!("Failed to play stream: {}", e)));
            }
            DeviceCommand::Pause(reply) => {
                let paused = stream.pause();
                let _ = reply.send(paused.map_err(|e| anyhow!("Failed to pause stream: {}", e)));
            }
            DeviceCommand::Close => break,
        }
    }
}

fn open_stream(
    mixer: Arc<Mutex<Mixer>>,
    clock: Arc<FrameClock>,
) -> Result<(Stream, u32), BackendError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(BackendError::NoDevice)?;
    let config = device
        .default_output_config()
        .map_err(|e| anyhow!("Failed to get output config: {}", e))?;

    let sample_format = config.sample_format();
    let config: StreamConfig = config.into();
    let sample_rate = config.sample_rate.0;
    clock.set_sample_rate(sample_rate);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, mixer, clock)?,
        SampleFormat::I16 => build_stream::<i16>(&device, &config, mixer, clock)?,
        SampleFormat::U16 => build_stream::<u16>(&device, &config, mixer, clock)?,
        other => return Err(BackendError::UnsupportedFormat(format!("{:?}", other))),
    };

    Ok((stream, sample_rate))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mixer: Arc<Mutex<Mixer>>,
    clock: Arc<FrameClock>,
) -> anyhow::Result<Stream>
where
    T: Sample + SizedSample + Send + 'static + cpal::FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut mono: Vec<f32> = Vec::new();

    let err_fn = |err| log::warn!("Output stream error: {}", err);

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                let timestamp = info.timestamp();
                if let Some(latency) = timestamp.playback.duration_since(&timestamp.callback) {
                    clock.set_output_latency(latency);
                }

                let frames = data.len() / channels;
                mono.resize(frames, 0.0);

                match mixer.lock() {
                    Ok(mut mixer) => mixer.process(&mut mono),
                    Err(_) => mono.fill(0.0),
                }

                for (frame, value) in data.chunks_mut(channels).zip(mono.iter()) {
                    let value: T = T::from_sample(*value);
                    for sample in frame.iter_mut() {
                        *sample = value;
                    }
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| anyhow!("Failed to build output stream: {}", e))?;

    Ok(stream)
}
