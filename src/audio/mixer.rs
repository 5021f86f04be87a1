//! Voice mixer
//!
//! Runs inside the audio callback. Voices arrive over a channel stamped with
//! their start frame and wait in a min-heap until the buffer that contains
//! that frame is rendered. After each buffer the mixer advances the clock,
//! which makes the frame counter the engine's notion of "now".

use super::click::ClickVoice;
use super::clock::FrameClock;
use crossbeam_channel::Receiver;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

/// A voice waiting for its start frame
#[derive(Debug, Clone)]
pub struct ScheduledVoice {
    pub start_frame: u64,
    pub voice: ClickVoice,
}

impl PartialEq for ScheduledVoice {
    fn eq(&self, other: &Self) -> bool {
        self.start_frame == other.start_frame
    }
}

impl Eq for ScheduledVoice {}

impl PartialOrd for ScheduledVoice {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledVoice {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap (earliest first)
        other.start_frame.cmp(&self.start_frame)
    }
}

struct ActiveVoice {
    voice: ClickVoice,
    /// Silent frames before the voice starts in the current buffer
    delay: usize,
}

pub struct Mixer {
    clock: Arc<FrameClock>,
    incoming: Receiver<ScheduledVoice>,
    pending: BinaryHeap<ScheduledVoice>,
    active: Vec<ActiveVoice>,
}

impl Mixer {
    pub fn new(clock: Arc<FrameClock>, incoming: Receiver<ScheduledVoice>) -> Self {
        Self {
            clock,
            incoming,
            pending: BinaryHeap::new(),
            active: Vec::new(),
        }
    }

    /// Render one mono buffer and advance the clock by its length
    pub fn process(&mut self, out: &mut [f32]) {
        self.pending.extend(self.incoming.try_iter());

        let base = self.clock.frames();
        let end = base + out.len() as u64;

        while let Some(next) = self.pending.peek() {
            if next.start_frame >= end {
                break;
            }
            if let Some(scheduled) = self.pending.pop() {
                // Late voices start at the top of this buffer
                let delay = scheduled.start_frame.saturating_sub(base) as usize;
                self.active.push(ActiveVoice {
                    voice: scheduled.voice,
                    delay,
                });
            }
        }

        out.fill(0.0);
        for active in self.active.iter_mut() {
            for sample in out.iter_mut().skip(active.delay) {
                if active.voice.is_finished() {
                    break;
                }
                *sample += active.voice.next_sample();
            }
            active.delay = 0;
        }
        self.active.retain(|a| !a.voice.is_finished());

        for sample in out.iter_mut() {
            *sample = sample.clamp(-1.0, 1.0);
        }

        self.clock.advance(out.len() as u64);
    }

    /// Voices sounding or waiting to sound
    pub fn voice_count(&self) -> usize {
        self.active.len() + self.pending.len() + self.incoming.len()
    }

    /// Drop every queued and sounding voice
    pub fn clear(&mut self) {
        for _ in self.incoming.try_iter() {}
        self.pending.clear();
        self.active.clear();
    }
}
