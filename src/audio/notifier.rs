//! Beat notifications
//!
//! Clicks are rendered up to a lookahead window ahead of time, but observers
//! should hear about a beat when it sounds. The notifier thread holds each
//! notification until its due time and then delivers it to the observer
//! callback and every subscriber, in the order the events were scheduled.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::io;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tapcat_core::types::ClickEvent;

/// What an observer learns about a sounding click
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeatEvent {
    pub beat: u32,
    pub subdivision: u32,
    /// True for accented positions and for every downbeat
    pub accented: bool,
    pub downbeat: bool,
}

impl From<&ClickEvent> for BeatEvent {
    fn from(event: &ClickEvent) -> Self {
        Self {
            beat: event.position.beat,
            subdivision: event.position.subdivision,
            accented: event.is_emphasized(),
            downbeat: event.downbeat,
        }
    }
}

pub type BeatCallback = Box<dyn FnMut(BeatEvent) + Send>;

/// Milliseconds until an event at `event_time` sounds, never negative
pub fn notification_delay(event_time: f64, now: f64) -> f64 {
    ((event_time - now) * 1000.0).max(0.0)
}

enum NotifierCommand {
    Schedule { due: Instant, event: BeatEvent },
    SetObserver(Option<BeatCallback>),
    Subscribe(Sender<BeatEvent>),
    Clear,
    Shutdown,
}

/// Cloneable handle the scheduler uses to queue notifications
#[derive(Clone)]
pub struct NotifierHandle {
    command_tx: Sender<NotifierCommand>,
}

impl NotifierHandle {
    /// Queue `event` for delivery when it sounds. `now` is the audio time
    /// reaching the listener at scheduling time, output latency included.
    pub fn notify(&self, event: &ClickEvent, now: f64) {
        let delay = notification_delay(event.time, now);
        let due = Instant::now() + Duration::from_secs_f64(delay / 1000.0);
        let _ = self.command_tx.send(NotifierCommand::Schedule {
            due,
            event: BeatEvent::from(event),
        });
    }
}

/// Owns the notifier thread
pub struct BeatNotifier {
    command_tx: Sender<NotifierCommand>,
    thread: Option<JoinHandle<()>>,
}

impl BeatNotifier {
    pub fn new() -> io::Result<Self> {
        let (command_tx, command_rx) = unbounded();
        let thread = thread::Builder::new()
            .name("tapcat-notifier".into())
            .spawn(move || NotifierThread::new(command_rx).run())?;

        Ok(Self {
            command_tx,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> NotifierHandle {
        NotifierHandle {
            command_tx: self.command_tx.clone(),
        }
    }

    /// Replace the observer callback
    pub fn set_observer(&self, callback: Option<BeatCallback>) {
        let _ = self.command_tx.send(NotifierCommand::SetObserver(callback));
    }

    /// Receive every notification on a channel
    pub fn subscribe(&self) -> Receiver<BeatEvent> {
        let (tx, rx) = unbounded();
        let _ = self.command_tx.send(NotifierCommand::Subscribe(tx));
        rx
    }

    /// Drop notifications that have not been delivered yet
    pub fn clear(&self) {
        let _ = self.command_tx.send(NotifierCommand::Clear);
    }

    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(NotifierCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for BeatNotifier {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Pending {
    due: Instant,
    seq: u64,
    event: BeatEvent,
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap: earliest due first, then scheduling order
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct NotifierThread {
    command_rx: Receiver<NotifierCommand>,
    queue: BinaryHeap<Pending>,
    observer: Option<BeatCallback>,
    subscribers: Vec<Sender<BeatEvent>>,
    next_seq: u64,
    last_due: Option<Instant>,
}

impl NotifierThread {
    fn new(command_rx: Receiver<NotifierCommand>) -> Self {
        Self {
            command_rx,
            queue: BinaryHeap::new(),
            observer: None,
            subscribers: Vec::new(),
            next_seq: 0,
            last_due: None,
        }
    }

    fn run(&mut self) {
        loop {
            let command = match self.queue.peek().map(|p| p.due) {
                Some(due) => {
                    let now = Instant::now();
                    if due <= now {
                        if let Some(pending) = self.queue.pop() {
                            self.deliver(pending.event);
                        }
                        continue;
                    }
                    match self.command_rx.recv_timeout(due - now) {
                        Ok(command) => command,
                        Err(RecvTimeoutError::Timeout) => continue,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.command_rx.recv() {
                    Ok(command) => command,
                    Err(_) => break,
                },
            };

            if self.handle_command(command) {
                break;
            }
        }
    }

    fn handle_command(&mut self, command: NotifierCommand) -> bool {
        match command {
            NotifierCommand::Schedule { due, event } => {
                // A notification never overtakes one scheduled before it
                let due = match self.last_due {
                    Some(last) if last > due => last,
                    _ => due,
                };
                self.last_due = Some(due);
                self.queue.push(Pending {
                    due,
                    seq: self.next_seq,
                    event,
                });
                self.next_seq += 1;
            }
            NotifierCommand::SetObserver(callback) => {
                self.observer = callback;
            }
            NotifierCommand::Subscribe(tx) => {
                self.subscribers.push(tx);
            }
            NotifierCommand::Clear => {
                self.queue.clear();
                self.last_due = None;
            }
            NotifierCommand::Shutdown => return true,
        }
        false
    }

    fn deliver(&mut self, event: BeatEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(event);
        }
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}
