//! Repeating timer
//!
//! A thread that calls a tick function, waits `interval`, and repeats until
//! cancelled. The wait starts only after the tick returns, so ticks never
//! overlap and a slow tick delays the next one instead of piling up.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::io;
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub struct RepeatingTimer {
    cancel_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl RepeatingTimer {
    /// Spawn the timer. The first tick fires after one `interval`.
    pub fn start<F>(interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let (cancel_tx, cancel_rx) = bounded::<()>(1);

        let thread = thread::Builder::new()
            .name("tapcat-scheduler".into())
            .spawn(move || loop {
                match cancel_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    // Cancel signal or handle dropped
                    _ => break,
                }
            })?;

        Ok(Self {
            cancel_tx: Some(cancel_tx),
            thread: Some(thread),
        })
    }

    pub fn is_active(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop ticking and wait for an in-flight tick to finish. Idempotent.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.try_send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.thread().id() != thread::current().id() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for RepeatingTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
