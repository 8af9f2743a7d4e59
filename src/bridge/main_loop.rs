//! Event-loop forwarder for async handlers.
//!
//! [`MainLoopDispatcher`] queues forwarded callbacks; the thread that owns the
//! [`MainLoop`] runs them. This is the usual arrangement when async handlers
//! have to touch state that belongs to one thread, such as a UI toolkit.

use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, trace};

use super::{AsyncDispatcher, ForwardedCallback};

/// Receiving side, owned by the thread that runs async handlers.
#[derive(Debug)]
pub struct MainLoop {
    rx: Receiver<ForwardedCallback>,
}

/// Sending side, installed on a [`CallbackContext`](crate::CallbackContext).
#[derive(Debug, Clone)]
pub struct MainLoopDispatcher {
    tx: Sender<ForwardedCallback>,
}

impl MainLoop {
    /// Create a loop and the dispatcher feeding it.
    pub fn new() -> (Self, MainLoopDispatcher) {
        let (tx, rx) = channel::unbounded();
        (Self { rx }, MainLoopDispatcher { tx })
    }

    /// Number of callbacks waiting to run.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run every callback already queued without waiting for more.
    pub fn iterate(&self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.rx.try_recv() {
            Self::run_one(callback);
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for one callback and run it.
    pub fn run_once(&self, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(callback) => {
                Self::run_one(callback);
                true
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => false,
        }
    }

    /// Keep running callbacks until the queue has been empty for `idle`.
    pub fn run_until_idle(&self, idle: Duration) -> usize {
        let mut ran = 0;
        while self.run_once(idle) {
            ran += 1;
        }
        ran
    }

    /// Run callbacks for `duration`, regardless of how busy the queue is.
    pub fn run_for(&self, duration: Duration) -> usize {
        let deadline = Instant::now() + duration;
        let mut ran = 0;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() || !self.run_once(remaining) {
                break;
            }
            ran += 1;
        }
        ran
    }

    /// Run callbacks until every dispatcher has been dropped.
    pub fn run(&self) -> usize {
        let mut ran = 0;
        while let Ok(callback) = self.rx.recv() {
            Self::run_one(callback);
            ran += 1;
        }
        debug!(ran, "main loop finished, all dispatchers dropped");
        ran
    }

    fn run_one(callback: ForwardedCallback) {
        trace!(callback = callback.callback_name(), "main loop running async callback");
        callback.run();
    }
}

impl AsyncDispatcher for MainLoopDispatcher {
    fn dispatch(&self, callback: ForwardedCallback) {
        // A closed loop drops the callback, which drops its responder and
        // wakes the caller with an abandoned response.
        if let Err(err) = self.tx.send(callback) {
            debug!(
                callback = err.0.callback_name(),
                "main loop is gone, dropping forwarded callback"
            );
        }
    }
}
