//! Shared helpers for the integration tests.

#![allow(dead_code)] // Each test binary uses a different subset

pub mod strategies;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use callback_core::{AsyncDispatcher, CallbackHandler, ForwardedCallback, HandlerRef};

/// Counts how many handler destructors have run.
#[derive(Debug, Clone, Default)]
pub struct DropCounter(Arc<AtomicUsize>);

impl DropCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    /// Handler that replaces the output with `[tag]` and bumps the counter
    /// when released.
    pub fn handler(&self, tag: u8) -> HandlerRef {
        let drops = self.0.clone();
        CallbackHandler::new(move |_, out| {
            out.clear();
            out.push(tag);
        })
        .with_destructor(move || {
            drops.fetch_add(1, Ordering::SeqCst);
        })
        .into_ref()
    }
}

/// Handler that replaces the output with `[tag]`.
pub fn tagged(tag: u8) -> HandlerRef {
    CallbackHandler::new(move |_, out| {
        out.clear();
        out.push(tag);
    })
    .into_ref()
}

/// Async handler that replies with its input prefixed by `tag`.
pub fn async_tagged(tag: u8) -> HandlerRef {
    CallbackHandler::new_async(move |request| {
        let mut reply = vec![tag];
        reply.extend_from_slice(request.input());
        request.respond_with(reply);
    })
    .into_ref()
}

/// Forwarder that runs every async callback on a fresh thread after `delay`.
#[derive(Debug, Clone, Copy)]
pub struct ThreadForwarder {
    pub delay: Duration,
}

impl ThreadForwarder {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self { delay })
    }
}

impl AsyncDispatcher for ThreadForwarder {
    fn dispatch(&self, callback: ForwardedCallback) {
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            callback.run();
        });
    }
}

/// First byte of an output buffer, for terse assertions.
pub fn tag_of(out: &[u8]) -> Option<u8> {
    out.first().copied()
}
