//! Override inheritance for worker threads.

use std::fmt;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::context::CallbackContext;
use crate::error::Result;
use crate::handler::{HandlerRef, Tier};

/// Top-of-stack overrides of one thread, captured for replay on another.
///
/// Registry defaults are not captured; every thread sees those already.
#[derive(Clone, Default)]
pub struct JobContextSnapshot {
    direct: Vec<(String, HandlerRef)>,
    async_: Vec<(String, HandlerRef)>,
}

impl JobContextSnapshot {
    /// Capture the calling thread's effective overrides in `ctx`.
    pub fn capture(ctx: &CallbackContext) -> Result<Self> {
        let (mut direct, mut async_) = ctx
            .inner
            .live
            .with_current(|t| (t.table(Tier::Direct).tops(), t.table(Tier::Async).tops()))?;
        // Stable order keeps apply/release deterministic.
        direct.sort_by(|a, b| a.0.cmp(&b.0));
        async_.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(Self { direct, async_ })
    }

    /// Push the captured overrides onto the calling thread.
    ///
    /// The returned scope pops exactly these entries again when released or
    /// dropped. The `in_async_job` flag is left as it is.
    pub fn apply(self, ctx: &CallbackContext) -> Result<JobScope> {
        self.apply_with_flag(ctx, None)
    }

    /// Like [`apply`](Self::apply), also marking the thread as running an
    /// async job until the scope ends.
    pub fn apply_async_job(self, ctx: &CallbackContext) -> Result<JobScope> {
        self.apply_with_flag(ctx, Some(true))
    }

    fn apply_with_flag(self, ctx: &CallbackContext, flag: Option<bool>) -> Result<JobScope> {
        let entries: Vec<(Tier, String, HandlerRef)> = self
            .direct
            .into_iter()
            .map(|(name, handler)| (Tier::Direct, name, handler))
            .chain(
                self.async_
                    .into_iter()
                    .map(|(name, handler)| (Tier::Async, name, handler)),
            )
            .collect();

        let previous_flag = ctx.inner.live.with_current(|t| {
            for (tier, name, handler) in &entries {
                t.table_mut(*tier).push(name, handler.clone());
            }
            let previous = t.in_async_job;
            if let Some(flag) = flag {
                t.in_async_job = flag;
            }
            previous
        })?;

        debug!(overrides = entries.len(), in_async_job = ?flag, "applied job context snapshot");

        Ok(JobScope {
            context: ctx.clone(),
            entries,
            previous_flag: flag.map(|_| previous_flag),
            released: false,
            _thread_bound: PhantomData,
        })
    }

    pub fn len(&self) -> usize {
        self.direct.len() + self.async_.len()
    }

    pub fn is_empty(&self) -> bool {
        self.direct.is_empty() && self.async_.is_empty()
    }

    /// Captured names for `tier`, sorted.
    pub fn names(&self, tier: Tier) -> Vec<&str> {
        let entries = match tier {
            Tier::Direct => &self.direct,
            Tier::Async => &self.async_,
        };
        entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for JobContextSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobContextSnapshot")
            .field("direct", &self.names(Tier::Direct))
            .field("async", &self.names(Tier::Async))
            .finish()
    }
}

impl CallbackContext {
    /// Shorthand for [`JobContextSnapshot::capture`].
    pub fn capture(&self) -> Result<JobContextSnapshot> {
        JobContextSnapshot::capture(self)
    }
}

/// Applied snapshot on a worker thread.
///
/// Releasing (explicitly or by drop, including during unwinding) pops the
/// entries the snapshot pushed, in reverse order, and restores the thread's
/// previous `in_async_job` value if the scope changed it.
#[must_use = "dropping the scope releases the inherited overrides immediately"]
pub struct JobScope {
    context: CallbackContext,
    entries: Vec<(Tier, String, HandlerRef)>,
    previous_flag: Option<bool>,
    released: bool,
    _thread_bound: PhantomData<*const ()>,
}

impl JobScope {
    /// Number of inherited overrides this scope holds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let entries = std::mem::take(&mut self.entries);
        let previous_flag = self.previous_flag;
        let outcome = self.context.inner.live.with_current(|t| {
            let mut removed = Vec::with_capacity(entries.len());
            let mut buried = 0;
            for (tier, name, handler) in entries.iter().rev() {
                if let Some((entry, was_top)) = t.table_mut(*tier).remove_entry(name, handler) {
                    if !was_top {
                        buried += 1;
                    }
                    removed.push(entry);
                }
            }
            if let Some(previous) = previous_flag {
                t.in_async_job = previous;
            }
            (removed, buried)
        });

        match outcome {
            Ok((removed, buried)) => {
                if buried > 0 {
                    warn!(buried, "job left overrides above inherited ones");
                }
                debug!(released = removed.len(), "released job context snapshot");
                drop(removed);
            }
            // The thread is exiting; its tables are released with it.
            Err(e) => debug!(error = %e, "job context released during thread teardown"),
        }
    }
}

impl Drop for JobScope {
    fn drop(&mut self) {
        self.release_inner();
    }
}

impl fmt::Debug for JobScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobScope")
            .field("entries", &self.entries.len())
            .field("previous_flag", &self.previous_flag)
            .field("released", &self.released)
            .finish()
    }
}
