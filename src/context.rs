//! # Callback Context
//!
//! Owner of every table the dispatch core uses: the default registry for both
//! tiers, the tracker of live per-thread override tables, the async forwarder
//! and the optional out-of-process transport.
//!
//! Contexts are cheap to clone and clones share state. Independent contexts are
//! fully isolated from each other, including their per-thread overrides, which
//! is what lets tests and embedders run several dispatch domains side by side.
//! Most applications use the process-wide one in [`crate::global`].
//!
//! ## Usage
//!
//! ```rust
//! use callback_core::{CallbackContext, CallbackHandler};
//!
//! let ctx = CallbackContext::new();
//! ctx.set_default("status-message", CallbackHandler::new(|_, out| out.extend_from_slice(b"seen")).into_ref());
//!
//! // Override for the current thread only.
//! ctx.push("status-message", CallbackHandler::new(|_, out| out.extend_from_slice(b"quiet")).into_ref());
//!
//! let mut out = Vec::new();
//! assert!(ctx.invoke("status-message", b"", &mut out));
//! assert_eq!(out, b"quiet");
//! ctx.pop("status-message");
//! ```

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::bridge::AsyncDispatcher;
use crate::config::CallbackConfig;
use crate::handler::{HandlerRef, Tier};
use crate::logging::log_callback_operation;
use crate::registry::{DefaultRegistry, RegistryStats};
use crate::stack::LiveTables;
use crate::transport::CallbackTransport;

pub(crate) struct ContextInner {
    pub(crate) registry: DefaultRegistry,
    pub(crate) live: Arc<LiveTables>,
    pub(crate) forwarder: RwLock<Option<Arc<dyn AsyncDispatcher>>>,
    pub(crate) transport: RwLock<Option<Arc<dyn CallbackTransport>>>,
    pub(crate) config: CallbackConfig,
}

impl Drop for ContextInner {
    fn drop(&mut self) {
        // Tables of threads that are still running, or that exited without
        // running their thread-local destructors.
        self.live.sweep();
    }
}

/// Shared handle on one dispatch domain.
#[derive(Clone)]
pub struct CallbackContext {
    pub(crate) inner: Arc<ContextInner>,
}

impl Default for CallbackContext {
    fn default() -> Self {
        Self::new()
    }
}

impl CallbackContext {
    /// Context with default configuration, no forwarder and no transport.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn with_config(config: CallbackConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> CallbackContextBuilder {
        CallbackContextBuilder::default()
    }

    pub fn config(&self) -> &CallbackConfig {
        &self.inner.config
    }

    /// Install or remove the hook that decides where async handlers run.
    pub fn set_async_dispatcher(&self, dispatcher: Option<Arc<dyn AsyncDispatcher>>) {
        *self.inner.forwarder.write() = dispatcher;
    }

    /// Install or remove an out-of-process transport.
    pub fn set_transport(&self, transport: Option<Arc<dyn CallbackTransport>>) {
        *self.inner.transport.write() = transport;
    }

    pub(crate) fn forwarder(&self) -> Option<Arc<dyn AsyncDispatcher>> {
        self.inner.forwarder.read().clone()
    }

    pub(crate) fn transport(&self) -> Option<Arc<dyn CallbackTransport>> {
        self.inner.transport.read().clone()
    }

    // -- Defaults ---------------------------------------------------------

    /// Set the default handler for `name`, shared by all threads.
    pub fn set_default(&self, name: &str, handler: HandlerRef) {
        self.inner.registry.set(Tier::Direct, name, handler);
    }

    /// Set the default async handler for `name`, shared by all threads.
    pub fn set_default_async(&self, name: &str, handler: HandlerRef) {
        self.inner.registry.set(Tier::Async, name, handler);
    }

    pub fn get_default(&self, name: &str) -> Option<HandlerRef> {
        self.inner.registry.get(Tier::Direct, name)
    }

    pub fn get_default_async(&self, name: &str) -> Option<HandlerRef> {
        self.inner.registry.get(Tier::Async, name)
    }

    pub fn clear_default(&self, name: &str) -> bool {
        self.inner.registry.clear(Tier::Direct, name)
    }

    pub fn clear_default_async(&self, name: &str) -> bool {
        self.inner.registry.clear(Tier::Async, name)
    }

    /// Sorted names that have a default in `tier`.
    pub fn default_names(&self, tier: Tier) -> Vec<String> {
        self.inner.registry.names(tier)
    }

    // -- Per-thread overrides ----------------------------------------------

    /// Temporarily override `name` on the calling thread.
    pub fn push(&self, name: &str, handler: HandlerRef) {
        self.push_tier(Tier::Direct, name, handler);
    }

    /// Remove the calling thread's most recent override of `name`.
    ///
    /// Popping with nothing pushed does nothing.
    pub fn pop(&self, name: &str) {
        self.pop_tier(Tier::Direct, name);
    }

    /// Temporarily override the async handler for `name` on the calling thread.
    pub fn push_async(&self, name: &str, handler: HandlerRef) {
        self.push_tier(Tier::Async, name, handler);
    }

    pub fn pop_async(&self, name: &str) {
        self.pop_tier(Tier::Async, name);
    }

    /// Push an override that is removed when the guard drops.
    pub fn push_scoped(&self, name: &str, handler: HandlerRef) -> OverrideGuard {
        self.push_tier(Tier::Direct, name, handler.clone());
        OverrideGuard::new(self.clone(), Tier::Direct, name, handler)
    }

    pub fn push_async_scoped(&self, name: &str, handler: HandlerRef) -> OverrideGuard {
        self.push_tier(Tier::Async, name, handler.clone());
        OverrideGuard::new(self.clone(), Tier::Async, name, handler)
    }

    /// Number of direct overrides of `name` on the calling thread.
    pub fn depth(&self, name: &str) -> usize {
        self.depth_tier(Tier::Direct, name)
    }

    pub fn depth_async(&self, name: &str) -> usize {
        self.depth_tier(Tier::Async, name)
    }

    fn depth_tier(&self, tier: Tier, name: &str) -> usize {
        self.inner
            .live
            .with_current(|t| t.table(tier).depth(name))
            .unwrap_or(0)
    }

    /// Mark the calling thread as running an async job. While set, `invoke`
    /// prefers the async tier.
    pub fn set_in_async_job(&self, in_async_job: bool) {
        if let Err(e) = self.inner.live.with_current(|t| t.in_async_job = in_async_job) {
            warn!(error = %e, "could not update in_async_job flag");
        }
    }

    pub fn in_async_job(&self) -> bool {
        self.inner
            .live
            .with_current(|t| t.in_async_job)
            .unwrap_or(false)
    }

    fn push_tier(&self, tier: Tier, name: &str, handler: HandlerRef) {
        match self
            .inner
            .live
            .with_current(|t| t.table_mut(tier).push(name, handler))
        {
            Ok(()) => log_callback_operation("push", name, tier, "pushed"),
            Err(e) => warn!(callback = name, tier = %tier, error = %e, "override push dropped"),
        }
    }

    fn pop_tier(&self, tier: Tier, name: &str) {
        match self.inner.live.with_current(|t| t.table_mut(tier).pop(name)) {
            Ok(Some(handler)) => {
                log_callback_operation("pop", name, tier, "popped");
                drop(handler);
            }
            Ok(None) => {
                warn!(callback = name, tier = %tier, "pop without a matching push");
                debug_assert!(
                    !self.inner.config.stacks.strict_pop,
                    "unbalanced pop of '{name}' ({tier} tier)"
                );
            }
            Err(e) => warn!(callback = name, tier = %tier, error = %e, "override pop skipped"),
        }
    }

    // -- Maintenance -------------------------------------------------------

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            direct_defaults: self.inner.registry.len(Tier::Direct),
            async_defaults: self.inner.registry.len(Tier::Async),
            live_thread_tables: self.inner.live.len(),
        }
    }

    /// Empty both tiers of the calling thread's tables and clear its
    /// `in_async_job` flag. Returns the number of references released.
    pub(crate) fn clear_thread_stacks(&self) -> usize {
        match self.inner.live.with_current(|t| {
            t.in_async_job = false;
            t.drain()
        }) {
            Ok(released) => {
                let count = released.len();
                drop(released);
                count
            }
            Err(e) => {
                debug!(error = %e, "thread tables already released");
                0
            }
        }
    }

    /// Release the override tables of every thread, returning how many handler
    /// references were released. Meant for process shutdown.
    pub fn sweep_thread_tables(&self) -> usize {
        self.inner.live.sweep()
    }

    /// Release every default and every per-thread table.
    pub fn shutdown(&self) -> usize {
        let released = self.inner.registry.clear_all() + self.inner.live.sweep();
        debug!(released, "callback context shut down");
        released
    }
}

impl fmt::Debug for CallbackContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackContext")
            .field("context_id", &self.inner.live.context_id())
            .field("stats", &self.stats())
            .field("has_forwarder", &self.inner.forwarder.read().is_some())
            .field("has_transport", &self.inner.transport.read().is_some())
            .finish()
    }
}

/// Builder for [`CallbackContext`].
#[derive(Default)]
pub struct CallbackContextBuilder {
    config: CallbackConfig,
    forwarder: Option<Arc<dyn AsyncDispatcher>>,
    transport: Option<Arc<dyn CallbackTransport>>,
}

impl CallbackContextBuilder {
    #[must_use]
    pub fn config(mut self, config: CallbackConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn async_dispatcher(mut self, dispatcher: Arc<dyn AsyncDispatcher>) -> Self {
        self.forwarder = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn CallbackTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> CallbackContext {
        CallbackContext {
            inner: Arc::new(ContextInner {
                registry: DefaultRegistry::new(),
                live: LiveTables::new(),
                forwarder: RwLock::new(self.forwarder),
                transport: RwLock::new(self.transport),
                config: self.config,
            }),
        }
    }
}

/// Override that is popped when dropped.
///
/// Removes exactly the handler it pushed, even if other overrides were pushed
/// on top of it in the meantime. Bound to the thread that created it.
#[must_use = "the override is removed as soon as the guard is dropped"]
pub struct OverrideGuard {
    context: CallbackContext,
    tier: Tier,
    name: String,
    handler: HandlerRef,
    _thread_bound: PhantomData<*const ()>,
}

impl OverrideGuard {
    fn new(context: CallbackContext, tier: Tier, name: &str, handler: HandlerRef) -> Self {
        Self {
            context,
            tier,
            name: name.to_string(),
            handler,
            _thread_bound: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }
}

impl Drop for OverrideGuard {
    fn drop(&mut self) {
        let removed = self
            .context
            .inner
            .live
            .with_current(|t| t.table_mut(self.tier).remove_entry(&self.name, &self.handler));
        match removed {
            Ok(Some((handler, was_top))) => {
                if !was_top {
                    warn!(callback = %self.name, tier = %self.tier, "scoped override was not on top when released");
                }
                drop(handler);
            }
            Ok(None) => debug!(callback = %self.name, tier = %self.tier, "scoped override already removed"),
            Err(e) => warn!(callback = %self.name, error = %e, "scoped override not released"),
        }
    }
}

impl fmt::Debug for OverrideGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverrideGuard")
            .field("name", &self.name)
            .field("tier", &self.tier)
            .finish()
    }
}
