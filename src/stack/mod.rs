//! # Per-Thread Override Stacks
//!
//! Every thread that touches a [`CallbackContext`](crate::CallbackContext) gets
//! its own pair of override tables (direct and async) plus the `in_async_job`
//! flag. The tables live in thread-local storage and are only ever mutated by
//! their own thread, so pushes on one thread are invisible to every other.
//!
//! ## Teardown
//!
//! Tables are released along two independent paths:
//!
//! - a thread-local destructor ([`ThreadSlot`]'s `Drop`) when the thread exits;
//! - [`LiveTables::sweep`], run when the owning context is dropped or an exit
//!   sweep guard fires, for threads whose destructor never ran.
//!
//! Each table is registered in the context's [`LiveTables`] tracker. Whichever
//! path removes it from the tracker is the one that clears it, so a table is
//! released exactly once.

mod table;

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::{CallbackError, Result};
use crate::handler::{HandlerRef, Tier};

pub(crate) use table::StackTable;

/// Override state of one thread for one context.
#[derive(Debug, Default)]
pub(crate) struct ThreadTables {
    direct: StackTable,
    async_: StackTable,
    pub in_async_job: bool,
}

impl ThreadTables {
    pub fn table(&self, tier: Tier) -> &StackTable {
        match tier {
            Tier::Direct => &self.direct,
            Tier::Async => &self.async_,
        }
    }

    pub fn table_mut(&mut self, tier: Tier) -> &mut StackTable {
        match tier {
            Tier::Direct => &mut self.direct,
            Tier::Async => &mut self.async_,
        }
    }

    /// Empty both tiers, returning every reference they held.
    pub fn drain(&mut self) -> Vec<HandlerRef> {
        let mut released = self.direct.drain();
        released.extend(self.async_.drain());
        released
    }
}

type SharedTables = Arc<Mutex<ThreadTables>>;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Tracker of every live per-thread table belonging to one context.
#[derive(Debug)]
pub(crate) struct LiveTables {
    context_id: u64,
    next_table: AtomicU64,
    tables: Mutex<HashMap<u64, SharedTables>>,
}

impl LiveTables {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            context_id: NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed),
            next_table: AtomicU64::new(1),
            tables: Mutex::new(HashMap::new()),
        })
    }

    pub fn context_id(&self) -> u64 {
        self.context_id
    }

    /// Number of thread tables currently tracked.
    pub fn len(&self) -> usize {
        self.tables.lock().len()
    }

    fn register(&self, tables: SharedTables) -> u64 {
        let id = self.next_table.fetch_add(1, Ordering::Relaxed);
        self.tables.lock().insert(id, tables);
        id
    }

    fn unregister(&self, id: u64) -> Option<SharedTables> {
        self.tables.lock().remove(&id)
    }

    /// Release every tracked table whose thread has not released it itself.
    ///
    /// Returns the number of handler references released.
    pub fn sweep(&self) -> usize {
        let tables: Vec<SharedTables> = self.tables.lock().drain().map(|(_, t)| t).collect();
        let released: Vec<HandlerRef> = tables.iter().flat_map(|t| t.lock().drain()).collect();
        let count = released.len();
        drop(released);
        debug!(
            context_id = self.context_id,
            thread_tables = tables.len(),
            released = count,
            "swept per-thread override tables"
        );
        count
    }

    /// Run `f` against the calling thread's tables, creating them on first use.
    ///
    /// The table lock is released before this returns, so anything `f` hands
    /// back (typically popped handlers) is dropped outside of it.
    pub fn with_current<R>(self: &Arc<Self>, f: impl FnOnce(&mut ThreadTables) -> R) -> Result<R> {
        let (tables, stale) = THREAD_SLOTS
            .try_with(|slots| {
                let mut slots = slots.borrow_mut();
                let mut stale = Vec::new();
                if !slots.contains_key(&self.context_id) {
                    // Drop slots whose context is gone before adding one.
                    let dead: Vec<u64> = slots
                        .iter()
                        .filter(|(_, slot)| slot.tracker.strong_count() == 0)
                        .map(|(id, _)| *id)
                        .collect();
                    stale.extend(dead.iter().filter_map(|id| slots.remove(id)));

                    let tables = SharedTables::default();
                    let table_id = self.register(tables.clone());
                    trace!(context_id = self.context_id, table_id, "created per-thread override tables");
                    slots.insert(
                        self.context_id,
                        ThreadSlot {
                            table_id,
                            tables,
                            tracker: Arc::downgrade(self),
                        },
                    );
                }
                let tables = slots
                    .get(&self.context_id)
                    .map(|slot| slot.tables.clone())
                    .unwrap_or_default();
                (tables, stale)
            })
            .map_err(|e| CallbackError::ThreadTeardown {
                reason: e.to_string(),
            })?;
        drop(stale);

        let mut guard = tables.lock();
        let result = f(&mut guard);
        drop(guard);
        Ok(result)
    }
}

/// Thread-local handle on one context's tables.
struct ThreadSlot {
    table_id: u64,
    tables: SharedTables,
    tracker: Weak<LiveTables>,
}

impl Drop for ThreadSlot {
    fn drop(&mut self) {
        let Some(tracker) = self.tracker.upgrade() else {
            return;
        };
        // Already swept if the tracker no longer has it.
        if let Some(tables) = tracker.unregister(self.table_id) {
            let released = tables.lock().drain();
            trace!(
                context_id = tracker.context_id,
                table_id = self.table_id,
                released = released.len(),
                "thread exited, released override tables"
            );
            drop(released);
        }
    }
}

thread_local! {
    static THREAD_SLOTS: RefCell<HashMap<u64, ThreadSlot>> = RefCell::new(HashMap::new());
}
