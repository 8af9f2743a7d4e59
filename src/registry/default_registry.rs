//! # Default Handler Registry
//!
//! Process-wide table of default handlers, one map per [`Tier`], guarded by a
//! single mutex.
//!
//! ## Key Features
//!
//! - **Atomic replacement**: readers see either the old or the new handler,
//!   never a partially replaced entry
//! - **Sequentially consistent defaults**: every change goes through one lock,
//!   so all threads observe default changes in the same order
//! - **Destructor safety**: replaced handlers are released after the lock is
//!   dropped, so a destructor may itself call back into the registry

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use crate::handler::{HandlerRef, Tier};
use crate::logging::log_callback_operation;

#[derive(Debug, Default)]
struct RegistryTables {
    direct: HashMap<String, HandlerRef>,
    async_: HashMap<String, HandlerRef>,
}

impl RegistryTables {
    fn table(&self, tier: Tier) -> &HashMap<String, HandlerRef> {
        match tier {
            Tier::Direct => &self.direct,
            Tier::Async => &self.async_,
        }
    }

    fn table_mut(&mut self, tier: Tier) -> &mut HashMap<String, HandlerRef> {
        match tier {
            Tier::Direct => &mut self.direct,
            Tier::Async => &mut self.async_,
        }
    }
}

/// Registry statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    pub direct_defaults: usize,
    pub async_defaults: usize,
    pub live_thread_tables: usize,
}

/// Default handlers for both tiers.
#[derive(Debug, Default)]
pub struct DefaultRegistry {
    tables: Mutex<RegistryTables>,
}

impl DefaultRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `handler` as the default for `name`, releasing any previous one.
    pub fn set(&self, tier: Tier, name: &str, handler: HandlerRef) {
        let previous = self
            .tables
            .lock()
            .table_mut(tier)
            .insert(name.to_string(), handler);

        log_callback_operation(
            "set_default",
            name,
            tier,
            if previous.is_some() { "replaced" } else { "installed" },
        );
        drop(previous);
    }

    /// New strong reference to the current default, if any.
    pub fn get(&self, tier: Tier, name: &str) -> Option<HandlerRef> {
        self.tables.lock().table(tier).get(name).cloned()
    }

    /// Remove the default for `name`. Returns whether one was installed.
    pub fn clear(&self, tier: Tier, name: &str) -> bool {
        let previous = self.tables.lock().table_mut(tier).remove(name);
        let removed = previous.is_some();
        if removed {
            log_callback_operation("clear_default", name, tier, "removed");
        }
        drop(previous);
        removed
    }

    /// Sorted names with a default installed in `tier`.
    pub fn names(&self, tier: Tier) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().table(tier).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self, tier: Tier) -> usize {
        self.tables.lock().table(tier).len()
    }

    /// Drop every default in both tiers, returning how many were released.
    pub fn clear_all(&self) -> usize {
        let released: Vec<HandlerRef> = {
            let mut tables = self.tables.lock();
            let mut released: Vec<HandlerRef> = tables.direct.drain().map(|(_, h)| h).collect();
            released.extend(tables.async_.drain().map(|(_, h)| h));
            released
        };
        debug!(released = released.len(), "cleared default callback handlers");
        released.len()
    }
}
