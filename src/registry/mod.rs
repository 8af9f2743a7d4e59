//! # Registry Infrastructure
//!
//! Process-wide default handler tables.
//!
//! ## Overview
//!
//! Each [`CallbackContext`](crate::CallbackContext) owns one
//! [`DefaultRegistry`] holding the default handler for every callback name in
//! both tiers. Defaults are visible to every thread; overrides pushed by a thread live
//! in its thread-local stacks and shadow them.
//!
//! ## Architecture
//!
//! ```text
//! DefaultRegistry (one mutex)
//! ├── direct: name -> HandlerRef
//! └── async:  name -> HandlerRef
//! ```

pub mod default_registry;

pub use default_registry::{DefaultRegistry, RegistryStats};
