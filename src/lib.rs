#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Callback Core
//!
//! Named callback dispatch between library modules and the application that
//! hosts them.
//!
//! ## Overview
//!
//! Modules deep inside an I/O stack sometimes need something only the
//! application can provide: credentials, an answer to a question, a place to
//! show progress. They ask for it by invoking a callback *by name* with an input
//! buffer and an output buffer. The application decides who answers:
//!
//! - a **default** handler per name, shared by every thread;
//! - per-thread **overrides** pushed and popped in strict LIFO order;
//! - **async** handlers that must run on a designated thread (typically a UI
//!   event loop) while the invoking thread blocks on the reply.
//!
//! ## Architecture
//!
//! ```text
//!   invoke(name, in, out)
//!          |
//!   +------v-------+   in_async_job?   +----------------------+
//!   |  Dispatcher  |------------------>| async stack / async  |
//!   +------+-------+                   | default -> AsyncBridge|
//!          | otherwise / not found     +----------+-----------+
//!   +------v---------------+                      | forward
//!   | direct stack / direct|             +--------v---------+
//!   | default -> call      |             | AsyncDispatcher  |
//!   +----------------------+             | (e.g. MainLoop)  |
//!                                        +------------------+
//! ```
//!
//! ## Module Organization
//!
//! - [`context`] - [`CallbackContext`], owner of all tables
//! - [`dispatch`] - resolution and invocation
//! - [`handler`] - handler references and destructors
//! - [`bridge`] - async bridge, forwarders and the main loop
//! - [`registry`] - process-wide default handlers
//! - [`job`] - override inheritance for worker threads
//! - [`standard`] - typed payloads for the well-known channels
//! - [`transport`] - out-of-process seam
//! - [`global`] - process-wide context and exit sweep
//! - [`config`] - configuration management
//! - [`logging`] - structured logging
//! - [`error`] - structured error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use callback_core::{CallbackContext, CallbackHandler};
//!
//! let ctx = CallbackContext::new();
//! ctx.set_default("ask-question", CallbackHandler::new(|_, out| out.push(0)).into_ref());
//!
//! let mut out = Vec::new();
//! assert!(ctx.invoke("ask-question", b"{}", &mut out));
//! assert_eq!(out, vec![0]);
//!
//! assert!(!ctx.invoke("nobody-listens", b"", &mut out));
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests
//! ```

pub mod bridge;
pub mod config;
pub mod constants;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod handler;
pub mod job;
pub mod logging;
pub mod registry;
pub mod standard;
pub mod transport;

mod stack;

pub use bridge::{
    AsyncCallbackRequest, AsyncDispatcher, CallbackResponder, ForwardedCallback, MainLoop,
    MainLoopDispatcher,
};
pub use config::{CallbackConfig, ConfigManager, ConfigurationError};
pub use context::{CallbackContext, CallbackContextBuilder, OverrideGuard};
pub use error::{CallbackError, Result};
pub use handler::{CallbackHandler, HandlerRef, Tier};
pub use job::{JobContextSnapshot, JobRunner, JobScope};
pub use registry::RegistryStats;
pub use standard::StandardCallback;
pub use transport::{CallbackTransport, LoopbackTransport};
