//! # Job Context Inheritance
//!
//! Overrides are per-thread, so a job handed to a worker thread would normally
//! lose the overrides its issuer had in place. A [`JobContextSnapshot`] taken on
//! the issuing thread and applied on the worker closes that gap:
//!
//! ```text
//! issuer:  push(n, H) -> capture() ------------------------------+
//! worker:                          apply() -> job body -> release()
//!                                  (n -> H)               (n -> default)
//! ```
//!
//! [`JobRunner`] packages the whole sequence for OS threads and for the tokio
//! blocking pool. Schedulers with their own threads use the snapshot directly.

pub mod runner;
pub mod snapshot;

pub use runner::JobRunner;
pub use snapshot::{JobContextSnapshot, JobScope};
