//! Worker thread launcher that carries callback overrides along.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use super::snapshot::JobContextSnapshot;
use crate::config::JobConfig;
use crate::context::CallbackContext;
use crate::error::{CallbackError, Result};

/// Runs job bodies on worker threads with the issuer's overrides applied and
/// `in_async_job` set. The worker's stacks are empty again when the job ends.
///
/// # Examples
///
/// ```rust
/// use callback_core::{CallbackContext, CallbackHandler, JobRunner};
///
/// let ctx = CallbackContext::new();
/// ctx.push("status-message", CallbackHandler::new(|_, out| out.push(1)).into_ref());
///
/// let runner = JobRunner::new(ctx.clone());
/// let handle = runner.spawn(|ctx| ctx.call("status-message", b"")).unwrap();
/// assert_eq!(handle.join().unwrap().unwrap(), vec![1]);
/// ```
#[derive(Debug, Clone)]
pub struct JobRunner {
    context: CallbackContext,
    config: JobConfig,
    next_job: Arc<AtomicU64>,
}

impl JobRunner {
    /// Runner using the context's own job settings.
    pub fn new(context: CallbackContext) -> Self {
        let config = context.config().jobs.clone();
        Self::with_config(context, config)
    }

    pub fn with_config(context: CallbackContext, config: JobConfig) -> Self {
        Self {
            context,
            config,
            next_job: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn context(&self) -> &CallbackContext {
        &self.context
    }

    /// Run `job` on a new named OS thread.
    ///
    /// The snapshot is captured on the calling thread before this returns.
    pub fn spawn<F, R>(&self, job: F) -> Result<thread::JoinHandle<R>>
    where
        F: FnOnce(&CallbackContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (job_id, snapshot) = self.prepare()?;
        let thread_name = format!("{}-{job_id}", self.config.thread_name_prefix);
        let context = self.context.clone();

        thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || run_job(job_id, &context, snapshot, job))
            .map_err(|source| CallbackError::JobSpawn {
                thread_name,
                source,
            })
    }

    /// Run `job` on the tokio blocking pool. Must be called from within a
    /// tokio runtime.
    pub fn spawn_blocking<F, R>(&self, job: F) -> Result<tokio::task::JoinHandle<R>>
    where
        F: FnOnce(&CallbackContext) -> R + Send + 'static,
        R: Send + 'static,
    {
        let (job_id, snapshot) = self.prepare()?;
        let context = self.context.clone();
        Ok(tokio::task::spawn_blocking(move || {
            run_job(job_id, &context, snapshot, job)
        }))
    }

    fn prepare(&self) -> Result<(u64, JobContextSnapshot)> {
        let job_id = self.next_job.fetch_add(1, Ordering::Relaxed);
        let snapshot = self.context.capture()?;
        debug!(job_id, inherited = snapshot.len(), "job scheduled");
        Ok((job_id, snapshot))
    }
}

/// Leaves a worker thread with empty stacks once its job ends, so a pooled
/// thread never hands one job's leftover overrides to the next.
struct ClearStacksOnExit<'a> {
    job_id: u64,
    context: &'a CallbackContext,
}

impl Drop for ClearStacksOnExit<'_> {
    fn drop(&mut self) {
        let leftover = self.context.clear_thread_stacks();
        if leftover > 0 {
            warn!(job_id = self.job_id, leftover, "job left overrides on its worker thread");
        }
    }
}

fn run_job<F, R>(job_id: u64, context: &CallbackContext, snapshot: JobContextSnapshot, job: F) -> R
where
    F: FnOnce(&CallbackContext) -> R,
{
    // Declared before the scope so it runs after the scope is released.
    let _clear = ClearStacksOnExit { job_id, context };
    let scope = match snapshot.apply_async_job(context) {
        Ok(scope) => Some(scope),
        Err(e) => {
            warn!(job_id, error = %e, "running job without inherited overrides");
            None
        }
    };
    debug!(job_id, "job started");

    let result = job(context);

    // Also released by drop if `job` unwinds.
    if let Some(scope) = scope {
        scope.release();
    }
    debug!(job_id, "job finished");
    result
}
