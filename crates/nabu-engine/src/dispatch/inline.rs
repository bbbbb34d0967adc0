use std::sync::Arc;

use super::{run_contained, ContextGuard, ContextLock, Dispatcher, GpuContext, Job, Priority, ReleasePolicy};
use crate::error::Result;

/// Dispatcher for single-threaded hosts: every job runs in place.
///
/// Priority is irrelevant here since nothing is ever queued.
pub struct InlineDispatcher {
    context: ContextLock,
}

impl InlineDispatcher {
    /// An inline dispatcher with no native context to bind.
    pub fn new() -> Self {
        Self {
            context: ContextLock::detached(),
        }
    }

    pub fn with_context(context: Arc<dyn GpuContext>, policy: ReleasePolicy) -> Self {
        Self {
            context: ContextLock::new(Some(context), policy),
        }
    }
}

impl Default for InlineDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for InlineDispatcher {
    fn is_dispatch_thread(&self) -> bool {
        true
    }

    fn post(&self, _priority: Priority, job: Job) {
        match self.context.acquire() {
            Ok(_guard) => run_contained(job),
            Err(e) => log::error!("dropping job: {e:#}"),
        }
    }

    fn ensure_context(&self) -> Result<ContextGuard<'_>> {
        self.context.acquire()
    }
}
