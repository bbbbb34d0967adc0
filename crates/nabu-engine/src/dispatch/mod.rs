//! Marshalling of GPU work onto the thread that owns the GPU context.
//!
//! [`Dispatcher`] is the object-safe core a host implements (or picks from the
//! two provided here); [`DispatcherExt`] layers the typed `invoke*` helpers on
//! top of it for every dispatcher, `dyn Dispatcher` included.

mod context;
mod handle;
mod inline;
mod render_thread;

use std::panic::{self, AssertUnwindSafe};

pub use context::{ContextGuard, ContextLock, GpuContext, ReleasePolicy};
pub use handle::DispatchHandle;
pub use inline::InlineDispatcher;
pub use render_thread::{RenderThreadConfig, RenderThreadDispatcher};

use crate::error::{EngineError, Result};

/// Unit of work accepted by [`Dispatcher::post`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Queue a posted job lands in.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Priority {
    Normal,
    /// Runs only when no normal-priority work is pending.
    Background,
}

/// Host-provided threading model for GPU work.
pub trait Dispatcher: Send + Sync {
    /// `true` if the caller is already on the thread jobs run on.
    fn is_dispatch_thread(&self) -> bool;

    /// Queues `job` to run on the dispatch thread with the GPU context current.
    ///
    /// Jobs posted from one thread at the same priority run in submission order.
    fn post(&self, priority: Priority, job: Job);

    /// Makes the GPU context current for the lifetime of the returned guard.
    ///
    /// Re-entrant within one call chain.
    fn ensure_context(&self) -> Result<ContextGuard<'_>>;
}

/// Typed helpers available on every [`Dispatcher`].
pub trait DispatcherExt: Dispatcher {
    /// Runs `action` on the dispatch thread and returns its result.
    ///
    /// Runs in place when already on the dispatch thread; otherwise queues at
    /// normal priority and blocks until it has run.
    fn invoke<T, F>(&self, action: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        if self.is_dispatch_thread() {
            let _guard = self.ensure_context()?;
            return panic::catch_unwind(AssertUnwindSafe(action)).map_err(|_| {
                log::error!("invoked action panicked");
                EngineError::DispatchCanceled
            });
        }

        self.invoke_async(action).wait()
    }

    /// Queues `func` at normal priority.
    fn invoke_async<T, F>(&self, func: F) -> DispatchHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        post_with_result(self, Priority::Normal, func)
    }

    /// Queues `func` at background priority.
    fn invoke_in_background_async<T, F>(&self, func: F) -> DispatchHandle<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        post_with_result(self, Priority::Background, func)
    }
}

impl<D: Dispatcher + ?Sized> DispatcherExt for D {}

fn post_with_result<D, T, F>(dispatcher: &D, priority: Priority, func: F) -> DispatchHandle<T>
where
    D: Dispatcher + ?Sized,
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (tx, handle) = DispatchHandle::channel();
    dispatcher.post(
        priority,
        Box::new(move || {
            // The receiver may be gone; the job still ran.
            let _ = tx.send(func());
        }),
    );
    handle
}

/// Runs a job, containing any panic so the dispatch thread survives it.
///
/// A panicking job drops its result sender, which cancels its handle.
pub(crate) fn run_contained(job: Job) {
    if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
        log::error!("dispatched job panicked; its handle resolves as canceled");
    }
}
