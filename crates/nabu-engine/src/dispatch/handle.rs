use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;

use crate::error::{EngineError, Result};

/// Result of work queued on a dispatcher.
///
/// Await it from async code or call [`DispatchHandle::wait`] to block. If the job
/// is dropped unrun or panics, the handle resolves to
/// [`EngineError::DispatchCanceled`].
#[must_use = "dropping a DispatchHandle discards the job's result"]
pub struct DispatchHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> DispatchHandle<T> {
    pub(crate) fn channel() -> (oneshot::Sender<T>, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx })
    }

    /// Blocks the calling thread until the job has run.
    ///
    /// Must not be called from the dispatch thread itself for a job queued behind
    /// the caller; that would wait on itself.
    pub fn wait(self) -> Result<T> {
        pollster::block_on(self)
    }

    /// Returns the result if the job already finished, without blocking.
    pub fn try_take(&mut self) -> Option<Result<T>> {
        match self.rx.try_recv() {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(oneshot::Canceled) => Some(Err(EngineError::DispatchCanceled)),
        }
    }
}

impl<T> Future for DispatchHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|oneshot::Canceled| EngineError::DispatchCanceled))
    }
}
