use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::channel::oneshot;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use thiserror::Error;

/// Why a present did not complete.
#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum PresentFault {
    #[error("compositor rejected the frame: {0}")]
    Rejected(String),

    #[error("device lost while presenting")]
    DeviceLost,

    /// The completer was dropped without reporting an outcome.
    #[error("present was abandoned before it completed")]
    Abandoned,
}

/// Observed state of a present.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum PresentStatus {
    Pending,
    Completed,
    Faulted(PresentFault),
}

/// Shared, awaitable handle to an in-flight present.
///
/// Cheap to clone; every clone observes the same outcome.
#[derive(Clone)]
pub struct PresentHandle {
    inner: Shared<BoxFuture<'static, Result<(), PresentFault>>>,
}

impl PresentHandle {
    /// A pending present plus the completer that resolves it.
    ///
    /// The completer may be moved to any thread (a compositor callback, a GPU
    /// completion callback); it touches nothing but this handle's state.
    pub fn channel() -> (PresentCompleter, Self) {
        let (tx, rx) = oneshot::channel();
        let inner = async move { rx.await.unwrap_or(Err(PresentFault::Abandoned)) }
            .boxed()
            .shared();
        (PresentCompleter { tx }, Self { inner })
    }

    /// A present that already completed.
    pub fn completed() -> Self {
        Self {
            inner: future::ready(Ok(())).boxed().shared(),
        }
    }

    /// A present that already faulted.
    pub fn faulted(fault: PresentFault) -> Self {
        Self {
            inner: future::ready(Err(fault)).boxed().shared(),
        }
    }

    /// Non-blocking status probe.
    pub fn status(&self) -> PresentStatus {
        match self.inner.clone().now_or_never() {
            None => PresentStatus::Pending,
            Some(Ok(())) => PresentStatus::Completed,
            Some(Err(fault)) => PresentStatus::Faulted(fault),
        }
    }
}

impl Future for PresentHandle {
    type Output = Result<(), PresentFault>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

/// Resolves one [`PresentHandle`]. Dropping it unresolved faults the present
/// with [`PresentFault::Abandoned`].
pub struct PresentCompleter {
    tx: oneshot::Sender<Result<(), PresentFault>>,
}

impl PresentCompleter {
    pub fn complete(self) {
        // Nobody may be watching anymore; that is fine.
        let _ = self.tx.send(Ok(()));
    }

    pub fn fail(self, fault: PresentFault) {
        let _ = self.tx.send(Err(fault));
    }
}
