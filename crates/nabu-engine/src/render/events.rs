use std::sync::mpsc::{self, Receiver, Sender, TryIter};
use std::sync::{Mutex, PoisonError};

use crate::coords::PixelSize;

/// Raised by a window render API after its framebuffer changed size.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FramebufferResized {
    pub size: PixelSize,
}

/// Fan-out notification source.
///
/// Every live subscriber receives every event; delivery order across
/// subscribers is unspecified. Dropped subscriptions are pruned on the next
/// emit.
pub struct EventHub<E> {
    subscribers: Mutex<Vec<Sender<E>>>,
}

impl<E: Clone> EventHub<E> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Subscription<E> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        Subscription { rx }
    }

    pub fn emit(&self, event: E) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E: Clone> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving end of an [`EventHub`]. Dropping it unsubscribes.
pub struct Subscription<E> {
    rx: Receiver<E>,
}

impl<E> Subscription<E> {
    /// Drains pending events, returning only the most recent one.
    pub fn latest(&self) -> Option<E> {
        self.rx.try_iter().last()
    }

    pub fn try_iter(&self) -> TryIter<'_, E> {
        self.rx.try_iter()
    }
}
