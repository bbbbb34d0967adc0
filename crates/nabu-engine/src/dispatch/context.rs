use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, ThreadId};

use crate::error::{EngineError, Result};

/// A native GPU context that can be bound to the calling thread.
///
/// OpenGL-style hosts implement this over their platform context; APIs without a
/// thread-bound context (Vulkan, wgpu) simply do not provide one.
pub trait GpuContext: Send + Sync {
    /// Binds the context to the calling thread.
    fn make_current(&self) -> anyhow::Result<()>;

    /// Unbinds the context from the calling thread.
    fn release_current(&self);
}

/// What happens to the native context when the outermost guard drops.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum ReleasePolicy {
    /// Unbind after the outermost guard; the context is only current inside a guard.
    #[default]
    Release,
    /// Leave the context bound; suits a dedicated render thread that owns it.
    KeepCurrent,
}

#[derive(Debug, Default)]
struct Owner {
    thread: Option<ThreadId>,
    depth: usize,
}

/// Re-entrant acquisition of an optional [`GpuContext`].
///
/// Nested acquisitions from the same thread only bump a depth counter. Another
/// thread asking for the context waits until the owner's outermost guard drops.
pub struct ContextLock {
    context: Option<Arc<dyn GpuContext>>,
    policy: ReleasePolicy,
    owner: Mutex<Owner>,
    released: Condvar,
}

impl ContextLock {
    pub fn new(context: Option<Arc<dyn GpuContext>>, policy: ReleasePolicy) -> Self {
        Self {
            context,
            policy,
            owner: Mutex::new(Owner::default()),
            released: Condvar::new(),
        }
    }

    /// A lock without a native context; guards only track nesting.
    pub fn detached() -> Self {
        Self::new(None, ReleasePolicy::Release)
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Acquires the context for the calling thread.
    ///
    /// The native `make_current` runs only for the outermost acquisition. If it
    /// fails, ownership is rolled back and the error is returned.
    pub fn acquire(&self) -> Result<ContextGuard<'_>> {
        let me = thread::current().id();
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);

        loop {
            match owner.thread {
                Some(t) if t == me => {
                    owner.depth += 1;
                    return Ok(ContextGuard { lock: self });
                }
                Some(_) => {
                    owner = self
                        .released
                        .wait(owner)
                        .unwrap_or_else(PoisonError::into_inner);
                }
                None => break,
            }
        }

        owner.thread = Some(me);
        owner.depth = 1;

        if let Some(ctx) = &self.context {
            if let Err(e) = ctx.make_current() {
                owner.thread = None;
                owner.depth = 0;
                drop(owner);
                self.released.notify_one();
                return Err(EngineError::Host(e.context("failed to make GPU context current")));
            }
        }

        Ok(ContextGuard { lock: self })
    }

    /// Current nesting depth for the calling thread (0 if not owned by it).
    pub fn depth(&self) -> usize {
        let owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        if owner.thread == Some(thread::current().id()) {
            owner.depth
        } else {
            0
        }
    }

    fn release(&self) {
        let mut owner = self.owner.lock().unwrap_or_else(PoisonError::into_inner);
        owner.depth = owner.depth.saturating_sub(1);
        if owner.depth > 0 {
            return;
        }

        if self.policy == ReleasePolicy::Release {
            if let Some(ctx) = &self.context {
                ctx.release_current();
            }
        }
        owner.thread = None;
        drop(owner);
        self.released.notify_one();
    }
}

/// Scoped GPU-context token returned by [`ContextLock::acquire`].
///
/// Dropping it (on every exit path, unwinding included) undoes exactly one
/// acquisition.
#[must_use = "the GPU context is released as soon as the guard is dropped"]
pub struct ContextGuard<'a> {
    lock: &'a ContextLock,
}

impl ContextGuard<'_> {
    /// Nesting depth including this guard.
    pub fn depth(&self) -> usize {
        self.lock.depth()
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct CountingContext {
        made: AtomicUsize,
        released: AtomicUsize,
        fail: AtomicBool,
    }

    impl GpuContext for CountingContext {
        fn make_current(&self) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("context lost");
            }
            self.made.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn release_current(&self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn lock_with(policy: ReleasePolicy) -> (Arc<CountingContext>, ContextLock) {
        let ctx = Arc::new(CountingContext::default());
        let lock = ContextLock::new(Some(ctx.clone() as Arc<dyn GpuContext>), policy);
        (ctx, lock)
    }

    // ── re-entrancy ──────────────────────────────────────────────────────

    #[test]
    fn nested_guards_bind_once() {
        let (ctx, lock) = lock_with(ReleasePolicy::Release);
        {
            let outer = lock.acquire().unwrap();
            let inner = lock.acquire().unwrap();
            assert_eq!(inner.depth(), 2);
            drop(inner);
            assert_eq!(outer.depth(), 1);
            assert_eq!(ctx.released.load(Ordering::SeqCst), 0);
        }
        assert_eq!(ctx.made.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.released.load(Ordering::SeqCst), 1);
        assert_eq!(lock.depth(), 0);
    }

    #[test]
    fn keep_current_never_unbinds() {
        let (ctx, lock) = lock_with(ReleasePolicy::KeepCurrent);
        drop(lock.acquire().unwrap());
        drop(lock.acquire().unwrap());
        assert_eq!(ctx.made.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn guard_released_on_unwind() {
        let (ctx, lock) = lock_with(ReleasePolicy::Release);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _g = lock.acquire().unwrap();
            panic!("draw failed");
        }));
        assert!(result.is_err());
        assert_eq!(ctx.released.load(Ordering::SeqCst), 1);
        assert_eq!(lock.depth(), 0);
    }

    // ── failures ─────────────────────────────────────────────────────────

    #[test]
    fn failed_bind_rolls_back_ownership() {
        let (ctx, lock) = lock_with(ReleasePolicy::Release);
        ctx.fail.store(true, Ordering::SeqCst);
        assert!(matches!(lock.acquire(), Err(EngineError::Host(_))));
        assert_eq!(lock.depth(), 0);

        ctx.fail.store(false, Ordering::SeqCst);
        assert!(lock.acquire().is_ok());
    }

    // ── cross-thread ─────────────────────────────────────────────────────

    #[test]
    fn other_thread_waits_for_outermost_release() {
        let (_ctx, lock) = lock_with(ReleasePolicy::Release);
        let lock = Arc::new(lock);
        let entered = Arc::new(AtomicBool::new(false));

        let guard = lock.acquire().unwrap();
        let handle = {
            let lock = lock.clone();
            let entered = entered.clone();
            std::thread::spawn(move || {
                let _g = lock.acquire().unwrap();
                entered.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }
}
