use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};

use anyhow::Context as _;

use super::{run_contained, ContextGuard, ContextLock, Dispatcher, GpuContext, Job, Priority, ReleasePolicy};
use crate::error::{EngineError, Result};

/// Settings for [`RenderThreadDispatcher`].
#[derive(Debug, Clone)]
pub struct RenderThreadConfig {
    pub thread_name: String,
    /// The render thread owns its context, so keeping it bound is the default.
    pub release_policy: ReleasePolicy,
}

impl Default for RenderThreadConfig {
    fn default() -> Self {
        Self {
            thread_name: "nabu-render".to_owned(),
            release_policy: ReleasePolicy::KeepCurrent,
        }
    }
}

impl RenderThreadConfig {
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[derive(Default)]
struct Queues {
    normal: VecDeque<Job>,
    background: VecDeque<Job>,
    running: bool,
}

struct Shared {
    queues: Mutex<Queues>,
    wake: Condvar,
    context: ContextLock,
}

impl Shared {
    fn next_job(&self) -> Option<Job> {
        let mut q = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if let Some(job) = q.normal.pop_front() {
                return Some(job);
            }
            if let Some(job) = q.background.pop_front() {
                return Some(job);
            }
            // Pending work is drained before shutdown completes.
            if !q.running {
                return None;
            }
            q = self.wake.wait(q).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn run(&self) {
        while let Some(job) = self.next_job() {
            match self.context.acquire() {
                Ok(_guard) => run_contained(job),
                Err(e) => log::error!("dropping render job: {e:#}"),
            }
        }
        log::debug!("render thread exiting");
    }
}

/// Dispatcher owning a dedicated render thread.
///
/// Normal and background jobs each run FIFO; background jobs only run when the
/// normal queue is empty. Dropping the dispatcher drains what is queued, then
/// stops and joins the thread.
pub struct RenderThreadDispatcher {
    shared: Arc<Shared>,
    thread_id: ThreadId,
    thread: Option<JoinHandle<()>>,
}

impl RenderThreadDispatcher {
    pub fn spawn(config: RenderThreadConfig, context: Option<Arc<dyn GpuContext>>) -> Result<Self> {
        let shared = Arc::new(Shared {
            queues: Mutex::new(Queues {
                running: true,
                ..Queues::default()
            }),
            wake: Condvar::new(),
            context: ContextLock::new(context, config.release_policy),
        });

        let worker = shared.clone();
        let thread = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker.run())
            .with_context(|| format!("failed to spawn render thread `{}`", config.thread_name))?;

        log::info!("render thread `{}` started", config.thread_name);

        Ok(Self {
            shared,
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    /// Jobs waiting in either queue.
    pub fn pending(&self) -> usize {
        let q = self.shared.queues.lock().unwrap_or_else(PoisonError::into_inner);
        q.normal.len() + q.background.len()
    }
}

impl Dispatcher for RenderThreadDispatcher {
    fn is_dispatch_thread(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    fn post(&self, priority: Priority, job: Job) {
        let mut q = self.shared.queues.lock().unwrap_or_else(PoisonError::into_inner);
        if !q.running {
            log::warn!("render thread stopped; dropping {priority:?} job");
            return;
        }
        match priority {
            Priority::Normal => q.normal.push_back(job),
            Priority::Background => q.background.push_back(job),
        }
        drop(q);
        self.shared.wake.notify_one();
    }

    fn ensure_context(&self) -> Result<ContextGuard<'_>> {
        if !self.is_dispatch_thread() {
            return Err(EngineError::InvalidState(
                "GPU context requested off the render thread",
            ));
        }
        self.shared.context.acquire()
    }
}

impl Drop for RenderThreadDispatcher {
    fn drop(&mut self) {
        {
            let mut q = self.shared.queues.lock().unwrap_or_else(PoisonError::into_inner);
            q.running = false;
        }
        self.shared.wake.notify_all();

        let Some(thread) = self.thread.take() else {
            return;
        };
        // A job may hold the last reference; the thread cannot join itself.
        if self.is_dispatch_thread() {
            return;
        }
        if thread.join().is_err() {
            log::error!("render thread panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::DispatcherExt;
    use std::sync::mpsc;

    fn spawn() -> RenderThreadDispatcher {
        RenderThreadDispatcher::spawn(RenderThreadConfig::default(), None).unwrap()
    }

    /// Parks the render thread until the returned sender fires.
    fn park(d: &RenderThreadDispatcher) -> mpsc::Sender<()> {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (parked_tx, parked_rx) = mpsc::channel::<()>();
        d.post(Priority::Normal, Box::new(move || {
            let _ = parked_tx.send(());
            let _ = release_rx.recv();
        }));
        parked_rx.recv().unwrap();
        release_tx
    }

    // ── threading ────────────────────────────────────────────────────────

    #[test]
    fn jobs_run_on_the_named_thread() {
        let d = spawn();
        let name = d
            .invoke(|| thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.as_deref(), Some("nabu-render"));
        assert!(!d.is_dispatch_thread());
    }

    #[test]
    fn invoke_from_a_job_runs_in_place() {
        let d = Arc::new(spawn());
        let inner = d.clone();
        let nested = d
            .invoke_async(move || inner.invoke(|| 5).unwrap() + inner.is_dispatch_thread() as i32)
            .wait()
            .unwrap();
        assert_eq!(nested, 6);
    }

    #[test]
    fn ensure_context_off_thread_is_rejected() {
        let d = spawn();
        assert!(matches!(d.ensure_context(), Err(EngineError::InvalidState(_))));
    }

    // ── ordering ─────────────────────────────────────────────────────────

    #[test]
    fn same_thread_submissions_keep_order() {
        let d = spawn();
        let (tx, rx) = mpsc::channel();
        for i in 0..32 {
            let tx = tx.clone();
            d.post(Priority::Normal, Box::new(move || tx.send(i).unwrap()));
        }
        d.invoke(|| ()).unwrap();
        let seen: Vec<i32> = rx.try_iter().collect();
        assert_eq!(seen, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn background_waits_for_normal_queue() {
        let d = spawn();
        let release = park(&d);
        let (tx, rx) = mpsc::channel();

        let bg = tx.clone();
        let background = d.invoke_in_background_async(move || bg.send("background").unwrap());
        let normal = d.invoke_async(move || tx.send("normal").unwrap());

        release.send(()).unwrap();
        background.wait().unwrap();
        normal.wait().unwrap();

        let seen: Vec<_> = rx.try_iter().collect();
        assert_eq!(seen, vec!["normal", "background"]);
    }

    // ── failure / shutdown ───────────────────────────────────────────────

    #[test]
    fn panicking_job_cancels_handle_and_thread_survives() {
        let d = spawn();
        let h = d.invoke_async(|| -> u32 { panic!("bad draw") });
        assert!(matches!(h.wait(), Err(EngineError::DispatchCanceled)));
        assert_eq!(d.invoke(|| 1).unwrap(), 1);
    }

    #[test]
    fn drop_drains_queued_jobs() {
        let d = spawn();
        let release = park(&d);
        let handles: Vec<_> = (0..4).map(|i| d.invoke_async(move || i)).collect();
        assert_eq!(d.pending(), 4);

        release.send(()).unwrap();
        drop(d);

        let results: Vec<_> = handles.into_iter().map(|h| h.wait().unwrap()).collect();
        assert_eq!(results, vec![0, 1, 2, 3]);
    }
}
