use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::coords::PixelSize;

use super::{HostCompositor, PresentHandle, PresentStatus};

/// Ready images of the requested size the pool must hold before one is reused.
///
/// With fewer, a fresh image is allocated so the caller never waits on a present
/// that is still draining in the compositor.
pub const REUSE_THRESHOLD: usize = 2;

struct SwapchainImage<I> {
    image: I,
    size: PixelSize,
    last_present: Option<PresentHandle>,
}

enum Readiness {
    /// Never presented, or the last present fully completed.
    Ready,
    InFlight,
    Broken,
}

impl<I> SwapchainImage<I> {
    fn readiness(&self) -> Readiness {
        match self.last_present.as_ref().map(PresentHandle::status) {
            None | Some(PresentStatus::Completed) => Readiness::Ready,
            Some(PresentStatus::Pending) => Readiness::InFlight,
            Some(PresentStatus::Faulted(fault)) => {
                log::warn!("evicting {} swapchain image: {fault}", self.size);
                Readiness::Broken
            }
        }
    }
}

struct Inner<C: HostCompositor> {
    compositor: C,
    /// Insertion order; never holds a checked-out image.
    pool: Mutex<Vec<SwapchainImage<C::Image>>>,
    disposed: AtomicBool,
}

impl<C: HostCompositor> Inner<C> {
    fn pool(&self) -> MutexGuard<'_, Vec<SwapchainImage<C::Image>>> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: HostCompositor> Drop for Inner<C> {
    fn drop(&mut self) {
        let leftovers = std::mem::take(self.pool.get_mut().unwrap_or_else(PoisonError::into_inner));
        if !leftovers.is_empty() {
            log::debug!("swapchain dropped undisposed; releasing {} images", leftovers.len());
        }
        for img in leftovers {
            self.compositor.dispose_image(img.image);
        }
    }
}

/// Pool of presentable images shared with a [`HostCompositor`].
///
/// Cloning yields another handle to the same pool.
pub struct Swapchain<C: HostCompositor> {
    inner: Arc<Inner<C>>,
}

impl<C: HostCompositor> Clone for Swapchain<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<C: HostCompositor> Swapchain<C> {
    pub fn new(compositor: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                compositor,
                pool: Mutex::new(Vec::new()),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn compositor(&self) -> &C {
        &self.inner.compositor
    }

    /// Images currently pooled (checked-out images excluded).
    pub fn pool_len(&self) -> usize {
        self.inner.pool().len()
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Checks out an image of `size` for one frame.
    ///
    /// After disposal this returns a skipped scope with no image; the caller
    /// should skip the frame. Errors only come from allocating a new image.
    pub fn begin_draw(&self, size: PixelSize) -> anyhow::Result<DrawScope<C>> {
        if self.is_disposed() {
            return Ok(DrawScope::skipped(self.inner.clone()));
        }

        let (reused, evicted) = {
            let mut pool = self.inner.pool();
            let mut kept = Vec::with_capacity(pool.len());
            let mut evicted = Vec::new();
            let mut first_ready = None;
            let mut ready = 0usize;

            // Newest first.
            for img in pool.drain(..).rev() {
                match img.readiness() {
                    Readiness::Broken => evicted.push(img),
                    Readiness::Ready if img.size != size => evicted.push(img),
                    Readiness::Ready => {
                        ready += 1;
                        first_ready.get_or_insert(kept.len());
                        kept.push(img);
                    }
                    Readiness::InFlight => kept.push(img),
                }
            }

            let reused = match first_ready {
                Some(i) if ready >= REUSE_THRESHOLD => Some(kept.remove(i)),
                _ => None,
            };

            kept.reverse();
            *pool = kept;
            (reused, evicted)
        };

        for img in evicted {
            self.inner.compositor.dispose_image(img.image);
        }

        let image = match reused {
            Some(img) => img,
            None => {
                log::trace!("allocating {size} swapchain image");
                SwapchainImage {
                    image: self.inner.compositor.create_image(size)?,
                    size,
                    last_present: None,
                }
            }
        };

        self.inner.compositor.begin_draw(&image.image);
        Ok(DrawScope {
            inner: self.inner.clone(),
            image: Some(image),
        })
    }

    /// Marks the swapchain disposed, waits for every pooled image's pending
    /// present, and disposes each image once.
    ///
    /// Idempotent. Scopes still checked out dispose their image on drop instead
    /// of presenting it.
    pub async fn dispose(&self) {
        let drained = {
            let mut pool = self.inner.pool();
            if self.inner.disposed.swap(true, Ordering::AcqRel) {
                return;
            }
            std::mem::take(&mut *pool)
        };

        log::debug!("disposing swapchain with {} pooled images", drained.len());
        for img in drained {
            if let Some(present) = img.last_present {
                if let Err(fault) = present.await {
                    log::debug!("pending present ended with: {fault}");
                }
            }
            self.inner.compositor.dispose_image(img.image);
        }
    }
}

/// One frame's checked-out image. Dropping it presents the image and returns
/// it to the pool.
#[must_use = "the image is presented as soon as the scope is dropped"]
pub struct DrawScope<C: HostCompositor> {
    inner: Arc<Inner<C>>,
    image: Option<SwapchainImage<C::Image>>,
}

impl<C: HostCompositor> DrawScope<C> {
    fn skipped(inner: Arc<Inner<C>>) -> Self {
        Self { inner, image: None }
    }

    /// The image to draw into; `None` if the swapchain was disposed.
    pub fn image(&self) -> Option<&C::Image> {
        self.image.as_ref().map(|img| &img.image)
    }

    pub fn size(&self) -> Option<PixelSize> {
        self.image.as_ref().map(|img| img.size)
    }

    pub fn is_skipped(&self) -> bool {
        self.image.is_none()
    }
}

impl<C: HostCompositor> Drop for DrawScope<C> {
    fn drop(&mut self) {
        let Some(mut img) = self.image.take() else {
            return;
        };

        // Checked under the pool lock so a concurrent dispose either sees this
        // image pooled or this scope sees the flag.
        let mut pool = self.inner.pool();
        if self.inner.disposed.load(Ordering::Acquire) {
            drop(pool);
            self.inner.compositor.dispose_image(img.image);
            return;
        }

        img.last_present = Some(self.inner.compositor.present(&img.image));
        pool.push(img);
    }
}
