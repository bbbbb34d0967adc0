use crate::coords::PixelSize;

use super::PresentHandle;

/// Platform compositor a [`Swapchain`](super::Swapchain) presents into.
///
/// `present` only starts the operation; completion (or a fault) is reported
/// later through the returned handle, from whatever thread the host likes.
pub trait HostCompositor: Send + Sync + 'static {
    type Image: Send + 'static;

    fn create_image(&self, size: PixelSize) -> anyhow::Result<Self::Image>;

    /// Hook run on an image right before it is handed out for drawing.
    fn begin_draw(&self, image: &Self::Image) {
        let _ = image;
    }

    fn present(&self, image: &Self::Image) -> PresentHandle;

    /// Releases an image. Called exactly once per created image.
    fn dispose_image(&self, image: Self::Image);
}
