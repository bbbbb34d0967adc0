/// Initialization parameters for the wgpu render API family.
///
/// Keep this minimal; add flags only when a platform or backend needs one.
#[derive(Debug, Clone)]
pub struct WgpuInit {
    /// Prefer an sRGB surface format when available.
    pub prefer_srgb: bool,

    /// Present mode used for OS surfaces.
    ///
    /// FIFO is supported everywhere and suits UI workloads.
    pub present_mode: wgpu::PresentMode,

    /// Alpha mode preference for OS surfaces.
    ///
    /// If unsupported on the current surface, a supported mode is selected.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,

    pub power_preference: wgpu::PowerPreference,

    /// Favor an empty set for portability.
    pub required_features: wgpu::Features,

    pub required_limits: wgpu::Limits,

    /// Hint; support depends on platform and backend.
    pub desired_maximum_frame_latency: u32,

    /// Format of offscreen render targets that are not tied to a surface.
    pub offscreen_format: wgpu::TextureFormat,
}

impl Default for WgpuInit {
    fn default() -> Self {
        Self {
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            power_preference: wgpu::PowerPreference::HighPerformance,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
            desired_maximum_frame_latency: 2,
            offscreen_format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

impl WgpuInit {
    pub fn with_present_mode(mut self, mode: wgpu::PresentMode) -> Self {
        self.present_mode = mode;
        self
    }

    pub fn with_power_preference(mut self, preference: wgpu::PowerPreference) -> Self {
        self.power_preference = preference;
        self
    }
}
