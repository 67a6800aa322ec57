use winit::dpi::PhysicalSize;

/// Offscreen color buffer owned by exactly one effect.
///
/// Targets are recreated on viewport change, never resized in place; the
/// old texture drops as soon as every bind group referencing it is rebuilt.
pub(crate) struct FrameBufferTarget {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    size: PhysicalSize<u32>,
}

impl FrameBufferTarget {
    pub(crate) fn new(
        device: &wgpu::Device,
        label: &str,
        size: PhysicalSize<u32>,
        format: wgpu::TextureFormat,
        filter: wgpu::FilterMode,
    ) -> Self {
        let extent = wgpu::Extent3d {
            width: size.width.max(1),
            height: size.height.max(1),
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        Self {
            texture,
            view,
            sampler,
            size: PhysicalSize::new(extent.width, extent.height),
        }
    }

    /// Pixel dimensions of the underlying texture.
    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    /// Whether the target already matches the requested pixel dimensions,
    /// making a reallocation redundant.
    pub(crate) fn matches(&self, size: PhysicalSize<u32>) -> bool {
        self.size.width == size.width.max(1) && self.size.height == size.height.max(1)
    }
}
