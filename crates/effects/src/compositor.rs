use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use winit::dpi::PhysicalSize;

use crate::dither::DitherPostProcess;
use crate::gpu::{FrameBufferTarget, GpuContext};
use crate::lens::RefractionLens;
use crate::pointer::{CanvasRect, PointerTracker};
use crate::runtime::{FrameClock, TimeSample};
use crate::types::EngineConfig;
use crate::wave::WaveFieldEffect;

/// Shared lifecycle of the compositor and every effect it owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectState {
    Uninitialized,
    Mounted,
    Running,
    Disposed,
}

/// Lifecycle state transitions. Render is a no-op before mount and after
/// dispose; dispose is terminal.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: EffectState,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            state: EffectState::Uninitialized,
        }
    }

    pub(crate) fn mount(&mut self) {
        if self.state == EffectState::Uninitialized {
            self.state = EffectState::Mounted;
        }
    }

    /// Returns whether a frame may render; first successful frame moves
    /// `Mounted` to `Running`.
    pub(crate) fn begin_frame(&mut self) -> bool {
        match self.state {
            EffectState::Mounted | EffectState::Running => {
                self.state = EffectState::Running;
                true
            }
            EffectState::Uninitialized | EffectState::Disposed => false,
        }
    }

    pub(crate) fn dispose(&mut self) {
        self.state = EffectState::Disposed;
    }

    pub(crate) fn state(&self) -> EffectState {
        self.state
    }
}

/// Collapses any number of resize events between ticks into the last
/// observed size; zero-area sizes are dropped.
#[derive(Debug, Default)]
pub(crate) struct ResizeDebounce {
    pending: Option<PhysicalSize<u32>>,
}

impl ResizeDebounce {
    pub(crate) fn push(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.pending = Some(size);
    }

    pub(crate) fn take(&mut self) -> Option<PhysicalSize<u32>> {
        self.pending.take()
    }
}

/// Effect resolution contract: `floor(css size × devicePixelRatio)`.
pub fn physical_resolution(css_size: (f64, f64), device_pixel_ratio: f64) -> PhysicalSize<u32> {
    let ratio = if device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0 {
        device_pixel_ratio
    } else {
        1.0
    };
    PhysicalSize::new(
        (css_size.0.max(0.0) * ratio).floor() as u32,
        (css_size.1.max(0.0) * ratio).floor() as u32,
    )
}

/// The wave field and its quantization stage share one offscreen buffer and
/// always run as a pair.
struct WaveChain {
    wave: WaveFieldEffect,
    target: FrameBufferTarget,
    dither: DitherPostProcess,
}

/// Owns the GPU context and drives both effect chains in fixed order:
/// wave → dither, and portal → background quad → lens. With both chains
/// enabled the dither output lands in the lens portal, so the lens refracts
/// the dithered wave; with the lens disabled the dither presents directly.
pub struct Compositor {
    context: GpuContext,
    lifecycle: Lifecycle,
    clock: FrameClock,
    pointer: PointerTracker,
    wave: Option<WaveChain>,
    lens: Option<RefractionLens>,
    resize: ResizeDebounce,
}

impl Compositor {
    pub fn new<T>(target: &T, initial_size: PhysicalSize<u32>, config: &EngineConfig) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        config.validate()?;
        let context = GpuContext::new(target, initial_size)?;
        let size = context.size;
        let format = context.surface_format;

        // Each effect failing to build is fatal to that effect only; the
        // compositor keeps whatever mounted successfully.
        let wave = match &config.wave {
            Some((wave_settings, dither_settings)) => {
                match Self::build_wave_chain(
                    &context,
                    format,
                    wave_settings.clone(),
                    *dither_settings,
                    size,
                ) {
                    Ok(chain) => Some(chain),
                    Err(error) => {
                        warn!(error = %error, "wave chain failed to mount; skipping");
                        None
                    }
                }
            }
            None => None,
        };

        let lens = match &config.lens {
            Some(lens_settings) => {
                match RefractionLens::new(&context.device, format, lens_settings.clone(), size) {
                    Ok(lens) => Some(lens),
                    Err(error) => {
                        warn!(error = %error, "refraction lens failed to mount; skipping");
                        None
                    }
                }
            }
            None => None,
        };

        let mut lifecycle = Lifecycle::new();
        lifecycle.mount();

        Ok(Self {
            context,
            lifecycle,
            clock: FrameClock::new(),
            pointer: PointerTracker::new(),
            wave,
            lens,
            resize: ResizeDebounce::default(),
        })
    }

    fn build_wave_chain(
        context: &GpuContext,
        format: wgpu::TextureFormat,
        wave_settings: crate::types::WaveSettings,
        dither_settings: crate::types::DitherSettings,
        size: PhysicalSize<u32>,
    ) -> Result<WaveChain> {
        let target = FrameBufferTarget::new(
            &context.device,
            "wave field target",
            size,
            format,
            // Nearest filtering keeps the block-quantized sample exact.
            wgpu::FilterMode::Nearest,
        );
        let wave = WaveFieldEffect::new(&context.device, format, wave_settings, size)?;
        let dither = DitherPostProcess::new(&context.device, format, dither_settings, &target, size)?;
        Ok(WaveChain {
            wave,
            target,
            dither,
        })
    }

    pub fn state(&self) -> EffectState {
        self.lifecycle.state()
    }

    /// Current effect resolution in framebuffer pixels.
    pub fn resolution(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Pointer-move events only mutate the tracker; nothing renders until
    /// the next tick reads the latest value. No-op once disposed.
    pub fn handle_pointer_moved(
        &mut self,
        client_x: f32,
        client_y: f32,
        rect: CanvasRect,
        device_pixel_ratio: f32,
    ) {
        if self.lifecycle.state() == EffectState::Disposed {
            return;
        }
        self.pointer
            .handle_pointer_moved(client_x, client_y, rect, device_pixel_ratio);
    }

    /// Queues a resize; consecutive calls before the next tick collapse
    /// into the last observed size. No-op once disposed.
    pub fn request_resize(&mut self, size: PhysicalSize<u32>) {
        if self.lifecycle.state() == EffectState::Disposed {
            return;
        }
        self.resize.push(size);
    }

    /// Reconfigures the surface after a lost/outdated swapchain.
    pub fn reconfigure_surface(&self) {
        self.context.reconfigure();
    }

    /// Renders one frame. Returns without touching the GPU when the
    /// compositor is not in a renderable state.
    pub fn render(&mut self, sample: TimeSample) -> Result<(), wgpu::SurfaceError> {
        if !self.lifecycle.begin_frame() {
            return Ok(());
        }

        self.apply_pending_resize();

        let tick = self.clock.tick(sample);
        let resolution = self.context.size;
        let pointer_pixels = self.pointer.position();
        let pointer_normalized = self
            .pointer
            .normalized((resolution.width, resolution.height));

        if let Some(chain) = self.wave.as_mut() {
            chain.wave.update(&tick, pointer_pixels);
        }
        if let Some(lens) = self.lens.as_mut() {
            lens.update(&tick, pointer_normalized);
        }

        let frame = self.context.surface.get_current_texture()?;
        let frame_view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("compositor encoder"),
                });

        let queue = &self.context.queue;
        match (self.wave.as_ref(), self.lens.as_ref()) {
            (Some(chain), Some(lens)) => {
                chain.wave.render(queue, &mut encoder, &chain.target.view);
                lens.render_portal(&mut encoder);
                chain.dither.render(queue, &mut encoder, lens.portal_view());
                lens.render_composite(queue, &mut encoder, &frame_view);
            }
            (Some(chain), None) => {
                chain.wave.render(queue, &mut encoder, &chain.target.view);
                chain.dither.render(queue, &mut encoder, &frame_view);
            }
            (None, Some(lens)) => {
                lens.render_portal(&mut encoder);
                lens.render_composite(queue, &mut encoder, &frame_view);
            }
            (None, None) => {
                clear_view(&mut encoder, &frame_view);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        Ok(())
    }

    /// Releases every GPU resource the effects own. Terminal; later render
    /// and input callbacks are no-ops.
    pub fn dispose(&mut self) {
        self.lifecycle.dispose();
        self.wave = None;
        self.lens = None;
    }

    fn apply_pending_resize(&mut self) {
        let Some(size) = self.resize.take() else {
            return;
        };
        if size == self.context.size
            && self
                .wave
                .as_ref()
                .map(|chain| chain.target.matches(size))
                .unwrap_or(true)
        {
            return;
        }

        self.context.resize(size);
        let format = self.context.surface_format;

        if let Some(chain) = self.wave.as_mut() {
            chain.target = FrameBufferTarget::new(
                &self.context.device,
                "wave field target",
                size,
                format,
                wgpu::FilterMode::Nearest,
            );
            chain.wave.set_resolution(size);
            chain.dither.set_resolution(size);
            chain.dither.rebind_input(&self.context.device, &chain.target);
        }
        if let Some(lens) = self.lens.as_mut() {
            lens.resize(&self.context.device, size);
        }

        debug!(
            width = size.width,
            height = size.height,
            "reallocated effect surfaces"
        );
    }
}

fn clear_view(encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
    let _clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some("clear pass"),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view,
            depth_slice: None,
            resolve_target: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        occlusion_query_set: None,
        timestamp_writes: None,
    });
}
