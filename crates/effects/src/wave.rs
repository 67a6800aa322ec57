use anyhow::Result;
use glam::Vec2;
use winit::dpi::PhysicalSize;

use crate::compile::{compile_fragment, compile_fullscreen_vertex};
use crate::gpu::{
    create_fullscreen_pipeline, create_uniform_binding, write_uniform, UniformBinding,
    WaveUniforms,
};
use crate::runtime::FrameTick;
use crate::types::WaveSettings;

/// Sentinel pixel position meaning "no pointer seen yet"; far enough out
/// that every falloff evaluates to zero.
const MOUSE_OFFSCREEN: [f32; 2] = [-1.0e6, -1.0e6];

/// Scalar wave height in [0, 1] for a normalized screen position.
///
/// Three interfering sine bands; the sum is normalized back to [-1, 1]
/// before amplitude scaling so the result stays bounded for any amplitude.
/// This is the same formula the fragment shader evaluates.
pub fn wave_height(pos: Vec2, time: f32, frequency: f32, amplitude: f32) -> f32 {
    let p = pos * frequency;
    let bands = (p.x * 1.7 + time * 1.3).sin()
        + (p.y * 2.3 - time * 0.9).sin()
        + ((p.x + p.y) * 1.1 + time * 1.7).sin();
    (0.5 + 0.5 * amplitude * (bands / 3.0)).clamp(0.0, 1.0)
}

/// Normalized-distance falloff: 1 at the pointer, 0 at `radius` and beyond.
/// A non-positive radius disables the falloff entirely instead of dividing
/// by zero.
pub fn mouse_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 {
        return 0.0;
    }
    (1.0 - distance / radius).clamp(0.0, 1.0)
}

/// CPU reference for one wave-field sample, mirroring the fragment shader.
/// `uv` and `pointer_uv` are in [0, 1] texture coordinates.
pub fn shade(
    settings: &WaveSettings,
    uv: Vec2,
    elapsed: f32,
    pointer_uv: Option<Vec2>,
) -> [f32; 3] {
    let time = elapsed * settings.speed;
    let height = wave_height(uv, time, settings.frequency, settings.amplitude);
    let mut rgb = [
        settings.color[0] * height,
        settings.color[1] * height,
        settings.color[2] * height,
    ];
    if settings.enable_mouse_interaction {
        if let Some(pointer) = pointer_uv {
            let falloff = mouse_falloff(uv.distance(pointer), settings.mouse_radius);
            for channel in &mut rgb {
                *channel *= 1.0 - falloff;
            }
        }
    }
    rgb.map(|channel| channel.clamp(0.0, 1.0))
}

/// Accumulator step for the elapsed-time uniform: frozen while animation is
/// disabled, otherwise advanced by the tick delta.
pub(crate) fn advance_elapsed(elapsed: f32, delta: f32, disable_animation: bool) -> f32 {
    if disable_animation {
        elapsed
    } else {
        elapsed + delta
    }
}

/// Animated wave color field rendered into its owned offscreen target.
pub(crate) struct WaveFieldEffect {
    settings: WaveSettings,
    uniforms: WaveUniforms,
    binding: UniformBinding,
    pipeline: wgpu::RenderPipeline,
    elapsed: f32,
}

impl WaveFieldEffect {
    pub(crate) fn new(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
        settings: WaveSettings,
        resolution: PhysicalSize<u32>,
    ) -> Result<Self> {
        settings.validate()?;

        let binding = create_uniform_binding::<WaveUniforms>(device, "wave");
        let vertex = compile_fullscreen_vertex(device)?;
        let fragment = compile_fragment(device, "wave fragment", WAVE_FRAGMENT_GLSL)?;
        let pipeline = create_fullscreen_pipeline(
            device,
            "wave pipeline",
            &vertex,
            &fragment,
            target_format,
            &[&binding.layout],
        )?;

        let mut uniforms = WaveUniforms::new(&settings, resolution);
        uniforms.mouse = MOUSE_OFFSCREEN;

        Ok(Self {
            settings,
            uniforms,
            binding,
            pipeline,
            elapsed: 0.0,
        })
    }

    /// Advances the time accumulator and latches the pointer position for
    /// this tick. `pointer` is in framebuffer pixels.
    pub(crate) fn update(&mut self, tick: &FrameTick, pointer: Option<Vec2>) {
        self.elapsed = advance_elapsed(self.elapsed, tick.delta, self.settings.disable_animation);
        self.uniforms.set_time(self.elapsed);
        if self.settings.enable_mouse_interaction {
            if let Some(position) = pointer {
                self.uniforms.set_mouse(position);
            }
        }
    }

    pub(crate) fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.uniforms.set_resolution(size);
    }

    pub(crate) fn render(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        write_uniform(queue, &self.binding.buffer, &self.uniforms);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("wave pass"),
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
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.binding.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Wave fragment shader. The `WaveParams` block must match `WaveUniforms`;
/// the height and falloff math must match [`wave_height`]/[`mouse_falloff`].
const WAVE_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform WaveParams {
    vec2 resolution;
    float time;
    float speed;
    float frequency;
    float amplitude;
    float mouse_radius;
    float enable_mouse;
    vec3 color;
    float _pad0;
    vec2 mouse;
    vec2 _pad1;
} ubo;

float wave_height(vec2 pos, float t) {
    vec2 p = pos * ubo.frequency;
    float bands = sin(p.x * 1.7 + t * 1.3)
        + sin(p.y * 2.3 - t * 0.9)
        + sin((p.x + p.y) * 1.1 + t * 1.7);
    return clamp(0.5 + 0.5 * ubo.amplitude * (bands / 3.0), 0.0, 1.0);
}

void main() {
    float t = ubo.time * ubo.speed;
    float height = wave_height(v_uv, t);
    vec3 rgb = ubo.color * height;
    if (ubo.enable_mouse > 0.5 && ubo.mouse_radius > 0.0) {
        vec2 pointer_uv = ubo.mouse / ubo.resolution;
        float falloff = clamp(1.0 - distance(v_uv, pointer_uv) / ubo.mouse_radius, 0.0, 1.0);
        rgb *= 1.0 - falloff;
    }
    out_color = vec4(clamp(rgb, 0.0, 1.0), 1.0);
}
";
