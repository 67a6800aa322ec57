use anyhow::Result;
use glam::{Mat4, Vec2, Vec3};
use winit::dpi::PhysicalSize;

use crate::compile::{compile_fragment, compile_fullscreen_vertex, compile_mesh_vertex};
use crate::gpu::{
    create_fullscreen_pipeline, create_mesh_pipeline, create_texture_bind_group,
    create_texture_layout, create_uniform_binding, write_uniform, FrameBufferTarget, LensUniforms,
    UniformBinding,
};
use crate::mesh::{GpuMesh, LensMesh, MeshVertex};
use crate::runtime::FrameTick;
use crate::types::LensSettings;

/// Damping time constant of the lens motion, in seconds. Roughly a 0.1–0.15
/// lerp factor per 60 Hz tick.
pub const LENS_TIME_CONSTANT: f32 = 0.15;

/// Camera placement shared with the source scene: pulled back far with a
/// narrow field of view, which keeps the lens nearly orthographic.
const CAMERA_DISTANCE: f32 = 20.0;
const CAMERA_FOV_DEG: f32 = 15.0;

/// Fixed clear color of the portal sub-scene (light grey, 0xd8d7d7).
const PORTAL_CLEAR: wgpu::Color = wgpu::Color {
    r: 216.0 / 255.0,
    g: 215.0 / 255.0,
    b: 215.0 / 255.0,
    a: 1.0,
};

/// Exponential step factor for a critically damped approach: never exceeds 1
/// so the position cannot overshoot, and a larger `dt` converges further in
/// a single step instead of oscillating.
pub fn damp_factor(dt: f32, time_constant: f32) -> f32 {
    if time_constant <= 0.0 {
        return 1.0;
    }
    1.0 - (-dt.max(0.0) / time_constant).exp()
}

/// Moves `current` toward `target` by one damped step.
pub fn damp_toward(current: Vec2, target: Vec2, dt: f32, time_constant: f32) -> Vec2 {
    current + (target - current) * damp_factor(dt, time_constant)
}

/// World-space lens target for a pointer in [-1, 1] normalized coordinates:
/// half the visible viewport extents at the reference depth.
pub fn pointer_target(normalized: Vec2, viewport_extents: Vec2) -> Vec2 {
    normalized * viewport_extents * 0.5
}

/// Fixed perspective camera for the lens scene.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LensCamera {
    fov_y: f32,
    distance: f32,
}

impl LensCamera {
    pub(crate) fn new() -> Self {
        Self {
            fov_y: CAMERA_FOV_DEG.to_radians(),
            distance: CAMERA_DISTANCE,
        }
    }

    pub(crate) fn view_proj(&self, aspect: f32) -> Mat4 {
        let projection = Mat4::perspective_rh(self.fov_y, aspect.max(1e-4), 0.1, 100.0);
        let view = Mat4::look_at_rh(
            Vec3::new(0.0, 0.0, self.distance),
            Vec3::ZERO,
            Vec3::Y,
        );
        projection * view
    }

    /// Width and height of the visible world plane at z = 0, the reference
    /// depth the lens travels in.
    pub(crate) fn viewport_extents(&self, aspect: f32) -> Vec2 {
        let height = 2.0 * self.distance * (self.fov_y * 0.5).tan();
        Vec2::new(height * aspect, height)
    }
}

/// Pointer-following transmissive lens over a portaled sub-scene.
///
/// Pass order each tick is fixed: portal (offscreen clear + sub-scene) →
/// background quad → lens mesh. Reordering shows one frame of stale portal
/// texture after a resize.
pub(crate) struct RefractionLens {
    settings: LensSettings,
    camera: LensCamera,
    position: Vec2,
    uniforms: LensUniforms,
    binding: UniformBinding,
    portal: FrameBufferTarget,
    texture_layout: wgpu::BindGroupLayout,
    portal_bind_group: wgpu::BindGroup,
    background_pipeline: wgpu::RenderPipeline,
    lens_pipeline: wgpu::RenderPipeline,
    mesh: GpuMesh,
}

impl RefractionLens {
    pub(crate) fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        settings: LensSettings,
        size: PhysicalSize<u32>,
    ) -> Result<Self> {
        settings.validate()?;

        // Mesh load failure is fatal to this effect instance; the host
        // drops the lens and keeps compositing the rest.
        let mesh_data = match &settings.mesh_path {
            Some(path) => LensMesh::from_gltf(path)?,
            None => LensMesh::cylinder(48),
        };
        let mesh = mesh_data.upload(device);

        let portal = FrameBufferTarget::new(
            device,
            "lens portal target",
            size,
            surface_format,
            wgpu::FilterMode::Linear,
        );

        let binding = create_uniform_binding::<LensUniforms>(device, "lens");
        let texture_layout = create_texture_layout(device, "portal texture layout");
        let portal_bind_group = create_texture_bind_group(
            device,
            &texture_layout,
            &portal.view,
            &portal.sampler,
            "portal texture",
        );

        let fullscreen_vertex = compile_fullscreen_vertex(device)?;
        let background_fragment =
            compile_fragment(device, "background fragment", BACKGROUND_FRAGMENT_GLSL)?;
        let background_pipeline = create_fullscreen_pipeline(
            device,
            "background pipeline",
            &fullscreen_vertex,
            &background_fragment,
            surface_format,
            &[&texture_layout],
        )?;

        let mesh_vertex = compile_mesh_vertex(device)?;
        let lens_fragment = compile_fragment(device, "lens fragment", LENS_FRAGMENT_GLSL)?;
        let lens_pipeline = create_mesh_pipeline(
            device,
            "lens pipeline",
            &mesh_vertex,
            &lens_fragment,
            MeshVertex::LAYOUT,
            surface_format,
            &[&binding.layout, &texture_layout],
        )?;

        let mut uniforms = LensUniforms::new(&settings, size);
        let aspect = aspect_of(size);
        uniforms.set_view_proj(LensCamera::new().view_proj(aspect));

        let mut lens = Self {
            settings,
            camera: LensCamera::new(),
            position: Vec2::ZERO,
            uniforms,
            binding,
            portal,
            texture_layout,
            portal_bind_group,
            background_pipeline,
            lens_pipeline,
            mesh,
        };
        lens.refresh_model();
        Ok(lens)
    }

    /// Damps the lens toward the pointer-derived target. With no pointer
    /// seen yet the lens rests wherever it is.
    pub(crate) fn update(&mut self, tick: &FrameTick, pointer_normalized: Option<Vec2>) {
        if let Some(ndc) = pointer_normalized {
            let extents = self.camera.viewport_extents(self.aspect());
            let target = pointer_target(ndc, extents);
            self.position = damp_toward(self.position, target, tick.delta, LENS_TIME_CONSTANT);
        }
        self.refresh_model();
    }

    /// Recreates the portal buffer at the new pixel dimensions and rebinds
    /// everything that referenced the old texture.
    pub(crate) fn resize(&mut self, device: &wgpu::Device, size: PhysicalSize<u32>) {
        if self.portal.matches(size) {
            return;
        }
        self.portal = FrameBufferTarget::new(
            device,
            "lens portal target",
            size,
            self.portal_format(),
            wgpu::FilterMode::Linear,
        );
        self.portal_bind_group = create_texture_bind_group(
            device,
            &self.texture_layout,
            &self.portal.view,
            &self.portal.sampler,
            "portal texture",
        );
        self.uniforms.set_resolution(size);
        self.uniforms
            .set_view_proj(self.camera.view_proj(aspect_of(size)));
    }

    /// View for rendering sub-scene content into the portal between the
    /// clear and the composite.
    pub(crate) fn portal_view(&self) -> &wgpu::TextureView {
        &self.portal.view
    }

    /// Pass 1: clear the portal buffer to the fixed sub-scene color. Content
    /// rendered into [`Self::portal_view`] afterwards lands on top.
    pub(crate) fn render_portal(&self, encoder: &mut wgpu::CommandEncoder) {
        // The pass drops immediately; ending it is what records the clear.
        let _clear_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("portal pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.portal.view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(PORTAL_CLEAR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });
    }

    /// Passes 2 and 3: background quad sampling the portal, then the lens
    /// mesh refracting it.
    pub(crate) fn render_composite(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
    ) {
        write_uniform(queue, &self.binding.buffer, &self.uniforms);
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lens composite pass"),
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

        pass.set_pipeline(&self.background_pipeline);
        pass.set_bind_group(0, &self.portal_bind_group, &[]);
        pass.draw(0..3, 0..1);

        pass.set_pipeline(&self.lens_pipeline);
        pass.set_bind_group(0, &self.binding.bind_group, &[]);
        pass.set_bind_group(1, &self.portal_bind_group, &[]);
        pass.set_vertex_buffer(0, self.mesh.vertex_buffer.slice(..));
        pass.set_index_buffer(self.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.mesh.index_count, 0, 0..1);
    }

    fn refresh_model(&mut self) {
        let model = Mat4::from_translation(Vec3::new(self.position.x, self.position.y, 0.0))
            * Mat4::from_rotation_x(std::f32::consts::FRAC_PI_2)
            * Mat4::from_scale(Vec3::splat(self.settings.scale));
        self.uniforms.set_model(model);
    }

    fn aspect(&self) -> f32 {
        aspect_of(self.portal.size())
    }

    fn portal_format(&self) -> wgpu::TextureFormat {
        self.portal.texture.format()
    }
}

fn aspect_of(size: PhysicalSize<u32>) -> f32 {
    size.width.max(1) as f32 / size.height.max(1) as f32
}

/// Full-viewport blit of the portal buffer behind the lens.
const BACKGROUND_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(set = 0, binding = 0) uniform texture2D t_portal;
layout(set = 0, binding = 1) uniform sampler s_portal;

void main() {
    out_color = texture(sampler2D(t_portal, s_portal), v_uv);
}
";

/// Transmissive lens material: the portal buffer is sampled at a
/// normal-driven offset scaled by (ior − 1)·thickness, skewed by the
/// anisotropy, with the red/blue taps spread for chromatic aberration and a
/// thin rim highlight where the surface turns away from the camera.
const LENS_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) in vec3 v_normal;
layout(location = 1) in vec4 v_clip;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform LensParams {
    mat4 model;
    mat4 view_proj;
    vec2 resolution;
    float ior;
    float thickness;
    float anisotropy;
    float chromatic_aberration;
    vec2 _pad;
} ubo;

layout(set = 1, binding = 0) uniform texture2D t_portal;
layout(set = 1, binding = 1) uniform sampler s_portal;

vec3 sample_portal(vec2 uv) {
    return texture(sampler2D(t_portal, s_portal), clamp(uv, 0.0, 1.0)).rgb;
}

void main() {
    vec3 n = normalize(v_normal);
    vec2 ndc = v_clip.xy / v_clip.w;
    vec2 screen_uv = vec2(ndc.x, -ndc.y) * 0.5 + 0.5;

    float bend = (ubo.ior - 1.0) * ubo.thickness * 0.04;
    vec2 offset = vec2(-n.x, n.y) * bend;
    offset.x *= 1.0 + ubo.anisotropy;

    float spread = ubo.chromatic_aberration * 0.25;
    float r = sample_portal(screen_uv + offset * (1.0 + spread)).r;
    float g = sample_portal(screen_uv + offset).g;
    float b = sample_portal(screen_uv + offset * (1.0 - spread)).b;

    float rim = pow(1.0 - clamp(abs(n.z), 0.0, 1.0), 3.0);
    vec3 rgb = mix(vec3(r, g, b), vec3(1.0), rim * 0.25);
    out_color = vec4(rgb, 1.0);
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damping_converges_within_five_time_constants() {
        let target = Vec2::new(3.0, -2.0);
        let mut position = Vec2::ZERO;
        let dt = 1.0 / 60.0;
        let steps = (5.0 * LENS_TIME_CONSTANT / dt).ceil() as usize;
        for _ in 0..steps {
            position = damp_toward(position, target, dt, LENS_TIME_CONSTANT);
        }
        let remaining = (target - position).length() / target.length();
        assert!(remaining < 0.01, "residual {remaining}");
    }

    #[test]
    fn damping_never_overshoots() {
        let target = Vec2::new(1.0, 0.0);
        let mut position = Vec2::ZERO;
        for _ in 0..1000 {
            let previous_gap = (target - position).x;
            position = damp_toward(position, target, 1.0 / 60.0, LENS_TIME_CONSTANT);
            let gap = (target - position).x;
            assert!(gap >= -1e-6, "overshot by {gap}");
            assert!(gap <= previous_gap + 1e-6, "distance grew");
        }
    }

    #[test]
    fn damp_factor_is_monotone_and_bounded() {
        let mut last = 0.0;
        for step in 0..20 {
            let dt = step as f32 * 0.05;
            let factor = damp_factor(dt, LENS_TIME_CONSTANT);
            assert!((0.0..=1.0).contains(&factor));
            assert!(factor >= last);
            last = factor;
        }
    }

    #[test]
    fn huge_delta_lands_on_target_without_oscillation() {
        let target = Vec2::new(5.0, 5.0);
        let position = damp_toward(Vec2::ZERO, target, 100.0, LENS_TIME_CONSTANT);
        assert!((target - position).length() < 1e-3);
    }

    #[test]
    fn per_tick_factor_matches_documented_range() {
        // At 60 Hz the exponential step should behave like the 0.1-0.15
        // lerp factor the source animation used.
        let factor = damp_factor(1.0 / 60.0, LENS_TIME_CONSTANT);
        assert!((0.1..=0.15).contains(&factor), "factor {factor}");
    }

    #[test]
    fn pointer_target_scales_to_half_extents() {
        let extents = Vec2::new(8.0, 6.0);
        assert_eq!(pointer_target(Vec2::new(1.0, 1.0), extents), Vec2::new(4.0, 3.0));
        assert_eq!(pointer_target(Vec2::new(-1.0, 0.5), extents), Vec2::new(-4.0, 1.5));
        assert_eq!(pointer_target(Vec2::ZERO, extents), Vec2::ZERO);
    }

    #[test]
    fn viewport_extents_follow_aspect() {
        let camera = LensCamera::new();
        let extents = camera.viewport_extents(2.0);
        assert!((extents.x / extents.y - 2.0).abs() < 1e-5);
        // height = 2 * 20 * tan(7.5 deg)
        let expected_height = 2.0 * 20.0 * (7.5_f32.to_radians()).tan();
        assert!((extents.y - expected_height).abs() < 1e-4);
    }

    #[test]
    fn view_projection_centers_the_origin() {
        let camera = LensCamera::new();
        let clip = camera.view_proj(16.0 / 9.0) * glam::Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    }

    #[test]
    fn viewport_edge_projects_to_clip_edge() {
        // A point at half the viewport extents must land on the NDC border,
        // which is what makes pointer_target track the cursor exactly.
        let camera = LensCamera::new();
        let aspect = 16.0 / 9.0;
        let extents = camera.viewport_extents(aspect);
        let clip = camera.view_proj(aspect)
            * glam::Vec4::new(extents.x * 0.5, extents.y * 0.5, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!((ndc.x - 1.0).abs() < 1e-4, "ndc.x {}", ndc.x);
        assert!((ndc.y - 1.0).abs() < 1e-4, "ndc.y {}", ndc.y);
    }
}
