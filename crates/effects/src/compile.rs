use std::borrow::Cow;

use anyhow::Result;
use wgpu::naga::ShaderStage;

/// Compiles the static full-screen triangle vertex shader shared by the
/// wave, dither, and background passes.
pub(crate) fn compile_fullscreen_vertex(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("fullscreen triangle vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(FULLSCREEN_VERTEX_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Compiles the lens mesh vertex shader. The uniform block layout must match
/// `LensUniforms` in `gpu/uniforms.rs`.
pub(crate) fn compile_mesh_vertex(device: &wgpu::Device) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("lens mesh vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(MESH_VERTEX_GLSL),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    }))
}

/// Hands an effect fragment shader to naga's GLSL frontend.
pub(crate) fn compile_fragment(
    device: &wgpu::Device,
    label: &str,
    source: &str,
) -> Result<wgpu::ShaderModule> {
    Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Owned(source.to_owned()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    }))
}

/// Minimal full-screen triangle vertex shader. `v_uv` spans [0, 1] with a
/// top-left origin so it coincides with texture space and with pointer
/// pixels divided by resolution; render-to-texture round trips therefore
/// need no flip. The triangle overshoots the corners so no quad seam exists.
const FULLSCREEN_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) out vec2 v_uv;

const vec2 positions[3] = vec2[3](
    vec2(-1.0, -3.0),
    vec2(3.0, 1.0),
    vec2(-1.0, 1.0)
);

void main() {
    uint vertex_index = uint(gl_VertexIndex);
    vec2 pos = positions[vertex_index];
    v_uv = vec2(pos.x, -pos.y) * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(pos, 0.0, 1.0);
}
";

/// Lens geometry vertex shader: model transform for the damped lens
/// placement, then the shared camera projection. Clip position is forwarded
/// so the fragment stage can derive the screen-space portal sample.
const MESH_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec3 position;
layout(location = 1) in vec3 normal;

layout(location = 0) out vec3 v_normal;
layout(location = 1) out vec4 v_clip;

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

void main() {
    vec4 world = ubo.model * vec4(position, 1.0);
    v_normal = normalize(mat3(ubo.model) * normal);
    gl_Position = ubo.view_proj * world;
    v_clip = gl_Position;
}
";
