//! GPU-facing plumbing shared by the effects: context ownership, offscreen
//! targets, uniform blocks, and pipeline construction helpers.

mod context;
mod pipeline;
mod target;
mod uniforms;

pub(crate) use context::GpuContext;
pub(crate) use pipeline::{
    create_fullscreen_pipeline, create_mesh_pipeline, create_texture_bind_group,
    create_texture_layout, create_uniform_binding, write_uniform, UniformBinding,
};
pub(crate) use target::FrameBufferTarget;
pub(crate) use uniforms::{DitherUniforms, LensUniforms, WaveUniforms};
