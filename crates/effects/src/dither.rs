use anyhow::Result;
use glam::Vec2;
use winit::dpi::PhysicalSize;

use crate::compile::{compile_fragment, compile_fullscreen_vertex};
use crate::gpu::{
    create_fullscreen_pipeline, create_texture_bind_group, create_texture_layout,
    create_uniform_binding, write_uniform, DitherUniforms, FrameBufferTarget, UniformBinding,
};
use crate::types::DitherSettings;

/// 8×8 Bayer threshold matrix, row-major, values in [0, 1).
///
/// Process-wide constant; the GPU copy is spliced into the fragment source
/// from this table so the shader and the CPU reference cannot diverge.
#[rustfmt::skip]
pub const BAYER_8X8: [f32; 64] = [
     0.0 / 64.0, 32.0 / 64.0,  8.0 / 64.0, 40.0 / 64.0,  2.0 / 64.0, 34.0 / 64.0, 10.0 / 64.0, 42.0 / 64.0,
    48.0 / 64.0, 16.0 / 64.0, 56.0 / 64.0, 24.0 / 64.0, 50.0 / 64.0, 18.0 / 64.0, 58.0 / 64.0, 26.0 / 64.0,
    12.0 / 64.0, 44.0 / 64.0,  4.0 / 64.0, 36.0 / 64.0, 14.0 / 64.0, 46.0 / 64.0,  6.0 / 64.0, 38.0 / 64.0,
    60.0 / 64.0, 28.0 / 64.0, 52.0 / 64.0, 20.0 / 64.0, 62.0 / 64.0, 30.0 / 64.0, 54.0 / 64.0, 22.0 / 64.0,
     3.0 / 64.0, 35.0 / 64.0, 11.0 / 64.0, 43.0 / 64.0,  1.0 / 64.0, 33.0 / 64.0,  9.0 / 64.0, 41.0 / 64.0,
    51.0 / 64.0, 19.0 / 64.0, 59.0 / 64.0, 27.0 / 64.0, 49.0 / 64.0, 17.0 / 64.0, 57.0 / 64.0, 25.0 / 64.0,
    15.0 / 64.0, 47.0 / 64.0,  7.0 / 64.0, 39.0 / 64.0, 13.0 / 64.0, 45.0 / 64.0,  5.0 / 64.0, 37.0 / 64.0,
    63.0 / 64.0, 31.0 / 64.0, 55.0 / 64.0, 23.0 / 64.0, 61.0 / 64.0, 29.0 / 64.0, 53.0 / 64.0, 21.0 / 64.0,
];

/// Signed dither threshold for a block coordinate. The −0.25 bias centers
/// the matrix's [0, 1) range roughly around zero.
pub fn bayer_threshold(x: u32, y: u32) -> f32 {
    BAYER_8X8[((y % 8) * 8 + (x % 8)) as usize] - 0.25
}

/// Block coordinate of a texture-space position: `floor(uv·R/P)`.
pub fn block_coord(uv: Vec2, resolution: Vec2, pixel_size: f32) -> (u32, u32) {
    let scaled = (uv * resolution / pixel_size).floor();
    (scaled.x.max(0.0) as u32, scaled.y.max(0.0) as u32)
}

/// Texture coordinate snapped to the top-left of its pixel block:
/// `floor(uv·R/P)·(P/R)`. Every position inside one block maps here, which
/// is what makes the pre-dither sample identical across the block.
pub fn block_uv(uv: Vec2, resolution: Vec2, pixel_size: f32) -> Vec2 {
    let normalized_pixel = Vec2::splat(pixel_size) / resolution;
    normalized_pixel * (uv / normalized_pixel).floor()
}

/// Quantizes one channel onto the `color_num`-level grid after applying a
/// signed threshold. Callers guarantee `color_num >= 2`.
pub fn quantize_channel(value: f32, color_num: u32, threshold: f32) -> f32 {
    let levels = (color_num - 1) as f32;
    let step = 1.0 / levels;
    let biased = (value + threshold * step).clamp(0.0, 1.0);
    (biased * levels + 0.5).floor() / levels
}

/// CPU reference for one dithered pixel, mirroring the fragment shader.
/// A zero-alpha sample (nothing rendered yet) becomes opaque black rather
/// than an undefined value.
pub fn dither_rgba(color: [f32; 4], block: (u32, u32), color_num: u32) -> [f32; 4] {
    if color[3] == 0.0 {
        return [0.0, 0.0, 0.0, 1.0];
    }
    let threshold = bayer_threshold(block.0, block.1);
    [
        quantize_channel(color[0], color_num, threshold),
        quantize_channel(color[1], color_num, threshold),
        quantize_channel(color[2], color_num, threshold),
        color[3],
    ]
}

/// Ordered-dither quantization pass over the wave field's target.
pub(crate) struct DitherPostProcess {
    uniforms: DitherUniforms,
    binding: UniformBinding,
    texture_layout: wgpu::BindGroupLayout,
    input_bind_group: wgpu::BindGroup,
    pipeline: wgpu::RenderPipeline,
}

impl DitherPostProcess {
    pub(crate) fn new(
        device: &wgpu::Device,
        output_format: wgpu::TextureFormat,
        settings: DitherSettings,
        input: &FrameBufferTarget,
        resolution: PhysicalSize<u32>,
    ) -> Result<Self> {
        settings.validate()?;

        let binding = create_uniform_binding::<DitherUniforms>(device, "dither");
        let texture_layout = create_texture_layout(device, "dither input layout");
        let input_bind_group = create_texture_bind_group(
            device,
            &texture_layout,
            &input.view,
            &input.sampler,
            "dither input",
        );

        let vertex = compile_fullscreen_vertex(device)?;
        let source = shader_source();
        let fragment = compile_fragment(device, "dither fragment", &source)?;
        let pipeline = create_fullscreen_pipeline(
            device,
            "dither pipeline",
            &vertex,
            &fragment,
            output_format,
            &[&binding.layout, &texture_layout],
        )?;

        Ok(Self {
            uniforms: DitherUniforms::new(&settings, resolution),
            binding,
            texture_layout,
            input_bind_group,
            pipeline,
        })
    }

    /// Points the pass at a freshly reallocated input target. Must run after
    /// every resize; the old bind group references a dead texture view.
    pub(crate) fn rebind_input(&mut self, device: &wgpu::Device, input: &FrameBufferTarget) {
        self.input_bind_group = create_texture_bind_group(
            device,
            &self.texture_layout,
            &input.view,
            &input.sampler,
            "dither input",
        );
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
            label: Some("dither pass"),
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
        pass.set_bind_group(1, &self.input_bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Builds the dither fragment source with the Bayer table spliced in from
/// [`BAYER_8X8`].
fn shader_source() -> String {
    let mut table = String::new();
    for (index, value) in BAYER_8X8.iter().enumerate() {
        if index > 0 {
            table.push_str(", ");
        }
        if index % 8 == 0 && index > 0 {
            table.push('\n');
            table.push_str("    ");
        }
        table.push_str(&format!("{value:.9}"));
    }

    format!(
        r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 out_color;

layout(std140, set = 0, binding = 0) uniform DitherParams {{
    vec2 resolution;
    float color_num;
    float pixel_size;
}} ubo;

layout(set = 1, binding = 0) uniform texture2D t_input;
layout(set = 1, binding = 1) uniform sampler s_input;

const float BAYER_8X8[64] = float[64](
    {table}
);

vec3 dither(vec2 scaled, vec3 color) {{
    int x = int(mod(scaled.x, 8.0));
    int y = int(mod(scaled.y, 8.0));
    float threshold = BAYER_8X8[y * 8 + x] - 0.25;
    float step_size = 1.0 / (ubo.color_num - 1.0);
    color = clamp(color + threshold * step_size, 0.0, 1.0);
    return floor(color * (ubo.color_num - 1.0) + 0.5) / (ubo.color_num - 1.0);
}}

void main() {{
    vec2 normalized_pixel = ubo.pixel_size / ubo.resolution;
    vec2 uv_pixel = normalized_pixel * floor(v_uv / normalized_pixel);
    vec4 input_color = texture(sampler2D(t_input, s_input), uv_pixel);

    if (input_color.a == 0.0) {{
        out_color = vec4(0.0, 0.0, 0.0, 1.0);
        return;
    }}

    vec2 scaled = floor(v_uv * ubo.resolution / ubo.pixel_size);
    out_color = vec4(dither(scaled, input_color.rgb), input_color.a);
}}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn on_grid(value: f32, color_num: u32) -> bool {
        let levels = (color_num - 1) as f32;
        let scaled = value * levels;
        (scaled - scaled.round()).abs() < 1e-5
    }

    #[test]
    fn bayer_matrix_values_lie_in_half_open_unit_interval() {
        for value in BAYER_8X8 {
            assert!((0.0..1.0).contains(&value), "value {value}");
        }
    }

    #[test]
    fn bayer_matrix_is_a_permutation_of_sixty_fourths() {
        let mut seen = [false; 64];
        for value in BAYER_8X8 {
            let index = (value * 64.0).round() as usize;
            assert!(!seen[index], "duplicate entry {index}/64");
            seen[index] = true;
        }
    }

    #[test]
    fn quantized_channels_land_exactly_on_the_grid() {
        for color_num in [2, 3, 4, 7, 16] {
            for step in 0..=100 {
                let value = step as f32 / 100.0;
                for (x, y) in [(0, 0), (3, 5), (7, 7), (11, 2)] {
                    let quantized = quantize_channel(value, color_num, bayer_threshold(x, y));
                    assert!(
                        on_grid(quantized, color_num),
                        "{quantized} off the {color_num}-level grid"
                    );
                    assert!((0.0..=1.0).contains(&quantized));
                }
            }
        }
    }

    #[test]
    fn dithering_is_deterministic() {
        let color = [0.31, 0.62, 0.93, 1.0];
        let a = dither_rgba(color, (5, 2), 4);
        let b = dither_rgba(color, (5, 2), 4);
        assert_eq!(a, b);
    }

    #[test]
    fn block_quantization_is_idempotent_within_a_block() {
        let resolution = Vec2::new(256.0, 256.0);
        let pixel_size = 4.0;
        // Two samples inside the same 4x4 block snap to the same coordinate.
        let a = block_uv(Vec2::new(0.500, 0.500), resolution, pixel_size);
        let b = block_uv(Vec2::new(0.507, 0.509), resolution, pixel_size);
        assert_eq!(a, b);
        // And the snapped coordinate is a fixed point of the mapping.
        assert_eq!(block_uv(a, resolution, pixel_size), a);
    }

    #[test]
    fn adjacent_blocks_get_distinct_coordinates() {
        let resolution = Vec2::new(64.0, 64.0);
        let a = block_uv(Vec2::new(0.01, 0.01), resolution, 2.0);
        let b = block_uv(Vec2::new(0.06, 0.01), resolution, 2.0);
        assert_ne!(a, b);
    }

    #[test]
    fn zero_alpha_input_becomes_opaque_black() {
        let out = dither_rgba([0.7, 0.2, 0.9, 0.0], (1, 1), 4);
        assert_eq!(out, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn uniform_gray_scenario_matches_the_formula() {
        // colorNum=4, pixelSize=2, resolution 8x8, input gray 0.5.
        let color_num = 4;
        let pixel_size = 2.0;
        let resolution = Vec2::new(8.0, 8.0);
        for ix in 0..8 {
            for iy in 0..8 {
                let uv = Vec2::new((ix as f32 + 0.5) / 8.0, (iy as f32 + 0.5) / 8.0);
                let block = block_coord(uv, resolution, pixel_size);
                let out = dither_rgba([0.5, 0.5, 0.5, 1.0], block, color_num);
                for channel in &out[..3] {
                    assert!(
                        on_grid(*channel, color_num),
                        "{channel} not in {{0, 1/3, 2/3, 1}}"
                    );
                }
                // Spot-check against the hand-evaluated formula.
                let threshold = bayer_threshold(block.0, block.1);
                let expected = ((0.5 + threshold / 3.0).clamp(0.0, 1.0) * 3.0 + 0.5).floor() / 3.0;
                assert_eq!(out[0], expected);
            }
        }
    }

    #[test]
    fn top_left_block_of_gray_rounds_down() {
        // BAYER[0] = 0 so threshold -0.25 pushes 0.5 to 0.4167 -> grid 1/3.
        let out = dither_rgba([0.5, 0.5, 0.5, 1.0], (0, 0), 4);
        assert!((out[0] - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn shader_source_embeds_the_full_matrix() {
        let source = shader_source();
        assert!(source.contains("const float BAYER_8X8[64]"));
        // 63/64 = 0.984375 only appears via the splice.
        assert!(source.contains("0.984375"));
        assert!(source.contains("floor(color * (ubo.color_num - 1.0) + 0.5)"));
    }
}
