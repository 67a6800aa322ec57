use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2};
use winit::dpi::PhysicalSize;

use crate::types::{DitherSettings, LensSettings, WaveSettings};

/// Uniform block for the wave field pass.
///
/// Field order and padding must match the `WaveParams` block in the wave
/// fragment shader (std140 layout).
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct WaveUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub speed: f32,
    pub frequency: f32,
    pub amplitude: f32,
    pub mouse_radius: f32,
    pub enable_mouse: f32,
    pub color: [f32; 3],
    pub _pad0: f32,
    pub mouse: [f32; 2],
    pub _pad1: [f32; 2],
}

unsafe impl Zeroable for WaveUniforms {}
unsafe impl Pod for WaveUniforms {}

impl WaveUniforms {
    pub fn new(settings: &WaveSettings, size: PhysicalSize<u32>) -> Self {
        Self {
            resolution: [size.width as f32, size.height as f32],
            time: 0.0,
            speed: settings.speed,
            frequency: settings.frequency,
            amplitude: settings.amplitude,
            mouse_radius: settings.mouse_radius,
            enable_mouse: if settings.enable_mouse_interaction {
                1.0
            } else {
                0.0
            },
            color: settings.color,
            _pad0: 0.0,
            mouse: [0.0, 0.0],
            _pad1: [0.0, 0.0],
        }
    }

    pub fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.resolution = [size.width as f32, size.height as f32];
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds;
    }

    pub fn set_mouse(&mut self, position: Vec2) {
        self.mouse = [position.x, position.y];
    }
}

/// Uniform block for the ordered-dither pass; matches `DitherParams`.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct DitherUniforms {
    pub resolution: [f32; 2],
    pub color_num: f32,
    pub pixel_size: f32,
}

unsafe impl Zeroable for DitherUniforms {}
unsafe impl Pod for DitherUniforms {}

impl DitherUniforms {
    pub fn new(settings: &DitherSettings, size: PhysicalSize<u32>) -> Self {
        Self {
            resolution: [size.width as f32, size.height as f32],
            color_num: settings.color_num as f32,
            pixel_size: settings.pixel_size as f32,
        }
    }

    pub fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.resolution = [size.width as f32, size.height as f32];
    }
}

/// Uniform block for the lens mesh pass; matches `LensParams` in both the
/// mesh vertex shader and the transmissive fragment shader.
#[repr(C, align(16))]
#[derive(Clone, Copy)]
pub(crate) struct LensUniforms {
    pub model: [[f32; 4]; 4],
    pub view_proj: [[f32; 4]; 4],
    pub resolution: [f32; 2],
    pub ior: f32,
    pub thickness: f32,
    pub anisotropy: f32,
    pub chromatic_aberration: f32,
    pub _pad: [f32; 2],
}

unsafe impl Zeroable for LensUniforms {}
unsafe impl Pod for LensUniforms {}

impl LensUniforms {
    pub fn new(settings: &LensSettings, size: PhysicalSize<u32>) -> Self {
        Self {
            model: Mat4::IDENTITY.to_cols_array_2d(),
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            resolution: [size.width as f32, size.height as f32],
            ior: settings.ior,
            thickness: settings.thickness,
            anisotropy: settings.anisotropy,
            chromatic_aberration: settings.chromatic_aberration,
            _pad: [0.0, 0.0],
        }
    }

    pub fn set_resolution(&mut self, size: PhysicalSize<u32>) {
        self.resolution = [size.width as f32, size.height as f32];
    }

    pub fn set_model(&mut self, model: Mat4) {
        self.model = model.to_cols_array_2d();
    }

    pub fn set_view_proj(&mut self, view_proj: Mat4) {
        self.view_proj = view_proj.to_cols_array_2d();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // std140 blocks round up to 16-byte multiples; a mismatch here means the
    // GLSL block and the Rust struct disagree and every field after the
    // mismatch reads garbage on the GPU.

    #[test]
    fn wave_uniforms_match_std140_size() {
        assert_eq!(std::mem::size_of::<WaveUniforms>(), 64);
        assert_eq!(std::mem::align_of::<WaveUniforms>(), 16);
    }

    #[test]
    fn dither_uniforms_match_std140_size() {
        assert_eq!(std::mem::size_of::<DitherUniforms>(), 16);
        assert_eq!(std::mem::align_of::<DitherUniforms>(), 16);
    }

    #[test]
    fn lens_uniforms_match_std140_size() {
        assert_eq!(std::mem::size_of::<LensUniforms>(), 160);
        assert_eq!(std::mem::align_of::<LensUniforms>(), 16);
    }

    #[test]
    fn wave_uniforms_capture_settings() {
        let settings = WaveSettings {
            enable_mouse_interaction: false,
            ..WaveSettings::default()
        };
        let uniforms = WaveUniforms::new(&settings, PhysicalSize::new(640, 480));
        assert_eq!(uniforms.resolution, [640.0, 480.0]);
        assert_eq!(uniforms.enable_mouse, 0.0);
        assert_eq!(uniforms.color, settings.color);
    }
}
