use std::path::PathBuf;

/// Raised when an effect is constructed with an option outside its domain.
///
/// A `color_num` of 1 would divide by zero inside the dither shader; the
/// effect refuses to mount rather than render undefined values.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SettingsError {
    #[error("wave speed must be positive, got {0}")]
    WaveSpeed(f32),
    #[error("wave frequency must be positive, got {0}")]
    WaveFrequency(f32),
    #[error("wave amplitude must be non-negative, got {0}")]
    WaveAmplitude(f32),
    #[error("wave color channel {index} must lie in [0, 1], got {value}")]
    WaveColor { index: usize, value: f32 },
    #[error("mouse radius must be non-negative, got {0}")]
    MouseRadius(f32),
    #[error("color count must be at least 2, got {0}")]
    ColorNum(u32),
    #[error("pixel size must be at least 1, got {0}")]
    PixelSize(u32),
    #[error("lens option '{key}' must be positive, got {value}")]
    LensOption { key: &'static str, value: f32 },
}

/// Options for the animated wave color field.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSettings {
    /// Time multiplier applied to the elapsed-time accumulator.
    pub speed: f32,
    /// Spatial frequency of the wave pattern.
    pub frequency: f32,
    /// Height contribution of the wave; zero yields a flat half-intensity field.
    pub amplitude: f32,
    /// Base color, each channel in [0, 1].
    pub color: [f32; 3],
    /// Freezes the elapsed-time accumulator when set.
    pub disable_animation: bool,
    /// Enables pointer-proximity attenuation of the field.
    pub enable_mouse_interaction: bool,
    /// Attenuation radius in normalized screen units.
    pub mouse_radius: f32,
}

impl Default for WaveSettings {
    fn default() -> Self {
        Self {
            speed: 0.05,
            frequency: 3.0,
            amplitude: 0.3,
            color: [0.5, 0.5, 0.5],
            disable_animation: false,
            enable_mouse_interaction: true,
            mouse_radius: 0.3,
        }
    }
}

impl WaveSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !(self.speed.is_finite() && self.speed > 0.0) {
            return Err(SettingsError::WaveSpeed(self.speed));
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(SettingsError::WaveFrequency(self.frequency));
        }
        if !(self.amplitude.is_finite() && self.amplitude >= 0.0) {
            return Err(SettingsError::WaveAmplitude(self.amplitude));
        }
        for (index, value) in self.color.iter().copied().enumerate() {
            if !(value.is_finite() && (0.0..=1.0).contains(&value)) {
                return Err(SettingsError::WaveColor { index, value });
            }
        }
        if !(self.mouse_radius.is_finite() && self.mouse_radius >= 0.0) {
            return Err(SettingsError::MouseRadius(self.mouse_radius));
        }
        Ok(())
    }
}

/// Options for the ordered-dither quantization pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DitherSettings {
    /// Number of quantization levels per channel; at least 2.
    pub color_num: u32,
    /// Edge length of the pixelation blocks in framebuffer pixels.
    pub pixel_size: u32,
}

impl Default for DitherSettings {
    fn default() -> Self {
        Self {
            color_num: 4,
            pixel_size: 2,
        }
    }
}

impl DitherSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.color_num < 2 {
            return Err(SettingsError::ColorNum(self.color_num));
        }
        if self.pixel_size < 1 {
            return Err(SettingsError::PixelSize(self.pixel_size));
        }
        Ok(())
    }
}

/// Options for the pointer-following refraction lens.
#[derive(Debug, Clone, PartialEq)]
pub struct LensSettings {
    /// Index of refraction of the transmissive material.
    pub ior: f32,
    /// Material thickness driving the refraction offset.
    pub thickness: f32,
    /// Directional skew of the refraction offset.
    pub anisotropy: f32,
    /// Per-channel dispersion strength.
    pub chromatic_aberration: f32,
    /// Uniform scale applied to the lens geometry.
    pub scale: f32,
    /// Optional glTF binary supplying the lens geometry; the built-in
    /// cylinder profile is used when absent.
    pub mesh_path: Option<PathBuf>,
}

impl Default for LensSettings {
    fn default() -> Self {
        Self {
            ior: 1.15,
            thickness: 5.0,
            anisotropy: 0.01,
            chromatic_aberration: 0.1,
            scale: 0.25,
            mesh_path: None,
        }
    }
}

impl LensSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        for (key, value) in [
            ("ior", self.ior),
            ("thickness", self.thickness),
            ("anisotropy", self.anisotropy),
            ("chromaticAberration", self.chromatic_aberration),
            ("scale", self.scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SettingsError::LensOption { key, value });
            }
        }
        Ok(())
    }
}

/// Immutable configuration passed to the engine at start-up.
///
/// Disabling an effect removes its passes entirely; the remaining chain keeps
/// its internal order. With both chains enabled the dithered wave renders
/// into the lens portal buffer, so the lens refracts it.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Window or surface size in logical (CSS) pixels.
    pub surface_size: (u32, u32),
    /// Wave field plus dither chain; `None` disables both passes.
    pub wave: Option<(WaveSettings, DitherSettings)>,
    /// Refraction lens chain; `None` disables it.
    pub lens: Option<LensSettings>,
    /// Optional FPS cap; `None` renders at display refresh.
    pub target_fps: Option<f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            wave: Some((WaveSettings::default(), DitherSettings::default())),
            lens: Some(LensSettings::default()),
            target_fps: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if let Some((wave, dither)) = &self.wave {
            wave.validate()?;
            dither.validate()?;
        }
        if let Some(lens) = &self.lens {
            lens.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn color_num_below_two_is_rejected() {
        let settings = DitherSettings {
            color_num: 1,
            ..DitherSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::ColorNum(1)));
    }

    #[test]
    fn zero_pixel_size_is_rejected() {
        let settings = DitherSettings {
            pixel_size: 0,
            ..DitherSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::PixelSize(0)));
    }

    #[test]
    fn negative_amplitude_is_rejected() {
        let settings = WaveSettings {
            amplitude: -1.0,
            ..WaveSettings::default()
        };
        assert_eq!(settings.validate(), Err(SettingsError::WaveAmplitude(-1.0)));
    }

    #[test]
    fn non_finite_speed_is_rejected() {
        let settings = WaveSettings {
            speed: f32::NAN,
            ..WaveSettings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::WaveSpeed(_))
        ));
    }

    #[test]
    fn out_of_range_color_is_rejected() {
        let settings = WaveSettings {
            color: [0.0, 2.0, 0.0],
            ..WaveSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::WaveColor {
                index: 1,
                value: 2.0
            })
        );
    }

    #[test]
    fn zero_mouse_radius_is_allowed() {
        let settings = WaveSettings {
            mouse_radius: 0.0,
            ..WaveSettings::default()
        };
        settings.validate().expect("zero radius disables falloff");
    }

    #[test]
    fn non_positive_lens_options_are_rejected() {
        let settings = LensSettings {
            thickness: 0.0,
            ..LensSettings::default()
        };
        assert_eq!(
            settings.validate(),
            Err(SettingsError::LensOption {
                key: "thickness",
                value: 0.0
            })
        );
    }
}
