//! TOML configuration surface for the glassdrop effects.
//!
//! The file format mirrors the option names recognized by the effects
//! (`waveSpeed`, `colorNum`, `chromaticAberration`, ...) so existing presets
//! translate key-for-key. Parsing and domain validation both live here; the
//! effects crate re-validates at construction time, so a config that passes
//! [`EffectsConfig::validate`] is guaranteed to mount.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Root of an effects TOML file. Every section is optional; omitted sections
/// fall back to the bundled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EffectsConfig {
    #[serde(default)]
    pub wave: WaveSection,
    #[serde(default)]
    pub dither: DitherSection,
    #[serde(default)]
    pub lens: LensSection,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct WaveSection {
    #[serde(default = "default_wave_speed")]
    pub wave_speed: f32,
    #[serde(default = "default_wave_frequency")]
    pub wave_frequency: f32,
    #[serde(default = "default_wave_amplitude")]
    pub wave_amplitude: f32,
    #[serde(default = "default_wave_color")]
    pub wave_color: [f32; 3],
    #[serde(default)]
    pub disable_animation: bool,
    #[serde(default = "default_true")]
    pub enable_mouse_interaction: bool,
    #[serde(default = "default_mouse_radius")]
    pub mouse_radius: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DitherSection {
    #[serde(default = "default_color_num")]
    pub color_num: u32,
    #[serde(default = "default_pixel_size")]
    pub pixel_size: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LensSection {
    #[serde(default = "default_ior")]
    pub ior: f32,
    #[serde(default = "default_thickness")]
    pub thickness: f32,
    #[serde(default = "default_anisotropy")]
    pub anisotropy: f32,
    #[serde(default = "default_chromatic_aberration")]
    pub chromatic_aberration: f32,
    #[serde(default = "default_lens_scale")]
    pub scale: f32,
    /// Optional glTF binary providing the lens geometry. When absent the
    /// built-in lathed cylinder is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mesh_path: Option<PathBuf>,
}

impl Default for WaveSection {
    fn default() -> Self {
        Self {
            wave_speed: default_wave_speed(),
            wave_frequency: default_wave_frequency(),
            wave_amplitude: default_wave_amplitude(),
            wave_color: default_wave_color(),
            disable_animation: false,
            enable_mouse_interaction: true,
            mouse_radius: default_mouse_radius(),
        }
    }
}

impl Default for DitherSection {
    fn default() -> Self {
        Self {
            color_num: default_color_num(),
            pixel_size: default_pixel_size(),
        }
    }
}

impl Default for LensSection {
    fn default() -> Self {
        Self {
            ior: default_ior(),
            thickness: default_thickness(),
            anisotropy: default_anisotropy(),
            chromatic_aberration: default_chromatic_aberration(),
            scale: default_lens_scale(),
            mesh_path: None,
        }
    }
}

impl EffectsConfig {
    /// Parses and validates an effects TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: EffectsConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects every option outside its documented domain. Errors name the
    /// offending key the way it appears in the file.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let wave = &self.wave;
        if !(wave.wave_speed.is_finite() && wave.wave_speed > 0.0) {
            return Err(invalid(format!(
                "waveSpeed must be a positive number, got {}",
                wave.wave_speed
            )));
        }
        if !(wave.wave_frequency.is_finite() && wave.wave_frequency > 0.0) {
            return Err(invalid(format!(
                "waveFrequency must be a positive number, got {}",
                wave.wave_frequency
            )));
        }
        if !(wave.wave_amplitude.is_finite() && wave.wave_amplitude >= 0.0) {
            return Err(invalid(format!(
                "waveAmplitude must be non-negative, got {}",
                wave.wave_amplitude
            )));
        }
        for (index, channel) in wave.wave_color.iter().enumerate() {
            if !(channel.is_finite() && (0.0..=1.0).contains(channel)) {
                return Err(invalid(format!(
                    "waveColor[{index}] must lie in [0, 1], got {channel}"
                )));
            }
        }
        if !(wave.mouse_radius.is_finite() && wave.mouse_radius >= 0.0) {
            return Err(invalid(format!(
                "mouseRadius must be non-negative, got {}",
                wave.mouse_radius
            )));
        }

        if self.dither.color_num < 2 {
            return Err(invalid(format!(
                "colorNum must be at least 2, got {}",
                self.dither.color_num
            )));
        }
        if self.dither.pixel_size < 1 {
            return Err(invalid(format!(
                "pixelSize must be at least 1, got {}",
                self.dither.pixel_size
            )));
        }

        let lens = &self.lens;
        for (key, value) in [
            ("ior", lens.ior),
            ("thickness", lens.thickness),
            ("anisotropy", lens.anisotropy),
            ("chromaticAberration", lens.chromatic_aberration),
            ("scale", lens.scale),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(format!(
                    "{key} must be a positive number, got {value}"
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Invalid(message)
}

fn default_true() -> bool {
    true
}

fn default_wave_speed() -> f32 {
    0.05
}

fn default_wave_frequency() -> f32 {
    3.0
}

fn default_wave_amplitude() -> f32 {
    0.3
}

fn default_wave_color() -> [f32; 3] {
    [0.5, 0.5, 0.5]
}

fn default_mouse_radius() -> f32 {
    0.3
}

fn default_color_num() -> u32 {
    4
}

fn default_pixel_size() -> u32 {
    2
}

fn default_ior() -> f32 {
    1.15
}

fn default_thickness() -> f32 {
    5.0
}

fn default_anisotropy() -> f32 {
    0.01
}

fn default_chromatic_aberration() -> f32 {
    0.1
}

fn default_lens_scale() -> f32 {
    0.25
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[wave]
waveSpeed = 0.08
waveFrequency = 2.5
waveAmplitude = 0.4
waveColor = [0.2, 0.4, 0.8]
disableAnimation = false
enableMouseInteraction = true
mouseRadius = 0.2

[dither]
colorNum = 6
pixelSize = 3

[lens]
ior = 1.2
thickness = 4.0
anisotropy = 0.02
chromaticAberration = 0.15
meshPath = "assets/lens.glb"
"#;

    #[test]
    fn parses_sample_config() {
        let config = EffectsConfig::from_toml_str(SAMPLE).expect("sample parses");
        assert!((config.wave.wave_speed - 0.08).abs() < f32::EPSILON);
        assert_eq!(config.wave.wave_color, [0.2, 0.4, 0.8]);
        assert!((config.wave.mouse_radius - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.dither.color_num, 6);
        assert_eq!(config.dither.pixel_size, 3);
        assert!((config.lens.ior - 1.2).abs() < f32::EPSILON);
        assert_eq!(
            config.lens.mesh_path.as_deref(),
            Some(std::path::Path::new("assets/lens.glb"))
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = EffectsConfig::from_toml_str("").expect("empty document parses");
        assert_eq!(config.dither.color_num, 4);
        assert_eq!(config.dither.pixel_size, 2);
        assert!((config.lens.ior - 1.15).abs() < f32::EPSILON);
        assert!(config.lens.mesh_path.is_none());
        assert!(config.wave.enable_mouse_interaction);
    }

    #[test]
    fn rejects_color_num_below_two() {
        let raw = "[dither]\ncolorNum = 1\n";
        let err = EffectsConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("colorNum")));
    }

    #[test]
    fn rejects_zero_pixel_size() {
        let raw = "[dither]\npixelSize = 0\n";
        let err = EffectsConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("pixelSize")));
    }

    #[test]
    fn rejects_negative_amplitude() {
        let raw = "[wave]\nwaveAmplitude = -0.1\n";
        let err = EffectsConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("waveAmplitude")));
    }

    #[test]
    fn rejects_out_of_range_color_channel() {
        let raw = "[wave]\nwaveColor = [0.5, 1.5, 0.5]\n";
        let err = EffectsConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("waveColor[1]")));
    }

    #[test]
    fn rejects_non_positive_ior() {
        let raw = "[lens]\nior = 0.0\n";
        let err = EffectsConfig::from_toml_str(raw).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(message) if message.contains("ior")));
    }

    #[test]
    fn rejects_unknown_keys() {
        let raw = "[wave]\nwaveSpedd = 0.1\n";
        assert!(matches!(
            EffectsConfig::from_toml_str(raw),
            Err(ConfigError::Parse(_))
        ));
    }
}
