use effectconfig::EffectsConfig;

/// Bundled effects preset, installed as a starting point for user configs.
/// Matches the built-in [`EffectsConfig`] defaults key for key.
pub const DEFAULT_CONFIG_TOML: &str = r#"# glassdrop default effects

[wave]
waveSpeed = 0.05
waveFrequency = 3.0
waveAmplitude = 0.3
waveColor = [0.5, 0.5, 0.5]
disableAnimation = false
enableMouseInteraction = true
mouseRadius = 0.3

[dither]
colorNum = 4
pixelSize = 2

[lens]
ior = 1.15
thickness = 5.0
anisotropy = 0.01
chromaticAberration = 0.1
scale = 0.25
"#;

/// Parses the bundled preset. Safe to unwrap at startup: the preset is
/// covered by tests, so a parse failure is a build defect, not user input.
pub fn bundled_config() -> EffectsConfig {
    EffectsConfig::from_toml_str(DEFAULT_CONFIG_TOML).expect("bundled default config is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_preset_parses_and_validates() {
        let config = bundled_config();
        assert_eq!(config.dither.color_num, 4);
        assert_eq!(config.dither.pixel_size, 2);
    }

    #[test]
    fn bundled_preset_matches_builtin_defaults() {
        let bundled = bundled_config();
        let builtin = EffectsConfig::default();
        assert_eq!(bundled.wave, builtin.wave);
        assert_eq!(bundled.dither, builtin.dither);
        assert_eq!(bundled.lens, builtin.lens);
    }
}
