use std::fs;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use effectconfig::EffectsConfig;
use effects::{DitherSettings, Engine, EngineConfig, LensSettings, WaveSettings};

use crate::cli::Cli;
use crate::defaults;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let file_config = load_config(&cli)?;

    if cli.print_config {
        let rendered =
            toml::to_string_pretty(&file_config).context("failed to render configuration")?;
        print!("{rendered}");
        return Ok(());
    }

    let engine_config = build_engine_config(&cli, &file_config);
    tracing::info!(
        size = ?engine_config.surface_size,
        wave = engine_config.wave.is_some(),
        lens = engine_config.lens.is_some(),
        "starting glassdrop"
    );
    Engine::new(engine_config).run()
}

fn load_config(cli: &Cli) -> Result<EffectsConfig> {
    match &cli.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config at {}", path.display()))?;
            let config = EffectsConfig::from_toml_str(&raw)
                .with_context(|| format!("invalid config at {}", path.display()))?;
            Ok(config)
        }
        None => Ok(defaults::bundled_config()),
    }
}

/// Folds CLI overrides into the file configuration. CLI flags win; domains
/// are re-checked by the effects at construction time.
pub(crate) fn build_engine_config(cli: &Cli, file: &EffectsConfig) -> EngineConfig {
    let defaults = EngineConfig::default();

    let wave = if cli.no_wave {
        None
    } else {
        let section = &file.wave;
        let wave = WaveSettings {
            speed: section.wave_speed,
            frequency: section.wave_frequency,
            amplitude: section.wave_amplitude,
            color: section.wave_color,
            disable_animation: section.disable_animation || cli.still,
            enable_mouse_interaction: section.enable_mouse_interaction && !cli.no_pointer,
            mouse_radius: section.mouse_radius,
        };
        let dither = DitherSettings {
            color_num: cli.color_num.unwrap_or(file.dither.color_num),
            pixel_size: cli.pixel_size.unwrap_or(file.dither.pixel_size),
        };
        Some((wave, dither))
    };

    let lens = if cli.no_lens {
        None
    } else {
        let section = &file.lens;
        Some(LensSettings {
            ior: section.ior,
            thickness: section.thickness,
            anisotropy: section.anisotropy,
            chromatic_aberration: section.chromatic_aberration,
            scale: section.scale,
            mesh_path: cli.mesh.clone().or_else(|| section.mesh_path.clone()),
        })
    };

    EngineConfig {
        surface_size: cli.size.unwrap_or(defaults.surface_size),
        wave,
        lens,
        target_fps: cli.fps.filter(|fps| *fps > 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("glassdrop").chain(args.iter().copied()))
            .expect("arguments parse")
    }

    #[test]
    fn defaults_enable_both_chains() {
        let config = build_engine_config(&cli(&[]), &EffectsConfig::default());
        assert!(config.wave.is_some());
        assert!(config.lens.is_some());
        assert_eq!(config.surface_size, (1280, 720));
        config.validate().expect("valid");
    }

    #[test]
    fn chain_flags_disable_effects() {
        let config = build_engine_config(&cli(&["--no-wave"]), &EffectsConfig::default());
        assert!(config.wave.is_none());
        assert!(config.lens.is_some());

        let config = build_engine_config(&cli(&["--no-lens"]), &EffectsConfig::default());
        assert!(config.wave.is_some());
        assert!(config.lens.is_none());
    }

    #[test]
    fn cli_overrides_win_over_file_values() {
        let file = EffectsConfig::default();
        let config = build_engine_config(
            &cli(&["--color-num", "8", "--pixel-size", "4", "--size", "640x480"]),
            &file,
        );
        let (_, dither) = config.wave.expect("wave enabled");
        assert_eq!(dither.color_num, 8);
        assert_eq!(dither.pixel_size, 4);
        assert_eq!(config.surface_size, (640, 480));
    }

    #[test]
    fn still_flag_freezes_animation() {
        let config = build_engine_config(&cli(&["--still"]), &EffectsConfig::default());
        let (wave, _) = config.wave.expect("wave enabled");
        assert!(wave.disable_animation);
    }

    #[test]
    fn no_pointer_disables_interaction() {
        let config = build_engine_config(&cli(&["--no-pointer"]), &EffectsConfig::default());
        let (wave, _) = config.wave.expect("wave enabled");
        assert!(!wave.enable_mouse_interaction);
    }

    #[test]
    fn mesh_flag_overrides_config_path() {
        let mut file = EffectsConfig::default();
        file.lens.mesh_path = Some("from-file.glb".into());
        let config = build_engine_config(&cli(&["--mesh", "from-cli.glb"]), &file);
        let lens = config.lens.expect("lens enabled");
        assert_eq!(
            lens.mesh_path.as_deref(),
            Some(std::path::Path::new("from-cli.glb"))
        );
    }

    #[test]
    fn non_positive_fps_cap_is_dropped() {
        let config = build_engine_config(&cli(&["--fps", "0"]), &EffectsConfig::default());
        assert!(config.target_fps.is_none());
    }
}
