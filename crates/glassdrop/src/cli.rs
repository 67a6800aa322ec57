use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "glassdrop",
    author,
    version,
    about = "Procedural glass-and-wave background compositor",
    arg_required_else_help = false
)]
pub struct Cli {
    /// Effects TOML file; bundled defaults are used when omitted.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Window size in logical pixels (e.g. `1280x720`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_size)]
    pub size: Option<(u32, u32)>,

    /// Optional FPS cap; renders at display refresh when omitted.
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f32>,

    /// Disable the dithered wave chain.
    #[arg(long)]
    pub no_wave: bool,

    /// Disable the refraction lens chain.
    #[arg(long)]
    pub no_lens: bool,

    /// Freeze the wave animation at its initial phase.
    #[arg(long)]
    pub still: bool,

    /// Disable pointer interaction for every effect.
    #[arg(long)]
    pub no_pointer: bool,

    /// Quantization levels per channel (at least 2).
    #[arg(long, value_name = "N")]
    pub color_num: Option<u32>,

    /// Pixelation block edge in framebuffer pixels (at least 1).
    #[arg(long, value_name = "PX")]
    pub pixel_size: Option<u32>,

    /// glTF binary to use as the lens geometry.
    #[arg(long, value_name = "PATH")]
    pub mesh: Option<PathBuf>,

    /// Print the resolved effects configuration as TOML and exit.
    #[arg(long)]
    pub print_config: bool,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub(crate) fn parse_size(raw: &str) -> Result<(u32, u32), String> {
    let (width, height) = raw
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{raw}'"))?;
    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| format!("invalid width in '{raw}'"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| format!("invalid height in '{raw}'"))?;
    if width == 0 || height == 0 {
        return Err(format!("size must be non-zero, got '{raw}'"));
    }
    Ok((width, height))
}
