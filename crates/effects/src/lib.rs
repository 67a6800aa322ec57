//! Core rendering engine for glassdrop's procedural background effects.
//!
//! Two effect chains run behind the host's content, both driven by the same
//! per-frame tick:
//!
//! ```text
//!   host tick ──▶ Compositor::render
//!        │             │
//!        │             ├─▶ WaveFieldEffect ──▶ offscreen target
//!        │             ├─▶ DitherPostProcess ──▶ screen (or lens portal)
//!        │             └─▶ RefractionLens: portal ▶ background quad ▶ lens
//!        │
//!   pointer events ──▶ PointerTracker (read once per tick)
//!   resize events ───▶ debounced reallocation at floor(css × dpr)
//! ```
//!
//! Each effect is an owned-resource object: it holds its shader pipeline,
//! uniform block, and any offscreen target, updates them once per tick, and
//! releases everything synchronously on dispose. All mutation happens on the
//! host's single thread; pointer events only latch state for the next tick.

mod compile;
mod compositor;
mod dither;
mod gpu;
mod lens;
mod mesh;
mod pointer;
mod runtime;
mod types;
mod wave;
mod window;

pub use compositor::{physical_resolution, Compositor, EffectState};
pub use dither::{
    bayer_threshold, block_coord, block_uv, dither_rgba, quantize_channel, BAYER_8X8,
};
pub use lens::{damp_factor, damp_toward, pointer_target, LENS_TIME_CONSTANT};
pub use mesh::LensMesh;
pub use pointer::{CanvasRect, PointerTracker};
pub use runtime::{
    BoxedTimeSource, FixedTimeSource, FrameClock, FrameTick, SystemTimeSource, TimeSample,
    TimeSource, MAX_FRAME_DELTA,
};
pub use types::{DitherSettings, EngineConfig, LensSettings, SettingsError, WaveSettings};
pub use wave::{mouse_falloff, shade, wave_height};

use anyhow::Result;

/// Thin entry point that validates the configuration and runs the windowed
/// host until the window closes.
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    /// Prepares an engine with the provided configuration.
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Opens the window and drives the compositor at display refresh.
    pub fn run(&mut self) -> Result<()> {
        self.config.validate()?;
        window::run_windowed(self.config.clone())
    }
}
