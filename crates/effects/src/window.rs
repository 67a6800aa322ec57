use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use tracing::{error, warn};
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::compositor::Compositor;
use crate::pointer::CanvasRect;
use crate::runtime::{SystemTimeSource, TimeSource};
use crate::types::EngineConfig;

/// Decides when the next redraw may happen under an optional FPS cap.
struct FramePacer {
    interval: Option<Duration>,
    next_deadline: Option<Instant>,
}

impl FramePacer {
    fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_secs_f32(1.0 / fps));
        Self {
            interval,
            next_deadline: None,
        }
    }

    fn ready(&self, now: Instant) -> bool {
        match (self.interval, self.next_deadline) {
            (None, _) | (_, None) => true,
            (Some(_), Some(deadline)) => now >= deadline,
        }
    }

    fn mark_rendered(&mut self, now: Instant) {
        if let Some(interval) = self.interval {
            self.next_deadline = Some(now + interval);
        }
    }

    fn deadline(&self) -> Option<Instant> {
        self.next_deadline
    }
}

/// Runs the compositor inside a desktop window until it is closed.
///
/// The event loop is the host tick of the effects: `CursorMoved` feeds the
/// pointer tracker, `Resized` feeds the debounced reallocation, and
/// `RedrawRequested` drives one render each.
pub(crate) fn run_windowed(config: EngineConfig) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;
    let (width, height) = config.surface_size;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title("glassdrop")
            .with_inner_size(LogicalSize::new(width, height))
            .build(&event_loop)
            .context("failed to create window")?,
    );

    let mut compositor = Compositor::new(window.as_ref(), window.inner_size(), &config)?;
    let mut time_source = SystemTimeSource::new();
    let mut pacer = FramePacer::new(config.target_fps);

    let loop_window = window.clone();
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == loop_window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                compositor.dispose();
                elwt.exit();
            }
            WindowEvent::CursorMoved { position, .. } => {
                let scale = loop_window.scale_factor();
                let logical = position.to_logical::<f64>(scale);
                let inner = loop_window.inner_size().to_logical::<f64>(scale);
                compositor.handle_pointer_moved(
                    logical.x as f32,
                    logical.y as f32,
                    CanvasRect::new(0.0, 0.0, inner.width as f32, inner.height as f32),
                    scale as f32,
                );
            }
            WindowEvent::Resized(new_size) => {
                compositor.request_resize(new_size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                compositor.request_resize(loop_window.inner_size());
            }
            WindowEvent::RedrawRequested => {
                match compositor.render(time_source.sample()) {
                    Ok(()) => pacer.mark_rendered(Instant::now()),
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        compositor.reconfigure_surface();
                    }
                    Err(wgpu::SurfaceError::Timeout) => {
                        // This frame is superseded; the next tick renders.
                        warn!("surface frame acquisition timed out");
                    }
                    Err(error) => {
                        error!(%error, "fatal surface error; shutting down");
                        compositor.dispose();
                        elwt.exit();
                    }
                }
            }
            _ => {}
        },
        Event::AboutToWait => {
            let now = Instant::now();
            if pacer.ready(now) {
                loop_window.request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = pacer.deadline() {
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncapped_pacer_is_always_ready() {
        let mut pacer = FramePacer::new(None);
        let now = Instant::now();
        assert!(pacer.ready(now));
        pacer.mark_rendered(now);
        assert!(pacer.ready(now));
    }

    #[test]
    fn capped_pacer_waits_out_the_interval() {
        let mut pacer = FramePacer::new(Some(10.0));
        let now = Instant::now();
        assert!(pacer.ready(now), "first frame renders immediately");
        pacer.mark_rendered(now);
        assert!(!pacer.ready(now + Duration::from_millis(50)));
        assert!(pacer.ready(now + Duration::from_millis(100)));
    }

    #[test]
    fn nonsense_fps_caps_are_ignored() {
        let pacer = FramePacer::new(Some(0.0));
        assert!(pacer.interval.is_none());
        let pacer = FramePacer::new(Some(f32::NAN));
        assert!(pacer.interval.is_none());
    }
}
