use glam::Vec2;

/// Bounding rectangle of the effect canvas in client (CSS) coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl CanvasRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// A zero-area or non-finite rect yields no usable pixel mapping.
    pub fn is_degenerate(&self) -> bool {
        !(self.width.is_finite() && self.height.is_finite())
            || self.width <= 0.0
            || self.height <= 0.0
    }
}

/// Converts raw client pointer coordinates into effect pixel space.
///
/// Events arrive asynchronously and only mutate the stored position; the
/// effects read it once per tick (last value wins). No smoothing happens
/// here; the lens applies its own damping downstream. Events are recorded
/// even while interaction is disabled so that re-enabling picks up the
/// current position immediately; consumers decide whether to look.
#[derive(Debug, Default)]
pub struct PointerTracker {
    position: Option<Vec2>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a pointer-move event.
    ///
    /// Degenerate canvas geometry or a non-positive pixel ratio is skipped
    /// entirely: the previous position stays current and no NaN can reach
    /// the uniforms.
    pub fn handle_pointer_moved(
        &mut self,
        client_x: f32,
        client_y: f32,
        rect: CanvasRect,
        device_pixel_ratio: f32,
    ) {
        if rect.is_degenerate() {
            return;
        }
        if !(device_pixel_ratio.is_finite() && device_pixel_ratio > 0.0) {
            return;
        }
        if !(client_x.is_finite() && client_y.is_finite()) {
            return;
        }
        let pixel = Vec2::new(
            (client_x - rect.left) * device_pixel_ratio,
            (client_y - rect.top) * device_pixel_ratio,
        );
        self.position = Some(pixel);
    }

    /// Latest pointer position in framebuffer pixels, if any event arrived.
    pub fn position(&self) -> Option<Vec2> {
        self.position
    }

    /// Pointer position mapped to [-1, 1] on both axes, y up, for the lens
    /// target derivation. Returns `None` until a pointer event arrives or
    /// when the resolution is degenerate.
    pub fn normalized(&self, resolution: (u32, u32)) -> Option<Vec2> {
        let position = self.position?;
        let (width, height) = resolution;
        if width == 0 || height == 0 {
            return None;
        }
        let ndc = Vec2::new(
            position.x / width as f32 * 2.0 - 1.0,
            1.0 - position.y / height as f32 * 2.0,
        );
        Some(ndc)
    }

    pub fn clear(&mut self) {
        self.position = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_client_coordinates_to_pixel_space() {
        let mut tracker = PointerTracker::new();
        tracker.handle_pointer_moved(110.0, 70.0, CanvasRect::new(10.0, 20.0, 400.0, 300.0), 2.0);
        let position = tracker.position().expect("position recorded");
        assert_eq!(position, Vec2::new(200.0, 100.0));
    }

    #[test]
    fn zero_area_rect_is_ignored() {
        let mut tracker = PointerTracker::new();
        tracker.handle_pointer_moved(50.0, 50.0, CanvasRect::new(0.0, 0.0, 0.0, 0.0), 1.0);
        assert!(tracker.position().is_none());
    }

    #[test]
    fn zero_area_rect_keeps_previous_position() {
        let mut tracker = PointerTracker::new();
        let rect = CanvasRect::new(0.0, 0.0, 100.0, 100.0);
        tracker.handle_pointer_moved(5.0, 5.0, rect, 1.0);
        tracker.handle_pointer_moved(50.0, 50.0, CanvasRect::new(0.0, 0.0, 100.0, 0.0), 1.0);
        assert_eq!(tracker.position(), Some(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn degenerate_input_never_produces_nan() {
        let mut tracker = PointerTracker::new();
        let rect = CanvasRect::new(0.0, 0.0, 100.0, 100.0);
        tracker.handle_pointer_moved(f32::NAN, 10.0, rect, 1.0);
        tracker.handle_pointer_moved(10.0, 10.0, rect, f32::NAN);
        tracker.handle_pointer_moved(10.0, 10.0, rect, 0.0);
        assert!(tracker.position().is_none());

        tracker.handle_pointer_moved(10.0, 10.0, rect, 1.0);
        let position = tracker.position().expect("valid event recorded");
        assert!(position.x.is_finite() && position.y.is_finite());
    }

    #[test]
    fn normalized_maps_center_to_origin() {
        let mut tracker = PointerTracker::new();
        let rect = CanvasRect::new(0.0, 0.0, 100.0, 100.0);
        tracker.handle_pointer_moved(50.0, 50.0, rect, 2.0);
        let ndc = tracker.normalized((200, 200)).expect("normalized");
        assert!(ndc.abs_diff_eq(Vec2::ZERO, 1e-6));
    }

    #[test]
    fn normalized_flips_y_axis() {
        let mut tracker = PointerTracker::new();
        let rect = CanvasRect::new(0.0, 0.0, 100.0, 100.0);
        tracker.handle_pointer_moved(0.0, 0.0, rect, 1.0);
        let ndc = tracker.normalized((100, 100)).expect("normalized");
        assert!(ndc.abs_diff_eq(Vec2::new(-1.0, 1.0), 1e-6));
    }

    #[test]
    fn normalized_rejects_zero_resolution() {
        let mut tracker = PointerTracker::new();
        let rect = CanvasRect::new(0.0, 0.0, 100.0, 100.0);
        tracker.handle_pointer_moved(10.0, 10.0, rect, 1.0);
        assert!(tracker.normalized((0, 100)).is_none());
    }

    #[test]
    fn last_event_wins() {
        let mut tracker = PointerTracker::new();
        let rect = CanvasRect::new(0.0, 0.0, 100.0, 100.0);
        tracker.handle_pointer_moved(1.0, 1.0, rect, 1.0);
        tracker.handle_pointer_moved(2.0, 2.0, rect, 1.0);
        tracker.handle_pointer_moved(3.0, 3.0, rect, 1.0);
        assert_eq!(tracker.position(), Some(Vec2::new(3.0, 3.0)));
    }
}
