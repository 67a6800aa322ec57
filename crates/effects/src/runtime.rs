use std::time::Instant;

/// Largest per-tick delta fed to the effects. A host stall (window drag,
/// suspend) otherwise produces one giant step that teleports the lens and
/// jumps the wave phase.
pub const MAX_FRAME_DELTA: f32 = 0.25;

/// Snapshot of the time state supplied to the effect uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    /// Creates a new time sample.
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource: Send {
    /// Resets the source to its initial state.
    fn reset(&mut self);
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the system monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    frame: u64,
}

impl SystemTimeSource {
    /// Creates a system time source initialised to `Instant::now()`.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
            frame: 0,
        }
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        self.origin = Instant::now();
        self.frame = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let elapsed = self.origin.elapsed();
        let sample = TimeSample::new(elapsed.as_secs_f32(), self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Time source that always reports a fixed timestamp. Used by tests and by
/// hosts that want a single deterministic frame.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
}

impl FixedTimeSource {
    /// Constructs a fixed time source that always returns the provided time.
    pub fn new(time: f32) -> Self {
        Self { time }
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample::new(self.time, 0)
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource + Send>;

/// Per-tick time values handed to each effect's `update`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    /// Elapsed time reported by the source, in seconds.
    pub seconds: f32,
    /// Time advanced since the previous tick, clamped to [`MAX_FRAME_DELTA`].
    pub delta: f32,
    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Derives per-tick deltas from a stream of [`TimeSample`]s.
///
/// The first tick after construction (or [`FrameClock::reset`]) reports a
/// zero delta; a sample that runs backwards also clamps to zero rather than
/// feeding a negative delta into the damping math.
#[derive(Debug, Default)]
pub struct FrameClock {
    last_seconds: Option<f32>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.last_seconds = None;
    }

    pub fn tick(&mut self, sample: TimeSample) -> FrameTick {
        let delta = match self.last_seconds {
            Some(previous) => (sample.seconds - previous).clamp(0.0, MAX_FRAME_DELTA),
            None => 0.0,
        };
        self.last_seconds = Some(sample.seconds);
        FrameTick {
            seconds: sample.seconds,
            delta,
            frame_index: sample.frame_index,
        }
    }
}
