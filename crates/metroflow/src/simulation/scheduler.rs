use std::time::Instant;

/// Live frames longer than this are simulated as this long.
pub const MAX_LIVE_DELTA_MS: f32 = 100.0;
/// Delta reported for the first live frame, before any elapsed time exists.
const FIRST_LIVE_DELTA_MS: f32 = 16.0;

pub const MIN_FPS: u32 = 10;
pub const MAX_FPS: u32 = 60;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_RECORDING_FRAMES: u32 = 90;

/// Paces simulation ticks. Implementations decide how much simulated time
/// passes per frame; the simulation itself is shared.
pub trait FrameScheduler {
    fn start(&mut self);

    /// Stop pacing. Further `next_delta` calls return `None` until restarted.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Milliseconds to simulate for the frame about to be drawn, or `None`
    /// if no tick should run this frame.
    fn next_delta(&mut self) -> Option<f32>;
}

/// Wall-clock pacing for the interactive window.
#[derive(Debug)]
pub struct LiveClock {
    last: Option<Instant>,
    running: bool,
}

impl Default for LiveClock {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveClock {
    pub fn new() -> Self {
        Self {
            last: None,
            running: true,
        }
    }

    /// Elapsed milliseconds since the previous frame at `now`, clamped to
    /// [`MAX_LIVE_DELTA_MS`].
    pub fn delta_at(&mut self, now: Instant) -> Option<f32> {
        if !self.running {
            return None;
        }
        let dt = match self.last {
            Some(last) => now.saturating_duration_since(last).as_secs_f32() * 1000.0,
            None => FIRST_LIVE_DELTA_MS,
        };
        self.last = Some(now);
        Some(dt.min(MAX_LIVE_DELTA_MS))
    }
}

impl FrameScheduler for LiveClock {
    fn start(&mut self) {
        self.running = true;
        self.last = None;
    }

    fn stop(&mut self) {
        self.running = false;
        self.last = None;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn next_delta(&mut self) -> Option<f32> {
        self.delta_at(Instant::now())
    }
}

/// Virtual timestep of exactly `1000 / fps` milliseconds, independent of how
/// fast frames are actually drawn.
#[derive(Debug, Clone)]
pub struct FixedStep {
    fps: u32,
    running: bool,
}

impl FixedStep {
    pub fn new(fps: u32) -> Self {
        Self {
            fps: fps.clamp(MIN_FPS, MAX_FPS),
            running: true,
        }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    pub fn step_ms(&self) -> f32 {
        1000.0 / self.fps as f32
    }
}

impl FrameScheduler for FixedStep {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn next_delta(&mut self) -> Option<f32> {
        self.running.then(|| self.step_ms())
    }
}

/// What the recorder should do after a frame was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureOutcome {
    /// More frames to go.
    Continue,
    /// That was the last frame; finalise now. Reported exactly once.
    Finished,
    /// No capture was outstanding, or the session is already finishing.
    Ignored,
}

/// Fixed-step pacing that waits for each frame to be captured before the
/// next tick and stops after a target frame count.
#[derive(Debug, Clone)]
pub struct Recording {
    step: FixedStep,
    target: u32,
    captured: u32,
    awaiting_capture: bool,
    finishing: bool,
}

impl Recording {
    pub fn new(fps: u32, target: u32) -> Self {
        Self {
            step: FixedStep::new(fps),
            target: target.max(1),
            captured: 0,
            awaiting_capture: false,
            finishing: false,
        }
    }

    pub fn fps(&self) -> u32 {
        self.step.fps()
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn captured(&self) -> u32 {
        self.captured
    }

    pub fn is_finishing(&self) -> bool {
        self.finishing
    }

    /// Whether a tick ran and its frame has not been captured yet.
    pub fn awaiting_capture(&self) -> bool {
        self.awaiting_capture
    }

    /// Completed share of the target, in whole percent.
    pub fn progress_percent(&self) -> u32 {
        ((self.captured as f32 / self.target as f32) * 100.0).round() as u32
    }

    /// Record that the outstanding frame was captured.
    pub fn frame_captured(&mut self) -> CaptureOutcome {
        if self.finishing || !self.awaiting_capture {
            return CaptureOutcome::Ignored;
        }
        self.awaiting_capture = false;
        self.captured += 1;
        if self.captured >= self.target {
            self.finishing = true;
            self.step.stop();
            CaptureOutcome::Finished
        } else {
            CaptureOutcome::Continue
        }
    }

    /// Abandon the session. Returns `true` only for the call that actually
    /// moved the session into finishing.
    pub fn abort(&mut self) -> bool {
        if self.finishing {
            return false;
        }
        self.finishing = true;
        self.awaiting_capture = false;
        self.step.stop();
        true
    }
}

impl FrameScheduler for Recording {
    fn start(&mut self) {
        if !self.finishing {
            self.step.start();
        }
    }

    fn stop(&mut self) {
        self.step.stop();
    }

    fn is_running(&self) -> bool {
        self.step.is_running() && !self.finishing
    }

    fn next_delta(&mut self) -> Option<f32> {
        if self.finishing || self.awaiting_capture {
            return None;
        }
        let dt = self.step.next_delta()?;
        self.awaiting_capture = true;
        Some(dt)
    }
}
