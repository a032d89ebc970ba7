/// Time values handed to one animation frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    /// Seconds since the clock started.
    pub elapsed: f32,
    /// Seconds since the previous sample.
    pub delta: f32,
    pub frame_index: u64,
}

impl FrameSample {
    pub fn new(elapsed: f32, delta: f32, frame_index: u64) -> Self {
        Self {
            elapsed,
            delta,
            frame_index,
        }
    }
}

/// Source of frame times for the animator.
pub trait FrameClock: Send {
    fn reset(&mut self);
    fn sample(&mut self) -> FrameSample;
}

/// Advances by a constant step per sample; used for headless runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedStepClock {
    step: f32,
    frame: u64,
}

impl FixedStepClock {
    pub fn new(step: f32) -> Self {
        Self {
            step: step.max(0.0),
            frame: 0,
        }
    }

    pub fn from_fps(fps: f32) -> Self {
        Self::new(1.0 / fps.max(f32::EPSILON))
    }

    pub fn step(&self) -> f32 {
        self.step
    }
}

impl FrameClock for FixedStepClock {
    fn reset(&mut self) {
        self.frame = 0;
    }

    fn sample(&mut self) -> FrameSample {
        self.frame = self.frame.saturating_add(1);
        FrameSample::new(self.frame as f32 * self.step, self.step, self.frame - 1)
    }
}
