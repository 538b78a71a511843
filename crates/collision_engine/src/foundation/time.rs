//! Time management utilities

use std::time::Instant;

/// Fixed-timestep accumulator with a hard cap on sub-steps per frame
///
/// Frame time is added with [`FixedTimestep::accumulate`]; [`FixedTimestep::next_step`]
/// then hands out whole steps while enough time is banked and the per-frame cap
/// has not been reached. Time left over when the cap is hit stays in the
/// accumulator for the next frame.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    max_steps: u32,
    accumulator: f32,
    steps_this_frame: u32,
}

impl FixedTimestep {
    /// Create an accumulator for the given step length and per-frame cap
    pub fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step,
            max_steps,
            accumulator: 0.0,
            steps_this_frame: 0,
        }
    }

    /// Add frame time and start a new frame
    pub fn accumulate(&mut self, delta_time: f32) {
        self.accumulator += delta_time.max(0.0);
        self.steps_this_frame = 0;
    }

    /// Consume one step if one is due this frame
    pub fn next_step(&mut self) -> bool {
        if self.accumulator > self.step && self.steps_this_frame < self.max_steps {
            self.accumulator -= self.step;
            self.steps_this_frame += 1;
            true
        } else {
            false
        }
    }

    /// Whether the per-frame cap stopped the frame with a full step still banked
    pub fn capped(&self) -> bool {
        self.steps_this_frame >= self.max_steps && self.accumulator > self.step
    }

    /// Length of one step in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Banked time not yet simulated
    pub fn accumulator(&self) -> f32 {
        self.accumulator
    }

    /// Steps handed out since the last [`FixedTimestep::accumulate`]
    pub fn steps_this_frame(&self) -> u32 {
        self.steps_this_frame
    }

    /// Drop all banked time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
        self.steps_this_frame = 0;
    }
}

/// Wall-clock timer for profiling a pipeline step
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    /// Start timing now
    pub fn start_new() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    /// Milliseconds since the stopwatch started
    pub fn elapsed_millis(&self) -> f32 {
        self.started.elapsed().as_secs_f32() * 1000.0
    }
}
