/// Fixed-rate frame clock.
/// Turns variable host frame times into a whole number of kernel ticks.
#[derive(Debug, Clone)]
pub struct FrameClock {
    /// Seconds per tick.
    dt: f32,
    /// Most ticks handed out for one host frame.
    max_steps: u32,
    accumulator: f32,
}

impl FrameClock {
    pub fn new(dt: f32, max_steps: u32) -> Self {
        Self {
            dt,
            max_steps: max_steps.max(1),
            accumulator: 0.0,
        }
    }

    /// Add host frame time. Returns how many ticks to run now.
    /// A clock with a non-positive step never ticks.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if self.dt.is_nan() || self.dt <= 0.0 || frame_dt.is_nan() || frame_dt <= 0.0 {
            return 0;
        }
        self.accumulator += frame_dt;
        // Cap to prevent a burst of ticks after a stall
        self.accumulator = self.accumulator.min(self.dt * self.max_steps as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Fraction of the next tick already accumulated (0.0 to 1.0).
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Drop any partial tick, e.g. after a stop/start.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
