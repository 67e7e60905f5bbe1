//! Time management utilities

use std::time::{Duration, Instant};

/// Wall-clock frame timer
pub struct Timer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Advance the timer by one frame and return the elapsed seconds
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
        self.delta_time
    }

    /// Get the time since the last frame in seconds
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Get the total elapsed time since timer creation
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Get the current frame count
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Get the average FPS since timer creation
    pub fn average_fps(&self) -> f32 {
        if self.total_time > 0.0 {
            self.frame_count as f32 / self.total_time
        } else {
            0.0
        }
    }
}

/// Accumulator that slices variable frame time into fixed simulation steps
///
/// Every frame the elapsed time is added to the accumulator and
/// [`FixedTimestep::advance`] reports how many whole steps fit. The count is
/// capped at `max_steps` so a long hitch cannot stall the loop; the excess
/// time is dropped.
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    step: f32,
    accumulator: f32,
    max_steps: u32,
}

impl FixedTimestep {
    /// Create an accumulator for the given step length in seconds
    pub fn new(step: f32, max_steps: u32) -> Self {
        Self {
            step: step.max(f32::EPSILON),
            accumulator: 0.0,
            max_steps: max_steps.max(1),
        }
    }

    /// Length of one fixed step in seconds
    pub fn step(&self) -> f32 {
        self.step
    }

    /// Time carried over to the next frame
    pub fn accumulated(&self) -> f32 {
        self.accumulator
    }

    /// Add `delta_time` seconds and return the number of fixed steps to run now
    pub fn advance(&mut self, delta_time: f32) -> u32 {
        self.accumulator += delta_time.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < self.max_steps {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == self.max_steps && self.accumulator >= self.step {
            log::debug!(
                "Fixed timestep dropped {:.3}s after {} steps",
                self.accumulator,
                steps
            );
            self.accumulator %= self.step;
        }
        steps
    }

    /// Forget any accumulated time
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Simple stopwatch for measuring elapsed time
pub struct Stopwatch {
    start_time: Option<Instant>,
    elapsed: Duration,
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

impl Stopwatch {
    /// Create a new stopped stopwatch
    pub fn new() -> Self {
        Self {
            start_time: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Create a new stopwatch and start it immediately
    pub fn start_new() -> Self {
        let mut stopwatch = Self::new();
        stopwatch.start();
        stopwatch
    }

    /// Start the stopwatch
    pub fn start(&mut self) {
        self.start_time = Some(Instant::now());
    }

    /// Stop the stopwatch and accumulate elapsed time
    pub fn stop(&mut self) {
        if let Some(start) = self.start_time.take() {
            self.elapsed += start.elapsed();
        }
    }

    /// Get the elapsed time
    pub fn elapsed(&self) -> Duration {
        let running = self.start_time.map_or(Duration::ZERO, |start| start.elapsed());
        self.elapsed + running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fixed_timestep_slices() {
        let mut fixed = FixedTimestep::new(0.02, 10);
        assert_eq!(fixed.advance(0.01), 0);
        assert_eq!(fixed.advance(0.015), 1);
        assert_relative_eq!(fixed.accumulated(), 0.005, epsilon = 1e-5);
        assert_eq!(fixed.advance(0.045), 2);
    }

    #[test]
    fn test_fixed_timestep_caps_steps() {
        let mut fixed = FixedTimestep::new(0.02, 3);
        assert_eq!(fixed.advance(1.0), 3);
        assert!(fixed.accumulated() < 0.02);
    }

    #[test]
    fn test_timer_counts_frames() {
        let mut timer = Timer::new();
        timer.tick();
        timer.tick();
        assert_eq!(timer.frame_count(), 2);
        assert!(timer.delta_time() >= 0.0);
    }

    #[test]
    fn test_stopwatch_accumulates() {
        let mut watch = Stopwatch::start_new();
        watch.stop();
        let first = watch.elapsed();
        assert_eq!(watch.elapsed(), first);
    }
}
