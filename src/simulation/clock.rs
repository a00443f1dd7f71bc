//! Fixed-timestep frame clock
//!
//! Wall-clock time is accumulated as a [`Duration`] and converted into whole
//! ticks; the remainder only feeds render interpolation. Nothing inside a
//! tick ever reads this clock.

use std::time::Duration;

use crate::core::config::SimulationConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameClock {
    step: Duration,
    max_frame: Duration,
    accumulator: Duration,
}

impl FrameClock {
    pub fn new(step: Duration, max_frame: Duration) -> Self {
        Self {
            step,
            max_frame: max_frame.max(step),
            accumulator: Duration::ZERO,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.fixed_step(), config.max_frame())
    }

    /// Add a frame's elapsed time (capped) and return how many ticks are due
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        self.accumulator += elapsed.min(self.max_frame);
        let mut due = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            due += 1;
        }
        due
    }

    /// Interpolation factor between the previous and current tick, in [0, 1)
    pub fn alpha(&self) -> f32 {
        self.accumulator.as_secs_f32() / self.step.as_secs_f32()
    }

    pub fn accumulated(&self) -> Duration {
        self.accumulator
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_ticks_and_remainder() {
        let mut clock = FrameClock::new(Duration::from_millis(50), Duration::from_millis(250));
        assert_eq!(clock.advance(Duration::from_millis(120)), 2);
        assert_eq!(clock.accumulated(), Duration::from_millis(20));
        assert!((clock.alpha() - 0.4).abs() < 1e-6);
        assert_eq!(clock.advance(Duration::from_millis(30)), 1);
        assert_eq!(clock.accumulated(), Duration::ZERO);
    }

    #[test]
    fn test_long_frame_is_capped() {
        let mut clock = FrameClock::new(Duration::from_millis(50), Duration::from_millis(250));
        assert_eq!(clock.advance(Duration::from_secs(10)), 5);
    }
}
