//! Fixed-rate tick accumulator.

use bevy_log::debug;

use crate::config::BuoyancyConfig;

/// Turns variable frame times into a whole number of fixed ticks.
///
/// At most `max_catch_up` ticks run per frame. Time beyond that is dropped
/// rather than carried over, so a stalled frame cannot snowball into a long
/// burst of catch-up ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepClock {
    step: f64,
    max_catch_up: u32,
    accumulator: f64,
}

impl StepClock {
    pub fn new(step: f64, max_catch_up: u32) -> Self {
        debug_assert!(step > 0.0, "non-positive tick length {step}");
        Self {
            step,
            max_catch_up: max_catch_up.max(1),
            accumulator: 0.0,
        }
    }

    pub fn from_config(config: &BuoyancyConfig) -> Self {
        Self::new(config.fixed_time_step(), config.max_catch_up_ticks)
    }

    pub fn time_step(&self) -> f64 {
        self.step
    }

    /// Adds `elapsed` seconds and returns how many ticks to run now.
    pub fn advance(&mut self, elapsed: f64) -> u32 {
        if elapsed.is_finite() && elapsed > 0.0 {
            self.accumulator += elapsed;
        }

        let available = (self.accumulator / self.step).floor() as u64;
        self.accumulator -= available as f64 * self.step;
        self.accumulator = self.accumulator.max(0.0);

        if available > self.max_catch_up as u64 {
            debug!(
                "Dropping {} ticks to keep up",
                available - self.max_catch_up as u64
            );
            self.max_catch_up
        } else {
            available as u32
        }
    }

    /// How far the clock is into the next tick, 0 to 1. Used to blend the
    /// last two tick values for display.
    pub fn ratio(&self) -> f64 {
        (self.accumulator / self.step).clamp(0.0, 1.0)
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}
