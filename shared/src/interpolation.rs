//! Smoothing of per-tick values for presentation.
//!
//! Physics runs on fixed ticks while frames land anywhere in between. Each
//! [`Interpolated`] keeps the last two tick values so a frame can blend
//! them by the overstep ratio of the fixed clock.

use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

pub trait Lerp: Copy {
    fn lerp_to(self, other: Self, ratio: f64) -> Self;
}

impl Lerp for f64 {
    #[inline]
    fn lerp_to(self, other: Self, ratio: f64) -> Self {
        self + (other - self) * ratio
    }
}

impl Lerp for DVec3 {
    #[inline]
    fn lerp_to(self, other: Self, ratio: f64) -> Self {
        self.lerp(other, ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interpolated<T> {
    pub current: T,
    pub previous: T,
}

impl<T: Lerp> Interpolated<T> {
    pub fn new(value: T) -> Self {
        Self {
            current: value,
            previous: value,
        }
    }

    /// Records the value of a new tick.
    pub fn push(&mut self, value: T) {
        self.previous = self.current;
        self.current = value;
    }

    /// Overwrites both samples, dropping history.
    pub fn reset(&mut self, value: T) {
        self.current = value;
        self.previous = value;
    }

    /// Value `ratio` of the way from the previous tick to the current one.
    pub fn interpolate(&self, ratio: f64) -> T {
        self.previous.lerp_to(self.current, ratio.clamp(0.0, 1.0))
    }
}

impl<T: Lerp + Default> Default for Interpolated<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
