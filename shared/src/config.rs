//! Runtime configuration for the buoyancy model.
//!
//! Defaults come from [`crate::constants`]. Scenes loaded by the server embed
//! a `BuoyancyConfig`, and any field left out falls back to its default.

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::error::ModelError;

/// Named gravity strengths.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Gravity {
    #[default]
    Earth,
    Moon,
    Jupiter,
    Pluto,
    /// Custom acceleration in m/s², must be positive.
    Custom(f64),
}

impl Gravity {
    /// Magnitude of the gravitational acceleration, m/s².
    pub fn acceleration(&self) -> f64 {
        match self {
            Gravity::Earth => constants::GRAVITY,
            Gravity::Moon => 1.6,
            Gravity::Jupiter => 24.8,
            Gravity::Pluto => 0.6,
            Gravity::Custom(value) => *value,
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        let g = self.acceleration();
        if g.is_finite() && g > 0.0 {
            Ok(())
        } else {
            Err(ModelError::InvalidGravity(g))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuoyancyConfig {
    pub gravity: Gravity,
    /// Absolute tolerance of the liquid height solver.
    pub root_tolerance: f64,
    /// Overlap allowed when deciding whether a mass sits inside a basin.
    pub slip_tolerance: f64,
    /// Lower bound on the mass handed to the rigid-body engine.
    pub minimum_body_mass: f64,
    /// Scale on liquid viscosity for the linear drag term.
    pub linear_drag_scale: f64,
    /// Form drag coefficient for the quadratic term. Zero disables it.
    pub quadratic_drag_coefficient: f64,
    /// Fixed physics rate.
    pub ticks_per_second: u64,
    /// Maximum fixed ticks run per frame.
    pub max_catch_up_ticks: u32,
}

impl Default for BuoyancyConfig {
    fn default() -> Self {
        Self {
            gravity: Gravity::Earth,
            root_tolerance: constants::ROOT_TOLERANCE,
            slip_tolerance: constants::SLIP_TOLERANCE,
            minimum_body_mass: constants::MINIMUM_BODY_MASS,
            linear_drag_scale: constants::LINEAR_DRAG_SCALE,
            quadratic_drag_coefficient: constants::QUADRATIC_DRAG_COEFFICIENT,
            ticks_per_second: constants::TICKS_PER_SECOND,
            max_catch_up_ticks: constants::MAX_CATCH_UP_TICKS,
        }
    }
}

impl BuoyancyConfig {
    pub fn with_gravity(mut self, gravity: Gravity) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_slip_tolerance(mut self, slip: f64) -> Self {
        self.slip_tolerance = slip;
        self
    }

    pub fn with_drag(mut self, linear_scale: f64, quadratic_coefficient: f64) -> Self {
        self.linear_drag_scale = linear_scale;
        self.quadratic_drag_coefficient = quadratic_coefficient;
        self
    }

    pub fn with_tick_rate(mut self, ticks_per_second: u64, max_catch_up_ticks: u32) -> Self {
        self.ticks_per_second = ticks_per_second;
        self.max_catch_up_ticks = max_catch_up_ticks;
        self
    }

    /// Fixed tick length in seconds.
    pub fn fixed_time_step(&self) -> f64 {
        1.0 / self.ticks_per_second.max(1) as f64
    }

    pub fn gravity_acceleration(&self) -> f64 {
        self.gravity.acceleration()
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        self.gravity.validate()?;
        for (name, value) in [
            ("root tolerance", self.root_tolerance),
            ("minimum body mass", self.minimum_body_mass),
        ] {
            crate::error::positive_dimension(name, value)?;
        }
        for (name, value) in [
            ("slip tolerance", self.slip_tolerance),
            ("linear drag scale", self.linear_drag_scale),
            ("quadratic drag coefficient", self.quadratic_drag_coefficient),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ModelError::InvalidDimension { name, value });
            }
        }
        Ok(())
    }
}
