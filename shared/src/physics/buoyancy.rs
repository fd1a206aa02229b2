//! Forces liquid exerts on a mass.
//!
//! All functions are pure: the model gathers submerged volume, velocity and
//! liquid properties for a mass, turns them into forces here, and hands the
//! sum to the engine.

use std::f64::consts::PI;

use bevy::math::DVec3;

use crate::config::BuoyancyConfig;
use crate::material::Material;

/// Forces acting on one mass during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TickForces {
    pub gravity: DVec3,
    pub buoyancy: DVec3,
    pub drag: DVec3,
}

impl TickForces {
    pub fn total(&self) -> DVec3 {
        self.gravity + self.buoyancy + self.drag
    }
}

/// Inputs gathered for one mass.
#[derive(Debug, Clone, Copy)]
pub struct ForceInputs<'a> {
    /// Mass handed to the engine, kg.
    pub body_mass: f64,
    /// Volume below the liquid line, m³.
    pub submerged_volume: f64,
    /// Volume the buoyant force acts on. Equal to the submerged volume except
    /// for boats, which subtract the liquid they hold.
    pub buoyant_volume: f64,
    /// Cross-section at the liquid line, m².
    pub waterline_area: f64,
    pub velocity: DVec3,
    /// Liquid the mass sits in, if any.
    pub liquid: Option<&'a Material>,
}

/// Weight of the body, pointing down.
#[inline]
pub fn gravity_force(body_mass: f64, gravity: f64) -> DVec3 {
    DVec3::new(0.0, -body_mass * gravity, 0.0)
}

/// Archimedes: weight of the displaced liquid, pointing up.
#[inline]
pub fn buoyant_force(submerged_volume: f64, liquid_density: f64, gravity: f64) -> DVec3 {
    DVec3::new(0.0, submerged_volume * liquid_density * gravity, 0.0)
}

/// Radius of the sphere holding `volume`.
#[inline]
fn equivalent_radius(volume: f64) -> f64 {
    (3.0 * volume / (4.0 * PI)).cbrt()
}

/// Drag opposing `velocity`.
///
/// The linear term is Stokes drag on the sphere equivalent to the submerged
/// volume, scaled by `config.linear_drag_scale`. The quadratic term is form
/// drag over the waterline area. The combined coefficient is capped at
/// `body_mass / dt` so one tick of drag can stop the body but never reverse
/// it.
pub fn drag_force(
    inputs: &ForceInputs,
    liquid: &Material,
    config: &BuoyancyConfig,
    dt: f64,
) -> DVec3 {
    if inputs.submerged_volume <= 0.0 || inputs.velocity == DVec3::ZERO || dt <= 0.0 {
        return DVec3::ZERO;
    }

    let speed = inputs.velocity.length();
    let linear = config.linear_drag_scale
        * 6.0
        * PI
        * liquid.viscosity
        * equivalent_radius(inputs.submerged_volume);
    let quadratic = 0.5
        * liquid.density
        * config.quadratic_drag_coefficient
        * inputs.waterline_area
        * speed;

    let coefficient = (linear + quadratic).min(inputs.body_mass / dt);
    -inputs.velocity * coefficient
}

/// Gravity, buoyancy and drag for one mass.
pub fn tick_forces(inputs: &ForceInputs, config: &BuoyancyConfig, dt: f64) -> TickForces {
    let g = config.gravity_acceleration();
    let gravity = gravity_force(inputs.body_mass, g);

    let Some(liquid) = inputs.liquid else {
        return TickForces {
            gravity,
            ..Default::default()
        };
    };

    TickForces {
        gravity,
        buoyancy: buoyant_force(inputs.buoyant_volume, liquid.density, g),
        drag: drag_force(inputs, liquid, config, dt),
    }
}
