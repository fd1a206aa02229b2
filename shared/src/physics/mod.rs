//! Boundary to the rigid-body engine, plus the buoyancy step integrator.
//!
//! The model never integrates motion itself. It reads transforms and
//! velocities back from a [`RigidBodyEngine`], computes liquid forces, and
//! hands them over with [`RigidBodyEngine::apply_force`].

pub mod buoyancy;
pub mod rapier;

use bevy::math::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::geometry::BodyShape;

/// Opaque reference to a body owned by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTransform {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl BodyTransform {
    pub fn from_position(position: DVec3) -> Self {
        Self {
            position,
            rotation: DQuat::IDENTITY,
        }
    }
}

/// Everything an engine needs to build a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDescriptor {
    pub shape: BodyShape,
    /// Mass in kg, ignored for static bodies.
    pub mass: f64,
    pub is_static: bool,
    pub transform: BodyTransform,
}

impl BodyDescriptor {
    pub fn dynamic(shape: BodyShape, mass: f64, position: DVec3) -> Self {
        Self {
            shape,
            mass,
            is_static: false,
            transform: BodyTransform::from_position(position),
        }
    }

    /// Immovable box, typically ground or a pool floor.
    pub fn static_box(size: DVec3, position: DVec3) -> Self {
        Self {
            shape: BodyShape::Cuboid {
                half_extents: size / 2.0,
            },
            mass: 0.0,
            is_static: true,
            transform: BodyTransform::from_position(position),
        }
    }
}

/// The narrow slice of a rigid-body engine this crate relies on.
///
/// Bodies are created detached and only take part in simulation after
/// [`add_body`](Self::add_body).
pub trait RigidBodyEngine {
    fn create_body(&mut self, descriptor: &BodyDescriptor) -> BodyHandle;
    fn add_body(&mut self, body: BodyHandle);
    fn remove_body(&mut self, body: BodyHandle);

    /// Advances the simulation, consuming forces applied since the last step.
    fn step(&mut self, dt: f64);

    fn transform(&self, body: BodyHandle) -> BodyTransform;
    fn set_position(&mut self, body: BodyHandle, position: DVec3);
    fn set_rotation(&mut self, body: BodyHandle, rotation: DQuat);

    fn velocity(&self, body: BodyHandle) -> DVec3;
    fn set_velocity(&mut self, body: BodyHandle, velocity: DVec3);

    fn set_mass(&mut self, body: BodyHandle, mass: f64);

    /// Accumulates a force (newtons) applied at the center of mass for the
    /// next step.
    fn apply_force(&mut self, body: BodyHandle, force: DVec3);

    /// Force exerted on `body` by `other` through contact during the last
    /// step. Zero when they did not touch.
    fn contact_force(&self, body: BodyHandle, other: BodyHandle) -> DVec3;
}
