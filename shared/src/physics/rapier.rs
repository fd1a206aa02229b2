//! [`RigidBodyEngine`] backed by rapier.
//!
//! The world runs without gravity, the model applies weight as a force like
//! every other liquid force. Rotations are locked since displacement is
//! computed for upright shapes.

use bevy::math::{DQuat, DVec3};
use bevy_log::{debug, warn};
use bevy_rapier3d::rapier::na::Quaternion;
use bevy_rapier3d::rapier::prelude::*;

use super::{BodyDescriptor, BodyHandle, BodyTransform, RigidBodyEngine};
use crate::geometry::BodyShape;

const FRICTION: Real = 0.5;

enum Slot {
    /// Created but not simulated yet.
    Detached {
        descriptor: BodyDescriptor,
        velocity: DVec3,
    },
    Active {
        body: RigidBodyHandle,
        collider: ColliderHandle,
    },
    Removed,
}

pub struct RapierEngine {
    pipeline: PhysicsPipeline,
    integration_parameters: IntegrationParameters,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    slots: Vec<Slot>,
}

impl Default for RapierEngine {
    fn default() -> Self {
        Self {
            pipeline: PhysicsPipeline::new(),
            integration_parameters: IntegrationParameters::default(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            slots: Vec::new(),
        }
    }
}

impl std::fmt::Debug for RapierEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RapierEngine")
            .field("bodies", &self.bodies.len())
            .field("colliders", &self.colliders.len())
            .field("active", &self.active_body_count())
            .finish()
    }
}

impl RapierEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bodies currently taking part in simulation.
    pub fn active_body_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|slot| matches!(slot, Slot::Active { .. }))
            .count()
    }

    fn slot(&self, handle: BodyHandle) -> Option<&Slot> {
        match self.slots.get(handle.0 as usize) {
            Some(Slot::Removed) | None => None,
            slot => slot,
        }
    }

    fn slot_mut(&mut self, handle: BodyHandle) -> Option<&mut Slot> {
        match self.slots.get_mut(handle.0 as usize) {
            Some(Slot::Removed) | None => {
                warn!("Ignoring access to unknown body {:?}", handle);
                None
            }
            slot => slot,
        }
    }

    fn active(&self, handle: BodyHandle) -> Option<(RigidBodyHandle, ColliderHandle)> {
        match self.slot(handle) {
            Some(Slot::Active { body, collider }) => Some((*body, *collider)),
            _ => None,
        }
    }

    fn rigid_body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        let (body, _) = self.active(handle)?;
        self.bodies.get_mut(body)
    }

    fn insert(&mut self, descriptor: &BodyDescriptor, velocity: DVec3) -> Slot {
        let transform = descriptor.transform;
        let position = Isometry::from_parts(
            to_vector(transform.position).into(),
            to_rotation(transform.rotation),
        );
        let builder = if descriptor.is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
                .lock_rotations()
                .can_sleep(false)
                .linvel(to_vector(velocity))
        };
        let body = self.bodies.insert(builder.position(position));

        let mut collider = collider_builder(&descriptor.shape)
            .friction(FRICTION)
            .restitution(0.0);
        if !descriptor.is_static {
            collider = collider.mass(descriptor.mass as Real);
        }
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        Slot::Active { body, collider }
    }
}

impl RigidBodyEngine for RapierEngine {
    fn create_body(&mut self, descriptor: &BodyDescriptor) -> BodyHandle {
        self.slots.push(Slot::Detached {
            descriptor: descriptor.clone(),
            velocity: DVec3::ZERO,
        });
        BodyHandle(self.slots.len() as u32 - 1)
    }

    fn add_body(&mut self, handle: BodyHandle) {
        let Some(Slot::Detached {
            descriptor,
            velocity,
        }) = self.slot(handle)
        else {
            return;
        };
        let (descriptor, velocity) = (descriptor.clone(), *velocity);
        let slot = self.insert(&descriptor, velocity);
        self.slots[handle.0 as usize] = slot;
        debug!("Body {:?} added to the rapier world", handle);
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        let Some(slot) = self.slot_mut(handle) else {
            return;
        };
        if let Slot::Active { body, .. } = std::mem::replace(slot, Slot::Removed) {
            self.bodies.remove(
                body,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }
    }

    fn step(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt as Real;
        self.pipeline.step(
            &Vector::zeros(),
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
        for (_, body) in self.bodies.iter_mut() {
            body.reset_forces(false);
        }
    }

    fn transform(&self, handle: BodyHandle) -> BodyTransform {
        match self.slot(handle) {
            Some(Slot::Detached { descriptor, .. }) => descriptor.transform,
            Some(Slot::Active { body, .. }) => self
                .bodies
                .get(*body)
                .map(|body| BodyTransform {
                    position: from_vector(body.translation()),
                    rotation: from_rotation(body.rotation()),
                })
                .unwrap_or_else(|| BodyTransform::from_position(DVec3::ZERO)),
            _ => BodyTransform::from_position(DVec3::ZERO),
        }
    }

    fn set_position(&mut self, handle: BodyHandle, position: DVec3) {
        match self.slot_mut(handle) {
            Some(Slot::Detached { descriptor, .. }) => descriptor.transform.position = position,
            Some(Slot::Active { .. }) => {
                if let Some(body) = self.rigid_body_mut(handle) {
                    body.set_translation(to_vector(position), true);
                }
            }
            _ => {}
        }
    }

    fn set_rotation(&mut self, handle: BodyHandle, rotation: DQuat) {
        match self.slot_mut(handle) {
            Some(Slot::Detached { descriptor, .. }) => descriptor.transform.rotation = rotation,
            Some(Slot::Active { .. }) => {
                if let Some(body) = self.rigid_body_mut(handle) {
                    body.set_rotation(to_rotation(rotation), true);
                }
            }
            _ => {}
        }
    }

    fn velocity(&self, handle: BodyHandle) -> DVec3 {
        match self.slot(handle) {
            Some(Slot::Detached { velocity, .. }) => *velocity,
            Some(Slot::Active { body, .. }) => self
                .bodies
                .get(*body)
                .map(|body| from_vector(body.linvel()))
                .unwrap_or(DVec3::ZERO),
            _ => DVec3::ZERO,
        }
    }

    fn set_velocity(&mut self, handle: BodyHandle, velocity: DVec3) {
        match self.slot_mut(handle) {
            Some(Slot::Detached { velocity: stored, .. }) => *stored = velocity,
            Some(Slot::Active { .. }) => {
                if let Some(body) = self.rigid_body_mut(handle) {
                    body.set_linvel(to_vector(velocity), true);
                }
            }
            _ => {}
        }
    }

    fn set_mass(&mut self, handle: BodyHandle, mass: f64) {
        match self.slot_mut(handle) {
            Some(Slot::Detached { descriptor, .. }) => descriptor.mass = mass,
            Some(Slot::Active { body, collider }) => {
                let (body, collider) = (*body, *collider);
                if self.bodies.get(body).is_some_and(|b| b.is_fixed()) {
                    return;
                }
                if let Some(collider) = self.colliders.get_mut(collider) {
                    collider.set_mass(mass as Real);
                }
            }
            _ => {}
        }
    }

    fn apply_force(&mut self, handle: BodyHandle, force: DVec3) {
        if let Some(body) = self.rigid_body_mut(handle) {
            body.add_force(to_vector(force), true);
        }
    }

    fn contact_force(&self, handle: BodyHandle, other: BodyHandle) -> DVec3 {
        let (Some((_, collider)), Some((_, other_collider))) =
            (self.active(handle), self.active(other))
        else {
            return DVec3::ZERO;
        };
        let Some(pair) = self.narrow_phase.contact_pair(collider, other_collider) else {
            return DVec3::ZERO;
        };

        // Manifold normals point out of the pair's first collider, so the
        // solver pushes the second collider along them.
        let on_second: Vector<Real> = pair
            .manifolds
            .iter()
            .map(|manifold| {
                let impulse: Real = manifold.points.iter().map(|p| p.data.impulse).sum();
                manifold.data.normal * impulse
            })
            .sum();
        let force = from_vector(&on_second) / self.integration_parameters.dt as f64;
        if pair.collider2 == collider {
            force
        } else {
            -force
        }
    }
}

fn collider_builder(shape: &BodyShape) -> ColliderBuilder {
    match shape {
        BodyShape::Cuboid { half_extents } => {
            ColliderBuilder::cuboid(
                half_extents.x as Real,
                half_extents.y as Real,
                half_extents.z as Real,
            )
        }
        BodyShape::OpenBox {
            half_extents,
            thickness,
        } => ColliderBuilder::compound(open_box_parts(*half_extents, *thickness)),
        BodyShape::ConvexHull { vertices } => {
            let points: Vec<Point<Real>> = vertices
                .iter()
                .map(|v| Point::new(v.x as Real, v.y as Real, v.z as Real))
                .collect();
            ColliderBuilder::convex_hull(&points).unwrap_or_else(|| {
                warn!("Degenerate hull of {} points, using its bounds", points.len());
                let (min, max) = shape.local_bounds();
                let half = (max - min) / 2.0;
                let center = (max + min) / 2.0;
                ColliderBuilder::cuboid(half.x as Real, half.y as Real, half.z as Real)
                    .translation(to_vector(center))
            })
        }
    }
}

/// Floor slab and four walls, so cargo can rest on the floor inside.
fn open_box_parts(half: DVec3, thickness: f64) -> Vec<(Isometry<Real>, SharedShape)> {
    let t = thickness / 2.0;
    let part = |center: DVec3, half: DVec3| {
        (
            Isometry::translation(center.x as Real, center.y as Real, center.z as Real),
            SharedShape::cuboid(half.x as Real, half.y as Real, half.z as Real),
        )
    };
    vec![
        part(
            DVec3::new(0.0, -half.y + t, 0.0),
            DVec3::new(half.x, t, half.z),
        ),
        part(
            DVec3::new(-half.x + t, 0.0, 0.0),
            DVec3::new(t, half.y, half.z),
        ),
        part(
            DVec3::new(half.x - t, 0.0, 0.0),
            DVec3::new(t, half.y, half.z),
        ),
        part(
            DVec3::new(0.0, 0.0, -half.z + t),
            DVec3::new(half.x - thickness, half.y, t),
        ),
        part(
            DVec3::new(0.0, 0.0, half.z - t),
            DVec3::new(half.x - thickness, half.y, t),
        ),
    ]
}

fn to_vector(v: DVec3) -> Vector<Real> {
    Vector::new(v.x as Real, v.y as Real, v.z as Real)
}

fn from_vector(v: &Vector<Real>) -> DVec3 {
    DVec3::new(v.x as f64, v.y as f64, v.z as f64)
}

fn to_rotation(q: DQuat) -> Rotation<Real> {
    Rotation::from_quaternion(Quaternion::new(
        q.w as Real,
        q.x as Real,
        q.y as Real,
        q.z as Real,
    ))
}

fn from_rotation(q: &Rotation<Real>) -> DQuat {
    let c = q.coords;
    DQuat::from_xyzw(c.x as f64, c.y as f64, c.z as f64, c.w as f64)
}
