//! Solid bodies taking part in the liquid simulation.
//!
//! A [`Mass`] ties together a shape, a material and an engine body, and
//! caches the vertical extent the body occupies this tick. Basins query that
//! cache when they solve for liquid height.

use std::fmt;

use bevy::math::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::basin::BasinId;
use crate::error::ModelError;
use crate::geometry::{MassShape, StepExtent};
use crate::interpolation::Interpolated;
use crate::material::Material;
use crate::physics::{BodyHandle, BodyTransform};
use crate::scale::{ScaleReadout, ScaleUnits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MassId(pub u32);

impl fmt::Display for MassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether any of the mass lies below the liquid line of its basin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubmersionState {
    #[default]
    Dry,
    Submerged,
}

/// Forces computed for a mass during the last ticks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MassForces {
    pub gravity: Interpolated<DVec3>,
    pub buoyancy: Interpolated<DVec3>,
    pub drag: Interpolated<DVec3>,
    /// Sum of contact forces acting on the mass.
    pub contact: Interpolated<DVec3>,
}

/// Description of a mass to add to a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSpec {
    pub name: String,
    pub shape: MassShape,
    pub material: Material,
    pub position: DVec3,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub scale: Option<ScaleUnits>,
}

impl MassSpec {
    pub fn new(name: impl Into<String>, shape: MassShape, material: Material) -> Self {
        Self {
            name: name.into(),
            shape,
            material,
            position: DVec3::ZERO,
            is_static: false,
            scale: None,
        }
    }

    pub fn at(mut self, position: DVec3) -> Self {
        self.position = position;
        self
    }

    /// Makes the body immovable.
    pub fn fixed(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn as_scale(mut self, units: ScaleUnits) -> Self {
        self.scale = Some(units);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Mass {
    id: MassId,
    pub name: String,
    shape: MassShape,
    material: Material,
    body: BodyHandle,
    is_static: bool,
    initial: BodyTransform,
    extent: StepExtent,
    position: Interpolated<DVec3>,
    rotation: DQuat,
    /// Basin formed inside this mass (boats only).
    interior_basin: Option<BasinId>,
    /// Innermost basin holding this mass this tick.
    basin: Option<BasinId>,
    submerged_volume: f64,
    submersion: SubmersionState,
    pub forces: MassForces,
    scale: Option<ScaleReadout>,
}

impl Mass {
    pub(crate) fn new(id: MassId, spec: &MassSpec, body: BodyHandle) -> Result<Self, ModelError> {
        spec.shape.validate()?;
        let volume = spec.shape.material_volume();
        if !(volume.is_finite() && volume > 0.0) {
            return Err(ModelError::InvalidVolume(volume));
        }
        if spec.material.liquid {
            return Err(ModelError::InvalidMaterial {
                name: spec.material.name.clone(),
                reason: "a mass needs a solid material",
            });
        }

        Ok(Self {
            id,
            name: spec.name.clone(),
            shape: spec.shape,
            material: spec.material.clone(),
            body,
            is_static: spec.is_static,
            initial: BodyTransform::from_position(spec.position),
            extent: spec.shape.extent_at(spec.position.y),
            position: Interpolated::new(spec.position),
            rotation: DQuat::IDENTITY,
            interior_basin: None,
            basin: None,
            submerged_volume: 0.0,
            submersion: SubmersionState::Dry,
            forces: MassForces::default(),
            scale: spec.scale.map(ScaleReadout::new),
        })
    }

    pub fn id(&self) -> MassId {
        self.id
    }

    pub fn shape(&self) -> &MassShape {
        &self.shape
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Intrinsic volume of material, independent of submersion.
    pub fn volume(&self) -> f64 {
        self.shape.material_volume()
    }

    /// Mass in kg handed to the engine, never below `floor`.
    pub fn body_mass(&self, floor: f64) -> f64 {
        (self.material.density * self.volume()).max(floor)
    }

    pub fn extent(&self) -> StepExtent {
        self.extent
    }

    pub fn step_bottom(&self) -> f64 {
        self.extent.bottom
    }

    pub fn step_top(&self) -> f64 {
        self.extent.top
    }

    pub fn position(&self) -> DVec3 {
        self.position.current
    }

    pub fn interpolated_position(&self, ratio: f64) -> DVec3 {
        self.position.interpolate(ratio)
    }

    pub fn position_history(&self) -> &Interpolated<DVec3> {
        &self.position
    }

    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    pub fn initial_transform(&self) -> BodyTransform {
        self.initial
    }

    pub fn interior_basin(&self) -> Option<BasinId> {
        self.interior_basin
    }

    pub fn basin(&self) -> Option<BasinId> {
        self.basin
    }

    pub fn submerged_volume(&self) -> f64 {
        self.submerged_volume
    }

    /// Submerged share of the envelope, 0 to 1.
    pub fn submerged_fraction(&self) -> f64 {
        (self.submerged_volume / self.shape.envelope_volume()).clamp(0.0, 1.0)
    }

    pub fn submersion(&self) -> SubmersionState {
        self.submersion
    }

    pub fn scale(&self) -> Option<&ScaleReadout> {
        self.scale.as_ref()
    }

    /// Cross-section at height `y` this tick.
    pub fn displaced_area(&self, y: f64) -> f64 {
        self.shape.displaced_area(&self.extent, y)
    }

    /// Volume below height `y` this tick.
    pub fn displaced_volume(&self, y: f64) -> f64 {
        self.shape.displaced_volume(&self.extent, y)
    }

    /// Refreshes the cached extent from the engine transform.
    pub fn update_step_information(&mut self, transform: BodyTransform) {
        self.position.push(transform.position);
        self.rotation = transform.rotation;
        self.extent = self.shape.extent_at(transform.position.y);
        debug_assert!(self.extent.bottom <= self.extent.top);
    }

    pub(crate) fn reset_transform(&mut self) {
        self.position.reset(self.initial.position);
        self.rotation = self.initial.rotation;
        self.extent = self.shape.extent_at(self.initial.position.y);
        self.forces = MassForces::default();
        self.submerged_volume = 0.0;
        self.submersion = SubmersionState::Dry;
        if let Some(scale) = self.scale.as_mut() {
            scale.force.reset(0.0);
        }
    }

    pub(crate) fn restore_position(&mut self, position: Interpolated<DVec3>) {
        self.position = position;
        self.extent = self.shape.extent_at(position.current.y);
    }

    pub(crate) fn set_shape(&mut self, shape: MassShape) -> Result<(), ModelError> {
        shape.validate()?;
        self.shape = shape;
        self.extent = shape.extent_at(self.position.current.y);
        Ok(())
    }

    pub(crate) fn set_material(&mut self, material: Material) {
        self.material = material;
    }

    pub(crate) fn set_body(&mut self, body: BodyHandle) {
        self.body = body;
    }

    pub(crate) fn set_interior_basin(&mut self, basin: Option<BasinId>) {
        self.interior_basin = basin;
    }

    pub(crate) fn set_basin(&mut self, basin: Option<BasinId>) {
        self.basin = basin;
    }

    pub(crate) fn set_submerged_volume(&mut self, volume: f64) {
        debug_assert!(volume >= 0.0, "negative submerged volume {volume}");
        self.submerged_volume = volume;
        self.submersion = if volume > 0.0 {
            SubmersionState::Submerged
        } else {
            SubmersionState::Dry
        };
    }

    pub(crate) fn scale_mut(&mut self) -> Option<&mut ScaleReadout> {
        self.scale.as_mut()
    }
}

/// Slot storage for masses, addressed by [`MassId`].
#[derive(Debug, Clone, Default)]
pub struct MassArena {
    slots: Vec<Option<Mass>>,
}

impl MassArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_id(&self) -> MassId {
        MassId(self.slots.len() as u32)
    }

    pub(crate) fn insert(&mut self, mass: Mass) -> MassId {
        let id = mass.id();
        debug_assert_eq!(id, self.next_id());
        self.slots.push(Some(mass));
        id
    }

    pub(crate) fn remove(&mut self, id: MassId) -> Option<Mass> {
        self.slots.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn get(&self, id: MassId) -> Option<&Mass> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: MassId) -> Option<&mut Mass> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mass> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Mass> {
        self.slots.iter_mut().flatten()
    }

    pub fn ids(&self) -> Vec<MassId> {
        self.iter().map(Mass::id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
