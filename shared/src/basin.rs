//! Liquid containers.
//!
//! A [`Basin`] owns a volume of liquid and works out where its surface sits
//! given the masses currently inside it. Basins are either fixed pools or the
//! interior of a floating boat, and a basin may hold exactly one nested child
//! basin whose contents must not be counted twice.

use std::fmt;

use bevy::math::{DVec2, DVec3};
use bevy_log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::geometry::{MassShape, StepExtent};
use crate::interpolation::Interpolated;
use crate::mass::{Mass, MassArena, MassId};
use crate::solver::find_root;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BasinId(pub u32);

impl fmt::Display for BasinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BasinKind {
    /// Rectangular pool fixed in the world, spanning `min` to `max`.
    Pool { min: DVec3, max: DVec3 },
    /// Interior of a boat. Its geometry follows the boat every tick.
    BoatInterior { boat: MassId },
}

#[derive(Debug, Clone)]
pub struct Basin {
    id: BasinId,
    kind: BasinKind,
    liquid_volume: f64,
    initial_volume: f64,
    extent: StepExtent,
    /// Horizontal bounds on the x/z plane.
    footprint_min: DVec2,
    footprint_max: DVec2,
    height: Interpolated<f64>,
    masses: Vec<MassId>,
    child: Option<BasinId>,
    parent: Option<BasinId>,
}

fn validate_liquid_volume(volume: f64) -> Result<f64, ModelError> {
    if volume.is_finite() && volume >= 0.0 {
        Ok(volume)
    } else {
        Err(ModelError::InvalidLiquidVolume(volume))
    }
}

impl Basin {
    pub(crate) fn pool(
        id: BasinId,
        min: DVec3,
        max: DVec3,
        liquid_volume: f64,
    ) -> Result<Self, ModelError> {
        let size = max - min;
        crate::error::positive_dimension("pool width", size.x)?;
        crate::error::positive_dimension("pool height", size.y)?;
        crate::error::positive_dimension("pool depth", size.z)?;
        let liquid_volume = validate_liquid_volume(liquid_volume)?;

        Ok(Self {
            id,
            kind: BasinKind::Pool { min, max },
            liquid_volume,
            initial_volume: liquid_volume,
            extent: StepExtent::new(min.y, max.y),
            footprint_min: DVec2::new(min.x, min.z),
            footprint_max: DVec2::new(max.x, max.z),
            height: Interpolated::new(min.y),
            masses: Vec::new(),
            child: None,
            parent: None,
        })
    }

    pub(crate) fn boat_interior(
        id: BasinId,
        boat: &Mass,
        liquid_volume: f64,
    ) -> Result<Self, ModelError> {
        let liquid_volume = validate_liquid_volume(liquid_volume)?;
        let mut basin = Self {
            id,
            kind: BasinKind::BoatInterior { boat: boat.id() },
            liquid_volume,
            initial_volume: liquid_volume,
            extent: boat.extent(),
            footprint_min: DVec2::ZERO,
            footprint_max: DVec2::ZERO,
            height: Interpolated::new(boat.step_bottom()),
            masses: Vec::new(),
            child: None,
            parent: None,
        };
        basin.follow_boat(boat);
        basin.height.reset(basin.extent.bottom);
        Ok(basin)
    }

    pub fn id(&self) -> BasinId {
        self.id
    }

    pub fn kind(&self) -> &BasinKind {
        &self.kind
    }

    /// The boat carrying this basin, if any.
    pub fn boat(&self) -> Option<MassId> {
        match self.kind {
            BasinKind::BoatInterior { boat } => Some(boat),
            BasinKind::Pool { .. } => None,
        }
    }

    pub fn liquid_volume(&self) -> f64 {
        self.liquid_volume
    }

    pub fn initial_volume(&self) -> f64 {
        self.initial_volume
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

    /// Liquid height from the latest solve.
    pub fn height(&self) -> f64 {
        self.height.current
    }

    pub fn interpolated_height(&self, ratio: f64) -> f64 {
        self.height.interpolate(ratio)
    }

    pub fn height_history(&self) -> &Interpolated<f64> {
        &self.height
    }

    pub fn masses(&self) -> &[MassId] {
        &self.masses
    }

    pub fn child(&self) -> Option<BasinId> {
        self.child
    }

    pub fn parent(&self) -> Option<BasinId> {
        self.parent
    }

    pub fn footprint_area(&self) -> f64 {
        let size = self.footprint_max - self.footprint_min;
        size.x * size.y
    }

    /// Basin cross-section at `y` with nothing inside it.
    pub fn maximum_area(&self, y: f64) -> f64 {
        if y < self.extent.bottom || y > self.extent.top {
            0.0
        } else {
            self.footprint_area()
        }
    }

    /// Basin volume below `y` with nothing inside it.
    pub fn maximum_volume(&self, y: f64) -> f64 {
        let y = y.clamp(self.extent.bottom, self.extent.top);
        self.footprint_area() * (y - self.extent.bottom)
    }

    /// Empty volume up to the rim.
    pub fn capacity(&self) -> f64 {
        self.maximum_volume(self.extent.top)
    }

    pub fn contains_point(&self, x: f64, z: f64) -> bool {
        x >= self.footprint_min.x
            && x <= self.footprint_max.x
            && z >= self.footprint_min.y
            && z <= self.footprint_max.y
    }

    /// Whether `mass` counts as inside this basin this tick.
    pub fn contains_mass(&self, mass: &Mass, slip: f64) -> bool {
        let position = mass.position();
        if !self.contains_point(position.x, position.z) {
            return false;
        }
        match self.kind {
            BasinKind::Pool { .. } => mass.extent().overlaps(&self.extent, slip),
            BasinKind::BoatInterior { boat } => {
                mass.id() != boat
                    && mass.step_bottom() >= self.extent.bottom - slip
                    && mass.step_bottom() < self.extent.top
            }
        }
    }

    pub(crate) fn set_liquid_volume(&mut self, volume: f64) -> Result<(), ModelError> {
        self.liquid_volume = validate_liquid_volume(volume)?;
        Ok(())
    }

    /// Moves liquid in or out without validation. The result is clamped at
    /// zero.
    pub(crate) fn add_liquid(&mut self, delta: f64) {
        self.liquid_volume = (self.liquid_volume + delta).max(0.0);
    }

    pub(crate) fn set_initial_volume(&mut self, volume: f64) -> Result<(), ModelError> {
        self.initial_volume = validate_liquid_volume(volume)?;
        Ok(())
    }

    /// Starts a new tick, keeping the last height for interpolation.
    pub(crate) fn begin_step(&mut self) {
        self.height.push(self.height.current);
    }

    pub(crate) fn restore_height(&mut self, height: Interpolated<f64>) {
        self.height = height;
    }

    pub(crate) fn reset(&mut self) {
        self.liquid_volume = self.initial_volume;
        self.height.reset(self.extent.bottom);
        self.masses.clear();
    }

    /// Tracks the interior of `boat` after it moved or changed shape.
    pub(crate) fn follow_boat(&mut self, boat: &Mass) {
        let MassShape::Boat {
            width,
            depth,
            thickness,
            ..
        } = *boat.shape()
        else {
            debug_assert!(false, "basin {} follows a {}", self.id, boat.shape().kind());
            return;
        };
        let center = boat.position();
        let half = DVec2::new(width / 2.0 - thickness, depth / 2.0 - thickness);
        let center = DVec2::new(center.x, center.z);
        self.extent = StepExtent::new(boat.step_bottom() + thickness, boat.step_top());
        self.footprint_min = center - half;
        self.footprint_max = center + half;
    }
}

/// Slot storage for basins, addressed by [`BasinId`]. Nesting is kept here so
/// the single-child and no-self-containment rules hold across the arena.
#[derive(Debug, Clone, Default)]
pub struct BasinArena {
    slots: Vec<Option<Basin>>,
}

impl BasinArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_id(&self) -> BasinId {
        BasinId(self.slots.len() as u32)
    }

    pub(crate) fn insert(&mut self, basin: Basin) -> BasinId {
        let id = basin.id();
        debug_assert_eq!(id, self.next_id());
        self.slots.push(Some(basin));
        id
    }

    /// Removes a basin and unlinks it from its parent and child.
    pub(crate) fn remove(&mut self, id: BasinId) -> Option<Basin> {
        let basin = self.slots.get_mut(id.0 as usize).and_then(Option::take)?;
        if let Some(parent) = basin.parent.and_then(|p| self.get_mut(p)) {
            parent.child = None;
        }
        if let Some(child) = basin.child.and_then(|c| self.get_mut(c)) {
            child.parent = None;
        }
        Some(basin)
    }

    pub fn get(&self, id: BasinId) -> Option<&Basin> {
        self.slots.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: BasinId) -> Option<&mut Basin> {
        self.slots.get_mut(id.0 as usize).and_then(Option::as_mut)
    }

    pub(crate) fn require(&self, id: BasinId) -> Result<&Basin, ModelError> {
        self.get(id).ok_or(ModelError::UnknownBasin(id))
    }

    pub(crate) fn require_mut(&mut self, id: BasinId) -> Result<&mut Basin, ModelError> {
        self.get_mut(id).ok_or(ModelError::UnknownBasin(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Basin> {
        self.slots.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Basin> {
        self.slots.iter_mut().flatten()
    }

    pub fn ids(&self) -> Vec<BasinId> {
        self.iter().map(Basin::id).collect()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Places `child` inside `parent`.
    pub fn nest(&mut self, parent: BasinId, child: BasinId) -> Result<(), ModelError> {
        if parent == child {
            return Err(ModelError::SelfContainment(parent));
        }
        let parent_basin = self.require(parent)?;
        if let Some(existing) = parent_basin.child {
            return Err(ModelError::ChildBasinOccupied { parent, existing });
        }
        if let Some(current) = self.require(child)?.parent {
            return Err(ModelError::AlreadyNested {
                child,
                parent: current,
            });
        }
        // Walking up from the parent must never reach the child.
        let mut ancestor = self.get(parent).and_then(Basin::parent);
        while let Some(id) = ancestor {
            if id == child {
                return Err(ModelError::SelfContainment(child));
            }
            ancestor = self.get(id).and_then(Basin::parent);
        }

        self.require_mut(parent)?.child = Some(child);
        self.require_mut(child)?.parent = Some(parent);
        debug!("Nested basin {child} in basin {parent}");
        Ok(())
    }

    /// Number of containers above `id`.
    pub fn depth(&self, id: BasinId) -> usize {
        let mut depth = 0;
        let mut current = self.get(id).and_then(Basin::parent);
        while let Some(parent) = current {
            depth += 1;
            current = self.get(parent).and_then(Basin::parent);
        }
        depth
    }

    /// Basin ids ordered so every child comes before its parent.
    pub fn solve_order(&self) -> Vec<BasinId> {
        let mut order: Vec<BasinId> = self.ids();
        order.sort_by_key(|id| std::cmp::Reverse(self.depth(*id)));
        order
    }

    /// Recomputes which masses each basin holds.
    pub(crate) fn update_membership(&mut self, masses: &MassArena, slip: f64) {
        for basin in self.iter_mut() {
            basin.masses = masses
                .iter()
                .filter(|mass| basin.contains_mass(mass, slip))
                .map(Mass::id)
                .collect();
        }
    }

    /// Deepest basin holding `mass` this tick.
    pub fn innermost_basin(&self, mass: MassId) -> Option<BasinId> {
        self.iter()
            .filter(|basin| basin.masses.contains(&mass))
            .max_by_key(|basin| self.depth(basin.id))
            .map(Basin::id)
    }

    /// Moves every boat interior along with its boat.
    pub(crate) fn follow_boats(&mut self, masses: &MassArena) {
        for basin in self.iter_mut() {
            if let Some(boat) = basin.boat().and_then(|id| masses.get(id)) {
                basin.follow_boat(boat);
            }
        }
    }

    /// Masses shared with the child basin are already covered by the
    /// child's container, so they are counted once.
    fn shared_child_masses<'a>(
        &'a self,
        basin: &'a Basin,
    ) -> Option<(&'a Basin, impl Iterator<Item = &'a MassId>)> {
        let child = basin.child.and_then(|c| self.get(c))?;
        let shared = child
            .masses
            .iter()
            .filter(move |id| basin.masses.contains(*id));
        Some((child, shared))
    }

    /// Combined cross-section of everything inside the basin at `y`.
    pub fn displaced_area(&self, id: BasinId, y: f64, masses: &MassArena) -> f64 {
        let Some(basin) = self.get(id) else {
            return 0.0;
        };
        let own: f64 = basin
            .masses
            .iter()
            .filter_map(|m| masses.get(*m))
            .map(|m| m.displaced_area(y))
            .sum();
        let shared: f64 = self
            .shared_child_masses(basin)
            .map(|(_, ids)| {
                ids.filter_map(|m| masses.get(*m))
                    .map(|m| m.displaced_area(y))
                    .sum::<f64>()
            })
            .unwrap_or(0.0);
        let area = own - shared;
        debug_assert!(area >= -1e-9, "negative displaced area {area} in basin {id}");
        area.max(0.0)
    }

    /// Combined volume of everything inside the basin below `y`.
    pub fn displaced_volume(&self, id: BasinId, y: f64, masses: &MassArena) -> f64 {
        let Some(basin) = self.get(id) else {
            return 0.0;
        };
        let own: f64 = basin
            .masses
            .iter()
            .filter_map(|m| masses.get(*m))
            .map(|m| m.displaced_volume(y))
            .sum();
        let shared: f64 = self
            .shared_child_masses(basin)
            .map(|(child, ids)| {
                let y = y.min(child.extent.top);
                ids.filter_map(|m| masses.get(*m))
                    .map(|m| m.displaced_volume(y))
                    .sum::<f64>()
            })
            .unwrap_or(0.0);
        let volume = own - shared;
        debug_assert!(volume >= -1e-9, "negative displaced volume {volume} in basin {id}");
        volume.max(0.0)
    }

    /// Space left for liquid below `y`.
    pub fn empty_volume(&self, id: BasinId, y: f64, masses: &MassArena) -> f64 {
        let Some(basin) = self.get(id) else {
            return 0.0;
        };
        (basin.maximum_volume(y) - self.displaced_volume(id, y, masses)).max(0.0)
    }

    /// Cross-section left for liquid at `y`, the derivative of
    /// [`empty_volume`](Self::empty_volume).
    pub fn empty_area(&self, id: BasinId, y: f64, masses: &MassArena) -> f64 {
        let Some(basin) = self.get(id) else {
            return 0.0;
        };
        (basin.maximum_area(y) - self.displaced_area(id, y, masses)).max(0.0)
    }

    /// Height at which the basin's liquid volume exactly fills the empty
    /// space. Pinned to the rim when the liquid overflows.
    pub fn solve_height(&self, id: BasinId, masses: &MassArena, tolerance: f64) -> f64 {
        let Some(basin) = self.get(id) else {
            return 0.0;
        };
        let StepExtent { bottom, top } = basin.extent;
        let target = basin.liquid_volume;

        if target <= 0.0 {
            return bottom;
        }
        let capacity = self.empty_volume(id, top, masses);
        if target >= capacity {
            trace!("basin {id} full: {target} m³ against {capacity} m³ of room");
            return top;
        }

        find_root(
            bottom,
            top,
            tolerance,
            |y| self.empty_volume(id, y, masses) - target,
            |y| self.empty_area(id, y, masses),
        )
    }

    /// Solves and stores the liquid height of `id`.
    pub fn compute_height(&mut self, id: BasinId, masses: &MassArena, tolerance: f64) -> f64 {
        let height = self.solve_height(id, masses, tolerance);
        if let Some(basin) = self.get_mut(id) {
            basin.height.current = height;
        }
        height
    }

    /// Solves every basin, children first.
    pub fn compute_heights(&mut self, masses: &MassArena, tolerance: f64) {
        for id in self.solve_order() {
            self.compute_height(id, masses, tolerance);
        }
    }
}
