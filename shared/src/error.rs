//! Errors raised when a model is constructed or mutated with bad input.
//!
//! Numeric edge cases (dry basins, zero-height shapes, root finder
//! stagnation) are handled in place and never show up here.

use std::fmt;

use crate::basin::BasinId;
use crate::mass::MassId;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A shape dimension was zero, negative or not finite.
    InvalidDimension { name: &'static str, value: f64 },
    /// A mass volume was zero, negative or not finite.
    InvalidVolume(f64),
    /// A liquid volume was negative or not finite.
    InvalidLiquidVolume(f64),
    /// A material density or viscosity was out of range.
    InvalidMaterial { name: String, reason: &'static str },
    /// Gravity must be strictly positive.
    InvalidGravity(f64),
    /// A boat wall is too thick for its outer dimensions.
    HullTooThick { thickness: f64, limit: f64 },
    UnknownBasin(BasinId),
    UnknownMass(MassId),
    /// A basin cannot be nested inside itself, directly or through a chain.
    SelfContainment(BasinId),
    /// The parent basin already holds a different child basin.
    ChildBasinOccupied { parent: BasinId, existing: BasinId },
    /// The basin is already nested in another container.
    AlreadyNested { child: BasinId, parent: BasinId },
    /// Boats hold a basin, so they cannot turn into another shape and back.
    ShapeKindChange { from: &'static str, to: &'static str },
    /// Only boats carry an interior basin.
    NotABoat(&'static str),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension { name, value } => {
                write!(f, "invalid {name}: {value} (must be positive and finite)")
            }
            Self::InvalidVolume(v) => write!(f, "invalid mass volume: {v} m³"),
            Self::InvalidLiquidVolume(v) => write!(f, "invalid liquid volume: {v} m³"),
            Self::InvalidMaterial { name, reason } => {
                write!(f, "invalid material {name}: {reason}")
            }
            Self::InvalidGravity(g) => write!(f, "invalid gravity: {g} m/s²"),
            Self::HullTooThick { thickness, limit } => write!(
                f,
                "hull thickness {thickness} m leaves no interior (limit {limit} m)"
            ),
            Self::UnknownBasin(id) => write!(f, "unknown basin {id}"),
            Self::UnknownMass(id) => write!(f, "unknown mass {id}"),
            Self::SelfContainment(id) => write!(f, "basin {id} would contain itself"),
            Self::ChildBasinOccupied { parent, existing } => write!(
                f,
                "basin {parent} already contains child basin {existing}"
            ),
            Self::AlreadyNested { child, parent } => {
                write!(f, "basin {child} is already nested in basin {parent}")
            }
            Self::ShapeKindChange { from, to } => {
                write!(f, "cannot change a {from} into a {to}")
            }
            Self::NotABoat(kind) => write!(f, "a {kind} has no interior basin"),
        }
    }
}

impl std::error::Error for ModelError {}

/// Checks that a size parameter is usable for geometry.
pub(crate) fn positive_dimension(name: &'static str, value: f64) -> Result<f64, ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::InvalidDimension { name, value })
    }
}
