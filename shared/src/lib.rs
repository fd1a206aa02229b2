pub mod basin;
pub mod clock;
pub mod config;
pub mod constants;
pub mod error;
pub mod geometry;
pub mod interpolation;
pub mod mass;
pub mod material;
pub mod model;
pub mod physics;
pub mod scale;
pub mod snapshot;
pub mod solver;

pub use basin::{Basin, BasinArena, BasinId, BasinKind};
pub use clock::StepClock;
pub use config::{BuoyancyConfig, Gravity};
pub use constants::*;
pub use error::ModelError;
pub use geometry::{BodyShape, MassShape, StepExtent};
pub use mass::{Mass, MassArena, MassForces, MassId, MassSpec, SubmersionState};
pub use material::Material;
pub use model::BuoyancyModel;
pub use physics::rapier::RapierEngine;
pub use physics::{BodyDescriptor, BodyHandle, BodyTransform, RigidBodyEngine};
pub use scale::{ScaleReadout, ScaleUnits};
pub use snapshot::ModelSnapshot;
