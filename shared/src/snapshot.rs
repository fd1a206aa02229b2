//! Serializable state of a model, for saving and restoring a running scene.

use bevy::math::DVec3;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize};

use crate::basin::BasinId;
use crate::interpolation::Interpolated;
use crate::mass::MassId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinSnapshot {
    pub id: BasinId,
    pub liquid_volume: f64,
    pub height: Interpolated<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassSnapshot {
    pub id: MassId,
    pub volume: f64,
    pub position: Interpolated<DVec3>,
    pub velocity: DVec3,
    pub submerged_volume: f64,
}

/// Restorable onto a model with the same basins and masses.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub tick: u64,
    pub basins: Vec<BasinSnapshot>,
    pub masses: Vec<MassSnapshot>,
}

impl ModelSnapshot {
    pub fn to_ron(&self) -> Result<String, Box<dyn std::error::Error>> {
        let pretty_config = PrettyConfig::new()
            .with_depth_limit(3)
            .with_separate_tuple_members(true)
            .with_enumerate_arrays(false);
        Ok(ron::ser::to_string_pretty(self, pretty_config)?)
    }

    pub fn from_ron(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(ron::de::from_str(contents)?)
    }

    pub fn basin(&self, id: BasinId) -> Option<&BasinSnapshot> {
        self.basins.iter().find(|b| b.id == id)
    }

    pub fn mass(&self, id: MassId) -> Option<&MassSnapshot> {
        self.masses.iter().find(|m| m.id == id)
    }
}
