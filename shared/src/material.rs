//! Solid and liquid materials.
//!
//! Densities are in kg/m³, viscosities in Pa·s. Solids carry a viscosity of
//! zero; only the liquid's viscosity feeds drag.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub density: f64,
    pub viscosity: f64,
    pub liquid: bool,
}

impl Material {
    pub fn solid(name: impl Into<String>, density: f64) -> Result<Self, ModelError> {
        Self::validated(name.into(), density, 0.0, false)
    }

    pub fn liquid(
        name: impl Into<String>,
        density: f64,
        viscosity: f64,
    ) -> Result<Self, ModelError> {
        Self::validated(name.into(), density, viscosity, true)
    }

    fn validated(
        name: String,
        density: f64,
        viscosity: f64,
        liquid: bool,
    ) -> Result<Self, ModelError> {
        if !(density.is_finite() && density > 0.0) {
            return Err(ModelError::InvalidMaterial {
                name,
                reason: "density must be positive",
            });
        }
        if !(viscosity.is_finite() && viscosity >= 0.0) {
            return Err(ModelError::InvalidMaterial {
                name,
                reason: "viscosity must not be negative",
            });
        }
        Ok(Self {
            name,
            density,
            viscosity,
            liquid,
        })
    }

    fn preset_solid(name: &str, density: f64) -> Self {
        Self {
            name: name.to_string(),
            density,
            viscosity: 0.0,
            liquid: false,
        }
    }

    fn preset_liquid(name: &str, density: f64, viscosity: f64) -> Self {
        Self {
            name: name.to_string(),
            density,
            viscosity,
            liquid: true,
        }
    }

    pub fn aluminum() -> Self {
        Self::preset_solid("aluminum", 2700.0)
    }

    pub fn brick() -> Self {
        Self::preset_solid("brick", 2000.0)
    }

    pub fn copper() -> Self {
        Self::preset_solid("copper", 8960.0)
    }

    pub fn gold() -> Self {
        Self::preset_solid("gold", 19320.0)
    }

    pub fn human() -> Self {
        Self::preset_solid("human", 950.0)
    }

    pub fn ice() -> Self {
        Self::preset_solid("ice", 919.0)
    }

    pub fn lead() -> Self {
        Self::preset_solid("lead", 11342.0)
    }

    pub fn platinum() -> Self {
        Self::preset_solid("platinum", 21450.0)
    }

    pub fn pvc() -> Self {
        Self::preset_solid("pvc", 1380.0)
    }

    pub fn steel() -> Self {
        Self::preset_solid("steel", 7800.0)
    }

    pub fn styrofoam() -> Self {
        Self::preset_solid("styrofoam", 14.0)
    }

    pub fn wood() -> Self {
        Self::preset_solid("wood", 400.0)
    }

    pub fn water() -> Self {
        Self::preset_liquid("water", 1000.0, 0.001)
    }

    pub fn seawater() -> Self {
        Self::preset_liquid("seawater", 1029.0, 0.00108)
    }

    pub fn gasoline() -> Self {
        Self::preset_liquid("gasoline", 680.0, 0.0006)
    }

    pub fn oil() -> Self {
        Self::preset_liquid("oil", 920.0, 0.08)
    }

    pub fn honey() -> Self {
        Self::preset_liquid("honey", 1440.0, 0.3)
    }

    pub fn mercury() -> Self {
        Self::preset_liquid("mercury", 13593.0, 0.0015)
    }

    /// Looks up a preset by name, case-insensitively.
    pub fn preset(name: &str) -> Option<Self> {
        let material = match name.to_ascii_lowercase().as_str() {
            "aluminum" => Self::aluminum(),
            "brick" => Self::brick(),
            "copper" => Self::copper(),
            "gold" => Self::gold(),
            "human" => Self::human(),
            "ice" => Self::ice(),
            "lead" => Self::lead(),
            "platinum" => Self::platinum(),
            "pvc" => Self::pvc(),
            "steel" => Self::steel(),
            "styrofoam" => Self::styrofoam(),
            "wood" => Self::wood(),
            "water" => Self::water(),
            "seawater" => Self::seawater(),
            "gasoline" => Self::gasoline(),
            "oil" => Self::oil(),
            "honey" => Self::honey(),
            "mercury" => Self::mercury(),
            _ => return None,
        };
        Some(material)
    }
}
