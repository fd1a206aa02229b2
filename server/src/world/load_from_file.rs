use bevy::math::DVec3;
use bevy_log::info;
use ron::de::from_str;
use serde::{Deserialize, Serialize};
use shared::{
    BasinId, BuoyancyConfig, BuoyancyModel, MassId, MassShape, MassSpec, Material, ModelError,
    ModelSnapshot, RapierEngine, ScaleUnits,
};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Scene used when no file is given.
pub const DEFAULT_SCENE: &str = include_str!("../../scenes/default.ron");

/// A material picked by preset name or given explicitly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MaterialChoice {
    Preset(String),
    Solid {
        name: String,
        density: f64,
    },
    Liquid {
        name: String,
        density: f64,
        viscosity: f64,
    },
}

impl MaterialChoice {
    pub fn resolve(&self) -> Result<Material, SceneError> {
        match self {
            MaterialChoice::Preset(name) => {
                Material::preset(name).ok_or_else(|| SceneError::UnknownMaterial(name.clone()))
            }
            MaterialChoice::Solid { name, density } => {
                Ok(Material::solid(name.clone(), *density)?)
            }
            MaterialChoice::Liquid {
                name,
                density,
                viscosity,
            } => Ok(Material::liquid(name.clone(), *density, *viscosity)?),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundDefinition {
    pub size: DVec3,
    pub position: DVec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolDefinition {
    pub name: String,
    pub min: DVec3,
    pub max: DVec3,
    pub liquid_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MassDefinition {
    pub name: String,
    pub shape: MassShape,
    pub material: MaterialChoice,
    pub position: DVec3,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub scale: Option<ScaleUnits>,
    /// Pool a boat floats in. Boats without one keep their interior
    /// unattached.
    #[serde(default)]
    pub container: Option<String>,
    /// Liquid a boat starts out holding, m³.
    #[serde(default)]
    pub liquid_volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneFile {
    pub name: String,
    pub config: BuoyancyConfig,
    pub liquid: MaterialChoice,
    pub ground: Vec<GroundDefinition>,
    pub pools: Vec<PoolDefinition>,
    pub masses: Vec<MassDefinition>,
}

impl Default for SceneFile {
    fn default() -> Self {
        Self {
            name: "empty".to_string(),
            config: BuoyancyConfig::default(),
            liquid: MaterialChoice::Preset("water".to_string()),
            ground: Vec::new(),
            pools: Vec::new(),
            masses: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    UnknownMaterial(String),
    UnknownPool { mass: String, pool: String },
    Model(ModelError),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::UnknownMaterial(name) => write!(f, "unknown material preset '{name}'"),
            SceneError::UnknownPool { mass, pool } => {
                write!(f, "'{mass}' floats in unknown pool '{pool}'")
            }
            SceneError::Model(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SceneError {}

impl From<ModelError> for SceneError {
    fn from(err: ModelError) -> Self {
        SceneError::Model(err)
    }
}

/// A scene turned into a running model.
#[derive(Debug)]
pub struct BuiltScene {
    pub model: BuoyancyModel,
    pub engine: RapierEngine,
    pub pools: HashMap<String, BasinId>,
    pub masses: HashMap<String, MassId>,
}

impl SceneFile {
    pub fn parse(contents: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Ok(from_str(contents)?)
    }

    pub fn build(&self) -> Result<BuiltScene, SceneError> {
        let mut engine = RapierEngine::new();
        let mut model = BuoyancyModel::new(self.config.clone(), self.liquid.resolve()?)?;

        for ground in &self.ground {
            model.add_ground(&mut engine, ground.size, ground.position);
        }

        let mut pools = HashMap::new();
        for pool in &self.pools {
            let id = model.add_pool(&mut engine, pool.min, pool.max, pool.liquid_volume)?;
            pools.insert(pool.name.clone(), id);
        }

        let mut masses = HashMap::new();
        for definition in &self.masses {
            let mut spec = MassSpec::new(
                definition.name.clone(),
                definition.shape,
                definition.material.resolve()?,
            )
            .at(definition.position);
            if definition.is_static {
                spec = spec.fixed();
            }
            if let Some(units) = definition.scale {
                spec = spec.as_scale(units);
            }

            let id = match &definition.container {
                Some(pool) => {
                    let container = pools.get(pool).copied().ok_or_else(|| {
                        SceneError::UnknownPool {
                            mass: definition.name.clone(),
                            pool: pool.clone(),
                        }
                    })?;
                    let (id, interior) = model.add_boat(&mut engine, spec, container)?;
                    model.set_liquid_volume(interior, definition.liquid_volume)?;
                    model.set_initial_liquid_volume(interior, definition.liquid_volume)?;
                    id
                }
                None => model.add_mass(&mut engine, spec)?,
            };
            masses.insert(definition.name.clone(), id);
        }

        info!(
            "Scene {} built with {} pools and {} masses",
            self.name,
            pools.len(),
            masses.len()
        );

        Ok(BuiltScene {
            model,
            engine,
            pools,
            masses,
        })
    }
}

/// Reads a scene from disk, or the built-in scene when `path` is `None`.
pub fn load_scene(path: Option<&Path>) -> Result<SceneFile, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        info!("No scene file given, using the default scene");
        return SceneFile::parse(DEFAULT_SCENE);
    };

    let contents: String = fs::read_to_string(path)?;
    let scene = SceneFile::parse(&contents)?;

    info!("Found scene file from disk: {}", path.display());

    Ok(scene)
}

pub fn load_snapshot(path: &Path) -> Result<ModelSnapshot, Box<dyn std::error::Error>> {
    let contents: String = fs::read_to_string(path)?;
    let snapshot = ModelSnapshot::from_ron(&contents)?;
    info!(
        "Found snapshot file from disk: {} (tick {})",
        path.display(),
        snapshot.tick
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scene_builds() {
        let scene = load_scene(None).unwrap();
        assert_eq!(scene.name, "harbor");

        let built = scene.build().unwrap();
        let pool = built.pools["pool"];
        assert!((built.model.liquid_height(pool).unwrap() - -0.5).abs() < 1e-6);

        let dinghy = built.masses["dinghy"];
        let interior = built
            .model
            .mass(dinghy)
            .unwrap()
            .interior_basin()
            .unwrap();
        assert_eq!(built.model.basin(pool).unwrap().child(), Some(interior));
        assert!((built.model.liquid_volume(interior).unwrap() - 0.05).abs() < 1e-12);
        assert!((built.model.total_liquid_volume() - 4.05).abs() < 1e-9);
    }

    #[test]
    fn test_minimal_scene_uses_defaults() {
        let scene = SceneFile::parse("(name: \"bare\")").unwrap();
        assert_eq!(scene.config, BuoyancyConfig::default());
        assert_eq!(scene.liquid, MaterialChoice::Preset("water".to_string()));
        let built = scene.build().unwrap();
        assert_eq!(built.model.masses().len(), 0);
    }

    #[test]
    fn test_material_choices() {
        let oak = MaterialChoice::Solid {
            name: "oak".to_string(),
            density: 750.0,
        };
        assert_eq!(oak.resolve().unwrap().density, 750.0);

        assert_eq!(
            MaterialChoice::Preset("unobtainium".to_string()).resolve(),
            Err(SceneError::UnknownMaterial("unobtainium".to_string()))
        );
        assert!(matches!(
            MaterialChoice::Liquid {
                name: "void".to_string(),
                density: -1.0,
                viscosity: 0.0,
            }
            .resolve(),
            Err(SceneError::Model(ModelError::InvalidMaterial { .. }))
        ));
    }

    #[test]
    fn test_unknown_pool_is_rejected() {
        let scene = SceneFile::parse(
            r#"(
                masses: [
                    (
                        name: "raft",
                        shape: Boat(width: 1.0, height: 0.3, depth: 1.0, thickness: 0.05),
                        material: Preset("wood"),
                        position: (0.0, 0.0, 0.0),
                        container: Some("lake"),
                    ),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(
            scene.build().unwrap_err(),
            SceneError::UnknownPool {
                mass: "raft".to_string(),
                pool: "lake".to_string(),
            }
        );
    }

    #[test]
    fn test_only_boats_float_in_a_container() {
        let scene = SceneFile::parse(
            r#"(
                pools: [
                    (name: "pool", min: (-1.0, -1.0, -1.0), max: (1.0, 0.0, 1.0), liquid_volume: 1.0),
                ],
                masses: [
                    (
                        name: "block",
                        shape: Cuboid(width: 0.1, height: 0.1, depth: 0.1),
                        material: Preset("wood"),
                        position: (0.0, -0.5, 0.0),
                        container: Some("pool"),
                    ),
                ],
            )"#,
        )
        .unwrap();

        assert_eq!(
            scene.build().unwrap_err(),
            SceneError::Model(ModelError::NotABoat("cuboid"))
        );
    }

    #[test]
    fn test_missing_file() {
        assert!(load_scene(Some(Path::new("/nonexistent/scene.ron"))).is_err());
        assert!(load_snapshot(Path::new("/nonexistent/snapshot.ron")).is_err());
    }
}
