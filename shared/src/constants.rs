pub const TICKS_PER_SECOND: u64 = 60;
/// Maximum fixed ticks run for a single frame before time is dropped.
pub const MAX_CATCH_UP_TICKS: u32 = 5;

/// Earth gravity, m/s².
pub const GRAVITY: f64 = 9.8;

/// Absolute tolerance (world units) for liquid height solving.
pub const ROOT_TOLERANCE: f64 = 1e-7;
/// Hard ceiling on root finder iterations.
pub const MAX_ROOT_ITERATIONS: u32 = 200;

/// Vertical overlap allowed before a mass counts as resting inside a basin.
/// Tuned for solver stiffness, not geometry.
pub const SLIP_TOLERANCE: f64 = 1e-2;

/// Floor applied to body masses handed to the rigid-body engine (kg).
pub const MINIMUM_BODY_MASS: f64 = 0.01;

/// Viscous drag scale applied on top of the liquid viscosity.
pub const LINEAR_DRAG_SCALE: f64 = 3000.0;
/// Quadratic (form) drag coefficient, dimensionless.
pub const QUADRATIC_DRAG_COEFFICIENT: f64 = 0.0;

pub const CONFIG_READ_ERROR: &str = "Failed to read scene file";
pub const SNAPSHOT_WRITE_ERROR: &str = "Failed to write snapshot file";
