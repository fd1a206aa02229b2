//! Open-topped hollow box. Outside it displaces like a solid box; inside it
//! forms a basin whose floor sits one wall thickness above the keel.

use crate::error::ModelError;

/// Width and depth of the interior.
pub fn interior_footprint(width: f64, depth: f64, thickness: f64) -> f64 {
    (width - 2.0 * thickness) * (depth - 2.0 * thickness)
}

/// Interior volume up to the rim.
pub fn interior_capacity(width: f64, height: f64, depth: f64, thickness: f64) -> f64 {
    interior_footprint(width, depth, thickness) * (height - thickness)
}

/// Volume of the walls and floor.
pub fn hull_volume(width: f64, height: f64, depth: f64, thickness: f64) -> f64 {
    width * height * depth - interior_capacity(width, height, depth, thickness)
}

pub fn validate_hull(
    width: f64,
    height: f64,
    depth: f64,
    thickness: f64,
) -> Result<(), ModelError> {
    let limit = (width / 2.0).min(depth / 2.0).min(height);
    if thickness >= limit {
        return Err(ModelError::HullTooThick { thickness, limit });
    }
    Ok(())
}

/// Volume the boat pushes out of the surrounding liquid, less what is held
/// inside it below the interior liquid line. Negative when the boat carries
/// more than it displaces, so the load drags it down.
pub fn buoyant_volume(displaced_volume: f64, interior_filled_volume: f64) -> f64 {
    displaced_volume - interior_filled_volume
}
