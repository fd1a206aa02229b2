//! Displacement geometry for the supported solid shapes.
//!
//! Every shape answers two questions about a candidate liquid height `y`,
//! given the vertical extent it occupies this tick:
//! - how large its horizontal cross-section is at `y` (displaced area)
//! - how much of its volume lies below `y` (displaced volume)
//!
//! All formulas are closed forms in the normalized height `t` within the
//! extent. Bodies are treated as upright: rotation does not change
//! displacement.

pub mod boat;
pub mod cone;
pub mod ellipsoid;
pub mod horizontal_cylinder;
pub mod prism;

use bevy::math::DVec3;
use serde::{Deserialize, Serialize};

use crate::error::{positive_dimension, ModelError};

/// Cached vertical bounds of a body, refreshed once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StepExtent {
    pub bottom: f64,
    pub top: f64,
}

impl StepExtent {
    pub fn new(bottom: f64, top: f64) -> Self {
        debug_assert!(bottom <= top, "inverted extent [{bottom}, {top}]");
        Self { bottom, top }
    }

    #[inline]
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Normalized height of `y`, or `None` when `y` is outside the extent or
    /// the extent has no height.
    #[inline]
    pub fn ratio(&self, y: f64) -> Option<f64> {
        let height = self.height();
        if height <= 0.0 || y < self.bottom || y > self.top {
            None
        } else {
            Some(((y - self.bottom) / height).clamp(0.0, 1.0))
        }
    }

    /// True when the two ranges share any height, widened by `slip`.
    #[inline]
    pub fn overlaps(&self, other: &StepExtent, slip: f64) -> bool {
        self.bottom < other.top + slip && self.top > other.bottom - slip
    }
}

/// Collision shape handed to the rigid-body engine.
#[derive(Debug, Clone, PartialEq)]
pub enum BodyShape {
    Cuboid { half_extents: DVec3 },
    /// Box without a lid: a floor and four walls of the given thickness.
    OpenBox { half_extents: DVec3, thickness: f64 },
    /// Convex hull around the given points, relative to the body origin.
    ConvexHull { vertices: Vec<DVec3> },
}

impl BodyShape {
    /// Corners of the axis-aligned box enclosing the shape, relative to the
    /// body origin.
    pub fn local_bounds(&self) -> (DVec3, DVec3) {
        match self {
            BodyShape::Cuboid { half_extents } | BodyShape::OpenBox { half_extents, .. } => {
                (-*half_extents, *half_extents)
            }
            BodyShape::ConvexHull { vertices } => vertices.iter().fold(
                (DVec3::splat(f64::INFINITY), DVec3::splat(f64::NEG_INFINITY)),
                |(min, max), v| (min.min(*v), max.max(*v)),
            ),
        }
    }
}

/// The closed set of solid shapes with their size parameters (meters).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MassShape {
    Cuboid {
        width: f64,
        height: f64,
        depth: f64,
    },
    /// Cone with its body origin at the center of mass, a quarter of the
    /// height above the base.
    Cone {
        radius: f64,
        height: f64,
        vertex_up: bool,
    },
    /// Ellipsoid sized by its bounding box.
    Ellipsoid {
        width: f64,
        height: f64,
        depth: f64,
    },
    VerticalCylinder {
        radius: f64,
        height: f64,
    },
    /// Cylinder lying along the z axis.
    HorizontalCylinder {
        radius: f64,
        length: f64,
    },
    /// Open-topped box with walls and floor of the given thickness.
    Boat {
        width: f64,
        height: f64,
        depth: f64,
        thickness: f64,
    },
}

impl MassShape {
    pub fn cube(side: f64) -> Self {
        MassShape::Cuboid {
            width: side,
            height: side,
            depth: side,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MassShape::Cuboid { .. } => "cuboid",
            MassShape::Cone { .. } => "cone",
            MassShape::Ellipsoid { .. } => "ellipsoid",
            MassShape::VerticalCylinder { .. } => "vertical cylinder",
            MassShape::HorizontalCylinder { .. } => "horizontal cylinder",
            MassShape::Boat { .. } => "boat",
        }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        match *self {
            MassShape::Cuboid {
                width,
                height,
                depth,
            }
            | MassShape::Ellipsoid {
                width,
                height,
                depth,
            } => {
                positive_dimension("width", width)?;
                positive_dimension("height", height)?;
                positive_dimension("depth", depth)?;
            }
            MassShape::Cone { radius, height, .. }
            | MassShape::VerticalCylinder { radius, height } => {
                positive_dimension("radius", radius)?;
                positive_dimension("height", height)?;
            }
            MassShape::HorizontalCylinder { radius, length } => {
                positive_dimension("radius", radius)?;
                positive_dimension("length", length)?;
            }
            MassShape::Boat {
                width,
                height,
                depth,
                thickness,
            } => {
                positive_dimension("width", width)?;
                positive_dimension("height", height)?;
                positive_dimension("depth", depth)?;
                positive_dimension("thickness", thickness)?;
                boat::validate_hull(width, height, depth, thickness)?;
            }
        }
        Ok(())
    }

    /// Volume enclosed by the outer surface. This is what the shape displaces
    /// once fully submerged.
    pub fn envelope_volume(&self) -> f64 {
        match *self {
            MassShape::Cuboid {
                width,
                height,
                depth,
            } => width * height * depth,
            MassShape::Cone { radius, height, .. } => cone::volume(radius, height),
            MassShape::Ellipsoid {
                width,
                height,
                depth,
            } => ellipsoid::volume(width / 2.0, height / 2.0, depth / 2.0),
            MassShape::VerticalCylinder { radius, height } => {
                std::f64::consts::PI * radius * radius * height
            }
            MassShape::HorizontalCylinder { radius, length } => {
                horizontal_cylinder::volume(radius, length)
            }
            MassShape::Boat {
                width,
                height,
                depth,
                ..
            } => width * height * depth,
        }
    }

    /// Volume of material the body is made of. Differs from the envelope
    /// only for hollow shapes.
    pub fn material_volume(&self) -> f64 {
        match *self {
            MassShape::Boat {
                width,
                height,
                depth,
                thickness,
            } => boat::hull_volume(width, height, depth, thickness),
            _ => self.envelope_volume(),
        }
    }

    /// Vertical extent of the shape when its body origin sits at `center_y`.
    pub fn extent_at(&self, center_y: f64) -> StepExtent {
        let (below, above) = match *self {
            MassShape::Cuboid { height, .. }
            | MassShape::VerticalCylinder { height, .. }
            | MassShape::Boat { height, .. }
            | MassShape::Ellipsoid { height, .. } => (height / 2.0, height / 2.0),
            MassShape::Cone {
                height, vertex_up, ..
            } => cone::origin_offsets(height, vertex_up),
            MassShape::HorizontalCylinder { radius, .. } => (radius, radius),
        };
        StepExtent::new(center_y - below, center_y + above)
    }

    /// Horizontal cross-section at height `y`, zero outside the extent.
    pub fn displaced_area(&self, extent: &StepExtent, y: f64) -> f64 {
        let Some(t) = extent.ratio(y) else {
            return 0.0;
        };
        let area = match *self {
            MassShape::Cuboid { width, depth, .. } | MassShape::Boat { width, depth, .. } => {
                prism::area(width * depth)
            }
            MassShape::VerticalCylinder { radius, .. } => {
                prism::area(std::f64::consts::PI * radius * radius)
            }
            MassShape::Cone {
                radius, vertex_up, ..
            } => cone::area(radius, vertex_up, t),
            MassShape::Ellipsoid { width, depth, .. } => {
                ellipsoid::area(width / 2.0, depth / 2.0, t)
            }
            MassShape::HorizontalCylinder { radius, length } => {
                horizontal_cylinder::area(2.0 * radius * length, t)
            }
        };
        debug_assert!(area >= 0.0, "negative displaced area {area}");
        area
    }

    /// Volume of the shape below height `y`.
    pub fn displaced_volume(&self, extent: &StepExtent, y: f64) -> f64 {
        if y <= extent.bottom {
            return 0.0;
        }
        let full = self.envelope_volume();
        if y >= extent.top {
            return full;
        }
        let Some(t) = extent.ratio(y) else {
            return 0.0;
        };
        let volume = match *self {
            MassShape::Cuboid { .. }
            | MassShape::VerticalCylinder { .. }
            | MassShape::Boat { .. } => prism::volume(full, t),
            MassShape::Cone { vertex_up, .. } => cone::volume_fraction(vertex_up, t) * full,
            MassShape::Ellipsoid { .. } => ellipsoid::volume_fraction(t) * full,
            MassShape::HorizontalCylinder { .. } => {
                horizontal_cylinder::volume_fraction(t) * full
            }
        };
        debug_assert!(volume >= 0.0, "negative displaced volume {volume}");
        volume
    }

    /// Uniformly rescales the shape so its material volume becomes `volume`.
    pub fn scaled_to_volume(&self, volume: f64) -> Result<Self, ModelError> {
        if !(volume.is_finite() && volume > 0.0) {
            return Err(ModelError::InvalidVolume(volume));
        }
        let factor = (volume / self.material_volume()).cbrt();
        let scaled = match *self {
            MassShape::Cuboid {
                width,
                height,
                depth,
            } => MassShape::Cuboid {
                width: width * factor,
                height: height * factor,
                depth: depth * factor,
            },
            MassShape::Cone {
                radius,
                height,
                vertex_up,
            } => MassShape::Cone {
                radius: radius * factor,
                height: height * factor,
                vertex_up,
            },
            MassShape::Ellipsoid {
                width,
                height,
                depth,
            } => MassShape::Ellipsoid {
                width: width * factor,
                height: height * factor,
                depth: depth * factor,
            },
            MassShape::VerticalCylinder { radius, height } => MassShape::VerticalCylinder {
                radius: radius * factor,
                height: height * factor,
            },
            MassShape::HorizontalCylinder { radius, length } => {
                MassShape::HorizontalCylinder {
                    radius: radius * factor,
                    length: length * factor,
                }
            }
            MassShape::Boat {
                width,
                height,
                depth,
                thickness,
            } => MassShape::Boat {
                width: width * factor,
                height: height * factor,
                depth: depth * factor,
                thickness: thickness * factor,
            },
        };
        Ok(scaled)
    }

    /// Collision shape for the rigid-body engine, relative to the body origin.
    pub fn body_shape(&self) -> BodyShape {
        match *self {
            MassShape::Cuboid {
                width,
                height,
                depth,
            } => BodyShape::Cuboid {
                half_extents: DVec3::new(width, height, depth) / 2.0,
            },
            MassShape::Boat {
                width,
                height,
                depth,
                thickness,
            } => BodyShape::OpenBox {
                half_extents: DVec3::new(width, height, depth) / 2.0,
                thickness,
            },
            MassShape::Cone {
                radius,
                height,
                vertex_up,
            } => BodyShape::ConvexHull {
                vertices: cone::hull_vertices(radius, height, vertex_up),
            },
            MassShape::Ellipsoid {
                width,
                height,
                depth,
            } => BodyShape::ConvexHull {
                vertices: ellipsoid::hull_vertices(width / 2.0, height / 2.0, depth / 2.0),
            },
            MassShape::VerticalCylinder { radius, height } => {
                let half = height / 2.0;
                let mut vertices = ring(radius, radius, -half);
                vertices.extend(ring(radius, radius, half));
                BodyShape::ConvexHull { vertices }
            }
            MassShape::HorizontalCylinder { radius, length } => BodyShape::ConvexHull {
                vertices: horizontal_cylinder::hull_vertices(radius, length),
            },
        }
    }
}

pub(crate) const RING_SEGMENTS: usize = 16;

/// Horizontal ellipse of hull points at height `y`.
pub(crate) fn ring(radius_x: f64, radius_z: f64, y: f64) -> Vec<DVec3> {
    (0..RING_SEGMENTS)
        .map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / RING_SEGMENTS as f64;
            DVec3::new(radius_x * angle.cos(), y, radius_z * angle.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn all_shapes() -> Vec<MassShape> {
        vec![
            MassShape::Cuboid {
                width: 0.3,
                height: 0.2,
                depth: 0.4,
            },
            MassShape::Cone {
                radius: 0.2,
                height: 0.5,
                vertex_up: true,
            },
            MassShape::Cone {
                radius: 0.2,
                height: 0.5,
                vertex_up: false,
            },
            MassShape::Ellipsoid {
                width: 0.4,
                height: 0.3,
                depth: 0.2,
            },
            MassShape::VerticalCylinder {
                radius: 0.15,
                height: 0.4,
            },
            MassShape::HorizontalCylinder {
                radius: 0.15,
                length: 0.5,
            },
            MassShape::Boat {
                width: 1.0,
                height: 0.3,
                depth: 0.6,
                thickness: 0.05,
            },
        ]
    }

    /// Simpson integration of the displaced area across the extent.
    fn integrate_area(shape: &MassShape, extent: &StepExtent, upto: f64) -> f64 {
        let steps = 20_000;
        let h = (upto - extent.bottom) / steps as f64;
        let mut sum = shape.displaced_area(extent, extent.bottom)
            + shape.displaced_area(extent, upto);
        for i in 1..steps {
            let y = extent.bottom + i as f64 * h;
            let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
            sum += weight * shape.displaced_area(extent, y);
        }
        sum * h / 3.0
    }

    #[test]
    fn test_volume_boundaries() {
        for shape in all_shapes() {
            let extent = shape.extent_at(1.0);
            assert_eq!(shape.displaced_volume(&extent, extent.bottom), 0.0);
            assert_eq!(shape.displaced_volume(&extent, extent.bottom - 1.0), 0.0);
            let full = shape.envelope_volume();
            assert!(
                (shape.displaced_volume(&extent, extent.top) - full).abs() < EPSILON,
                "{} not full at top",
                shape.kind()
            );
            assert_eq!(shape.displaced_volume(&extent, extent.top + 1.0), full);
        }
    }

    #[test]
    fn test_area_zero_outside_extent() {
        for shape in all_shapes() {
            let extent = shape.extent_at(0.0);
            assert_eq!(shape.displaced_area(&extent, extent.bottom - 0.01), 0.0);
            assert_eq!(shape.displaced_area(&extent, extent.top + 0.01), 0.0);
        }
    }

    #[test]
    fn test_area_integrates_to_volume() {
        for shape in all_shapes() {
            let extent = shape.extent_at(0.5);
            for fraction in [0.1, 0.37, 0.5, 0.81, 1.0] {
                let y = extent.bottom + fraction * extent.height();
                let integrated = integrate_area(&shape, &extent, y);
                let volume = shape.displaced_volume(&extent, y);
                assert!(
                    (integrated - volume).abs() < 1e-6,
                    "{}: integral {integrated} vs volume {volume} at {fraction}",
                    shape.kind()
                );
            }
        }
    }

    #[test]
    fn test_volume_monotonic() {
        for shape in all_shapes() {
            let extent = shape.extent_at(0.0);
            let mut previous = 0.0;
            for i in 0..=100 {
                let y = extent.bottom + extent.height() * i as f64 / 100.0;
                let volume = shape.displaced_volume(&extent, y);
                assert!(volume + 1e-15 >= previous, "{} not monotonic", shape.kind());
                previous = volume;
            }
        }
    }

    #[test]
    fn test_degenerate_extent() {
        let extent = StepExtent::new(2.0, 2.0);
        for shape in all_shapes() {
            assert_eq!(shape.displaced_area(&extent, 2.0), 0.0, "{}", shape.kind());
            assert_eq!(shape.displaced_area(&extent, 2.5), 0.0, "{}", shape.kind());
            assert_eq!(shape.displaced_volume(&extent, 2.0), 0.0, "{}", shape.kind());
            assert_eq!(shape.displaced_volume(&extent, 1.0), 0.0, "{}", shape.kind());
            let above = shape.displaced_volume(&extent, 2.5);
            assert!(
                (above - shape.envelope_volume()).abs() < 1e-12,
                "{}",
                shape.kind()
            );
        }
    }

    #[test]
    fn test_cone_extent_offsets() {
        let up = MassShape::Cone {
            radius: 0.1,
            height: 0.4,
            vertex_up: true,
        };
        let extent = up.extent_at(0.0);
        assert!((extent.bottom + 0.1).abs() < EPSILON);
        assert!((extent.top - 0.3).abs() < EPSILON);

        let down = MassShape::Cone {
            radius: 0.1,
            height: 0.4,
            vertex_up: false,
        };
        let extent = down.extent_at(0.0);
        assert!((extent.bottom + 0.3).abs() < EPSILON);
        assert!((extent.top - 0.1).abs() < EPSILON);
    }

    #[test]
    fn test_scaled_to_volume() {
        for shape in all_shapes() {
            let scaled = shape.scaled_to_volume(0.002).unwrap();
            assert!((scaled.material_volume() - 0.002).abs() < 1e-12);
            assert_eq!(scaled.kind(), shape.kind());
        }
        assert!(MassShape::cube(1.0).scaled_to_volume(0.0).is_err());
    }

    #[test]
    fn test_validation() {
        assert!(MassShape::cube(0.1).validate().is_ok());
        assert!(MassShape::cube(0.0).validate().is_err());
        assert!(MassShape::VerticalCylinder {
            radius: -0.1,
            height: 1.0
        }
        .validate()
        .is_err());
        assert!(MassShape::Boat {
            width: 1.0,
            height: 0.5,
            depth: 1.0,
            thickness: 0.6,
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_body_shape_bounds() {
        let cone = MassShape::Cone {
            radius: 0.2,
            height: 0.8,
            vertex_up: true,
        };
        let (min, max) = cone.body_shape().local_bounds();
        assert!((max.x - 0.2).abs() < EPSILON);
        assert!((min.y + 0.2).abs() < EPSILON);
        assert!((max.y - 0.6).abs() < EPSILON);

        let (min, max) = MassShape::cube(0.5).body_shape().local_bounds();
        assert_eq!(min, DVec3::splat(-0.25));
        assert_eq!(max, DVec3::splat(0.25));

        let boat = MassShape::Boat {
            width: 1.0,
            height: 0.4,
            depth: 0.6,
            thickness: 0.05,
        };
        let hull = boat.body_shape();
        assert!(matches!(hull, BodyShape::OpenBox { thickness, .. } if thickness == 0.05));
        let (min, max) = hull.local_bounds();
        assert_eq!(min, DVec3::new(-0.5, -0.2, -0.3));
        assert_eq!(max, DVec3::new(0.5, 0.2, 0.3));
    }

    #[test]
    fn test_extent_overlap() {
        let a = StepExtent::new(0.0, 1.0);
        let b = StepExtent::new(1.005, 2.0);
        assert!(!a.overlaps(&b, 0.0));
        assert!(a.overlaps(&b, 0.01));
    }
}
