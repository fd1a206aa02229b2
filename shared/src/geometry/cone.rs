//! Right circular cone, base down (`vertex_up`) or base up.

use std::f64::consts::PI;

use bevy::math::DVec3;

use super::ring;

pub fn volume(radius: f64, height: f64) -> f64 {
    PI * radius * radius * height / 3.0
}

/// Distance from the body origin (center of mass) down to the bottom and up
/// to the top of the cone.
pub fn origin_offsets(height: f64, vertex_up: bool) -> (f64, f64) {
    if vertex_up {
        (height / 4.0, 3.0 * height / 4.0)
    } else {
        (3.0 * height / 4.0, height / 4.0)
    }
}

/// Radius of the cross-section as a fraction of the base radius.
#[inline]
fn radius_fraction(vertex_up: bool, t: f64) -> f64 {
    if vertex_up {
        1.0 - t
    } else {
        t
    }
}

pub fn area(radius: f64, vertex_up: bool, t: f64) -> f64 {
    let r = radius * radius_fraction(vertex_up, t);
    PI * r * r
}

/// Share of the cone's volume below normalized height `t`.
pub fn volume_fraction(vertex_up: bool, t: f64) -> f64 {
    if vertex_up {
        let remaining = 1.0 - t;
        1.0 - remaining * remaining * remaining
    } else {
        t * t * t
    }
}

pub fn hull_vertices(radius: f64, height: f64, vertex_up: bool) -> Vec<DVec3> {
    let (below, above) = origin_offsets(height, vertex_up);
    let (base_y, apex_y) = if vertex_up {
        (-below, above)
    } else {
        (above, -below)
    };
    let mut vertices = ring(radius, radius, base_y);
    vertices.push(DVec3::new(0.0, apex_y, 0.0));
    vertices
}
