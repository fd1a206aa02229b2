//! Axis-aligned ellipsoid with semi-axes `a` (x), `b` (y) and `c` (z).

use std::f64::consts::PI;

use bevy::math::DVec3;

use super::ring;

pub fn volume(a: f64, b: f64, c: f64) -> f64 {
    4.0 / 3.0 * PI * a * b * c
}

/// Elliptical slice at normalized height `t`: `4·π·a·c·(t − t²)`.
pub fn area(a: f64, c: f64, t: f64) -> f64 {
    4.0 * PI * a * c * (t - t * t)
}

/// Share of the volume below `t`: `t²·(3 − 2t)`.
pub fn volume_fraction(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

pub fn hull_vertices(a: f64, b: f64, c: f64) -> Vec<DVec3> {
    const LATITUDES: usize = 8;
    let mut vertices = vec![DVec3::new(0.0, -b, 0.0), DVec3::new(0.0, b, 0.0)];
    for i in 1..LATITUDES {
        let phi = PI * i as f64 / LATITUDES as f64;
        let (sin, cos) = phi.sin_cos();
        vertices.extend(ring(a * sin, c * sin, -b * cos));
    }
    vertices
}
