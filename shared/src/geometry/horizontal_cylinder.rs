//! Cylinder lying on its side, axis along z.
//!
//! The cross-section at normalized height `t` is a chord of the circle, so
//! the area is `footprint · 2·√(t − t²)` where the footprint is
//! `2·radius·length`. Volume follows the circular segment integral.

use std::f64::consts::PI;

use bevy::math::DVec3;

use super::RING_SEGMENTS;

pub fn volume(radius: f64, length: f64) -> f64 {
    PI * radius * radius * length
}

pub fn area(footprint: f64, t: f64) -> f64 {
    footprint * 2.0 * (t - t * t).max(0.0).sqrt()
}

/// Share of the volume below `t`, with `f = 2t − 1`:
/// `1/2 + (f·√(1 − f²) + asin f) / π`.
pub fn volume_fraction(t: f64) -> f64 {
    let f = (2.0 * t - 1.0).clamp(-1.0, 1.0);
    0.5 + (f * (1.0 - f * f).max(0.0).sqrt() + f.asin()) / PI
}

pub fn hull_vertices(radius: f64, length: f64) -> Vec<DVec3> {
    let half = length / 2.0;
    (0..RING_SEGMENTS)
        .flat_map(|i| {
            let angle = std::f64::consts::TAU * i as f64 / RING_SEGMENTS as f64;
            let (x, y) = (radius * angle.cos(), radius * angle.sin());
            [DVec3::new(x, y, -half), DVec3::new(x, y, half)]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_full() {
        assert!(volume_fraction(0.0).abs() < 1e-12);
        assert!((volume_fraction(0.5) - 0.5).abs() < 1e-12);
        assert!((volume_fraction(1.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_widest_at_axis() {
        // At the axis the chord equals the diameter.
        assert!((area(0.4, 0.5) - 0.4).abs() < 1e-12);
        assert!(area(0.4, 0.25) < area(0.4, 0.5));
        assert_eq!(area(0.4, 0.0), 0.0);
    }

    #[test]
    fn test_fraction_symmetry() {
        for t in [0.1, 0.3, 0.45] {
            assert!((volume_fraction(t) + volume_fraction(1.0 - t) - 1.0).abs() < 1e-12);
        }
    }
}
