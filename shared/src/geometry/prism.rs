//! Shapes with a constant cross-section: boxes, upright cylinders and the
//! outer envelope of a boat.

/// Cross-section inside the extent is the footprint itself.
#[inline]
pub fn area(footprint: f64) -> f64 {
    footprint
}

/// Volume grows linearly with the normalized height.
#[inline]
pub fn volume(full_volume: f64, t: f64) -> f64 {
    full_volume * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_volume() {
        assert_eq!(volume(6.0, 0.0), 0.0);
        assert_eq!(volume(6.0, 0.5), 3.0);
        assert_eq!(volume(6.0, 1.0), 6.0);
        assert_eq!(area(2.5), 2.5);
    }
}
