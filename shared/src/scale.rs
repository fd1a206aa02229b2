//! Scales: masses that report the contact force pressing down on them.

use serde::{Deserialize, Serialize};

use crate::interpolation::Interpolated;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScaleUnits {
    #[default]
    Newtons,
    Kilograms,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleReadout {
    pub units: ScaleUnits,
    /// Downward contact force on the scale, newtons.
    pub force: Interpolated<f64>,
}

impl ScaleReadout {
    pub fn new(units: ScaleUnits) -> Self {
        Self {
            units,
            force: Interpolated::new(0.0),
        }
    }

    /// Reading in the configured units for the given gravity.
    pub fn reading(&self, gravity: f64) -> f64 {
        self.reading_at(gravity, 1.0)
    }

    /// Interpolated reading between the last two ticks.
    pub fn reading_at(&self, gravity: f64, ratio: f64) -> f64 {
        let force = self.force.interpolate(ratio);
        match self.units {
            ScaleUnits::Newtons => force,
            ScaleUnits::Kilograms => force / gravity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        let mut scale = ScaleReadout::new(ScaleUnits::Kilograms);
        scale.force.push(19.6);
        assert!((scale.reading(9.8) - 2.0).abs() < 1e-12);

        scale.units = ScaleUnits::Newtons;
        assert_eq!(scale.reading(9.8), 19.6);
        assert_eq!(scale.reading_at(9.8, 0.5), 9.8);
    }
}
