//! Hybrid Newton/bisection root finder.
//!
//! Used to turn a liquid volume into a liquid height: the empty volume of a
//! basin grows monotonically with height, and its derivative is the empty
//! cross-sectional area, so Newton steps converge quickly while the bracket
//! guarantees termination.

use bevy_log::trace;

use crate::constants::MAX_ROOT_ITERATIONS;

/// Solves `f(x) = 0` for an increasing `f` on `[lo, hi]`.
///
/// `derivative` must return `f'(x)`. Each iteration narrows the bracket
/// around the sign change, takes a Newton step, and falls back to bisection
/// whenever that step leaves the bracket or the derivative is unusable.
/// Returns as soon as `|f(x)| <= tolerance`, or when the bracket can no
/// longer shrink in floating point. Never fails.
pub fn find_root<F, D>(mut lo: f64, mut hi: f64, tolerance: f64, f: F, derivative: D) -> f64
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    debug_assert!(lo <= hi, "inverted root bracket [{lo}, {hi}]");

    let mut x = (lo + hi) / 2.0;

    for iteration in 0..MAX_ROOT_ITERATIONS {
        let y = f(x);
        if y.abs() <= tolerance {
            trace!("root found at {x} after {iteration} iterations");
            return x;
        }

        if y < 0.0 {
            lo = x;
        } else {
            hi = x;
        }

        let slope = derivative(x);
        let newton = x - y / slope;

        let next = if slope != 0.0 && newton.is_finite() && newton > lo && newton < hi {
            newton
        } else {
            (lo + hi) / 2.0
        };

        // Bracket collapsed below floating point resolution.
        if next == lo || next == hi || next == x {
            trace!("root finder stagnated at {x} (residual {y})");
            return x;
        }

        x = next;
    }

    trace!("root finder hit iteration cap at {x}");
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-7;

    #[test]
    fn test_linear_root() {
        let root = find_root(0.0, 10.0, TOLERANCE, |x| 2.0 * x - 3.0, |_| 2.0);
        assert!((root - 1.5).abs() < TOLERANCE);
    }

    #[test]
    fn test_cubic_root() {
        let root = find_root(0.0, 2.0, TOLERANCE, |x| x * x * x - 2.0, |x| 3.0 * x * x);
        assert!((root - 2f64.cbrt()).abs() < 1e-6);
    }

    #[test]
    fn test_zero_derivative_falls_back_to_bisection() {
        // Derivative is garbage, bisection alone must still converge.
        let root = find_root(0.0, 1.0, TOLERANCE, |x| x - 0.3, |_| 0.0);
        assert!((root - 0.3).abs() < TOLERANCE);
    }

    #[test]
    fn test_wrong_derivative_still_converges() {
        let root = find_root(-5.0, 5.0, TOLERANCE, |x| x.powi(3) + x, |_| 1e-9);
        assert!(root.abs() < 1e-6);
    }

    #[test]
    fn test_unreachable_tolerance_terminates() {
        // Step function: no point satisfies the tolerance, the bracket has to
        // collapse onto the jump and return.
        let root = find_root(
            0.0,
            1.0,
            0.0,
            |x| if x < 0.25 { -1.0 } else { 1.0 },
            |_| 0.0,
        );
        assert!((root - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_root_at_bracket_edge() {
        let root = find_root(0.0, 1.0, TOLERANCE, |x| x - 1.0, |_| 1.0);
        assert!((root - 1.0).abs() < TOLERANCE);
    }
}
