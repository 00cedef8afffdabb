//! Confidence intervals and score clamping

use serde::{Deserialize, Serialize};

/// Clamp a score into the unit interval, mapping NaN to 0
pub fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Confidence interval representing [lower, upper] bounds
///
/// The interval captures both a confidence estimate and how certain we are
/// about that estimate: wide intervals mean uncertain sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    /// Lower bound [0.0, 1.0]
    pub lower: f64,
    /// Upper bound [0.0, 1.0]
    pub upper: f64,
}

impl ConfidenceInterval {
    /// Create a new confidence interval
    ///
    /// # Panics
    /// Panics if bounds are invalid (lower > upper or out of [0, 1])
    pub fn new(lower: f64, upper: f64) -> Self {
        assert!((0.0..=1.0).contains(&lower), "Lower bound must be in [0, 1]");
        assert!((0.0..=1.0).contains(&upper), "Upper bound must be in [0, 1]");
        assert!(lower <= upper, "Lower bound must be <= upper bound");

        Self { lower, upper }
    }

    /// Build `center ± margin`, clamped to [0, 1]
    pub fn around(center: f64, margin: f64) -> Self {
        let center = unit(center);
        let margin = margin.abs();
        Self {
            lower: unit(center - margin),
            upper: unit(center + margin),
        }
    }

    /// A degenerate interval at a single point
    pub fn point(value: f64) -> Self {
        Self::around(value, 0.0)
    }

    /// Get the midpoint of the interval
    pub fn midpoint(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }

    /// Get the width of the interval (uncertainty measure)
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Check if the interval contains a value
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

impl Default for ConfidenceInterval {
    fn default() -> Self {
        Self::point(0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confidence_interval_creation() {
        let ci = ConfidenceInterval::new(0.7, 0.9);
        assert_eq!(ci.lower, 0.7);
        assert_eq!(ci.upper, 0.9);
    }

    #[test]
    fn test_midpoint() {
        let ci = ConfidenceInterval::new(0.6, 0.8);
        assert!((ci.midpoint() - 0.7).abs() < 1e-9);
    }

    #[test]
    #[should_panic]
    fn test_invalid_bounds() {
        ConfidenceInterval::new(0.9, 0.5);
    }

    #[test]
    fn test_around_clamps_at_edges() {
        let ci = ConfidenceInterval::around(0.95, 0.2);
        assert_eq!(ci.upper, 1.0);
        assert!((ci.lower - 0.75).abs() < 1e-9);

        let ci = ConfidenceInterval::around(0.05, 0.4);
        assert_eq!(ci.lower, 0.0);
    }

    #[test]
    fn test_unit_handles_nan() {
        assert_eq!(unit(f64::NAN), 0.0);
        assert_eq!(unit(1.7), 1.0);
        assert_eq!(unit(-0.2), 0.0);
    }

    proptest! {
        #[test]
        fn prop_around_stays_in_unit(center in -2.0f64..2.0, margin in -1.0f64..1.0) {
            let ci = ConfidenceInterval::around(center, margin);
            prop_assert!(ci.lower >= 0.0 && ci.upper <= 1.0);
            prop_assert!(ci.lower <= ci.upper);
        }
    }
}
