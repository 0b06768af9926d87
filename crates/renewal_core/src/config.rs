//! Immutable configuration values for the renewal-model calculators.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{RenewalError, RenewalResult};

/// Default discretization step as a fraction of the mean, used by
/// [`DistributionConfig::for_mean_and_aperiodicity`].
pub const DELTA_X_DEFAULT: f64 = 0.001;

/// Largest discretization any calculator will allocate.
pub const MAX_NUM_POINTS: usize = 100_000_000;

/// Parameters of one discretized inter-event time distribution.
///
/// Any change produces a new value; calculators never mutate a config in
/// place, so curves computed from one config can't drift out of sync with it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionConfig {
    pub mean: f64,
    pub aperiodicity: f64,
    pub delta_x: f64,
    pub num_points: usize,
}

impl Default for DistributionConfig {
    fn default() -> Self {
        Self {
            mean: 100.0,
            aperiodicity: 0.5,
            delta_x: 1.0,
            num_points: 500,
        }
    }
}

impl DistributionConfig {
    pub fn new(
        mean: f64,
        aperiodicity: f64,
        delta_x: f64,
        num_points: usize,
    ) -> RenewalResult<Self> {
        let config = Self {
            mean,
            aperiodicity,
            delta_x,
            num_points,
        };
        config.validate()?;
        Ok(config)
    }

    /// Discretizes at `DELTA_X_DEFAULT·mean` out to ten aperiodicities of the mean.
    pub fn for_mean_and_aperiodicity(mean: f64, aperiodicity: f64) -> RenewalResult<Self> {
        check_positive("mean", mean)?;
        check_positive("aperiodicity", aperiodicity)?;
        let delta_x = DELTA_X_DEFAULT * mean;
        let num_points = (aperiodicity * 10.0 * mean / delta_x).round() + 1.0;
        if num_points > MAX_NUM_POINTS as f64 {
            return Err(RenewalError::GridTooLarge {
                num_points,
                max: MAX_NUM_POINTS,
            });
        }
        Self::new(mean, aperiodicity, delta_x, num_points as usize)
    }

    pub fn validate(&self) -> RenewalResult<()> {
        check_positive("mean", self.mean)?;
        check_positive("aperiodicity", self.aperiodicity)?;
        check_positive("delta_x", self.delta_x)?;
        if self.num_points < 2 {
            return Err(RenewalError::InvalidNumPoints(self.num_points));
        }
        if self.num_points > MAX_NUM_POINTS {
            return Err(RenewalError::GridTooLarge {
                num_points: self.num_points as f64,
                max: MAX_NUM_POINTS,
            });
        }
        Ok(())
    }

    /// Largest x on the grid.
    pub fn max_x(&self) -> f64 {
        self.delta_x * (self.num_points - 1) as f64
    }
}

impl fmt::Display for DistributionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Mean = {}; Aperiodicity = {}; Delta T = {}; Num Points = {}",
            self.mean, self.aperiodicity, self.delta_x, self.num_points
        )
    }
}

fn check_positive(name: &'static str, value: f64) -> RenewalResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(RenewalError::InvalidParameter { name, value });
    }
    Ok(())
}

/// How the cdf is read when evaluating a conditional probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CdfLookup {
    /// Linear interpolation between grid points.
    #[default]
    Interpolated,
    /// Read the grid points nearest to each time. Falls back to interpolation
    /// when both times round to the same point.
    NearestPoint,
}

/// One axis of a fitting grid: `num` evenly spaced values from `min` to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridRange {
    pub min: f64,
    pub max: f64,
    pub num: usize,
}

impl GridRange {
    pub fn new(min: f64, max: f64, num: usize) -> Self {
        Self { min, max, num }
    }

    pub(crate) fn validate(&self, axis: &'static str) -> RenewalResult<()> {
        if !(self.min.is_finite() && self.max.is_finite()) || self.min <= 0.0 {
            return Err(RenewalError::InvalidGrid {
                axis,
                reason: "bounds must be positive and finite",
            });
        }
        if self.max < self.min {
            return Err(RenewalError::InvalidGrid {
                axis,
                reason: "max must not be below min",
            });
        }
        if self.num == 0 {
            return Err(RenewalError::InvalidGrid {
                axis,
                reason: "at least one grid value is required",
            });
        }
        Ok(())
    }

    pub fn values(&self) -> impl Iterator<Item = f64> {
        let Self { min, max, num } = *self;
        let step = if num > 1 {
            (max - min) / (num - 1) as f64
        } else {
            0.0
        };
        (0..num).map(move |i| min + i as f64 * step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_matches_documented_values() {
        let config = DistributionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_points, 500);
        assert_eq!(config.max_x(), 499.0);
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            DistributionConfig::new(0.0, 0.5, 1.0, 10),
            Err(RenewalError::InvalidParameter {
                name: "mean",
                value: 0.0
            })
        );
        assert!(DistributionConfig::new(1.0, f64::NAN, 1.0, 10).is_err());
        assert!(DistributionConfig::new(1.0, 0.5, -1.0, 10).is_err());
        assert_eq!(
            DistributionConfig::new(1.0, 0.5, 1.0, 1),
            Err(RenewalError::InvalidNumPoints(1))
        );
    }

    #[test]
    fn mean_and_aperiodicity_shortcut_sets_grid() {
        let config = DistributionConfig::for_mean_and_aperiodicity(200.0, 0.3).unwrap();
        assert_relative_eq!(config.delta_x, 0.2);
        assert_eq!(config.num_points, 3001);
    }

    #[test]
    fn huge_aperiodicity_is_rejected_before_allocating() {
        assert!(matches!(
            DistributionConfig::for_mean_and_aperiodicity(100.0, 1e300),
            Err(RenewalError::GridTooLarge { .. })
        ));
        assert!(matches!(
            DistributionConfig::new(1.0, 0.5, 1.0, MAX_NUM_POINTS + 1),
            Err(RenewalError::GridTooLarge { .. })
        ));
        assert!(DistributionConfig::for_mean_and_aperiodicity(100.0, 9_000.0).is_ok());
    }

    #[test]
    fn display_lists_every_parameter() {
        let text = DistributionConfig::default().to_string();
        assert_eq!(text, "Mean = 100; Aperiodicity = 0.5; Delta T = 1; Num Points = 500");
    }

    #[test]
    fn grid_values_span_range() {
        let grid = GridRange::new(1.0, 2.0, 5);
        let values: Vec<f64> = grid.values().collect();
        assert_eq!(values, vec![1.0, 1.25, 1.5, 1.75, 2.0]);
        assert_eq!(GridRange::new(3.0, 3.0, 1).values().collect::<Vec<_>>(), vec![3.0]);
        assert!(GridRange::new(2.0, 1.0, 3).validate("mean").is_err());
        assert!(GridRange::new(1.0, 2.0, 0).validate("mean").is_err());
    }
}
