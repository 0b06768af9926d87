//! Evenly discretized functions.
//!
//! Every curve produced by the calculators (pdf, cdf, hazard, conditional
//! probability, ...) is an evenly spaced sequence of samples. The x values are
//! never stored: sample `i` sits at `min_x + i * delta`.

use serde::{Deserialize, Serialize};

use crate::error::{RenewalError, RenewalResult};

/// Scale applied before rounding in [`DiscretizedFunction::closest_x_index`], so
/// that values landing on a bin boundary through roundoff are assigned upward.
const PRECISION_SCALE: f64 = 1.0 + 1e-14;

/// Fraction of `delta` by which an x value may overshoot either end of the
/// domain and still be treated as lying on it.
const DOMAIN_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscretizedFunction {
    name: String,
    info: String,
    min_x: f64,
    delta: f64,
    values: Vec<f64>,
}

impl DiscretizedFunction {
    /// Creates `num_points` zero-valued samples at x = 0, delta, 2·delta, ...
    pub fn new(num_points: usize, delta: f64) -> Self {
        Self::from_values(delta, vec![0.0; num_points])
    }

    /// Wraps existing samples that start at x = 0.
    pub fn from_values(delta: f64, values: Vec<f64>) -> Self {
        Self::with_origin(0.0, delta, values)
    }

    /// Wraps existing samples that start at `min_x`.
    pub fn with_origin(min_x: f64, delta: f64, values: Vec<f64>) -> Self {
        Self {
            name: String::new(),
            info: String::new(),
            min_x,
            delta,
            values,
        }
    }

    /// Attaches a descriptive name and parameter summary.
    pub fn with_metadata(mut self, name: impl Into<String>, info: impl Into<String>) -> Self {
        self.name = name.into();
        self.info = info.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn info(&self) -> &str {
        &self.info
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_info(&mut self, info: impl Into<String>) {
        self.info = info.into();
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn min_x(&self) -> f64 {
        self.min_x
    }

    pub fn max_x(&self) -> f64 {
        self.x(self.values.len().saturating_sub(1))
    }

    pub fn x(&self, index: usize) -> f64 {
        self.min_x + self.delta * index as f64
    }

    pub fn y(&self, index: usize) -> f64 {
        self.values[index]
    }

    pub fn set(&mut self, index: usize, y: f64) {
        self.values[index] = y;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Iterates over `(x, y)` pairs.
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, &y)| (self.x(i), y))
    }

    /// Index of the sample nearest to `x`, clamped to the valid range.
    pub fn closest_x_index(&self, x: f64) -> usize {
        if self.values.is_empty() || self.delta == 0.0 {
            return 0;
        }
        let scaled = PRECISION_SCALE * (x - self.min_x) / self.delta;
        let rounded = scaled.round();
        if rounded <= 0.0 {
            0
        } else {
            (rounded as usize).min(self.values.len() - 1)
        }
    }

    /// Snaps `x` onto the domain when it overshoots an end by roundoff only.
    pub(crate) fn checked_x(&self, x: f64) -> RenewalResult<f64> {
        let max_x = self.max_x();
        let tolerance = DOMAIN_TOLERANCE * self.delta;
        if !x.is_finite() || x < self.min_x - tolerance || x > max_x + tolerance {
            return Err(RenewalError::OutOfDomain { x, max_x });
        }
        Ok(x.clamp(self.min_x, max_x))
    }

    /// Index of the segment `[x_i, x_{i+1}]` containing `x` (already on the domain).
    pub(crate) fn segment_index(&self, x: f64) -> usize {
        let last_segment = self.values.len().saturating_sub(2);
        let raw = ((x - self.min_x) / self.delta).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(last_segment)
        }
    }

    /// Linearly interpolated y at `x`.
    pub fn interpolated_y(&self, x: f64) -> RenewalResult<f64> {
        let x = self.checked_x(x)?;
        if self.values.len() == 1 {
            return Ok(self.values[0]);
        }
        let i = self.segment_index(x);
        let x0 = self.x(i);
        let (y0, y1) = (self.values[i], self.values[i + 1]);
        Ok(y0 + (y1 - y0) * (x - x0) / self.delta)
    }

    /// Multiplies every y value by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for y in &mut self.values {
            *y *= factor;
        }
    }

    /// Σ x·y / Σ y, treating the samples as an (unnormalized) density.
    pub fn mean_from_pdf(&self) -> f64 {
        let (weighted, total) = self
            .points()
            .fold((0.0, 0.0), |(weighted, total), (x, y)| (weighted + x * y, total + y));
        weighted / total
    }

    /// Σ y·delta: the rectangle-rule area under the samples.
    pub fn area(&self) -> f64 {
        self.values.iter().sum::<f64>() * self.delta
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ramp() -> DiscretizedFunction {
        DiscretizedFunction::from_values(0.5, vec![0.0, 1.0, 2.0, 3.0, 4.0])
    }

    #[test]
    fn x_values_are_evenly_spaced_from_origin() {
        let func = ramp();
        assert_eq!(func.size(), 5);
        assert_eq!(func.x(0), 0.0);
        assert_eq!(func.x(3), 1.5);
        assert_eq!(func.max_x(), 2.0);
    }

    #[test]
    fn interpolation_is_linear_within_segments() {
        let func = ramp();
        assert_relative_eq!(func.interpolated_y(0.25).unwrap(), 0.5);
        assert_relative_eq!(func.interpolated_y(1.9).unwrap(), 3.8, epsilon = 1e-12);
        assert_relative_eq!(func.interpolated_y(2.0).unwrap(), 4.0);
        assert_relative_eq!(func.interpolated_y(0.0).unwrap(), 0.0);
    }

    #[test]
    fn interpolation_outside_domain_is_rejected() {
        let func = ramp();
        assert!(matches!(
            func.interpolated_y(2.1),
            Err(RenewalError::OutOfDomain { .. })
        ));
        assert!(func.interpolated_y(-0.1).is_err());
        assert!(func.interpolated_y(f64::NAN).is_err());
        assert!(func.interpolated_y(2.0 + 1e-12).is_ok());
    }

    #[test]
    fn closest_index_rounds_and_clamps() {
        let func = ramp();
        assert_eq!(func.closest_x_index(0.74), 1);
        assert_eq!(func.closest_x_index(0.75), 2);
        assert_eq!(func.closest_x_index(-3.0), 0);
        assert_eq!(func.closest_x_index(100.0), 4);
    }

    #[test]
    fn mean_and_area_of_uniform_density() {
        let func = DiscretizedFunction::from_values(1.0, vec![0.25; 4]);
        assert_relative_eq!(func.area(), 1.0);
        assert_relative_eq!(func.mean_from_pdf(), 1.5);
    }

    #[test]
    fn scale_and_metadata() {
        let mut func = ramp().with_metadata("Ramp", "slope = 2");
        func.scale(2.0);
        assert_eq!(func.values(), &[0.0, 2.0, 4.0, 6.0, 8.0]);
        assert_eq!(func.name(), "Ramp");
        assert_eq!(func.info(), "slope = 2");
    }
}
