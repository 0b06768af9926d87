//! Weibull model. The aperiodicity is converted to a shape parameter by a
//! bounded grid search, the scale then follows from the mean.

use statrs::function::gamma::gamma;

pub const MIN_SHAPE: f64 = 1.0;
pub const MAX_SHAPE: f64 = 5.0;
pub const SHAPE_STEP: f64 = 0.001;

#[derive(Debug, Clone, Copy)]
pub struct WeibullDensity {
    shape: f64,
    scale: f64,
}

impl WeibullDensity {
    pub fn new(mean: f64, aperiodicity: f64) -> Self {
        let shape = shape_for_aperiodicity(aperiodicity);
        let scale = mean / gamma(1.0 + 1.0 / shape);
        Self { shape, scale }
    }

    pub fn shape(&self) -> f64 {
        self.shape
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn pdf(&self, t: f64) -> f64 {
        let k = self.shape;
        let z = t / self.scale;
        (k / self.scale) * z.powf(k - 1.0) * (-z.powf(k)).exp()
    }

    pub fn pdf_at_origin(&self) -> f64 {
        if self.shape == 1.0 {
            1.0 / self.scale
        } else {
            0.0
        }
    }
}

/// Coefficient of variation of a Weibull distribution with shape `k`.
pub fn cov_for_shape(k: f64) -> f64 {
    let g1 = gamma(1.0 + 1.0 / k);
    let g2 = gamma(1.0 + 2.0 / k);
    (g2 / (g1 * g1) - 1.0).sqrt()
}

/// Shape in `[MIN_SHAPE, MAX_SHAPE]` whose COV is closest to `aperiodicity`.
/// Aperiodicities outside the range reachable on the grid map to its ends.
pub fn shape_for_aperiodicity(aperiodicity: f64) -> f64 {
    let steps = ((MAX_SHAPE - MIN_SHAPE) / SHAPE_STEP).round() as usize;
    let mut best_shape = MIN_SHAPE;
    let mut best_misfit = f64::INFINITY;
    for i in 0..=steps {
        let k = MIN_SHAPE + i as f64 * SHAPE_STEP;
        let misfit = (cov_for_shape(k) - aperiodicity).abs();
        if misfit < best_misfit {
            best_misfit = misfit;
            best_shape = k;
        }
    }
    best_shape
}
