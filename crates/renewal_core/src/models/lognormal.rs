//! Lognormal model parameterized by mean and aperiodicity (COV).

use std::f64::consts::PI;

#[derive(Debug, Clone, Copy)]
pub struct LognormalDensity {
    mu: f64,
    sigma: f64,
}

impl LognormalDensity {
    /// `sigma = sqrt(ln(aper² + 1))`, `mu = ln(mean) − sigma²/2`.
    pub fn new(mean: f64, aperiodicity: f64) -> Self {
        let sigma = (aperiodicity * aperiodicity + 1.0).ln().sqrt();
        let mu = mean.ln() - sigma * sigma / 2.0;
        Self { mu, sigma }
    }

    pub fn mu(&self) -> f64 {
        self.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn pdf(&self, t: f64) -> f64 {
        let z = t.ln() - self.mu;
        (-z * z / (2.0 * self.sigma * self.sigma)).exp() / (t * self.sigma * (2.0 * PI).sqrt())
    }
}
