//! Brownian Passage Time density (Matthews et al., 2002, BSSA 92, 2223-2250).
//!
//! The numerical safeguards that make conditional probabilities usable far
//! out on the BPT tail live in [`crate::safety`].

use std::f64::consts::PI;

/// Step, in units of the mean, of the standalone integration in [`cond_prob_direct`].
const DIRECT_STEP: f64 = 0.001;

#[derive(Debug, Clone, Copy)]
pub struct BptDensity {
    mean: f64,
    /// mean / (2π·aper²)
    temp1: f64,
    /// 2·mean·aper²
    temp2: f64,
}

impl BptDensity {
    pub fn new(mean: f64, aperiodicity: f64) -> Self {
        let a2 = aperiodicity * aperiodicity;
        Self {
            mean,
            temp1: mean / (2.0 * PI * a2),
            temp2: 2.0 * mean * a2,
        }
    }

    /// `sqrt(mean/(2π·aper²·t³)) · exp(−(t−mean)²/(2·mean·aper²·t))`
    pub fn pdf(&self, t: f64) -> f64 {
        let dt = t - self.mean;
        (self.temp1 / (t * t * t)).sqrt() * (-dt * dt / (self.temp2 * t)).exp()
    }
}

/// Conditional probability computed without a calculator, by trapezoidal
/// integration of the unit-mean density at a fixed step of 0.001 (the
/// WGCEP-2002 approach). Slower and slightly less accurate than the
/// interpolating calculator.
///
/// When `time_since_last/mean > 10·aperiodicity` the time since last is
/// pulled back to `10·aperiodicity·mean`. Returns NaN once the cdf at the
/// start of the window has reached 1.
pub fn cond_prob_direct(mean: f64, aperiodicity: f64, time_since_last: f64, duration: f64) -> f64 {
    let start = if time_since_last / mean > aperiodicity * 10.0 {
        10.0 * aperiodicity * mean
    } else {
        time_since_last
    };

    let i1 = ((start / mean) / DIRECT_STEP).round() as usize;
    let i2 = (((start + duration) / mean) / DIRECT_STEP).round() as usize;

    let unit = BptDensity::new(1.0, aperiodicity);
    let mut cdf = 0.0;
    let mut cdf_at_start = 0.0;
    let mut pdf_last = 0.0;
    for i in 1..=i2 {
        let t = DIRECT_STEP * i as f64;
        let pdf = unit.pdf(t);
        cdf += DIRECT_STEP * (pdf + pdf_last) / 2.0;
        if i == i1 {
            cdf_at_start = cdf;
        }
        pdf_last = pdf;
    }

    if cdf_at_start >= 1.0 {
        f64::NAN
    } else {
        (cdf - cdf_at_start) / (1.0 - cdf_at_start)
    }
}
