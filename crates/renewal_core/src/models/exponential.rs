//! Exponential (Poisson) model: memoryless, determined by the mean alone.

#[derive(Debug, Clone, Copy)]
pub struct ExponentialDensity {
    rate: f64,
}

impl ExponentialDensity {
    pub fn new(mean: f64) -> Self {
        Self { rate: 1.0 / mean }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn pdf(&self, t: f64) -> f64 {
        self.rate * (-self.rate * t).exp()
    }

    pub fn cdf(&self, t: f64) -> f64 {
        -(-self.rate * t).exp_m1()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn cdf_matches_one_minus_exp() {
        let d = ExponentialDensity::new(50.0);
        assert_relative_eq!(d.cdf(10.0), 1.0 - (-0.2f64).exp(), epsilon = 1e-15);
        assert_eq!(d.cdf(0.0), 0.0);
        assert_relative_eq!(d.pdf(0.0), 0.02);
    }
}
