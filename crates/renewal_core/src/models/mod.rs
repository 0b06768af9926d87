//! Renewal models and their closed-form densities.
//!
//! [`RenewalModelKind`] is the closed set of supported models. Each model
//! module only knows how to evaluate its density for a given configuration;
//! discretization, integration and every probability calculation are shared
//! and live in [`crate::distributions`].

pub mod bpt;
pub mod exponential;
pub mod lognormal;
pub mod weibull;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::DistributionConfig;

pub use bpt::BptDensity;
pub use exponential::ExponentialDensity;
pub use lognormal::LognormalDensity;
pub use weibull::WeibullDensity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RenewalModelKind {
    Exponential,
    Lognormal,
    Weibull,
    /// Brownian Passage Time (Matthews et al., 2002).
    Bpt,
}

impl RenewalModelKind {
    pub const ALL: [RenewalModelKind; 4] = [
        RenewalModelKind::Exponential,
        RenewalModelKind::Lognormal,
        RenewalModelKind::Weibull,
        RenewalModelKind::Bpt,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RenewalModelKind::Exponential => "Exponential",
            RenewalModelKind::Lognormal => "Lognormal",
            RenewalModelKind::Weibull => "Weibull",
            RenewalModelKind::Bpt => "BPT",
        }
    }

    /// The exponential model is fully determined by its mean.
    pub fn uses_aperiodicity(&self) -> bool {
        !matches!(self, RenewalModelKind::Exponential)
    }
}

impl fmt::Display for RenewalModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenewalModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exponential" | "poisson" => Ok(RenewalModelKind::Exponential),
            "lognormal" => Ok(RenewalModelKind::Lognormal),
            "weibull" => Ok(RenewalModelKind::Weibull),
            "bpt" | "brownian_passage_time" => Ok(RenewalModelKind::Bpt),
            other => Err(format!("Unknown renewal model '{other}'")),
        }
    }
}

/// A model's density, with every derived parameter resolved for one config.
#[derive(Debug, Clone, Copy)]
pub enum Density {
    Exponential(ExponentialDensity),
    Lognormal(LognormalDensity),
    Weibull(WeibullDensity),
    Bpt(BptDensity),
}

impl Density {
    pub fn new(kind: RenewalModelKind, config: &DistributionConfig) -> Self {
        match kind {
            RenewalModelKind::Exponential => {
                Density::Exponential(ExponentialDensity::new(config.mean))
            }
            RenewalModelKind::Lognormal => {
                Density::Lognormal(LognormalDensity::new(config.mean, config.aperiodicity))
            }
            RenewalModelKind::Weibull => {
                Density::Weibull(WeibullDensity::new(config.mean, config.aperiodicity))
            }
            RenewalModelKind::Bpt => {
                Density::Bpt(BptDensity::new(config.mean, config.aperiodicity))
            }
        }
    }

    /// Density at `t > 0`. May be NaN where the formula underflows.
    pub fn pdf(&self, t: f64) -> f64 {
        match self {
            Density::Exponential(d) => d.pdf(t),
            Density::Lognormal(d) => d.pdf(t),
            Density::Weibull(d) => d.pdf(t),
            Density::Bpt(d) => d.pdf(t),
        }
    }

    /// Limit of the density as t → 0⁺.
    pub fn pdf_at_origin(&self) -> f64 {
        match self {
            Density::Exponential(d) => d.rate(),
            Density::Weibull(d) => d.pdf_at_origin(),
            Density::Lognormal(_) | Density::Bpt(_) => 0.0,
        }
    }

    /// Exact cdf where the model has one that is used directly instead of
    /// integrating the density.
    pub fn closed_form_cdf(&self, t: f64) -> Option<f64> {
        match self {
            Density::Exponential(d) => Some(d.cdf(t)),
            _ => None,
        }
    }
}
