//! The `renewal_core` crate computes earthquake-occurrence probabilities from
//! renewal models of inter-event time.
//!
//! Key components:
//! - **Models**: Exponential (Poisson), Lognormal, Weibull and Brownian Passage
//!   Time densities.
//! - **Distributions**: trapezoidally integrated pdf/cdf on an even grid and
//!   every curve derived from them.
//! - **Safety**: tail safeguards that keep BPT conditional probabilities stable
//!   where `1 − cdf` vanishes.
//! - **Engine**: `RenewalCalc`, the lazily computing calculator that can be
//!   frozen for concurrent reads.
pub mod config;
pub mod distributions;
pub mod engine;
pub mod error;
pub mod function;
pub mod interpolator;
pub mod models;
pub mod safety;

pub use config::{CdfLookup, DistributionConfig, GridRange};
pub use distributions::{CondProbIter, Distributions};
pub use engine::{FitResult, RenewalCalc};
pub use error::{RenewalError, RenewalResult};
pub use function::DiscretizedFunction;
pub use models::RenewalModelKind;
