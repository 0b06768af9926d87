//! Error type shared by every renewal-model calculation.
//!
//! Precondition violations, frozen-engine mutations and discretization
//! problems are all reported through [`RenewalError`]. Numerically unsafe
//! conditional probabilities are *not* errors: those come back as `f64::NAN`.

use thiserror::Error;

/// Crate-wide result alias.
pub type RenewalResult<T> = Result<T, RenewalError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenewalError {
    #[error("{name} must be positive and finite; got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("num_points must be at least 2; got {0}")]
    InvalidNumPoints(usize),

    #[error("discretization needs {num_points} points; at most {max} are allowed")]
    GridTooLarge { num_points: f64, max: usize },

    #[error("time since last event must be non-negative and finite; got {0}")]
    InvalidTimeSinceLast(f64),

    #[error("duration must be positive and finite; got {0}")]
    InvalidDuration(f64),

    #[error("historic open interval must be non-negative and finite; got {0}")]
    InvalidHistOpenInterval(f64),

    #[error("calculator is frozen; parameters and curves are read-only")]
    Frozen,

    #[error("duration {duration} is too long for the discretization (max {max})")]
    DurationTooLong { duration: f64, max: f64 },

    #[error("x = {x} lies outside the discretized domain [0, {max_x}]")]
    OutOfDomain { x: f64, max_x: f64 },

    #[error(
        "no grid point has 1-cdf of at least {threshold:e} \
         (first 1-cdf = {first_one_minus_cdf:e}); check num_points and delta_x"
    )]
    InsufficientDiscretization {
        threshold: f64,
        first_one_minus_cdf: f64,
    },

    #[error("the exponential model has no aperiodicity parameter")]
    AperiodicityNotSupported,

    #[error("invalid fitting grid for {axis}: {reason}")]
    InvalidGrid {
        axis: &'static str,
        reason: &'static str,
    },

    #[error("confidence {0} must lie strictly between 0 and 1")]
    InvalidConfidence(f64),

    #[error("confidence {confidence} was not reached before factor {max_factor} left the domain")]
    ConfidenceNotReached { confidence: f64, max_factor: f64 },
}

pub(crate) fn check_time_since_last(time_since_last: f64) -> RenewalResult<()> {
    if !time_since_last.is_finite() || time_since_last < 0.0 {
        return Err(RenewalError::InvalidTimeSinceLast(time_since_last));
    }
    Ok(())
}

pub(crate) fn check_duration(duration: f64) -> RenewalResult<()> {
    if !duration.is_finite() || duration <= 0.0 {
        return Err(RenewalError::InvalidDuration(duration));
    }
    Ok(())
}

pub(crate) fn check_hist_open_interval(hist_open_interval: f64) -> RenewalResult<()> {
    if !hist_open_interval.is_finite() || hist_open_interval < 0.0 {
        return Err(RenewalError::InvalidHistOpenInterval(hist_open_interval));
    }
    Ok(())
}
