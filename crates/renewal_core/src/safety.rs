//! Tail safeguards for Brownian Passage Time conditional probabilities.
//!
//! Far out on the BPT tail `1 − cdf` approaches zero and the plain
//! conditional-probability ratio is dominated by roundoff. Every BPT query is
//! routed through one of three branches instead:
//!
//! 1. Durations shorter than `MIN_NORM_DURATION·mean` are evaluated at that
//!    minimum and scaled down linearly.
//! 2. Windows that end before the safe cutoff use the plain ratio.
//! 3. Windows past the cutoff blend linearly from the value just inside the
//!    cutoff toward the mean-residual-life limit
//!    `1 − exp(−duration/(2·mean·aper²))`, reached at `10·mean`
//!    (Matthews et al., 2002, eq. 24). The blend never extrapolates past
//!    either end.

use log::debug;

use crate::config::CdfLookup;
use crate::distributions::{cap_at_one, Distributions};
use crate::error::{
    check_duration, check_hist_open_interval, check_time_since_last, RenewalError, RenewalResult,
};
use crate::function::DiscretizedFunction;

/// Smallest `1 − cdf` still considered a safe divisor.
pub const SAFE_ONE_MINUS_CDF: f64 = 1e-13;

/// Smallest `duration/mean` evaluated directly.
pub const MIN_NORM_DURATION: f64 = 0.01;

/// Multiple of the mean standing in for infinite time since last event.
pub const INFINITE_TIME_FACTOR: f64 = 10.0;

/// Roundoff allowance on the `MIN_NORM_DURATION` comparison; without it the
/// rescaled query can recurse forever.
const MIN_NORM_DURATION_ROUNDOFF: f64 = 0.9999;

/// Keeps `start + duration` strictly inside the cutoff after roundoff.
const SAFE_DURATION_NUDGE: f64 = 1.0001;

/// Numerator and denominator of the integrated-curve ratio below this are
/// treated as cancellation noise.
const MIN_INTEGRATED_TERM: f64 = 1e-10;

/// Relative spread between the open-interval and cutoff probabilities below
/// which the tail is treated as flat.
const FLAT_TAIL_TOLERANCE: f64 = 1e-4;

/// Last grid x, scanning up from the origin, before `1 − cdf` first drops
/// below [`SAFE_ONE_MINUS_CDF`]. Grids that never get that close to one keep
/// their last x; only a grid whose very first point is unsafe has no cutoff.
pub(crate) fn compute_safe_cutoff(cdf: &DiscretizedFunction) -> RenewalResult<f64> {
    let mut cutoff = None;
    for (x, y) in cdf.points() {
        if 1.0 - y < SAFE_ONE_MINUS_CDF {
            break;
        }
        cutoff = Some(x);
    }
    cutoff.ok_or_else(|| RenewalError::InsufficientDiscretization {
        threshold: SAFE_ONE_MINUS_CDF,
        first_one_minus_cdf: cdf.values().first().map_or(f64::NAN, |y| 1.0 - y),
    })
}

impl Distributions {
    /// Conditional probability once the time since last event is effectively
    /// infinite.
    pub fn asymptotic_cond_prob(&self, duration: f64) -> f64 {
        let config = self.config();
        let mean_residual_life = 2.0 * config.mean * config.aperiodicity * config.aperiodicity;
        -(-duration / mean_residual_life).exp_m1()
    }

    pub(crate) fn bpt_cond_prob(
        &self,
        time_since_last: f64,
        duration: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<f64> {
        check_time_since_last(time_since_last)?;
        check_duration(duration)?;
        let mean = self.config().mean;

        if duration / mean < MIN_NORM_DURATION * MIN_NORM_DURATION_ROUNDOFF {
            let min_duration = MIN_NORM_DURATION * mean;
            let prob = self.bpt_cond_prob(time_since_last, min_duration, lookup)?;
            return Ok(prob * duration / min_duration);
        }

        let safe = self.safe_time_since_last_cutoff()?;
        if time_since_last + duration <= safe {
            return self.base_cond_prob(time_since_last, duration, lookup);
        }

        let safe_start = safe - duration * SAFE_DURATION_NUDGE;
        if safe_start < 0.0 {
            return Ok(1.0);
        }
        let at_safe = self.base_cond_prob(safe_start, duration, lookup)?;
        let at_infinity = self.asymptotic_cond_prob(duration);
        if time_since_last + duration > self.raw_cdf().max_x() {
            return Ok(at_infinity);
        }
        let blend_start = safe - duration;
        let blend_span = INFINITE_TIME_FACTOR * mean - blend_start;
        // the cutoff can lie past the infinite-time proxy on very wide grids
        let weight = if blend_span > 0.0 {
            ((time_since_last - blend_start) / blend_span).clamp(0.0, 1.0)
        } else {
            1.0
        };
        Ok(at_safe + (at_infinity - at_safe) * weight)
    }

    pub(crate) fn bpt_cond_prob_for_unknown_time_since_last_event(
        &self,
        duration: f64,
        hist_open_interval: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<f64> {
        check_duration(duration)?;
        check_hist_open_interval(hist_open_interval)?;

        let safe = self.safe_time_since_last_cutoff()?;
        let at_safe = self.bpt_cond_prob(safe, duration, lookup)?;
        if hist_open_interval >= safe {
            return Ok(at_safe);
        }

        let at_open = self.bpt_cond_prob(hist_open_interval, duration, lookup)?;
        if ((at_safe - at_open) / at_safe).abs() < FLAT_TAIL_TOLERANCE {
            return Ok(at_safe);
        }

        let (numer, denom) = self.integrated_ratio(duration, hist_open_interval, true)?;
        if numer > MIN_INTEGRATED_TERM && denom > MIN_INTEGRATED_TERM {
            return Ok(cap_at_one(numer / denom));
        }

        debug!(
            "integrated ratio unreliable (numer={numer:e}, denom={denom:e}); \
             summing bins up to {safe}"
        );
        self.survival_weighted_cond_prob(duration, hist_open_interval, safe, lookup)
    }

    /// Average of the conditional probabilities at grid start times from
    /// `hist_open_interval` to `safe`, weighted by `1 − cdf`. The first bin
    /// only counts the part beyond the open interval.
    pub(crate) fn survival_weighted_cond_prob(
        &self,
        duration: f64,
        hist_open_interval: f64,
        safe: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<f64> {
        let cond_probs = self.cond_prob_func(duration, lookup)?;
        let cdf = self.raw_cdf();
        let dx = self.config().delta_x;
        let first = cond_probs.closest_x_index(hist_open_interval);
        // closest index: the safe cutoff can lie beyond the shorter cond-prob axis
        let last = cond_probs.closest_x_index(safe);

        let (mut weighted, mut norm) = (0.0, 0.0);
        for i in first..=last {
            let mut weight = 1.0 - cdf.y(i);
            if i == first {
                weight *= ((cdf.x(i) + dx / 2.0) - hist_open_interval) / dx;
            }
            norm += weight;
            weighted += cond_probs.y(i) * weight;
        }
        Ok(cap_at_one(weighted / norm))
    }
}
