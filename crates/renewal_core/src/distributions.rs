//! Discretized pdf/cdf for one model and configuration, and every
//! probability derived from them.
//!
//! [`Distributions::compute`] is a pure function of the model and config. The
//! result is immutable apart from curves that are derived on first use
//! (the integrated cdfs), which are initialized at most once and are safe to
//! request from any number of threads.

use std::sync::{Arc, OnceLock};

use log::{debug, warn};

use crate::config::{CdfLookup, DistributionConfig};
use crate::error::{
    check_duration, check_hist_open_interval, check_time_since_last, RenewalError, RenewalResult,
};
use crate::function::DiscretizedFunction;
use crate::interpolator::Interpolator;
use crate::models::{Density, RenewalModelKind};
use crate::safety;

/// Below this value of `1 − cdf(time_since_last)` the conditional probability
/// is reported as NaN.
pub const UNSTABLE_ONE_MINUS_CDF: f64 = 1e-14;

/// Caps a ratio at one. NaN passes through untouched.
pub(crate) fn cap_at_one(prob: f64) -> f64 {
    if prob > 1.0 {
        1.0
    } else {
        prob
    }
}

#[derive(Debug)]
struct IntegratedCurves {
    cdf: Interpolator,
    one_minus_cdf: Interpolator,
}

#[derive(Debug)]
pub struct Distributions {
    model: RenewalModelKind,
    config: DistributionConfig,
    pdf: Arc<DiscretizedFunction>,
    cdf: Arc<DiscretizedFunction>,
    cdf_interp: Interpolator,
    integrated: OnceLock<IntegratedCurves>,
    safe_cutoff: RenewalResult<f64>,
}

impl Distributions {
    /// Evaluates the model density on the grid and integrates it into a cdf
    /// with the trapezoidal rule (the exponential cdf is exact).
    pub fn compute(model: RenewalModelKind, config: DistributionConfig) -> RenewalResult<Self> {
        config.validate()?;
        let density = Density::new(model, &config);
        let n = config.num_points;
        let dx = config.delta_x;

        let mut pdf = vec![0.0; n];
        let mut cdf = vec![0.0; n];
        pdf[0] = density.pdf_at_origin();
        let mut clamped = 0usize;
        for i in 1..n {
            let t = dx * i as f64;
            let mut pd = density.pdf(t);
            if pd.is_nan() {
                pd = 0.0;
                clamped += 1;
            }
            pdf[i] = pd;
            cdf[i] = match density.closed_form_cdf(t) {
                Some(exact) => exact,
                None => cdf[i - 1] + dx * (pdf[i - 1] + pd) / 2.0,
            };
        }
        if clamped > 0 {
            warn!("{model} density underflowed to NaN at {clamped} points; set to 0 ({config})");
        }
        debug!("computed {model} distributions ({config})");

        let pdf = Arc::new(DiscretizedFunction::from_values(dx, pdf));
        let cdf = Arc::new(DiscretizedFunction::from_values(dx, cdf));
        let safe_cutoff = safety::compute_safe_cutoff(&cdf);
        Ok(Self {
            model,
            config,
            cdf_interp: Interpolator::new(Arc::clone(&cdf)),
            pdf,
            cdf,
            integrated: OnceLock::new(),
            safe_cutoff,
        })
    }

    pub fn model(&self) -> RenewalModelKind {
        self.model
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    /// Parameter summary attached to every curve handed out.
    pub fn info(&self) -> String {
        if self.model.uses_aperiodicity() {
            self.config.to_string()
        } else {
            format!(
                "Mean = {}; Delta T = {}; Num Points = {}",
                self.config.mean, self.config.delta_x, self.config.num_points
            )
        }
    }

    pub fn raw_pdf(&self) -> &DiscretizedFunction {
        &self.pdf
    }

    pub fn raw_cdf(&self) -> &DiscretizedFunction {
        &self.cdf
    }

    pub fn pdf(&self) -> DiscretizedFunction {
        let info = format!("{}\nComputed mean = {}", self.info(), self.pdf.mean_from_pdf() as f32);
        (*self.pdf)
            .clone()
            .with_metadata(format!("{} PDF (Probability Density Function)", self.model), info)
    }

    pub fn cdf(&self) -> DiscretizedFunction {
        (*self.cdf)
            .clone()
            .with_metadata(format!("{} CDF (Cumulative Density Function)", self.model), self.info())
    }

    /// `1 − cdf`
    pub fn survivor_func(&self) -> DiscretizedFunction {
        let values = self.cdf.values().iter().map(|c| 1.0 - c).collect();
        DiscretizedFunction::from_values(self.config.delta_x, values)
            .with_metadata(format!("{} Survivor Function", self.model), self.info())
    }

    /// `pdf / (1 − cdf)`, NaN where that is not finite.
    pub fn hazard_func(&self) -> DiscretizedFunction {
        let values = self
            .pdf
            .values()
            .iter()
            .zip(self.cdf.values())
            .map(|(p, c)| {
                let haz = p / (1.0 - c);
                if haz.is_infinite() {
                    f64::NAN
                } else {
                    haz
                }
            })
            .collect();
        DiscretizedFunction::from_values(self.config.delta_x, values)
            .with_metadata(format!("{} Hazard Function", self.model), self.info())
    }

    /// Largest grid time for which dividing by `1 − cdf` is numerically safe.
    pub fn safe_time_since_last_cutoff(&self) -> RenewalResult<f64> {
        self.safe_cutoff.clone()
    }

    /// Probability of an event within `duration` given none in the
    /// `time_since_last` already elapsed. NaN when this can't be computed
    /// safely.
    pub fn cond_prob(
        &self,
        time_since_last: f64,
        duration: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<f64> {
        match self.model {
            RenewalModelKind::Bpt => self.bpt_cond_prob(time_since_last, duration, lookup),
            _ => self.base_cond_prob(time_since_last, duration, lookup),
        }
    }

    /// `(cdf(t + d) − cdf(t)) / (1 − cdf(t))` without any tail safeguards.
    pub fn base_cond_prob(
        &self,
        time_since_last: f64,
        duration: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<f64> {
        check_time_since_last(time_since_last)?;
        check_duration(duration)?;
        let end = time_since_last + duration;

        let (p1, p2) = match self.nearest_points(time_since_last, end, lookup)? {
            Some(pair) => pair,
            None => (
                self.cdf_interp.interpolate(time_since_last)?,
                self.cdf_interp.interpolate(end)?,
            ),
        };

        let one_minus_p1 = 1.0 - p1;
        if one_minus_p1 < UNSTABLE_ONE_MINUS_CDF {
            return Ok(f64::NAN);
        }
        Ok((p2 - p1) / one_minus_p1)
    }

    /// Grid cdf values at the points nearest `start` and `end`, or `None` when
    /// interpolation should be used instead.
    fn nearest_points(
        &self,
        start: f64,
        end: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<Option<(f64, f64)>> {
        if lookup == CdfLookup::Interpolated {
            return Ok(None);
        }
        let dx = self.config.delta_x;
        let pt1 = (start / dx).round();
        let pt2 = (end / dx).round();
        if pt1 == pt2 {
            return Ok(None);
        }
        if pt2 >= self.cdf.size() as f64 {
            return Err(RenewalError::OutOfDomain {
                x: end,
                max_x: self.cdf.max_x(),
            });
        }
        Ok(Some((self.cdf.y(pt1 as usize), self.cdf.y(pt2 as usize))))
    }

    /// Number of start times on the grid for which `start + duration` stays in
    /// the domain.
    fn cond_prob_len(&self, duration: f64) -> RenewalResult<usize> {
        check_duration(duration)?;
        let steps = (duration / self.config.delta_x + 1.0).floor();
        if steps >= self.config.num_points as f64 {
            return Err(RenewalError::DurationTooLong {
                duration,
                max: self.config.max_x(),
            });
        }
        Ok(self.config.num_points - steps as usize)
    }

    /// Lazily evaluates the conditional probability at every grid start time
    /// whose window fits in the domain.
    pub fn cond_prob_iter(
        self: &Arc<Self>,
        duration: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<CondProbIter> {
        let len = self.cond_prob_len(duration)?;
        Ok(CondProbIter {
            dists: Arc::clone(self),
            duration,
            lookup,
            index: 0,
            len,
        })
    }

    pub fn cond_prob_func(
        &self,
        duration: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<DiscretizedFunction> {
        let len = self.cond_prob_len(duration)?;
        let dx = self.config.delta_x;
        let values = (0..len)
            .map(|i| self.cond_prob(dx * i as f64, duration, lookup))
            .collect::<RenewalResult<Vec<f64>>>()?;

        let func = DiscretizedFunction::from_values(dx, values);
        Ok(match self.model {
            RenewalModelKind::Bpt => func.with_metadata(
                format!("{} Safe Conditional Probability Function", self.model),
                format!("{}\nsafeTimeSinceLast={}", self.info(), self.safe_cutoff_label()),
            ),
            _ => func.with_metadata(
                format!("{} Conditional Probability Function", self.model),
                self.info(),
            ),
        })
    }

    fn safe_cutoff_label(&self) -> String {
        match &self.safe_cutoff {
            Ok(cutoff) => cutoff.to_string(),
            Err(_) => "NaN".to_string(),
        }
    }

    /// Conditional probability divided by the expected number of events
    /// (`duration / mean`).
    pub fn cond_prob_gain_func(
        &self,
        duration: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<DiscretizedFunction> {
        let mut func = self.cond_prob_func(duration, lookup)?;
        let mean = self.config.mean;
        func.scale(mean / duration);
        func.set_name(format!("{} Conditional Probability Gain Function", self.model));
        func.set_info(format!(
            "Defined as cond prob divided by expected number (duration/mean={}).\n{}",
            (duration / mean) as f32,
            self.info()
        ));
        Ok(func)
    }

    fn integrated(&self) -> &IntegratedCurves {
        self.integrated.get_or_init(|| {
            let n = self.config.num_points;
            let dx = self.config.delta_x;
            let mut cdf_sum = vec![0.0; n];
            let mut one_minus_sum = vec![0.0; n];
            let (mut sum1, mut sum2) = (0.0, 0.0);
            for i in 1..n {
                let avg = (self.cdf.y(i - 1) + self.cdf.y(i)) / 2.0;
                sum1 += dx * avg;
                sum2 += dx * (1.0 - avg);
                cdf_sum[i] = sum1;
                one_minus_sum[i] = sum2;
            }
            debug!("integrated {} cdf ({})", self.model, self.config);
            IntegratedCurves {
                cdf: Interpolator::new(Arc::new(
                    DiscretizedFunction::from_values(dx, cdf_sum)
                        .with_metadata(format!("{} Integrated CDF", self.model), self.info()),
                )),
                one_minus_cdf: Interpolator::new(Arc::new(
                    DiscretizedFunction::from_values(dx, one_minus_sum)
                        .with_metadata(format!("{} Integrated 1-CDF", self.model), self.info()),
                )),
            }
        })
    }

    /// Running trapezoidal integral of the cdf.
    pub fn integrated_cdf(&self) -> &DiscretizedFunction {
        self.integrated().cdf.function()
    }

    /// Running trapezoidal integral of `1 − cdf`.
    pub fn integrated_one_minus_cdf(&self) -> &DiscretizedFunction {
        self.integrated().one_minus_cdf.function()
    }

    pub(crate) fn integrated_ratio(
        &self,
        duration: f64,
        hist_open_interval: f64,
        clamp_end: bool,
    ) -> RenewalResult<(f64, f64)> {
        let integrated = self.integrated();
        let mut end = hist_open_interval + duration;
        if clamp_end {
            end = end.min(integrated.cdf.function().max_x());
        }
        let cdf_integral =
            integrated.cdf.interpolate(end)? - integrated.cdf.interpolate(hist_open_interval)?;
        let numer = duration - cdf_integral;
        let total = integrated.one_minus_cdf.function();
        let denom = total.y(total.size() - 1)
            - integrated.one_minus_cdf.interpolate(hist_open_interval)?;
        Ok((numer, denom))
    }

    /// Probability of an event within `duration` when the date of the last
    /// event is unknown beyond the fact that none occurred during the last
    /// `hist_open_interval`.
    pub fn cond_prob_for_unknown_time_since_last_event(
        &self,
        duration: f64,
        hist_open_interval: f64,
        lookup: CdfLookup,
    ) -> RenewalResult<f64> {
        match self.model {
            RenewalModelKind::Bpt => self.bpt_cond_prob_for_unknown_time_since_last_event(
                duration,
                hist_open_interval,
                lookup,
            ),
            _ => {
                check_duration(duration)?;
                check_hist_open_interval(hist_open_interval)?;
                let (numer, denom) = self.integrated_ratio(duration, hist_open_interval, false)?;
                Ok(cap_at_one(numer / denom))
            }
        }
    }

    /// Density of the time since the last event when only the historic open
    /// interval is known: `1 − cdf` beyond the open interval, normalized.
    pub fn time_since_last_event_pdf(
        &self,
        hist_open_interval: f64,
    ) -> RenewalResult<DiscretizedFunction> {
        check_hist_open_interval(hist_open_interval)?;
        let dx = self.config.delta_x;
        let mut func = DiscretizedFunction::new(self.config.num_points, dx);
        let first = func.closest_x_index(hist_open_interval);
        let mut norm = 0.0;
        for i in first..func.size() {
            let survival = 1.0 - self.cdf.y(i);
            func.set(i, survival);
            norm += survival;
        }
        func.scale(1.0 / (dx * norm));
        let mean = func.mean_from_pdf();
        Ok(func.with_metadata(
            "Time Since Last Event PDF",
            format!(
                "The PDF of date of last event when only the historic open interval \
                 ({hist_open_interval}) is known\nmean = {}",
                mean as f32
            ),
        ))
    }

    pub fn mean_time_since_last_event(&self, hist_open_interval: f64) -> RenewalResult<f64> {
        Ok(self.time_since_last_event_pdf(hist_open_interval)?.mean_from_pdf())
    }

    /// Smallest factor `f` on a 0.001 grid starting at 1.001 such that
    /// `cdf(mean·f) − cdf(mean/f) ≥ confidence`.
    pub fn fractional_uncertainty_for_conf_bounds(&self, confidence: f64) -> RenewalResult<f64> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(RenewalError::InvalidConfidence(confidence));
        }
        let mean = self.config.mean;
        let max_x = self.cdf.max_x();
        let mut step = 1usize;
        loop {
            let factor = 1.0 + CONF_FACTOR_STEP * step as f64;
            let upper = mean * factor;
            if upper > max_x {
                return Err(RenewalError::ConfidenceNotReached {
                    confidence,
                    max_factor: factor,
                });
            }
            let prob =
                self.cdf.interpolated_y(upper)? - self.cdf.interpolated_y(mean / factor)?;
            if prob >= confidence {
                return Ok(factor);
            }
            step += 1;
        }
    }
}

const CONF_FACTOR_STEP: f64 = 0.001;

/// Conditional probabilities `(time_since_last, probability)` for successive
/// grid start times. Consumed once.
#[derive(Debug)]
pub struct CondProbIter {
    dists: Arc<Distributions>,
    duration: f64,
    lookup: CdfLookup,
    index: usize,
    len: usize,
}

impl CondProbIter {
    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl Iterator for CondProbIter {
    type Item = RenewalResult<(f64, f64)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.len {
            return None;
        }
        let t = self.dists.config.delta_x * self.index as f64;
        self.index += 1;
        Some(
            self.dists
                .cond_prob(t, self.duration, self.lookup)
                .map(|p| (t, p)),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.len - self.index;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for CondProbIter {}
