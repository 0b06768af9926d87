//! The configurable calculator.
//!
//! A [`RenewalCalc`] owns one model and one [`DistributionConfig`]. Curves are
//! computed the first time anything asks for them and cached until a setter
//! changes the configuration. Computation happens under a mutex, so at most one
//! thread ever computes a given configuration and the others wait for it.
//!
//! [`RenewalCalc::freeze`] ends the configuration phase: every curve is forced,
//! setters start failing with [`RenewalError::Frozen`], and reads no longer
//! touch the lock.

use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{CdfLookup, DistributionConfig, GridRange};
use crate::distributions::{CondProbIter, Distributions};
use crate::error::{RenewalError, RenewalResult};
use crate::function::DiscretizedFunction;
use crate::models::RenewalModelKind;

#[derive(Debug)]
enum CalcState {
    Stale,
    Fresh(Arc<Distributions>),
}

/// Best grid point found by [`RenewalCalc::fit_to_this_function`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitResult {
    pub mean: f64,
    pub aperiodicity: f64,
    /// Sum of squared pdf differences at the target's x values.
    pub misfit: f64,
}

#[derive(Debug)]
pub struct RenewalCalc {
    model: RenewalModelKind,
    config: DistributionConfig,
    lookup: CdfLookup,
    state: Mutex<CalcState>,
    frozen: Option<Arc<Distributions>>,
}

impl RenewalCalc {
    /// Calculator with the default configuration.
    pub fn new(model: RenewalModelKind) -> Self {
        Self {
            model,
            config: DistributionConfig::default(),
            lookup: CdfLookup::default(),
            state: Mutex::new(CalcState::Stale),
            frozen: None,
        }
    }

    pub fn with_config(model: RenewalModelKind, config: DistributionConfig) -> RenewalResult<Self> {
        let mut calc = Self::new(model);
        calc.set_config(config)?;
        Ok(calc)
    }

    pub fn exponential() -> Self {
        Self::new(RenewalModelKind::Exponential)
    }

    pub fn lognormal() -> Self {
        Self::new(RenewalModelKind::Lognormal)
    }

    pub fn weibull() -> Self {
        Self::new(RenewalModelKind::Weibull)
    }

    pub fn bpt() -> Self {
        Self::new(RenewalModelKind::Bpt)
    }

    pub fn model(&self) -> RenewalModelKind {
        self.model
    }

    pub fn name(&self) -> &'static str {
        self.model.name()
    }

    pub fn config(&self) -> &DistributionConfig {
        &self.config
    }

    pub fn mean(&self) -> f64 {
        self.config.mean
    }

    pub fn aperiodicity(&self) -> f64 {
        self.config.aperiodicity
    }

    pub fn cdf_lookup(&self) -> CdfLookup {
        self.lookup
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.is_some()
    }

    /// True when cached curves match the current configuration.
    pub fn is_computed(&self) -> bool {
        if self.frozen.is_some() {
            return true;
        }
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(*state, CalcState::Fresh(_))
    }

    fn ensure_mutable(&self) -> RenewalResult<()> {
        if self.frozen.is_some() {
            return Err(RenewalError::Frozen);
        }
        Ok(())
    }

    /// Replaces the configuration and drops every cached curve.
    pub fn set_config(&mut self, config: DistributionConfig) -> RenewalResult<()> {
        self.ensure_mutable()?;
        config.validate()?;
        self.config = config;
        self.state = Mutex::new(CalcState::Stale);
        Ok(())
    }

    pub fn set_all(
        &mut self,
        mean: f64,
        aperiodicity: f64,
        delta_x: f64,
        num_points: usize,
    ) -> RenewalResult<()> {
        self.ensure_mutable()?;
        self.set_config(DistributionConfig::new(mean, aperiodicity, delta_x, num_points)?)
    }

    /// Sets the mean and aperiodicity with the default discretization
    /// (see [`DistributionConfig::for_mean_and_aperiodicity`]).
    pub fn set_mean_and_aperiodicity(&mut self, mean: f64, aperiodicity: f64) -> RenewalResult<()> {
        self.ensure_mutable()?;
        self.set_config(DistributionConfig::for_mean_and_aperiodicity(mean, aperiodicity)?)
    }

    pub fn set_aperiodicity(&mut self, aperiodicity: f64) -> RenewalResult<()> {
        self.ensure_mutable()?;
        if !self.model.uses_aperiodicity() {
            return Err(RenewalError::AperiodicityNotSupported);
        }
        let config = DistributionConfig {
            aperiodicity,
            ..self.config
        };
        self.set_config(config)
    }

    pub fn set_cdf_lookup(&mut self, lookup: CdfLookup) -> RenewalResult<()> {
        self.ensure_mutable()?;
        self.lookup = lookup;
        Ok(())
    }

    /// Curves for the current configuration, computing them if needed.
    pub fn distributions(&self) -> RenewalResult<Arc<Distributions>> {
        if let Some(frozen) = &self.frozen {
            return Ok(Arc::clone(frozen));
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let CalcState::Fresh(dists) = &*state {
            return Ok(Arc::clone(dists));
        }
        let dists = Arc::new(Distributions::compute(self.model, self.config)?);
        *state = CalcState::Fresh(Arc::clone(&dists));
        Ok(dists)
    }

    pub fn pdf(&self) -> RenewalResult<DiscretizedFunction> {
        Ok(self.distributions()?.pdf())
    }

    pub fn cdf(&self) -> RenewalResult<DiscretizedFunction> {
        Ok(self.distributions()?.cdf())
    }

    pub fn survivor_func(&self) -> RenewalResult<DiscretizedFunction> {
        Ok(self.distributions()?.survivor_func())
    }

    pub fn haz_func(&self) -> RenewalResult<DiscretizedFunction> {
        Ok(self.distributions()?.hazard_func())
    }

    pub fn cond_prob(&self, time_since_last: f64, duration: f64) -> RenewalResult<f64> {
        self.distributions()?.cond_prob(time_since_last, duration, self.lookup)
    }

    pub fn cond_prob_iter(&self, duration: f64) -> RenewalResult<CondProbIter> {
        self.distributions()?.cond_prob_iter(duration, self.lookup)
    }

    pub fn cond_prob_func(&self, duration: f64) -> RenewalResult<DiscretizedFunction> {
        self.distributions()?.cond_prob_func(duration, self.lookup)
    }

    pub fn cond_prob_gain_func(&self, duration: f64) -> RenewalResult<DiscretizedFunction> {
        self.distributions()?.cond_prob_gain_func(duration, self.lookup)
    }

    pub fn cond_prob_for_unknown_time_since_last_event(
        &self,
        duration: f64,
        hist_open_interval: f64,
    ) -> RenewalResult<f64> {
        self.distributions()?
            .cond_prob_for_unknown_time_since_last_event(duration, hist_open_interval, self.lookup)
    }

    pub fn safe_time_since_last_cutoff(&self) -> RenewalResult<f64> {
        self.distributions()?.safe_time_since_last_cutoff()
    }

    pub fn time_since_last_event_pdf(
        &self,
        hist_open_interval: f64,
    ) -> RenewalResult<DiscretizedFunction> {
        self.distributions()?.time_since_last_event_pdf(hist_open_interval)
    }

    pub fn mean_time_since_last_event(&self, hist_open_interval: f64) -> RenewalResult<f64> {
        self.distributions()?.mean_time_since_last_event(hist_open_interval)
    }

    pub fn fractional_uncertainty_for_conf_bounds(&self, confidence: f64) -> RenewalResult<f64> {
        self.distributions()?.fractional_uncertainty_for_conf_bounds(confidence)
    }

    /// Computes every curve, including the lazily integrated ones, and makes
    /// the calculator read-only. Freezing twice is a no-op.
    pub fn freeze(&mut self) -> RenewalResult<()> {
        if self.frozen.is_some() {
            return Ok(());
        }
        let dists = self.distributions()?;
        dists.integrated_cdf();
        debug!("froze {} calculator ({})", self.model, self.config);
        self.frozen = Some(dists);
        Ok(())
    }

    /// Grid search for the mean and aperiodicity whose pdf best matches
    /// `target` in the least-squares sense. The calculator is left configured
    /// with the best fit, discretized at half the target's spacing out to
    /// twice its extent.
    ///
    /// The exponential model only searches the mean axis.
    pub fn fit_to_this_function(
        &mut self,
        target: &DiscretizedFunction,
        mean_range: GridRange,
        aperiodicity_range: GridRange,
    ) -> RenewalResult<FitResult> {
        self.ensure_mutable()?;
        mean_range.validate("mean")?;
        let aperiodicities: Vec<f64> = if self.model.uses_aperiodicity() {
            aperiodicity_range.validate("aperiodicity")?;
            aperiodicity_range.values().collect()
        } else {
            vec![self.config.aperiodicity]
        };
        if target.size() < 2 {
            return Err(RenewalError::InvalidNumPoints(target.size()));
        }
        let delta_x = target.delta() / 2.0;
        let num_points = target.size() * 2 + 1;

        let mut best: Option<FitResult> = None;
        for mean in mean_range.values() {
            for &aperiodicity in &aperiodicities {
                let config = DistributionConfig::new(mean, aperiodicity, delta_x, num_points)?;
                let dists = Distributions::compute(self.model, config)?;
                let misfit = pdf_misfit(target, dists.raw_pdf())?;
                if best.map_or(true, |b| misfit < b.misfit) {
                    best = Some(FitResult {
                        mean,
                        aperiodicity,
                        misfit,
                    });
                }
            }
        }

        // both axes hold at least one value, so the search always yields a point
        let best = best.ok_or(RenewalError::InvalidGrid {
            axis: "mean",
            reason: "at least one grid value is required",
        })?;
        debug!(
            "best {} fit: mean = {}, aperiodicity = {}, misfit = {:e}",
            self.model, best.mean, best.aperiodicity, best.misfit
        );
        self.set_all(best.mean, best.aperiodicity, delta_x, num_points)?;
        Ok(best)
    }
}

/// Σ (target − pdf)² over every target point but the last.
fn pdf_misfit(target: &DiscretizedFunction, pdf: &DiscretizedFunction) -> RenewalResult<f64> {
    let mut misfit = 0.0;
    for i in 0..target.size() - 1 {
        let diff = target.y(i) - pdf.interpolated_y(target.x(i))?;
        misfit += diff * diff;
    }
    Ok(misfit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn curves_are_computed_lazily_and_invalidated_by_setters() {
        let mut calc = RenewalCalc::lognormal();
        assert!(!calc.is_computed());
        let first = calc.cdf().unwrap();
        assert!(calc.is_computed());

        calc.set_all(50.0, 0.3, 0.5, 400).unwrap();
        assert!(!calc.is_computed());
        let second = calc.cdf().unwrap();
        assert_ne!(first, second);
        assert_eq!(second.size(), 400);
    }

    #[test]
    fn repeated_reads_share_one_computation() {
        let calc = RenewalCalc::weibull();
        let a = calc.distributions().unwrap();
        let b = calc.distributions().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn invalid_settings_leave_config_untouched() {
        let mut calc = RenewalCalc::bpt();
        let before = *calc.config();
        assert!(calc.set_all(-1.0, 0.5, 1.0, 100).is_err());
        assert!(calc.set_aperiodicity(0.0).is_err());
        assert_eq!(*calc.config(), before);
    }

    #[test]
    fn exponential_rejects_aperiodicity() {
        let mut calc = RenewalCalc::exponential();
        assert_eq!(calc.set_aperiodicity(0.3), Err(RenewalError::AperiodicityNotSupported));
        let mut bpt = RenewalCalc::bpt();
        bpt.set_aperiodicity(0.3).unwrap();
        assert_eq!(bpt.aperiodicity(), 0.3);
    }

    #[test]
    fn default_bpt_calculator_answers_queries() {
        let mut calc = RenewalCalc::bpt();
        assert_eq!(calc.safe_time_since_last_cutoff(), Ok(499.0));
        assert!(calc.cond_prob(50.0, 30.0).is_ok());
        assert!(calc.cond_prob_for_unknown_time_since_last_event(30.0, 0.0).is_ok());
        assert!(calc.cond_prob_func(30.0).is_ok());

        calc.set_mean_and_aperiodicity(100.0, 0.2).unwrap();
        assert!(calc.cond_prob(50.0, 30.0).is_ok());
    }

    #[test]
    fn frozen_calculator_rejects_every_mutation() {
        let mut calc = RenewalCalc::bpt();
        calc.set_all(100.0, 0.5, 1.0, 2000).unwrap();
        let before = calc.cond_prob(50.0, 30.0).unwrap();
        calc.freeze().unwrap();
        calc.freeze().unwrap();

        assert_eq!(calc.set_all(10.0, 0.5, 1.0, 100), Err(RenewalError::Frozen));
        assert_eq!(calc.set_aperiodicity(0.2), Err(RenewalError::Frozen));
        assert_eq!(calc.set_mean_and_aperiodicity(10.0, 0.2), Err(RenewalError::Frozen));
        assert_eq!(calc.set_cdf_lookup(CdfLookup::NearestPoint), Err(RenewalError::Frozen));
        let target = calc.pdf().unwrap();
        let (means, apers) = (GridRange::new(90.0, 110.0, 3), GridRange::new(0.4, 0.6, 3));
        assert_eq!(
            calc.fit_to_this_function(&target, means, apers),
            Err(RenewalError::Frozen)
        );
        assert_eq!(calc.cond_prob(50.0, 30.0).unwrap(), before);
        assert!(calc.is_frozen());
    }

    #[test]
    fn frozen_calculator_serves_concurrent_readers() {
        let mut calc = RenewalCalc::bpt();
        calc.set_all(100.0, 0.5, 1.0, 2000).unwrap();
        calc.freeze().unwrap();
        let expected: Vec<f64> = (0..20)
            .map(|i| calc.cond_prob(i as f64 * 10.0, 30.0).unwrap())
            .collect();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for (i, want) in expected.iter().enumerate() {
                        let got = calc.cond_prob(i as f64 * 10.0, 30.0).unwrap();
                        assert_relative_eq!(got, *want, epsilon = 1e-15, max_relative = 1e-12);
                    }
                    let unknown = calc
                        .cond_prob_for_unknown_time_since_last_event(30.0, 100.0)
                        .unwrap();
                    assert!((0.0..=1.0).contains(&unknown));
                });
            }
        });
    }

    #[test]
    fn unfrozen_calculator_computes_once_across_threads() {
        let calc = RenewalCalc::lognormal();
        let handles: Vec<Arc<Distributions>> = std::thread::scope(|scope| {
            let workers: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| calc.distributions().unwrap()))
                .collect();
            workers.into_iter().map(|w| w.join().unwrap()).collect()
        });
        assert!(handles.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn pdf_info_reports_computed_mean() {
        let mut calc = RenewalCalc::weibull();
        calc.set_all(10.0, 0.4, 0.01, 5000).unwrap();
        let pdf = calc.pdf().unwrap();
        assert!(pdf.info().contains("Computed mean = "));
        assert_relative_eq!(pdf.mean_from_pdf(), 10.0, max_relative = 1e-3);
    }

    #[test]
    fn fit_recovers_generating_parameters() {
        let mut source = RenewalCalc::bpt();
        source.set_all(10.0, 0.5, 0.2, 300).unwrap();
        let target = source.pdf().unwrap();

        let mut calc = RenewalCalc::bpt();
        let (means, apers) = (GridRange::new(8.0, 12.0, 5), GridRange::new(0.3, 0.7, 5));
        let fit = calc.fit_to_this_function(&target, means, apers).unwrap();
        assert_relative_eq!(fit.mean, 10.0, max_relative = 1e-12);
        assert_relative_eq!(fit.aperiodicity, 0.5, max_relative = 1e-12);
        assert_eq!(calc.config().num_points, 601);
        assert_relative_eq!(calc.config().delta_x, 0.1);
        assert_relative_eq!(calc.mean(), fit.mean);
    }

    #[test]
    fn exponential_fit_only_searches_mean() {
        let mut source = RenewalCalc::exponential();
        source.set_all(5.0, 1.0, 0.1, 300).unwrap();
        let target = source.pdf().unwrap();

        let mut calc = RenewalCalc::exponential();
        let (means, apers) = (GridRange::new(3.0, 7.0, 5), GridRange::new(-1.0, -2.0, 0));
        let fit = calc.fit_to_this_function(&target, means, apers).unwrap();
        assert_relative_eq!(fit.mean, 5.0);
        assert_eq!(fit.aperiodicity, calc.aperiodicity());
    }

    #[test]
    fn fit_rejects_malformed_grids() {
        let mut calc = RenewalCalc::lognormal();
        let target = calc.pdf().unwrap();
        let empty_means = (GridRange::new(1.0, 2.0, 0), GridRange::new(0.3, 0.7, 2));
        assert!(matches!(
            calc.fit_to_this_function(&target, empty_means.0, empty_means.1),
            Err(RenewalError::InvalidGrid { axis: "mean", .. })
        ));
        let reversed_apers = (GridRange::new(1.0, 2.0, 2), GridRange::new(0.7, 0.3, 2));
        assert!(matches!(
            calc.fit_to_this_function(&target, reversed_apers.0, reversed_apers.1),
            Err(RenewalError::InvalidGrid {
                axis: "aperiodicity",
                ..
            })
        ));
    }

    #[test]
    fn nearest_point_lookup_is_forwarded() {
        let mut calc = RenewalCalc::lognormal();
        calc.set_cdf_lookup(CdfLookup::NearestPoint).unwrap();
        let cdf = calc.cdf().unwrap();
        let p = calc.cond_prob(10.2, 20.0).unwrap();
        assert_relative_eq!(p, (cdf.y(30) - cdf.y(10)) / (1.0 - cdf.y(10)), max_relative = 1e-12);
    }
}
