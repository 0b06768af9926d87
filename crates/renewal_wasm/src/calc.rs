//! Calculator wrapper exposed to JavaScript.

use anyhow::Context;
use js_sys::Float64Array;
use renewal_core::models::bpt;
use renewal_core::{
    CdfLookup, DiscretizedFunction, GridRange, RenewalCalc, RenewalModelKind, RenewalResult,
};
use serde::Serialize;
use serde_wasm_bindgen::to_value;
use wasm_bindgen::prelude::*;

use crate::curve::CurvePayload;

pub(crate) fn parse_model(name: &str) -> anyhow::Result<RenewalModelKind> {
    name.parse::<RenewalModelKind>().map_err(anyhow::Error::msg)
}

fn to_js_error(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{:#}", err))
}

fn serialize<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    to_value(value).map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

fn checked<T>(result: RenewalResult<T>, context: &'static str) -> Result<T, JsValue> {
    result.context(context).map_err(to_js_error)
}

fn curve(
    result: RenewalResult<DiscretizedFunction>,
    context: &'static str,
) -> Result<JsValue, JsValue> {
    let func = checked(result, context)?;
    serialize(&CurvePayload::from(&func))
}

#[wasm_bindgen]
pub struct WasmRenewalCalc {
    calc: RenewalCalc,
}

#[wasm_bindgen]
impl WasmRenewalCalc {
    /// `model` is one of "exponential", "lognormal", "weibull" or "bpt".
    #[wasm_bindgen(constructor)]
    pub fn new(model: &str) -> Result<WasmRenewalCalc, JsValue> {
        console_error_panic_hook::set_once();
        let kind = parse_model(model).map_err(to_js_error)?;
        Ok(WasmRenewalCalc {
            calc: RenewalCalc::new(kind),
        })
    }

    pub fn model_name(&self) -> String {
        self.calc.name().to_string()
    }

    pub fn set_all(
        &mut self,
        mean: f64,
        aperiodicity: f64,
        delta_x: f64,
        num_points: u32,
    ) -> Result<(), JsValue> {
        checked(
            self.calc.set_all(mean, aperiodicity, delta_x, num_points as usize),
            "Invalid distribution parameters",
        )
    }

    pub fn set_mean_and_aperiodicity(
        &mut self,
        mean: f64,
        aperiodicity: f64,
    ) -> Result<(), JsValue> {
        checked(
            self.calc.set_mean_and_aperiodicity(mean, aperiodicity),
            "Invalid distribution parameters",
        )
    }

    pub fn set_nearest_point_lookup(&mut self, enabled: bool) -> Result<(), JsValue> {
        let lookup = if enabled {
            CdfLookup::NearestPoint
        } else {
            CdfLookup::Interpolated
        };
        checked(self.calc.set_cdf_lookup(lookup), "Cannot change cdf lookup")
    }

    pub fn get_config(&self) -> Result<JsValue, JsValue> {
        serialize(self.calc.config())
    }

    pub fn get_pdf(&self) -> Result<JsValue, JsValue> {
        curve(self.calc.pdf(), "PDF computation failed")
    }

    pub fn get_cdf(&self) -> Result<JsValue, JsValue> {
        curve(self.calc.cdf(), "CDF computation failed")
    }

    pub fn get_survivor_func(&self) -> Result<JsValue, JsValue> {
        curve(self.calc.survivor_func(), "Survivor function failed")
    }

    pub fn get_haz_func(&self) -> Result<JsValue, JsValue> {
        curve(self.calc.haz_func(), "Hazard function failed")
    }

    pub fn get_cond_prob_func(&self, duration: f64) -> Result<JsValue, JsValue> {
        curve(self.calc.cond_prob_func(duration), "Conditional probability function failed")
    }

    pub fn get_cond_prob_gain_func(&self, duration: f64) -> Result<JsValue, JsValue> {
        curve(self.calc.cond_prob_gain_func(duration), "Conditional probability gain failed")
    }

    pub fn get_time_since_last_event_pdf(
        &self,
        hist_open_interval: f64,
    ) -> Result<JsValue, JsValue> {
        curve(
            self.calc.time_since_last_event_pdf(hist_open_interval),
            "Time since last event PDF failed",
        )
    }

    /// Raw cdf samples, for callers that only need the y values.
    pub fn cdf_values(&self) -> Result<Float64Array, JsValue> {
        let dists = checked(self.calc.distributions(), "CDF computation failed")?;
        Ok(Float64Array::from(dists.raw_cdf().values()))
    }

    pub fn cond_prob(&self, time_since_last: f64, duration: f64) -> Result<f64, JsValue> {
        checked(
            self.calc.cond_prob(time_since_last, duration),
            "Conditional probability failed",
        )
    }

    pub fn cond_prob_for_unknown_time_since_last_event(
        &self,
        duration: f64,
        hist_open_interval: f64,
    ) -> Result<f64, JsValue> {
        checked(
            self.calc
                .cond_prob_for_unknown_time_since_last_event(duration, hist_open_interval),
            "Conditional probability for unknown date of last event failed",
        )
    }

    pub fn safe_time_since_last_cutoff(&self) -> Result<f64, JsValue> {
        checked(self.calc.safe_time_since_last_cutoff(), "Safe cutoff unavailable")
    }

    pub fn fractional_uncertainty_for_conf_bounds(&self, confidence: f64) -> Result<f64, JsValue> {
        checked(
            self.calc.fractional_uncertainty_for_conf_bounds(confidence),
            "Confidence bound search failed",
        )
    }

    pub fn freeze(&mut self) -> Result<(), JsValue> {
        checked(self.calc.freeze(), "Freeze failed")
    }

    pub fn is_frozen(&self) -> bool {
        self.calc.is_frozen()
    }

    /// Fits the model to a pdf sampled at `delta` spacing from x = 0.
    #[allow(clippy::too_many_arguments)]
    pub fn fit_to_function(
        &mut self,
        delta: f64,
        values: Vec<f64>,
        mean_min: f64,
        mean_max: f64,
        mean_num: u32,
        aperiodicity_min: f64,
        aperiodicity_max: f64,
        aperiodicity_num: u32,
    ) -> Result<JsValue, JsValue> {
        let target = DiscretizedFunction::from_values(delta, values);
        let fit = checked(
            self.calc.fit_to_this_function(
                &target,
                GridRange::new(mean_min, mean_max, mean_num as usize),
                GridRange::new(aperiodicity_min, aperiodicity_max, aperiodicity_num as usize),
            ),
            "Fit failed",
        )?;
        serialize(&fit)
    }
}

/// Fixed-step BPT conditional probability that needs no calculator.
#[wasm_bindgen]
pub fn bpt_cond_prob_direct(
    mean: f64,
    aperiodicity: f64,
    time_since_last: f64,
    duration: f64,
) -> f64 {
    bpt::cond_prob_direct(mean, aperiodicity, time_since_last, duration)
}
