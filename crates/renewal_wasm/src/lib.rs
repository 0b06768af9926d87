//! WASM bindings for `renewal_core`.
//!
//! `WasmRenewalCalc` wraps one calculator; curves cross the boundary as
//! serialized `{ name, info, x, y }` objects or raw `Float64Array`s.

mod calc;
mod curve;

pub use calc::{bpt_cond_prob_direct, WasmRenewalCalc};
