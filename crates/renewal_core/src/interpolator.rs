//! Repeated linear interpolation over a shared curve.
//!
//! An [`Interpolator`] starts out computing each slope on the fly. Once it has
//! answered [`OPTIMIZE_AFTER_CALLS`] queries it builds a per-segment slope
//! table and uses that from then on. The table is built at most once and the
//! interpolator can be queried from many threads at the same time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use log::debug;

use crate::error::RenewalResult;
use crate::function::DiscretizedFunction;

/// Number of direct interpolations after which the slope table is built.
pub const OPTIMIZE_AFTER_CALLS: usize = 100;

#[derive(Debug)]
pub struct Interpolator {
    func: Arc<DiscretizedFunction>,
    calls: AtomicUsize,
    slopes: OnceLock<Box<[f64]>>,
}

impl Interpolator {
    pub fn new(func: Arc<DiscretizedFunction>) -> Self {
        Self {
            func,
            calls: AtomicUsize::new(0),
            slopes: OnceLock::new(),
        }
    }

    pub fn function(&self) -> &Arc<DiscretizedFunction> {
        &self.func
    }

    /// True once the slope table has been built.
    pub fn is_optimized(&self) -> bool {
        self.slopes.get().is_some()
    }

    /// Linearly interpolated y at `x`; fails outside the function's domain.
    pub fn interpolate(&self, x: f64) -> RenewalResult<f64> {
        let func = &*self.func;
        let x = func.checked_x(x)?;
        if func.size() == 1 {
            return Ok(func.y(0));
        }
        let i = func.segment_index(x);
        let dx = x - func.x(i);

        if let Some(slopes) = self.slope_table() {
            return Ok(func.y(i) + slopes[i] * dx);
        }
        let (y0, y1) = (func.y(i), func.y(i + 1));
        Ok(y0 + (y1 - y0) * dx / func.delta())
    }

    fn slope_table(&self) -> Option<&[f64]> {
        if let Some(slopes) = self.slopes.get() {
            return Some(slopes);
        }
        let calls = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if calls <= OPTIMIZE_AFTER_CALLS {
            return None;
        }
        let slopes = self.slopes.get_or_init(|| {
            debug!(
                "building slope table for '{}' ({} points) after {} calls",
                self.func.name(),
                self.func.size(),
                calls
            );
            let delta = self.func.delta();
            self.func
                .values()
                .windows(2)
                .map(|pair| (pair[1] - pair[0]) / delta)
                .collect()
        });
        Some(slopes)
    }
}
