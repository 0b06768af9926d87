//! Serializable form of a discretized curve.

use renewal_core::DiscretizedFunction;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub(crate) struct CurvePayload {
    pub name: String,
    pub info: String,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl From<&DiscretizedFunction> for CurvePayload {
    fn from(func: &DiscretizedFunction) -> Self {
        let (x, y) = func.points().unzip();
        Self {
            name: func.name().to_string(),
            info: func.info().to_string(),
            x,
            y,
        }
    }
}
