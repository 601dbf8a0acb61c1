use serde::{Deserialize, Serialize};

/// Affine map of `value` from `[in_start, in_end]` onto
/// `[out_start, out_end]`. Values outside the input range extrapolate.
pub fn map_range(in_start: f64, in_end: f64, out_start: f64, out_end: f64, value: f64) -> f64 {
    out_start + (value - in_start) / ((in_end - in_start) / (out_end - out_start))
}

/// Half-open signal window `above < value <= up_to`; an unset lower bound
/// admits everything up to `up_to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalRange {
    #[serde(default)]
    pub above: Option<f64>,
    pub up_to: f64,
}

impl SignalRange {
    pub fn contains(&self, value: f64) -> bool {
        self.above.map_or(true, |above| value > above) && value <= self.up_to
    }
}

/// Maps `value` from `input` onto `output`.
pub(crate) fn map_pair(input: [f64; 2], output: [f64; 2], value: f64) -> f64 {
    map_range(input[0], input[1], output[0], output[1], value)
}
