use crate::stats::median;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Cutoff of the baseline-wander high-pass (Hz).
pub const BASELINE_CUTOFF_HZ: f64 = 0.5;

/// How DC offset and baseline wander are removed before display and detection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BaselineMode {
    /// Single-pole IIR high-pass at [`BASELINE_CUTOFF_HZ`]
    #[default]
    Highpass,
    /// Subtract the sequence median
    Median,
}

impl BaselineMode {
    /// Filter `data`, whose samples are `dt` seconds apart.
    pub fn apply(self, data: &[f64], dt: f64) -> Vec<f64> {
        match self {
            BaselineMode::Highpass => single_pole_highpass(data, dt, BASELINE_CUTOFF_HZ),
            BaselineMode::Median => subtract_median(data),
        }
    }
}

/// `y[0] = 0; y[i] = a * (y[i-1] + x[i] - x[i-1])` with `a = rc / (rc + dt)`.
/// A non-finite input sample repeats the previous finite one.
pub fn single_pole_highpass(data: &[f64], dt: f64, cutoff: f64) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
    let rc = 1.0 / (2.0 * PI * cutoff.max(0.01));
    let alpha = rc / (rc + dt);
    let mut out = Vec::with_capacity(data.len());
    let mut prev_x = data.iter().copied().find(|x| x.is_finite()).unwrap_or(0.0);
    let mut y = 0.0;
    for &x in data {
        let x = if x.is_finite() { x } else { prev_x };
        y = alpha * (y + x - prev_x);
        out.push(y);
        prev_x = x;
    }
    out
}

/// Subtract the median of the finite samples from every sample.
pub fn subtract_median(data: &[f64]) -> Vec<f64> {
    let med = median(data);
    let med = if med.is_finite() { med } else { 0.0 };
    data.iter().map(|x| x - med).collect()
}
