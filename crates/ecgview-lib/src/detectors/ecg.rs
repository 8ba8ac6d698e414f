use crate::{
    metrics::smoothing::{summarize, SmoothingParams},
    signal::{Beat, Events, HrSeries},
    stats::percentile,
};
use serde::{Deserialize, Serialize};

/// Sequences shorter than this yield an empty result.
pub const MIN_SEQUENCE_LEN: usize = 5;

/// Tunables of the derivative–square–integrate beat detector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeatDetectorConfig {
    /// Moving window integration length (seconds).
    pub integration_window_s: f64,
    /// Lower bound on the integration window (samples).
    pub min_integration_samples: usize,
    /// Fraction of the envelope percentile used as detection threshold.
    pub threshold_scale: f64,
    /// Envelope percentile the threshold is derived from.
    pub threshold_percentile: f64,
    /// Absolute threshold floor.
    pub threshold_floor: f64,
    /// Minimum spacing between accepted peaks (seconds).
    pub refractory_s: f64,
    /// Half-width of the search for the true extremum around a candidate (seconds).
    pub search_s: f64,
    /// Accepted RR interval range (seconds), inclusive.
    pub min_rr_s: f64,
    pub max_rr_s: f64,
}

impl Default for BeatDetectorConfig {
    fn default() -> Self {
        Self {
            integration_window_s: 0.12,
            min_integration_samples: 3,
            threshold_scale: 0.35,
            threshold_percentile: 0.98,
            threshold_floor: 1e-7,
            refractory_s: 0.28,
            search_s: 0.05,
            min_rr_s: 0.25,
            max_rr_s: 2.5,
        }
    }
}

/// Run detection and robust smoothing on a baseline-filtered sequence whose
/// samples are `dt` seconds apart. Beat times are relative to the first sample.
pub fn detect_hr(sequence: &[f64], dt: f64, params: &SmoothingParams) -> HrSeries {
    detect_hr_with_config(sequence, dt, params, &BeatDetectorConfig::default())
}

pub fn detect_hr_with_config(
    sequence: &[f64],
    dt: f64,
    params: &SmoothingParams,
    cfg: &BeatDetectorConfig,
) -> HrSeries {
    if sequence.len() < MIN_SEQUENCE_LEN || !(dt > 0.0) {
        return HrSeries::empty();
    }
    let raw = detect_raw_beats(sequence, dt, cfg);
    summarize(&raw, params)
}

/// Instantaneous-rate beats before smoothing, one per accepted RR interval.
pub fn detect_raw_beats(sequence: &[f64], dt: f64, cfg: &BeatDetectorConfig) -> Vec<Beat> {
    let peaks = detect_peaks(sequence, dt, cfg);
    rr_to_beats(&peaks, dt, cfg)
}

/// Refined R-peak sample indices.
pub fn detect_peaks(sequence: &[f64], dt: f64, cfg: &BeatDetectorConfig) -> Events {
    if sequence.len() < MIN_SEQUENCE_LEN || !(dt > 0.0) {
        return Events::from_indices(Vec::new());
    }
    let polarity = polarity(sequence);
    let corrected: Vec<f64> = sequence.iter().map(|v| polarity * v).collect();
    let squared = square(&derivative(&corrected));
    let win = ((cfg.integration_window_s / dt).round() as usize).max(cfg.min_integration_samples);
    let envelope = moving_window_integral(&squared, win);
    let threshold = (cfg.threshold_scale * percentile(&envelope, cfg.threshold_percentile))
        .max(cfg.threshold_floor);
    let refractory = ((cfg.refractory_s / dt).round() as usize).max(1);
    let search = ((cfg.search_s / dt).round() as usize).max(1);
    Events::from_indices(pick_peaks(&corrected, &envelope, threshold, refractory, search))
}

/// -1.0 when the negated minimum exceeds the maximum (inverted QRS), else 1.0.
fn polarity(data: &[f64]) -> f64 {
    let (min, max) = data
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if -min > max {
        -1.0
    } else {
        1.0
    }
}

fn derivative(data: &[f64]) -> Vec<f64> {
    if data.is_empty() {
        return Vec::new();
    }
    let mut out = vec![0.0; data.len()];
    for i in 1..data.len() {
        let d = data[i] - data[i - 1];
        out[i] = if d.is_finite() { d } else { 0.0 };
    }
    out
}

fn square(data: &[f64]) -> Vec<f64> {
    data.iter().map(|x| x * x).collect()
}

/// Trailing windowed mean, normalised by the available length at the start.
fn moving_window_integral(data: &[f64], win: usize) -> Vec<f64> {
    let win = win.max(1);
    let mut out = Vec::with_capacity(data.len());
    let mut acc = 0.0;
    for (i, &sample) in data.iter().enumerate() {
        acc += sample;
        if i >= win {
            acc -= data[i - win];
        }
        out.push(acc / win.min(i + 1) as f64);
    }
    out
}

/// Local envelope maxima at or above `threshold`, each refined to the largest
/// polarity-corrected sample within `search` samples. After an acceptance the scan
/// skips ahead by 30 % of the refractory period.
fn pick_peaks(
    corrected: &[f64],
    envelope: &[f64],
    threshold: f64,
    refractory: usize,
    search: usize,
) -> Vec<usize> {
    let n = envelope.len();
    let mut peaks = Vec::new();
    let mut last_peak: Option<usize> = None;
    let skip = (refractory as f64 * 0.3).floor() as usize;
    let mut i = 1;
    while i + 1 < n {
        let e = envelope[i];
        let is_candidate = e >= threshold && e >= envelope[i - 1] && e >= envelope[i + 1];
        let refractory_ok = last_peak.map_or(true, |last| i >= last + refractory);
        if is_candidate && refractory_ok {
            let start = i.saturating_sub(search);
            let end = (i + search).min(n - 1);
            let mut idx = i;
            let mut best = f64::NEG_INFINITY;
            for (j, &v) in corrected.iter().enumerate().take(end + 1).skip(start) {
                if v > best {
                    best = v;
                    idx = j;
                }
            }
            peaks.push(idx);
            last_peak = Some(idx);
            i += skip;
        }
        i += 1;
    }
    peaks
}

fn rr_to_beats(peaks: &Events, dt: f64, cfg: &BeatDetectorConfig) -> Vec<Beat> {
    peaks
        .indices
        .windows(2)
        .filter_map(|w| {
            let prev = w[0] as f64 * dt;
            let time = w[1] as f64 * dt;
            let rr = time - prev;
            (rr >= cfg.min_rr_s && rr <= cfg.max_rr_s).then(|| Beat {
                time,
                bpm: 60.0 / rr,
            })
        })
        .collect()
}
