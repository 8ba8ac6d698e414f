use crate::signal::{Beat, HrSeries};
use crate::stats::{mean, median};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SMOOTH_BEATS: usize = 5;
pub const DEFAULT_TOLERANCE_PCT: f64 = 30.0;
pub const MAX_SMOOTH_BEATS: usize = 50;
pub const TOLERANCE_RANGE_PCT: (f64, f64) = (5.0, 80.0);

/// Beat smoothing and outlier-rejection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingParams {
    /// Length of the trailing moving average, in beats.
    pub smooth_beats: usize,
    /// Reject beats deviating from their neighbourhood median.
    pub robust: bool,
    /// Allowed deviation from the neighbourhood median, in percent.
    pub tolerance_pct: f64,
}

impl Default for SmoothingParams {
    fn default() -> Self {
        Self {
            smooth_beats: DEFAULT_SMOOTH_BEATS,
            robust: true,
            tolerance_pct: DEFAULT_TOLERANCE_PCT,
        }
    }
}

impl SmoothingParams {
    /// Clamp out-of-range values to safe ones. A zero beat count falls back
    /// to the default.
    pub fn sanitized(self) -> Self {
        let tolerance_pct = if self.tolerance_pct.is_finite() {
            self.tolerance_pct
                .clamp(TOLERANCE_RANGE_PCT.0, TOLERANCE_RANGE_PCT.1)
        } else {
            DEFAULT_TOLERANCE_PCT
        };
        let smooth_beats = match self.smooth_beats {
            0 => DEFAULT_SMOOTH_BEATS,
            n => n.min(MAX_SMOOTH_BEATS),
        };
        Self {
            smooth_beats,
            robust: self.robust,
            tolerance_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Smoothed {
    pub beats: Vec<Beat>,
    /// Raw beats that survived outlier rejection
    pub kept_raw: usize,
}

/// Keep each beat whose bpm lies within `tolerance_pct` of the median of its
/// `max(3, 2 * smooth_beats - 1)`-wide neighbourhood on either side.
pub fn reject_outliers(raw: &[Beat], smooth_beats: usize, tolerance_pct: f64) -> Vec<Beat> {
    if raw.is_empty() {
        return Vec::new();
    }
    let half_width = (2 * smooth_beats).saturating_sub(1).max(3);
    let bpm: Vec<f64> = raw.iter().map(|b| b.bpm).collect();
    let last = raw.len() - 1;
    raw.iter()
        .enumerate()
        .filter(|&(i, beat)| {
            let lo = i.saturating_sub(half_width);
            let hi = (i + half_width).min(last);
            let med = median(&bpm[lo..=hi]);
            if !med.is_finite() || med <= 0.0 {
                return true;
            }
            (beat.bpm - med).abs() / med * 100.0 <= tolerance_pct
        })
        .map(|(_, beat)| *beat)
        .collect()
}

/// Trailing `m`-beat moving average, stamped at the newest beat of each window.
/// With fewer than `m` beats the input is returned unchanged.
pub fn trailing_average(beats: &[Beat], m: usize) -> Vec<Beat> {
    let m = m.max(1);
    if beats.len() < m {
        return beats.to_vec();
    }
    beats
        .windows(m)
        .map(|w| Beat {
            time: w[m - 1].time,
            bpm: w.iter().map(|b| b.bpm).sum::<f64>() / m as f64,
        })
        .collect()
}

pub fn smooth(raw: &[Beat], params: &SmoothingParams) -> Smoothed {
    let kept = if params.robust {
        reject_outliers(raw, params.smooth_beats, params.tolerance_pct)
    } else {
        raw.to_vec()
    };
    Smoothed {
        beats: trailing_average(&kept, params.smooth_beats),
        kept_raw: kept.len(),
    }
}

/// Smooth `raw` and attach the summary statistics.
pub fn summarize(raw: &[Beat], params: &SmoothingParams) -> HrSeries {
    let Smoothed { beats, kept_raw } = smooth(raw, params);
    let average = mean(beats.iter().map(|b| b.bpm));
    let keep_ratio = if raw.is_empty() {
        0.0
    } else {
        kept_raw as f64 / raw.len() as f64
    };
    HrSeries {
        beats,
        average,
        total_raw_beats: raw.len(),
        kept_beats: kept_raw,
        keep_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn beats(bpm: &[f64]) -> Vec<Beat> {
        let mut t = 0.0;
        bpm.iter()
            .map(|&b| {
                t += 60.0 / b;
                Beat { time: t, bpm: b }
            })
            .collect()
    }

    #[test]
    fn robust_filter_drops_single_beat_outliers() {
        let mut bpm = vec![75.0; 20];
        bpm[6] = 150.0; // halved RR
        bpm[13] = 37.5; // doubled RR
        let raw = beats(&bpm);
        for tolerance in [30.0, 45.0] {
            let kept = reject_outliers(&raw, 5, tolerance);
            assert_eq!(kept.len(), 18);
            assert!(kept.iter().all(|b| b.bpm == 75.0));
        }
    }

    #[test]
    fn robust_filter_keeps_gradual_changes() {
        let bpm: Vec<f64> = (0..30).map(|i| 60.0 + i as f64).collect();
        let raw = beats(&bpm);
        assert_eq!(reject_outliers(&raw, 3, 30.0).len(), raw.len());
    }

    #[test]
    fn moving_average_trails_kept_beats() {
        let raw = beats(&[60.0, 70.0, 80.0, 90.0]);
        let out = trailing_average(&raw, 3);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].bpm, 70.0);
        assert_eq!(out[0].time, raw[2].time);
        assert_eq!(out[1].bpm, 80.0);
    }

    #[test]
    fn short_series_falls_back_to_kept_beats() {
        let raw = beats(&[70.0, 80.0]);
        let series = summarize(&raw, &SmoothingParams::default());
        assert_eq!(series.beats.len(), 2);
        assert_eq!(series.average, 75.0);
        assert_eq!(series.keep_ratio, 1.0);
    }

    #[test]
    fn empty_input_has_nan_average() {
        let series = summarize(&[], &SmoothingParams::default());
        assert!(series.is_empty());
        assert!(series.average.is_nan());
        assert_eq!(series.keep_ratio, 0.0);
    }

    #[test]
    fn non_robust_keeps_everything() {
        let raw = beats(&[75.0, 75.0, 200.0, 75.0, 75.0]);
        let params = SmoothingParams {
            smooth_beats: 1,
            robust: false,
            tolerance_pct: 30.0,
        };
        let series = summarize(&raw, &params);
        assert_eq!(series.kept_beats, 5);
        assert_eq!(series.beats, raw);
    }

    #[test]
    fn sanitize_clamps_parameters() {
        let params = SmoothingParams {
            smooth_beats: 0,
            robust: true,
            tolerance_pct: f64::NAN,
        }
        .sanitized();
        assert_eq!(params.smooth_beats, DEFAULT_SMOOTH_BEATS);
        assert_eq!(params.tolerance_pct, DEFAULT_TOLERANCE_PCT);
        let params = SmoothingParams {
            smooth_beats: 500,
            robust: false,
            tolerance_pct: -4.0,
        }
        .sanitized();
        assert_eq!(params.smooth_beats, MAX_SMOOTH_BEATS);
        assert_eq!(params.tolerance_pct, 5.0);
    }

    #[test]
    fn tolerance_is_bounded_to_usable_band() {
        let sanitize = |tolerance_pct| {
            SmoothingParams {
                tolerance_pct,
                ..SmoothingParams::default()
            }
            .sanitized()
            .tolerance_pct
        };
        assert_eq!(sanitize(200.0), 80.0);
        assert_eq!(sanitize(100.0), 80.0);
        assert_eq!(sanitize(2.0), 5.0);
        assert_eq!(sanitize(45.0), 45.0);
        let params = SmoothingParams {
            smooth_beats: 0,
            robust: true,
            tolerance_pct: 200.0,
        }
        .sanitized();
        assert_eq!(params.smooth_beats, 5);
        assert_eq!(params.tolerance_pct, 80.0);
    }
}
