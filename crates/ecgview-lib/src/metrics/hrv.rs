//! Beat-to-beat interval statistics over refined R-peaks.

use crate::signal::Events;
use serde::{Deserialize, Serialize};

/// Successive differences larger than this count towards pNN50 (seconds).
const NN50_THRESHOLD_S: f64 = 0.050;

/// Time-domain heart-rate variability. Intervals are in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HrvTime {
    /// Number of RR intervals
    pub n: usize,
    pub avnn: f64,
    pub sdnn: f64,
    pub rmssd: f64,
    /// Fraction of successive differences above 50 ms
    pub pnn50: f64,
}

/// Rhythm summary of a peak train, intervals in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RrStats {
    pub beat_count: usize,
    pub mean_rr_ms: f64,
    /// Population standard deviation of the intervals
    pub rr_std_ms: f64,
    /// `60000 / mean_rr_ms`, or 0 without intervals
    pub mean_hr_bpm: f64,
}

/// Seconds between consecutive peaks. Empty with fewer than two peaks or a
/// non-positive sample rate.
pub fn rr_intervals(peaks: &Events, fs: f64) -> Vec<f64> {
    if !(fs > 0.0) {
        return Vec::new();
    }
    peaks
        .indices
        .windows(2)
        .map(|w| w[1].saturating_sub(w[0]) as f64 / fs)
        .collect()
}

pub fn hrv_time(rr: &[f64]) -> HrvTime {
    let n = rr.len();
    let avnn = if n > 0 {
        rr.iter().sum::<f64>() / n as f64
    } else {
        0.0
    };
    let sdnn = if n > 1 {
        (rr.iter().map(|x| (x - avnn).powi(2)).sum::<f64>() / (n as f64 - 1.0)).sqrt()
    } else {
        0.0
    };
    let (rmssd, pnn50) = if n > 1 {
        let pairs = n as f64 - 1.0;
        let squares: f64 = rr.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum();
        let nn50 = rr
            .windows(2)
            .filter(|w| (w[1] - w[0]).abs() > NN50_THRESHOLD_S)
            .count();
        ((squares / pairs).sqrt(), nn50 as f64 / pairs)
    } else {
        (0.0, 0.0)
    };
    HrvTime {
        n,
        avnn,
        sdnn,
        rmssd,
        pnn50,
    }
}

pub fn rr_stats(peaks: &Events, fs: f64) -> RrStats {
    let rr_ms: Vec<f64> = rr_intervals(peaks, fs)
        .into_iter()
        .map(|rr| rr * 1000.0)
        .collect();
    let (mean_rr_ms, rr_std_ms) = if rr_ms.is_empty() {
        (0.0, 0.0)
    } else {
        let n = rr_ms.len() as f64;
        let mean = rr_ms.iter().sum::<f64>() / n;
        let var = rr_ms.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        (mean, var.sqrt())
    };
    let mean_hr_bpm = if mean_rr_ms > 0.0 {
        60_000.0 / mean_rr_ms
    } else {
        0.0
    };
    RrStats {
        beat_count: peaks.indices.len(),
        mean_rr_ms,
        rr_std_ms,
        mean_hr_bpm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_from_peak_indices() {
        let peaks = Events::from_indices(vec![100, 260, 400, 580]);
        assert_eq!(rr_intervals(&peaks, 200.0), vec![0.8, 0.7, 0.9]);
        assert!(rr_intervals(&peaks, 0.0).is_empty());
        assert!(rr_intervals(&Events::from_indices(vec![5]), 200.0).is_empty());
    }

    #[test]
    fn time_domain_metrics() {
        let hrv = hrv_time(&[0.8, 0.7, 0.9]);
        assert_eq!(hrv.n, 3);
        assert!((hrv.avnn - 0.8).abs() < 1e-12);
        assert!((hrv.sdnn - 0.1).abs() < 1e-12);
        // diffs -0.1 and 0.2
        assert!((hrv.rmssd - (0.05f64 / 2.0).sqrt()).abs() < 1e-12);
        assert_eq!(hrv.pnn50, 1.0);
    }

    #[test]
    fn steady_rhythm_has_no_variability() {
        let hrv = hrv_time(&[0.8; 10]);
        assert_eq!(hrv.sdnn, 0.0);
        assert_eq!(hrv.rmssd, 0.0);
        assert_eq!(hrv.pnn50, 0.0);
        let single = hrv_time(&[0.8]);
        assert_eq!((single.n, single.avnn, single.sdnn), (1, 0.8, 0.0));
        assert_eq!(hrv_time(&[]).avnn, 0.0);
    }

    #[test]
    fn rr_stats_use_population_deviation() {
        let peaks = Events::from_indices(vec![0, 160, 300, 480]);
        let stats = rr_stats(&peaks, 200.0);
        assert_eq!(stats.beat_count, 4);
        assert!((stats.mean_rr_ms - 800.0).abs() < 1e-9);
        assert!((stats.rr_std_ms - (20_000.0f64 / 3.0).sqrt()).abs() < 1e-9);
        assert!((stats.mean_hr_bpm - 75.0).abs() < 1e-9);
    }

    #[test]
    fn rr_stats_without_intervals() {
        let stats = rr_stats(&Events::from_indices(vec![42]), 200.0);
        assert_eq!(stats.beat_count, 1);
        assert_eq!(stats.mean_rr_ms, 0.0);
        assert_eq!(stats.mean_hr_bpm, 0.0);
    }
}
