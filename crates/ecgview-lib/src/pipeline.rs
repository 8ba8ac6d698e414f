//! Window-level heart-rate pipeline: merge → baseline → detect → smooth.
//!
//! Everything here is a pure function of its inputs.

use crate::{
    baseline::BaselineMode,
    config::HrConfig,
    detectors::ecg::{detect_hr, detect_peaks, detect_raw_beats, BeatDetectorConfig},
    metrics::hrv::{hrv_time, rr_intervals, rr_stats, HrvTime, RrStats},
    metrics::scale::ScaleRange,
    overview::OverviewState,
    resample::{raw_window, resample},
    signal::{Beat, Events, HrSeries, SampleSource, Window},
};
use serde::Serialize;

/// Heart-rate trace of the visible window together with its axis range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowHr {
    pub hr: HrSeries,
    pub scale: ScaleRange,
}

/// Beat-by-beat heart rate for the visible window, detected at full resolution on
/// the median of the selected leads. Beat times are seconds from the window start.
pub fn compute_window_hr<S: SampleSource + ?Sized>(
    source: &S,
    window: &Window,
    config: &HrConfig,
) -> HrSeries {
    match filtered_window(source, window, config) {
        Some((filtered, dt, config)) => detect_hr(&filtered, dt, &config.smoothing),
        None => HrSeries::empty(),
    }
}

/// Detector output for a window before smoothing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowBeats {
    /// Refined R-peaks as absolute sample indices
    pub peaks: Events,
    /// One beat per accepted RR interval; times relative to the window start
    pub raw_beats: Vec<Beat>,
}

pub fn find_window_beats<S: SampleSource + ?Sized>(
    source: &S,
    window: &Window,
    config: &HrConfig,
) -> WindowBeats {
    let Some((filtered, dt, _)) = filtered_window(source, window, config) else {
        return WindowBeats {
            peaks: Events::from_indices(Vec::new()),
            raw_beats: Vec::new(),
        };
    };
    let detector = BeatDetectorConfig::default();
    let start = window.range(source.sample_rate()).clamped(source.total_samples()).start;
    let local = detect_peaks(&filtered, dt, &detector);
    WindowBeats {
        peaks: Events::from_indices(local.indices.iter().map(|i| i + start).collect()),
        raw_beats: detect_raw_beats(&filtered, dt, &detector),
    }
}

/// Merged, baseline-corrected full-resolution samples of the window with their
/// spacing and the sanitized configuration.
fn filtered_window<S: SampleSource + ?Sized>(
    source: &S,
    window: &Window,
    config: &HrConfig,
) -> Option<(Vec<f64>, f64, HrConfig)> {
    let fs = source.sample_rate();
    if !(fs > 0.0) || source.total_samples() == 0 {
        return None;
    }
    let config = config.sanitized();
    let leads = config.resolve_leads(source.lead_count());
    let dt = 1.0 / fs;
    let merged = raw_window(source, &leads, window.range(fs));
    let filtered = config.baseline.apply(&merged, dt);
    Some((filtered, dt, config))
}

/// Axis range for a window: the overview's locked range when locking is enabled
/// and the overview has completed, otherwise the window's own range.
pub fn window_scale(
    hr: &HrSeries,
    config: &HrConfig,
    overview: Option<&OverviewState>,
) -> ScaleRange {
    let locked = if config.lock_scale {
        overview.and_then(OverviewState::range)
    } else {
        None
    };
    ScaleRange::for_window(hr, locked)
}

pub fn analyze_window<S: SampleSource + ?Sized>(
    source: &S,
    window: &Window,
    config: &HrConfig,
    overview: Option<&OverviewState>,
) -> WindowHr {
    let hr = compute_window_hr(source, window, config);
    let scale = window_scale(&hr, config, overview);
    WindowHr { hr, scale }
}

/// Shape of a loaded recording.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RecordingInfo {
    pub lead_count: usize,
    pub total_samples: usize,
    pub duration_s: f64,
    pub sample_rate: f64,
}

impl RecordingInfo {
    pub fn of<S: SampleSource + ?Sized>(source: &S) -> Self {
        Self {
            lead_count: source.lead_count(),
            total_samples: source.total_samples(),
            duration_s: source.duration(),
            sample_rate: source.sample_rate(),
        }
    }
}

/// Rhythm report over the refined R-peaks of a whole recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingSummary {
    pub info: RecordingInfo,
    pub peaks: Events,
    /// Detected peaks per minute of recording
    pub average_hr_bpm: f64,
    pub rr: RrStats,
    pub hrv: HrvTime,
}

impl RecordingSummary {
    pub fn from_events<S: SampleSource + ?Sized>(source: &S, peaks: Events) -> Self {
        let info = RecordingInfo::of(source);
        let average_hr_bpm = if info.duration_s > 0.0 {
            peaks.indices.len() as f64 * 60.0 / info.duration_s
        } else {
            0.0
        };
        let rr = rr_stats(&peaks, info.sample_rate);
        let hrv = hrv_time(&rr_intervals(&peaks, info.sample_rate));
        Self {
            info,
            peaks,
            average_hr_bpm,
            rr,
            hrv,
        }
    }
}

/// Detect beats across the entire recording and summarise its rhythm.
pub fn summarize_recording<S: SampleSource + ?Sized>(
    source: &S,
    config: &HrConfig,
) -> RecordingSummary {
    let whole = Window::new(0, source.duration(), 1);
    let beats = find_window_beats(source, &whole, config);
    RecordingSummary::from_events(source, beats.peaks)
}

/// Pixel-aligned, baseline-corrected trace of one lead for display.
pub fn window_series<S: SampleSource + ?Sized>(
    source: &S,
    window: &Window,
    lead: usize,
    baseline: BaselineMode,
) -> Vec<f64> {
    let fs = source.sample_rate();
    let width = window.pixel_width.max(1);
    if !(fs > 0.0) {
        return vec![0.0; width];
    }
    let seg = resample(source, lead, window.range(fs), width);
    baseline.apply(&seg, window.pixel_dt())
}
