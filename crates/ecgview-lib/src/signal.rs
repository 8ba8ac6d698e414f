use crate::error::{EcgError, Result};
use serde::{Deserialize, Serialize};

/// Uniform read access to a multi-lead recording, in millivolts.
pub trait SampleSource {
    /// Uniform sampling frequency in Hz
    fn sample_rate(&self) -> f64;
    fn lead_count(&self) -> usize;
    /// Samples per lead
    fn total_samples(&self) -> usize;
    /// Sample lookup with the index clamped to the valid range.
    /// Returns 0.0 for an empty source or an unknown lead.
    fn sample(&self, lead: usize, index: usize) -> f64;

    fn duration(&self) -> f64 {
        let fs = self.sample_rate();
        if fs > 0.0 {
            self.total_samples() as f64 / fs
        } else {
            0.0
        }
    }
}

/// In-memory multi-lead recording. All leads share sample rate and length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    fs: f64,
    leads: Vec<Vec<f64>>,
}

impl Recording {
    pub fn new(fs: f64, leads: Vec<Vec<f64>>) -> Result<Self> {
        if !fs.is_finite() || fs <= 0.0 {
            return Err(EcgError::InvalidSampleRate(fs));
        }
        if leads.is_empty() {
            return Err(EcgError::NoLeads);
        }
        let expected = leads[0].len();
        if let Some((lead, data)) = leads
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != expected)
        {
            return Err(EcgError::LeadLengthMismatch {
                lead,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self { fs, leads })
    }

    pub fn leads(&self) -> &[Vec<f64>] {
        &self.leads
    }

    pub fn lead(&self, index: usize) -> Option<&[f64]> {
        self.leads.get(index).map(Vec::as_slice)
    }
}

impl SampleSource for Recording {
    fn sample_rate(&self) -> f64 {
        self.fs
    }

    fn lead_count(&self) -> usize {
        self.leads.len()
    }

    fn total_samples(&self) -> usize {
        self.leads.first().map_or(0, Vec::len)
    }

    fn sample(&self, lead: usize, index: usize) -> f64 {
        match self.leads.get(lead) {
            Some(data) if !data.is_empty() => data[index.min(data.len() - 1)],
            _ => 0.0,
        }
    }
}

/// `(start, count)` span of sample indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRange {
    pub start: usize,
    pub count: usize,
}

impl SampleRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    pub fn end(&self) -> usize {
        self.start + self.count
    }

    /// Shrink the range so that `start + count <= total`.
    pub fn clamped(self, total: usize) -> Self {
        let start = self.start.min(total);
        let count = self.count.min(total - start);
        Self { start, count }
    }
}

/// View parameters of the visible pane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start_sample: usize,
    pub seconds: f64,
    pub pixel_width: usize,
}

impl Window {
    pub fn new(start_sample: usize, seconds: f64, pixel_width: usize) -> Self {
        Self {
            start_sample,
            seconds,
            pixel_width,
        }
    }

    pub fn sample_count(&self, fs: f64) -> usize {
        ((self.seconds * fs).round() as usize).max(1)
    }

    pub fn range(&self, fs: f64) -> SampleRange {
        SampleRange::new(self.start_sample, self.sample_count(fs))
    }

    pub fn samples_per_pixel(&self, fs: f64) -> f64 {
        self.sample_count(fs) as f64 / self.pixel_width.max(1) as f64
    }

    /// Seconds between two adjacent pixels.
    pub fn pixel_dt(&self) -> f64 {
        self.seconds / self.pixel_width.max(1) as f64
    }

    pub fn start_time(&self, fs: f64) -> f64 {
        self.start_sample as f64 / fs
    }

    /// Pixel column to absolute recording time in seconds.
    pub fn x_to_time(&self, x: f64, fs: f64) -> f64 {
        self.start_time(fs) + (x / self.pixel_width.max(1) as f64) * self.seconds
    }

    /// Absolute recording time to pixel column; may fall outside `[0, width)`.
    pub fn time_to_x(&self, t: f64, fs: f64) -> f64 {
        if self.seconds <= 0.0 {
            return 0.0;
        }
        (t - self.start_time(fs)) / self.seconds * self.pixel_width.max(1) as f64
    }

    /// Last start sample that keeps the whole window inside the recording.
    pub fn max_view_start(&self, total_samples: usize, fs: f64) -> usize {
        total_samples.saturating_sub(self.sample_count(fs))
    }

    pub fn clamp_start(mut self, total_samples: usize, fs: f64) -> Self {
        self.start_sample = self.start_sample.min(self.max_view_start(total_samples, fs));
        self
    }
}

/// Point events on a timeline (refined R-peak sample indices).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Events {
    pub indices: Vec<usize>,
}

impl Events {
    pub fn from_indices(indices: Vec<usize>) -> Self {
        Self { indices }
    }
}

/// One detected heartbeat: its time and the instantaneous rate relative to the previous beat.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    /// Seconds from the start of the analysed sequence
    pub time: f64,
    pub bpm: f64,
}

/// Smoothed beat-by-beat heart-rate trace plus its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HrSeries {
    pub beats: Vec<Beat>,
    /// Mean of `beats`' bpm; NaN when empty
    pub average: f64,
    pub total_raw_beats: usize,
    pub kept_beats: usize,
    pub keep_ratio: f64,
}

impl HrSeries {
    pub fn empty() -> Self {
        Self {
            beats: Vec::new(),
            average: f64::NAN,
            total_raw_beats: 0,
            kept_beats: 0,
            keep_ratio: 0.0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.beats.is_empty()
    }
}

/// One coarse step of the whole-recording overview.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverviewPoint {
    pub center_time: f64,
    pub average_bpm: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_leads() {
        let err = Recording::new(200.0, vec![vec![0.0; 4], vec![0.0; 3]]).unwrap_err();
        assert!(matches!(
            err,
            EcgError::LeadLengthMismatch {
                lead: 1,
                expected: 4,
                actual: 3
            }
        ));
        assert!(matches!(
            Recording::new(0.0, vec![vec![0.0]]),
            Err(EcgError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn sample_lookup_clamps() {
        let rec = Recording::new(100.0, vec![vec![1.0, 2.0, 3.0]]).unwrap();
        assert_eq!(rec.sample(0, 10), 3.0);
        assert_eq!(rec.sample(4, 0), 0.0);
        assert_eq!(rec.lead(0), Some(&[1.0, 2.0, 3.0][..]));
        assert!(rec.lead(1).is_none());
        let empty = Recording::new(100.0, vec![Vec::new()]).unwrap();
        assert_eq!(empty.sample(0, 0), 0.0);
    }

    #[test]
    fn range_clamps_to_total() {
        assert_eq!(SampleRange::new(8, 5).clamped(10), SampleRange::new(8, 2));
        assert_eq!(SampleRange::new(12, 5).clamped(10), SampleRange::new(10, 0));
    }

    #[test]
    fn window_maps_pixels_to_time() {
        let w = Window::new(400, 10.0, 1000);
        assert_eq!(w.sample_count(200.0), 2000);
        assert!((w.samples_per_pixel(200.0) - 2.0).abs() < 1e-12);
        assert!((w.x_to_time(500.0, 200.0) - 7.0).abs() < 1e-12);
        assert!((w.time_to_x(7.0, 200.0) - 500.0).abs() < 1e-9);
        assert_eq!(w.max_view_start(3000, 200.0), 1000);
        assert_eq!(Window::new(2500, 10.0, 1000).clamp_start(3000, 200.0).start_sample, 1000);
    }
}
