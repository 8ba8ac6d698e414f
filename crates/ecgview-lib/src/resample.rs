//! Representative sample sequences drawn from a [`SampleSource`].

use crate::signal::{SampleRange, SampleSource};
use crate::stats::median_in_place;

/// Relative offsets averaged per output bin when decimating.
const DECIMATION_TAPS: [f64; 3] = [0.2, 0.5, 0.8];

/// Robust multi-lead merge: median across `leads` at one sample index.
///
/// Non-finite lead values are left out; 0.0 when none is finite.
/// `scratch` is reused between calls to avoid an allocation per sample.
pub fn merge_leads<S: SampleSource + ?Sized>(
    source: &S,
    leads: &[usize],
    index: usize,
    scratch: &mut Vec<f64>,
) -> f64 {
    if let [lead] = leads {
        return source.sample(*lead, index);
    }
    scratch.clear();
    scratch.extend(
        leads
            .iter()
            .map(|&lead| source.sample(lead, index))
            .filter(|v| v.is_finite()),
    );
    let med = median_in_place(scratch);
    if med.is_finite() {
        med
    } else {
        0.0
    }
}

/// Exactly `output_len` samples representing `range` of one lead.
///
/// With more than two source samples per output bin, each bin is the mean of three
/// taps at 20/50/80 % of its sub-range; otherwise the sample nearest the bin
/// midpoint is used. Indices outside the recording clamp to the nearest sample.
pub fn resample<S: SampleSource + ?Sized>(
    source: &S,
    lead: usize,
    range: SampleRange,
    output_len: usize,
) -> Vec<f64> {
    if source.total_samples() == 0 || output_len == 0 {
        return vec![0.0; output_len];
    }
    let n = range.count.max(1);
    let w = output_len;
    let samples_per_pixel = n as f64 / w as f64;
    (0..w)
        .map(|x| {
            if samples_per_pixel > 2.0 {
                let s0 = range.start.saturating_add(scaled(x, n, w));
                let s1 = range.start.saturating_add(scaled(x + 1, n, w)).saturating_sub(1);
                let span = s1.saturating_sub(s0) as f64;
                let acc: f64 = DECIMATION_TAPS
                    .iter()
                    .map(|&p| source.sample(lead, s0.saturating_add((p * span).floor() as usize)))
                    .sum();
                acc / DECIMATION_TAPS.len() as f64
            } else {
                // floor((x + 0.5) * n / w) in integer arithmetic
                let mid = scaled(2 * x + 1, n, 2 * w);
                source.sample(lead, range.start.saturating_add(mid))
            }
        })
        .collect()
}

/// `floor(x * n / w)` without intermediate overflow, saturating at `usize::MAX`.
fn scaled(x: usize, n: usize, w: usize) -> usize {
    let v = x as u128 * n as u128 / w as u128;
    usize::try_from(v).unwrap_or(usize::MAX)
}

/// Full-resolution window: one value per source sample of `range` (clamped to the
/// recording), with several leads merged by [`merge_leads`].
pub fn raw_window<S: SampleSource + ?Sized>(
    source: &S,
    leads: &[usize],
    range: SampleRange,
) -> Vec<f64> {
    let range = range.clamped(source.total_samples());
    if leads.is_empty() {
        return vec![0.0; range.count];
    }
    let mut scratch = Vec::with_capacity(leads.len());
    (range.start..range.end())
        .map(|s| merge_leads(source, leads, s, &mut scratch))
        .collect()
}

/// `output_len` lead-merged samples evenly spanning `[t0, t0 + duration)` seconds,
/// each taken from the sample at `floor(t * fs)`. Used by the overview at a fixed width.
pub fn resample_merged_span<S: SampleSource + ?Sized>(
    source: &S,
    leads: &[usize],
    t0: f64,
    duration: f64,
    output_len: usize,
) -> Vec<f64> {
    let total = source.total_samples();
    if total == 0 || leads.is_empty() {
        return vec![0.0; output_len];
    }
    let fs = source.sample_rate();
    let mut scratch = Vec::with_capacity(leads.len());
    (0..output_len)
        .map(|x| {
            let t = t0 + (x as f64 / output_len as f64) * duration;
            let s = ((t * fs).floor().max(0.0) as usize).min(total - 1);
            merge_leads(source, leads, s, &mut scratch)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Recording;

    fn ramp(n: usize) -> Recording {
        Recording::new(100.0, vec![(0..n).map(|i| i as f64).collect()]).unwrap()
    }

    #[test]
    fn decimation_averages_three_taps() {
        let rec = ramp(100);
        let out = resample(&rec, 0, SampleRange::new(0, 100), 10);
        assert_eq!(out.len(), 10);
        // bin 0 covers 0..=9, span 9: taps 1, 4, 7
        assert!((out[0] - 4.0).abs() < 1e-12);
        // bin 3 covers 30..=39
        assert!((out[3] - 34.0).abs() < 1e-12);
    }

    #[test]
    fn upsampling_uses_nearest_midpoint() {
        let rec = ramp(10);
        let out = resample(&rec, 0, SampleRange::new(2, 4), 8);
        assert_eq!(out, vec![2.0, 2.0, 3.0, 3.0, 4.0, 4.0, 5.0, 5.0]);
    }

    #[test]
    fn resample_clamps_and_handles_empty() {
        let rec = ramp(10);
        let out = resample(&rec, 0, SampleRange::new(8, 4), 4);
        assert_eq!(out, vec![8.0, 9.0, 9.0, 9.0]);
        let empty = Recording::new(100.0, vec![Vec::new()]).unwrap();
        assert_eq!(resample(&empty, 0, SampleRange::new(0, 10), 3), vec![0.0; 3]);
    }

    #[test]
    fn huge_ranges_do_not_overflow() {
        let rec = ramp(10);
        let out = resample(&rec, 0, SampleRange::new(3, usize::MAX), 100);
        // every tap lands past the end and clamps to the last sample
        assert_eq!(out, vec![9.0; 100]);
        let out = resample(&rec, 0, SampleRange::new(usize::MAX - 1, 4), 8);
        assert_eq!(out, vec![9.0; 8]);
    }

    #[test]
    fn raw_window_takes_median_across_leads() {
        let rec = Recording::new(
            100.0,
            vec![
                vec![1.0, 10.0, 0.0],
                vec![2.0, -50.0, 4.0],
                vec![3.0, 11.0, f64::NAN],
            ],
        )
        .unwrap();
        assert_eq!(
            raw_window(&rec, &[0, 1, 2], SampleRange::new(0, 3)),
            vec![2.0, 10.0, 2.0]
        );
        assert_eq!(raw_window(&rec, &[1], SampleRange::new(1, 5)), vec![-50.0, 4.0]);
        assert_eq!(
            raw_window(&rec, &[0, 1], SampleRange::new(0, 2)),
            vec![1.5, -20.0]
        );
    }

    #[test]
    fn merged_span_picks_floor_sample() {
        let rec = Recording::new(128.0, vec![(0..200).map(|i| i as f64).collect()]).unwrap();
        let out = resample_merged_span(&rec, &[0], 0.5, 0.25, 4);
        assert_eq!(out, vec![64.0, 72.0, 80.0, 88.0]);
        let tail = resample_merged_span(&rec, &[0], 1.5, 1.0, 2);
        assert_eq!(tail, vec![192.0, 199.0]);
    }
}
