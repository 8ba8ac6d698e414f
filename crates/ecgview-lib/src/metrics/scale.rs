use crate::signal::{HrSeries, OverviewPoint};
use serde::{Deserialize, Serialize};

pub const SCALE_FLOOR_BPM: f64 = 30.0;
pub const SCALE_CEIL_BPM: f64 = 230.0;
pub const MIN_SPAN_BPM: f64 = 40.0;
const PAD_BPM: f64 = 10.0;
const WIDENED_SPAN_BPM: f64 = 60.0;
const DEFAULT_RANGE: (f64, f64) = (60.0, 180.0);

/// Display range of the heart-rate axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self::from_bpm(std::iter::empty())
    }
}

impl ScaleRange {
    /// Padded, decade-rounded range covering the finite values of `bpm`.
    ///
    /// Always `30 <= min < max <= 230` with a span of at least 40.
    pub fn from_bpm(bpm: impl IntoIterator<Item = f64>) -> Self {
        let (lo, hi) = bpm
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
                None => Some((v, v)),
            })
            .unwrap_or(DEFAULT_RANGE);

        let clamp = |v: f64| v.clamp(SCALE_FLOOR_BPM, SCALE_CEIL_BPM);
        let mut min_bpm = clamp(((lo - PAD_BPM) / 10.0).floor() * 10.0);
        let mut max_bpm = clamp(((hi + PAD_BPM) / 10.0).ceil() * 10.0);
        if max_bpm - min_bpm < MIN_SPAN_BPM {
            let mid = 0.5 * (min_bpm + max_bpm);
            min_bpm = (mid - WIDENED_SPAN_BPM / 2.0).max(SCALE_FLOOR_BPM);
            max_bpm = (mid + WIDENED_SPAN_BPM / 2.0).min(SCALE_CEIL_BPM);
            // pinned against a bound: extend away from it
            if max_bpm - min_bpm < MIN_SPAN_BPM {
                if min_bpm <= SCALE_FLOOR_BPM {
                    max_bpm = SCALE_FLOOR_BPM + WIDENED_SPAN_BPM;
                } else {
                    min_bpm = SCALE_CEIL_BPM - WIDENED_SPAN_BPM;
                }
            }
        }
        Self { min_bpm, max_bpm }
    }

    /// Range for the visible pane: the locked overview range when given,
    /// otherwise derived from the window's own beats. A window without beats
    /// shows the unpadded 60..180 default.
    pub fn for_window(hr: &HrSeries, locked: Option<ScaleRange>) -> Self {
        if let Some(range) = locked {
            return range;
        }
        if !hr.beats.iter().any(|b| b.bpm.is_finite()) {
            return Self {
                min_bpm: DEFAULT_RANGE.0,
                max_bpm: DEFAULT_RANGE.1,
            };
        }
        Self::from_bpm(hr.beats.iter().map(|b| b.bpm))
    }

    pub fn from_overview(points: &[OverviewPoint]) -> Self {
        Self::from_bpm(points.iter().map(|p| p.average_bpm))
    }

    pub fn span(&self) -> f64 {
        self.max_bpm - self.min_bpm
    }

    /// Normalised position of `bpm` on the axis (0 at `min_bpm`, 1 at `max_bpm`).
    pub fn normalize(&self, bpm: f64) -> f64 {
        (bpm - self.min_bpm) / self.span()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Beat;

    fn assert_valid(r: ScaleRange) {
        assert!(r.min_bpm >= SCALE_FLOOR_BPM, "{:?}", r);
        assert!(r.max_bpm <= SCALE_CEIL_BPM, "{:?}", r);
        assert!(r.min_bpm < r.max_bpm, "{:?}", r);
        assert!(r.span() >= MIN_SPAN_BPM, "{:?}", r);
    }

    #[test]
    fn pads_and_rounds_to_decades() {
        let r = ScaleRange::from_bpm([72.0, 95.0, 81.0]);
        assert_eq!(r, ScaleRange { min_bpm: 60.0, max_bpm: 110.0 });
    }

    #[test]
    fn narrow_range_is_widened_around_midpoint() {
        let r = ScaleRange::from_bpm([75.0, 76.0]);
        // 60..90 is 30 wide: re-centred on 75
        assert_eq!(r, ScaleRange { min_bpm: 45.0, max_bpm: 105.0 });
    }

    #[test]
    fn defaults_without_finite_values() {
        let r = ScaleRange::from_bpm([f64::NAN, f64::INFINITY]);
        assert_eq!(r, ScaleRange { min_bpm: 50.0, max_bpm: 190.0 });
        assert_eq!(ScaleRange::default(), r);
    }

    #[test]
    fn always_within_bounds() {
        let cases: [&[f64]; 8] = [
            &[],
            &[1.0],
            &[10.0, 12.0],
            &[35.0],
            &[225.0],
            &[500.0, 900.0],
            &[-20.0, 400.0],
            &[100.0, 100.0, 100.0],
        ];
        for case in cases {
            assert_valid(ScaleRange::from_bpm(case.iter().copied()));
        }
        for bpm in (0..300).map(|v| v as f64) {
            assert_valid(ScaleRange::from_bpm([bpm]));
            assert_valid(ScaleRange::from_bpm([bpm, bpm + 7.5]));
        }
    }

    #[test]
    fn locked_range_wins_for_window() {
        let hr = HrSeries {
            beats: vec![Beat { time: 1.0, bpm: 120.0 }],
            ..HrSeries::empty()
        };
        let locked = ScaleRange { min_bpm: 40.0, max_bpm: 100.0 };
        assert_eq!(ScaleRange::for_window(&hr, Some(locked)), locked);
        assert_eq!(
            ScaleRange::for_window(&hr, None),
            ScaleRange { min_bpm: 90.0, max_bpm: 150.0 }
        );
    }

    #[test]
    fn beatless_window_uses_plain_default() {
        let empty = ScaleRange::for_window(&HrSeries::empty(), None);
        assert_eq!(empty, ScaleRange { min_bpm: 60.0, max_bpm: 180.0 });
        assert_valid(empty);
        let hr = HrSeries {
            beats: vec![Beat { time: 0.5, bpm: f64::NAN }],
            ..HrSeries::empty()
        };
        assert_eq!(ScaleRange::for_window(&hr, None), empty);
        // overview path still pads
        assert_eq!(ScaleRange::from_overview(&[]), ScaleRange { min_bpm: 50.0, max_bpm: 190.0 });
    }
}
