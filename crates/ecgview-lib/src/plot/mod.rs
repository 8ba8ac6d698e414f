use crate::{
    metrics::scale::ScaleRange,
    signal::{HrSeries, OverviewPoint},
};
use serde::{Deserialize, Serialize};

pub const HR_COLOR: u32 = 0xFF0077;
pub const OVERVIEW_COLOR: u32 = 0x1F77B4;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: Option<String>,
    /// Fixed `[min, max]`; the renderer autoscales when absent.
    pub range: Option<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Style {
    pub width: f32,
    pub color: Color,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(pub u32);

impl Color {
    pub fn rgb(self) -> (u8, u8, u8) {
        (
            ((self.0 >> 16) & 0xFF) as u8,
            ((self.0 >> 8) & 0xFF) as u8,
            (self.0 & 0xFF) as u8,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSeries {
    pub name: String,
    pub points: Vec<[f64; 2]>,
    pub style: Style,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Series {
    Line(LineSeries),
}

impl Series {
    pub fn points(&self) -> &[[f64; 2]] {
        match self {
            Series::Line(line) => &line.points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Figure {
    pub title: Option<String>,
    pub x: Axis,
    pub y: Axis,
    pub series: Vec<Series>,
}

impl Figure {
    pub fn new(title: impl Into<Option<String>>) -> Self {
        Self {
            title: title.into(),
            x: Axis::default(),
            y: Axis::default(),
            series: Vec::new(),
        }
    }

    pub fn add_series(&mut self, series: Series) {
        self.series.push(series);
    }

    /// Axis bounds: fixed ranges where set, otherwise the extent of the finite data.
    /// Degenerate extents are widened so the result is always drawable.
    pub fn bounds(&self) -> ([f64; 2], [f64; 2]) {
        let extent = |pick: fn(&[f64; 2]) -> f64| {
            self.series
                .iter()
                .flat_map(|s| s.points().iter().map(pick))
                .filter(|v| v.is_finite())
                .fold(None, |acc: Option<[f64; 2]>, v| match acc {
                    Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
                    None => Some([v, v]),
                })
                .unwrap_or([0.0, 1.0])
        };
        let widen = |[lo, hi]: [f64; 2]| if hi > lo { [lo, hi] } else { [lo - 0.5, hi + 0.5] };
        let x = self.x.range.unwrap_or_else(|| extent(|p| p[0]));
        let y = self.y.range.unwrap_or_else(|| extent(|p| p[1]));
        (widen(x), widen(y))
    }
}

pub trait PlotBackend {
    fn draw(&mut self, fig: &Figure) -> anyhow::Result<()>;
}

pub fn decimate_points(points: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if points.len() <= max_points {
        return points.to_vec();
    }
    let bucket_size = points.len() as f64 / max_points as f64;
    let mut result = Vec::with_capacity(max_points);
    for i in 0..max_points {
        let start = (i as f64 * bucket_size).floor() as usize;
        if start >= points.len() {
            break;
        }
        result.push(points[start]);
    }
    result
}

fn bpm_axis(scale: ScaleRange) -> Axis {
    Axis {
        label: Some("bpm".into()),
        range: Some([scale.min_bpm, scale.max_bpm]),
    }
}

/// Smoothed beat-by-beat trace over the window, on a fixed bpm axis.
pub fn figure_from_hr(hr: &HrSeries, scale: ScaleRange) -> Figure {
    let title = if hr.average.is_finite() {
        format!("Heart rate (avg {:.0} bpm)", hr.average)
    } else {
        "Heart rate".to_string()
    };
    let mut fig = Figure::new(Some(title));
    fig.x.label = Some("time (s)".into());
    fig.y = bpm_axis(scale);
    fig.add_series(Series::Line(LineSeries {
        name: "HR".into(),
        points: hr.beats.iter().map(|b| [b.time, b.bpm]).collect(),
        style: Style {
            width: 2.0,
            color: Color(HR_COLOR),
        },
    }));
    fig
}

pub fn figure_from_overview(points: &[OverviewPoint], scale: ScaleRange) -> Figure {
    figure_from_overview_limit(points, scale, 1024)
}

pub fn figure_from_overview_limit(
    points: &[OverviewPoint],
    scale: ScaleRange,
    max_points: usize,
) -> Figure {
    let mut fig = Figure::new(Some("Heart rate overview".to_string()));
    fig.x.label = Some("time (s)".into());
    fig.y = bpm_axis(scale);
    let raw: Vec<[f64; 2]> = points
        .iter()
        .map(|p| [p.center_time, p.average_bpm])
        .collect();
    fig.add_series(Series::Line(LineSeries {
        name: "8 s average".into(),
        points: decimate_points(&raw, max_points),
        style: Style {
            width: 1.4,
            color: Color(OVERVIEW_COLOR),
        },
    }));
    fig
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Beat;

    #[test]
    fn hr_figure_uses_scale_range() {
        let hr = HrSeries {
            beats: vec![
                Beat { time: 1.0, bpm: 72.0 },
                Beat { time: 1.8, bpm: 75.0 },
            ],
            average: 73.5,
            total_raw_beats: 2,
            kept_beats: 2,
            keep_ratio: 1.0,
        };
        let scale = ScaleRange {
            min_bpm: 60.0,
            max_bpm: 90.0,
        };
        let fig = figure_from_hr(&hr, scale);
        assert_eq!(fig.y.range, Some([60.0, 90.0]));
        assert_eq!(fig.series[0].points(), &[[1.0, 72.0], [1.8, 75.0]]);
        assert_eq!(fig.bounds(), ([1.0, 1.8], [60.0, 90.0]));
        assert!(fig.title.as_deref().unwrap_or_default().contains("74"));
    }

    #[test]
    fn empty_figure_has_drawable_bounds() {
        let fig = figure_from_hr(&HrSeries::empty(), ScaleRange::default());
        let (x, y) = fig.bounds();
        assert!(x[1] > x[0]);
        assert!(y[1] > y[0]);
        assert_eq!(fig.title.as_deref(), Some("Heart rate"));
    }

    #[test]
    fn overview_figure_is_decimated() {
        let points: Vec<OverviewPoint> = (0..50)
            .map(|i| OverviewPoint {
                center_time: i as f64 * 4.0,
                average_bpm: 70.0,
            })
            .collect();
        let fig = figure_from_overview_limit(&points, ScaleRange::default(), 10);
        assert_eq!(fig.series[0].points().len(), 10);
        assert_eq!(fig.series[0].points()[1], [20.0, 70.0]);
    }

    #[test]
    fn series_style_is_solid_stroke() {
        let fig = figure_from_hr(&HrSeries::empty(), ScaleRange::default());
        let Series::Line(line) = &fig.series[0];
        let style = serde_json::to_value(&line.style).unwrap();
        let keys: Vec<&str> = style
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, ["color", "width"]);
    }

    #[test]
    fn color_components() {
        assert_eq!(Color(HR_COLOR).rgb(), (0xFF, 0x00, 0x77));
    }
}
