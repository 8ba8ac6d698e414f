//! Whole-recording heart-rate overview, built incrementally in bounded batches.

pub mod worker;

use crate::{
    baseline::BaselineMode,
    config::HrConfig,
    detectors::ecg::detect_hr,
    metrics::{scale::ScaleRange, smoothing::SmoothingParams},
    resample::resample_merged_span,
    signal::{OverviewPoint, SampleSource},
};
use log::{debug, info};
use serde::Serialize;

/// Distance between consecutive analysis centres (seconds).
pub const STRIDE_S: f64 = 4.0;
/// Analysis window centred on each step (seconds).
pub const WINDOW_S: f64 = 8.0;
/// Representative samples per analysis window.
pub const RESAMPLE_WIDTH: usize = 600;
/// Steps processed per [`OverviewBuilder::poll`].
pub const STEPS_PER_SLICE: usize = 120;
/// Lower bound on the smoothing length used for overview steps.
pub const MIN_SMOOTH_BEATS: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverviewStatus {
    #[default]
    Idle,
    Building,
    Complete,
}

/// Accumulated overview. Only [`OverviewBuilder`] mutates it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverviewState {
    status: OverviewStatus,
    points: Vec<OverviewPoint>,
    progress: f64,
    steps_completed: usize,
    total_steps: usize,
    range: Option<ScaleRange>,
}

impl OverviewState {
    pub fn status(&self) -> OverviewStatus {
        self.status
    }

    pub fn points(&self) -> &[OverviewPoint] {
        &self.points
    }

    /// Fraction of steps processed, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn steps_completed(&self) -> usize {
        self.steps_completed
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Locked scale range; `None` until the build completes.
    pub fn range(&self) -> Option<ScaleRange> {
        self.range
    }
}

/// Everything that invalidates an overview when it changes.
#[derive(Debug, Clone, PartialEq)]
struct PipelineKey {
    sample_rate: f64,
    lead_count: usize,
    total_samples: usize,
    leads: Vec<usize>,
    baseline: BaselineMode,
    smoothing: SmoothingParams,
}

impl PipelineKey {
    fn new<S: SampleSource + ?Sized>(source: &S, config: &HrConfig) -> Self {
        let config = config.sanitized();
        Self {
            sample_rate: source.sample_rate(),
            lead_count: source.lead_count(),
            total_samples: source.total_samples(),
            leads: config.resolve_leads(source.lead_count()),
            baseline: config.baseline,
            smoothing: config.smoothing,
        }
    }

    fn same_source<S: SampleSource + ?Sized>(&self, source: &S) -> bool {
        self.sample_rate == source.sample_rate()
            && self.lead_count == source.lead_count()
            && self.total_samples == source.total_samples()
    }

    fn step_params(&self) -> SmoothingParams {
        SmoothingParams {
            smooth_beats: self.smoothing.smooth_beats.max(MIN_SMOOTH_BEATS),
            robust: true,
            tolerance_pct: self.smoothing.tolerance_pct,
        }
    }
}

struct Job {
    key: PipelineKey,
    config: HrConfig,
    next_step: usize,
    total_seconds: f64,
}

/// Cooperative overview builder.
///
/// `start` (re)initialises the state and supersedes any in-flight build; each `poll`
/// processes at most one batch of steps and returns, so a host loop stays responsive.
pub struct OverviewBuilder {
    state: OverviewState,
    job: Option<Job>,
    completed_key: Option<PipelineKey>,
    batch_size: usize,
    generation: u64,
}

impl Default for OverviewBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OverviewBuilder {
    pub fn new() -> Self {
        Self {
            state: OverviewState::default(),
            job: None,
            completed_key: None,
            batch_size: STEPS_PER_SLICE,
            generation: 0,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Discard any current build and begin a new one from empty. Returns its generation.
    pub fn start<S: SampleSource + ?Sized>(&mut self, source: &S, config: &HrConfig) -> u64 {
        self.invalidate();
        let key = PipelineKey::new(source, config);
        let total_seconds = source.duration();
        let total_steps = ((total_seconds / STRIDE_S).ceil() as usize).max(1);
        info!(
            "overview build {} started: {:.1} s, {} steps, leads {:?}",
            self.generation, total_seconds, total_steps, key.leads
        );
        self.state.status = OverviewStatus::Building;
        self.state.total_steps = total_steps;
        self.job = Some(Job {
            key,
            config: config.sanitized(),
            next_step: 0,
            total_seconds,
        });
        self.generation
    }

    /// Drop all accumulated results and return to idle.
    pub fn invalidate(&mut self) {
        if self.job.take().is_some() {
            info!("overview build {} discarded", self.generation);
        }
        self.completed_key = None;
        self.generation += 1;
        self.state = OverviewState::default();
    }

    /// Restart when `source` or `config` no longer match the current build (or
    /// nothing was built yet). Returns whether a restart happened.
    pub fn ensure_current<S: SampleSource + ?Sized>(&mut self, source: &S, config: &HrConfig) -> bool {
        let key = PipelineKey::new(source, config);
        let current = match (&self.job, self.state.status) {
            (Some(job), _) => job.key == key,
            (None, OverviewStatus::Complete) => self.completed_key.as_ref() == Some(&key),
            (None, _) => false,
        };
        if current {
            return false;
        }
        self.start(source, config);
        true
    }

    /// Process one batch of steps. Restarts the build when the shape of `source`
    /// differs from the one it was started with.
    pub fn poll<S: SampleSource + ?Sized>(&mut self, source: &S) -> OverviewStatus {
        let stale = match &self.job {
            Some(job) => !job.key.same_source(source),
            None => return self.state.status,
        };
        if stale {
            let config = self.job.as_ref().map(|job| job.config.clone()).unwrap_or_default();
            info!("overview source changed; restarting");
            self.start(source, &config);
        }
        let Some(job) = self.job.as_mut() else {
            return self.state.status;
        };

        let total_steps = self.state.total_steps;
        let end = (job.next_step + self.batch_size).min(total_steps);
        for step in job.next_step..end {
            if let Some(point) = analyse_step(source, job, step) {
                self.state.points.push(point);
            }
        }
        job.next_step = end;
        self.state.steps_completed = end;
        self.state.progress = end as f64 / total_steps as f64;
        debug!(
            "overview build {}: {}/{} steps, {} points",
            self.generation,
            end,
            total_steps,
            self.state.points.len()
        );

        if end >= total_steps {
            let range = ScaleRange::from_overview(&self.state.points);
            self.state.range = Some(range);
            self.state.status = OverviewStatus::Complete;
            self.state.progress = 1.0;
            if let Some(job) = self.job.take() {
                self.completed_key = Some(job.key);
            }
            info!(
                "overview build {} complete: {} points, scale {:.0}-{:.0} bpm",
                self.generation,
                self.state.points.len(),
                range.min_bpm,
                range.max_bpm
            );
        }
        self.state.status
    }

    /// Poll until the build finishes. Blocks the caller for the whole recording.
    pub fn run_to_completion<S: SampleSource + ?Sized>(&mut self, source: &S) -> &OverviewState {
        while self.poll(source) == OverviewStatus::Building {}
        &self.state
    }

    pub fn state(&self) -> &OverviewState {
        &self.state
    }

    pub fn status(&self) -> OverviewStatus {
        self.state.status
    }

    pub fn progress(&self) -> f64 {
        self.state.progress
    }

    pub fn points(&self) -> &[OverviewPoint] {
        &self.state.points
    }

    pub fn scale_range(&self) -> Option<ScaleRange> {
        self.state.range
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Analyse the 8 s window centred on `step`; `None` when no finite average results.
fn analyse_step<S: SampleSource + ?Sized>(
    source: &S,
    job: &Job,
    step: usize,
) -> Option<OverviewPoint> {
    let center = step as f64 * STRIDE_S;
    let t0 = (center - WINDOW_S / 2.0).max(0.0);
    let t1 = (center + WINDOW_S / 2.0).min(job.total_seconds);
    let duration = (t1 - t0).max(1e-6);
    let seg = resample_merged_span(source, &job.key.leads, t0, duration, RESAMPLE_WIDTH);
    let dt = duration / RESAMPLE_WIDTH as f64;
    let filtered = job.key.baseline.apply(&seg, dt);
    let hr = detect_hr(&filtered, dt, &job.key.step_params());
    hr.average.is_finite().then_some(OverviewPoint {
        center_time: center,
        average_bpm: hr.average,
    })
}
