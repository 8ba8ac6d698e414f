use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use ecgview_lib::{
    analyze_window, find_window_beats, summarize_recording,
    io::{load_recording, save_recording, LoadOptions},
    overview::worker::{OverviewUpdate, OverviewWorker, SharedSource},
    plot::{figure_from_hr, figure_from_overview, Figure, PlotBackend, Series},
    synthetic::SyntheticEcg,
    BaselineMode, HrConfig, OverviewBuilder, OverviewState, Recording, SampleSource, Window,
    WindowHr,
};
use log::info;
use plotters::prelude::*;
use serde::Serialize;
use std::{
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

#[derive(Parser)]
#[command(
    name = "ecgview",
    version,
    about = "Multi-lead ECG heart-rate analysis tools"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct LoadArgs {
    /// Recording: .csv/.txt delimited text, anything else interleaved int16
    #[arg(long)]
    input: PathBuf,
    #[arg(long, default_value_t = 200.0)]
    fs: f64,
    /// Interleaved leads per sample (binary input only)
    #[arg(long = "leads", default_value_t = 3)]
    lead_count: usize,
    #[arg(long, default_value_t = 2.0)]
    uv_per_lsb: f64,
}

impl LoadArgs {
    fn load(&self) -> Result<Recording> {
        let opts = LoadOptions {
            fs: self.fs,
            lead_count: self.lead_count,
            uv_per_lsb: self.uv_per_lsb,
        };
        let rec = load_recording(&self.input, &opts)?;
        info!(
            "loaded {}: {} leads, {} samples at {} Hz",
            self.input.display(),
            rec.lead_count(),
            rec.total_samples(),
            rec.sample_rate()
        );
        Ok(rec)
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum BaselineArg {
    Highpass,
    Median,
}

impl From<BaselineArg> for BaselineMode {
    fn from(arg: BaselineArg) -> Self {
        match arg {
            BaselineArg::Highpass => BaselineMode::Highpass,
            BaselineArg::Median => BaselineMode::Median,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct HrArgs {
    /// TOML file with analysis settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Lead to merge (repeatable)
    #[arg(long = "lead")]
    leads: Vec<usize>,
    #[arg(long, value_enum)]
    baseline: Option<BaselineArg>,
    /// Beats in the trailing average
    #[arg(long)]
    smooth: Option<usize>,
    #[arg(long)]
    no_robust: bool,
    /// Outlier tolerance in percent of the local median
    #[arg(long)]
    tolerance: Option<f64>,
    #[arg(long)]
    no_lock_scale: bool,
}

impl HrArgs {
    fn config(&self) -> Result<HrConfig> {
        let mut cfg = match &self.config {
            Some(path) => HrConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => HrConfig::default(),
        };
        if !self.leads.is_empty() {
            cfg.leads = self.leads.clone();
        }
        if let Some(baseline) = self.baseline {
            cfg.baseline = baseline.into();
        }
        if let Some(smooth) = self.smooth {
            cfg.smoothing.smooth_beats = smooth;
        }
        if self.no_robust {
            cfg.smoothing.robust = false;
        }
        if let Some(tolerance) = self.tolerance {
            cfg.smoothing.tolerance_pct = tolerance;
        }
        if self.no_lock_scale {
            cfg.lock_scale = false;
        }
        Ok(cfg)
    }
}

#[derive(Args, Debug, Clone)]
struct WindowArgs {
    #[arg(long, default_value_t = 0.0)]
    start_s: f64,
    #[arg(long, default_value_t = 10.0)]
    window_s: f64,
    /// Pane width in pixels
    #[arg(long, default_value_t = 1000)]
    width: usize,
}

impl WindowArgs {
    fn window(&self, rec: &Recording) -> Result<Window> {
        if !(self.window_s > 0.0) {
            return Err(anyhow!("window length must be positive"));
        }
        let fs = rec.sample_rate();
        let start = (self.start_s.max(0.0) * fs).round() as usize;
        let view = Window::new(start, self.window_s, self.width.max(1));
        Ok(view.clamp_start(rec.total_samples(), fs))
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a synthetic 3-lead recording (.csv/.txt as text, otherwise int16)
    Sample {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 200.0)]
        fs: f64,
        #[arg(long, default_value_t = 10.0)]
        duration_s: f64,
        #[arg(long, default_value_t = 0.8)]
        rr_s: f64,
        #[arg(long, default_value_t = 0.0)]
        noise_mv: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        #[arg(long, default_value_t = 2.0)]
        uv_per_lsb: f64,
    },
    /// Smoothed heart rate and axis range of one window
    WindowHr {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        hr: HrArgs,
        #[arg(long, value_enum, default_value = "json")]
        format: OutputFormat,
    },
    /// Refined R-peak sample indices and unsmoothed beats of one window
    FindBeats {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        hr: HrArgs,
    },
    /// Build the whole-recording overview on the background worker
    Overview {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        hr: HrArgs,
        /// Steps per batch
        #[arg(long, default_value_t = 120)]
        batch: usize,
    },
    /// Recording info, detected peaks, RR statistics and time-domain HRV
    Summary {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        hr: HrArgs,
    },
    /// Render the window heart rate (or the overview) to a PNG via plotters
    HrPlot {
        #[command(flatten)]
        load: LoadArgs,
        #[command(flatten)]
        window: WindowArgs,
        #[command(flatten)]
        hr: HrArgs,
        #[arg(long)]
        out: PathBuf,
        /// Plot the overview instead of the window
        #[arg(long)]
        overview: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Commands::Sample {
            out,
            fs,
            duration_s,
            rr_s,
            noise_mv,
            seed,
            uv_per_lsb,
        } => {
            let generator = SyntheticEcg {
                fs,
                duration_s,
                rr_s,
                noise_mv,
                seed,
                ..SyntheticEcg::default()
            };
            cmd_sample(&generator, &out, uv_per_lsb)?
        }
        Commands::WindowHr {
            load,
            window,
            hr,
            format,
        } => cmd_window_hr(&load, &window, &hr, format)?,
        Commands::FindBeats { load, window, hr } => cmd_find_beats(&load, &window, &hr)?,
        Commands::Overview { load, hr, batch } => cmd_overview(&load, &hr, batch)?,
        Commands::Summary { load, hr } => cmd_summary(&load, &hr)?,
        Commands::HrPlot {
            load,
            window,
            hr,
            out,
            overview,
        } => cmd_hr_plot(&load, &window, &hr, &out, overview)?,
    }
    Ok(())
}

fn cmd_sample(generator: &SyntheticEcg, out: &Path, uv_per_lsb: f64) -> Result<()> {
    let rec = generator.generate()?;
    let opts = LoadOptions {
        fs: generator.fs,
        lead_count: rec.lead_count(),
        uv_per_lsb,
    };
    save_recording(out, &rec, &opts)?;
    info!(
        "wrote {} samples x {} leads to {}",
        rec.total_samples(),
        rec.lead_count(),
        out.display()
    );
    Ok(())
}

/// Locked range source for a one-shot run: the full overview, built inline.
fn overview_for(rec: &Recording, cfg: &HrConfig) -> Option<OverviewState> {
    if !cfg.lock_scale {
        return None;
    }
    let mut builder = OverviewBuilder::new();
    builder.start(rec, cfg);
    Some(builder.run_to_completion(rec).clone())
}

#[derive(Serialize)]
struct WindowReport {
    start_s: f64,
    window_s: f64,
    leads: Vec<usize>,
    #[serde(flatten)]
    result: WindowHr,
}

fn window_report(load: &LoadArgs, window: &WindowArgs, hr: &HrArgs) -> Result<WindowReport> {
    let rec = load.load()?;
    let cfg = hr.config()?;
    let view = window.window(&rec)?;
    let overview = overview_for(&rec, &cfg);
    let result = analyze_window(&rec, &view, &cfg, overview.as_ref());
    Ok(WindowReport {
        start_s: view.start_time(rec.sample_rate()),
        window_s: view.seconds,
        leads: cfg.resolve_leads(rec.lead_count()),
        result,
    })
}

fn cmd_window_hr(
    load: &LoadArgs,
    window: &WindowArgs,
    hr: &HrArgs,
    format: OutputFormat,
) -> Result<()> {
    let report = window_report(load, window, hr)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string(&report)?),
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(io::stdout());
            for beat in &report.result.hr.beats {
                writer.serialize(beat)?;
            }
            writer.flush()?;
        }
    }
    Ok(())
}

fn cmd_find_beats(load: &LoadArgs, window: &WindowArgs, hr: &HrArgs) -> Result<()> {
    let rec = load.load()?;
    let cfg = hr.config()?;
    let view = window.window(&rec)?;
    let beats = find_window_beats(&rec, &view, &cfg);
    let out = serde_json::json!({
        "fs": rec.sample_rate(),
        "start_sample": view.start_sample,
        "peaks": beats.peaks,
        "raw_beats": beats.raw_beats,
    });
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_overview(load: &LoadArgs, hr: &HrArgs, batch: usize) -> Result<()> {
    let rec = load.load()?;
    let cfg = hr.config()?;
    let source: SharedSource = Arc::new(rec);
    let mut worker = OverviewWorker::with_batch_size(batch);
    worker.start(source, cfg)?;
    loop {
        match worker.next_update(Duration::from_secs(120)) {
            Some(OverviewUpdate::Progress {
                progress, points, ..
            }) => info!("overview {:.0}% ({} points)", progress * 100.0, points),
            Some(OverviewUpdate::Complete { state, .. }) => {
                println!("{}", serde_json::to_string(&state)?);
                return Ok(());
            }
            Some(OverviewUpdate::Cancelled { .. }) => return Err(anyhow!("overview cancelled")),
            None => return Err(anyhow!("overview worker timed out")),
        }
    }
}

fn cmd_summary(load: &LoadArgs, hr: &HrArgs) -> Result<()> {
    let rec = load.load()?;
    let cfg = hr.config()?;
    let summary = summarize_recording(&rec, &cfg);
    info!(
        "{} peaks, mean HR {:.1} bpm, SDNN {:.1} ms",
        summary.rr.beat_count,
        summary.rr.mean_hr_bpm,
        summary.hrv.sdnn * 1000.0
    );
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}

fn cmd_hr_plot(
    load: &LoadArgs,
    window: &WindowArgs,
    hr: &HrArgs,
    out: &Path,
    overview: bool,
) -> Result<()> {
    let fig = if overview {
        let rec = load.load()?;
        let cfg = hr.config()?;
        let mut builder = OverviewBuilder::new();
        builder.start(&rec, &cfg);
        let state = builder.run_to_completion(&rec);
        figure_from_overview(state.points(), state.range().unwrap_or_default())
    } else {
        let report = window_report(load, window, hr)?;
        figure_from_hr(&report.result.hr, report.result.scale)
    };
    PngBackend::new(out).draw(&fig)?;
    info!("wrote {}", out.display());
    Ok(())
}

struct PngBackend<'a> {
    path: &'a Path,
    size: (u32, u32),
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path) -> Self {
        Self {
            path,
            size: (800, 480),
        }
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let root = BitMapBackend::new(self.path, self.size).into_drawing_area();
        root.fill(&WHITE)?;
        let ([x_min, x_max], [y_min, y_max]) = fig.bounds();
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(40)
            .y_label_area_size(50)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        let mut mesh = chart.configure_mesh();
        if let Some(label) = &fig.x.label {
            mesh.x_desc(label.as_str());
        }
        if let Some(label) = &fig.y.label {
            mesh.y_desc(label.as_str());
        }
        mesh.draw()?;
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let (r, g, b) = line.style.color.rgb();
                    chart.draw_series(LineSeries::new(
                        line.points
                            .iter()
                            .filter(|p| p[0].is_finite() && p[1].is_finite())
                            .map(|p| (p[0], p[1])),
                        RGBColor(r, g, b).stroke_width(line.style.width.round().max(1.0) as u32),
                    ))?;
                }
            }
        }
        root.present()?;
        Ok(())
    }
}
