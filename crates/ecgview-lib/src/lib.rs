pub mod baseline;
pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod overview;
pub mod pipeline;
pub mod plot;
pub mod resample;
pub mod signal;
pub mod stats;
pub mod synthetic;

pub use baseline::BaselineMode;
pub use config::HrConfig;
pub use error::{EcgError, Result};
pub use io::{load_recording, LoadOptions};
pub use metrics::scale::ScaleRange;
pub use metrics::smoothing::SmoothingParams;
pub use overview::worker::{OverviewUpdate, OverviewWorker};
pub use overview::{OverviewBuilder, OverviewState, OverviewStatus};
pub use pipeline::{
    analyze_window, compute_window_hr, find_window_beats, summarize_recording, window_series,
    RecordingInfo, RecordingSummary, WindowBeats, WindowHr,
};
pub use signal::*;
