pub mod binary;
pub mod text;

use crate::signal::Recording;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_SAMPLE_RATE: f64 = 200.0;

/// How raw files are interpreted. Delimited text ignores `lead_count` and `uv_per_lsb`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoadOptions {
    pub fs: f64,
    /// Interleaved leads per sample in binary files
    pub lead_count: usize,
    pub uv_per_lsb: f64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            fs: DEFAULT_SAMPLE_RATE,
            lead_count: 3,
            uv_per_lsb: binary::DEFAULT_UV_PER_LSB,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Delimited,
    Int16,
}

impl InputFormat {
    /// `.csv` and `.txt` are delimited text; everything else is raw int16.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("csv") | Some("txt") => InputFormat::Delimited,
            _ => InputFormat::Int16,
        }
    }
}

pub fn load_recording(path: &Path, opts: &LoadOptions) -> Result<Recording> {
    match InputFormat::from_path(path) {
        InputFormat::Delimited => text::read_delimited(path, opts.fs),
        InputFormat::Int16 => {
            binary::read_interleaved_i16(path, opts.fs, opts.lead_count, opts.uv_per_lsb)
        }
    }
}

/// Write `recording` in the format implied by the extension of `path`.
pub fn save_recording(path: &Path, recording: &Recording, opts: &LoadOptions) -> Result<()> {
    match InputFormat::from_path(path) {
        InputFormat::Delimited => text::write_delimited(path, recording),
        InputFormat::Int16 => binary::write_interleaved_i16(path, recording, opts.uv_per_lsb),
    }
}
