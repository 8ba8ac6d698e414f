use crate::{
    baseline::BaselineMode,
    error::{EcgError, Result},
    metrics::smoothing::SmoothingParams,
};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Only the first three leads of a recording are selectable.
pub const MAX_SELECTABLE_LEADS: usize = 3;

/// Immutable analysis configuration passed into every pipeline call.
///
/// ```toml
/// leads = [0, 1]
/// baseline = "median"
/// lock_scale = false
///
/// [smoothing]
/// smooth_beats = 4
/// tolerance_pct = 25.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrConfig {
    /// Selected lead indices, merged by per-sample median
    pub leads: Vec<usize>,
    pub baseline: BaselineMode,
    pub smoothing: SmoothingParams,
    /// Use the overview's range for every window once it is available
    pub lock_scale: bool,
}

impl Default for HrConfig {
    fn default() -> Self {
        Self {
            leads: (0..MAX_SELECTABLE_LEADS).collect(),
            baseline: BaselineMode::default(),
            smoothing: SmoothingParams::default(),
            lock_scale: true,
        }
    }
}

impl HrConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| EcgError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Copy with smoothing parameters clamped to safe values.
    pub fn sanitized(&self) -> Self {
        let smoothing = self.smoothing.sanitized();
        if smoothing != self.smoothing {
            debug!("smoothing parameters sanitized: {:?} -> {:?}", self.smoothing, smoothing);
        }
        Self {
            smoothing,
            ..self.clone()
        }
    }

    /// Selected leads that exist in a recording of `lead_count` leads, in
    /// ascending order without duplicates; lead 0 when nothing usable is selected.
    pub fn resolve_leads(&self, lead_count: usize) -> Vec<usize> {
        let limit = lead_count.min(MAX_SELECTABLE_LEADS);
        let mut leads: Vec<usize> = self.leads.iter().copied().filter(|&l| l < limit).collect();
        leads.sort_unstable();
        leads.dedup();
        if leads.is_empty() {
            leads.push(0);
        }
        leads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = HrConfig::from_toml_str(
            r#"
            baseline = "median"

            [smoothing]
            smooth_beats = 4
            "#,
        )
        .unwrap();
        assert_eq!(cfg.baseline, BaselineMode::Median);
        assert_eq!(cfg.smoothing.smooth_beats, 4);
        assert!(cfg.smoothing.robust);
        assert_eq!(cfg.leads, vec![0, 1, 2]);
        assert!(cfg.lock_scale);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let err = HrConfig::from_toml_str("baseline = \"lowpass\"").unwrap_err();
        assert!(matches!(err, EcgError::Config(_)));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "leads = [1]\nlock_scale = false").unwrap();
        let cfg = HrConfig::load(file.path()).unwrap();
        assert_eq!(cfg.leads, vec![1]);
        assert!(!cfg.lock_scale);
        assert!(matches!(
            HrConfig::load(Path::new("/nonexistent/hr.toml")),
            Err(EcgError::Io { .. })
        ));
    }

    #[test]
    fn lead_selection_is_resolved() {
        let cfg = HrConfig {
            leads: vec![2, 0, 2, 7],
            ..HrConfig::default()
        };
        assert_eq!(cfg.resolve_leads(12), vec![0, 2]);
        assert_eq!(cfg.resolve_leads(1), vec![0]);
        let none = HrConfig {
            leads: Vec::new(),
            ..HrConfig::default()
        };
        assert_eq!(none.resolve_leads(3), vec![0]);
    }
}
