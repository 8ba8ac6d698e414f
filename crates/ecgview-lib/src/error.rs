use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EcgError {
    #[error("sample rate must be positive and finite, got {0}")]
    InvalidSampleRate(f64),
    #[error("recording needs at least one lead")]
    NoLeads,
    #[error("lead {lead} has {actual} samples, expected {expected}")]
    LeadLengthMismatch {
        lead: usize,
        expected: usize,
        actual: usize,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, EcgError>;
