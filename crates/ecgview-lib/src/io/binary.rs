use crate::signal::{Recording, SampleSource};
use anyhow::{Context, Result};
use std::{fs, path::Path};

pub const DEFAULT_UV_PER_LSB: f64 = 2.0;

/// Split little-endian int16 words, interleaved `lead_count` per sample, into
/// per-lead millivolt series. A trailing partial sample is dropped.
pub fn decode_interleaved_i16(bytes: &[u8], lead_count: usize, uv_per_lsb: f64) -> Vec<Vec<f64>> {
    let lead_count = lead_count.max(1);
    let words: Vec<i16> = bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect();
    let total = words.len() / lead_count;
    let scale = uv_per_lsb / 1000.0;
    (0..lead_count)
        .map(|lead| {
            (0..total)
                .map(|i| words[i * lead_count + lead] as f64 * scale)
                .collect()
        })
        .collect()
}

pub fn encode_interleaved_i16(recording: &Recording, uv_per_lsb: f64) -> Vec<u8> {
    let scale = 1000.0 / uv_per_lsb;
    let mut out = Vec::with_capacity(recording.total_samples() * recording.lead_count() * 2);
    for i in 0..recording.total_samples() {
        for lead in recording.leads() {
            let raw = (lead[i] * scale)
                .round()
                .clamp(i16::MIN as f64, i16::MAX as f64) as i16;
            out.extend_from_slice(&raw.to_le_bytes());
        }
    }
    out
}

pub fn read_interleaved_i16(
    path: &Path,
    fs: f64,
    lead_count: usize,
    uv_per_lsb: f64,
) -> Result<Recording> {
    if lead_count == 0 {
        anyhow::bail!("lead count must be at least 1");
    }
    if !(uv_per_lsb > 0.0) {
        anyhow::bail!("uV per LSB must be positive, got {}", uv_per_lsb);
    }
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let leads = decode_interleaved_i16(&bytes, lead_count, uv_per_lsb);
    Recording::new(fs, leads).with_context(|| format!("building recording from {}", path.display()))
}

pub fn write_interleaved_i16(path: &Path, recording: &Recording, uv_per_lsb: f64) -> Result<()> {
    if !(uv_per_lsb > 0.0) {
        anyhow::bail!("uV per LSB must be positive, got {}", uv_per_lsb);
    }
    fs::write(path, encode_interleaved_i16(recording, uv_per_lsb))
        .with_context(|| format!("failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn deinterleaves_and_scales() {
        let bytes = words(&[500, -500, 1000, 0, -32768, 32767]);
        let leads = decode_interleaved_i16(&bytes, 2, 2.0);
        assert_eq!(leads.len(), 2);
        let expected = [[1.0, 2.0, -65.536], [-1.0, 0.0, 65.534]];
        for (lead, want) in leads.iter().zip(expected) {
            assert_eq!(lead.len(), 3);
            for (got, want) in lead.iter().zip(want) {
                assert!((got - want).abs() < 1e-9, "{} vs {}", got, want);
            }
        }
    }

    #[test]
    fn partial_sample_is_dropped() {
        let mut bytes = words(&[1, 2, 3, 4, 5]);
        bytes.push(0xff);
        let leads = decode_interleaved_i16(&bytes, 3, 1000.0);
        assert_eq!(leads[0], vec![1.0]);
        assert_eq!(leads[2], vec![3.0]);
    }

    #[test]
    fn encode_saturates() {
        let rec = Recording::new(100.0, vec![vec![0.002, 1e6, -1e6]]).unwrap();
        let bytes = encode_interleaved_i16(&rec, 2.0);
        assert_eq!(bytes, words(&[1, i16::MAX, i16::MIN]));
    }

    #[test]
    fn rejects_bad_options() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(read_interleaved_i16(file.path(), 200.0, 0, 2.0).is_err());
        assert!(read_interleaved_i16(file.path(), 200.0, 1, 0.0).is_err());
    }
}
