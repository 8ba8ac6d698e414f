use crate::signal::{Recording, SampleSource};
use anyhow::{Context, Result};
use csv::WriterBuilder;
use log::warn;
use std::path::Path;

fn is_separator(c: char) -> bool {
    c == ';' || c == ',' || c.is_whitespace()
}

/// All fields of a row as finite numbers, or `None` if any field is not one.
fn parse_row(line: &str) -> Option<Vec<f64>> {
    let mut row = Vec::new();
    for field in line.split(is_separator).filter(|f| !f.is_empty()) {
        match field.parse::<f64>() {
            Ok(v) if v.is_finite() => row.push(v),
            _ => return None,
        }
    }
    (!row.is_empty()).then_some(row)
}

/// Parse one sample per line, one column per lead. Non-numeric rows (headers,
/// comments) are skipped; the first numeric row fixes the lead count.
pub fn parse_delimited(text: &str) -> Result<Vec<Vec<f64>>> {
    let mut leads: Vec<Vec<f64>> = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let Some(row) = parse_row(line.trim()) else {
            continue;
        };
        if leads.is_empty() {
            leads = vec![Vec::new(); row.len()];
        }
        if row.len() != leads.len() {
            warn!(
                "line {}: expected {} fields, found {}; skipped",
                idx + 1,
                leads.len(),
                row.len()
            );
            continue;
        }
        for (lead, v) in leads.iter_mut().zip(row) {
            lead.push(v);
        }
    }
    if leads.is_empty() {
        anyhow::bail!("no numeric rows found");
    }
    Ok(leads)
}

pub fn read_delimited(path: &Path, fs: f64) -> Result<Recording> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let leads = parse_delimited(&text).with_context(|| format!("parsing {}", path.display()))?;
    Recording::new(fs, leads).with_context(|| format!("building recording from {}", path.display()))
}

/// Write one comma-separated row per sample, without a header.
pub fn write_delimited(path: &Path, recording: &Recording) -> Result<()> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for i in 0..recording.total_samples() {
        let row = recording.leads().iter().map(|lead| format!("{:.6}", lead[i]));
        writer.write_record(row).context("writing sample row")?;
    }
    writer.flush().with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}
