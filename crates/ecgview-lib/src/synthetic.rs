use crate::{error::Result, signal::Recording};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Periodic pulse model of a multi-lead ECG: a triangular QRS at every multiple of
/// the RR interval riding on a slow baseline drift and a cardiac-rate sinusoid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticEcg {
    pub fs: f64,
    pub duration_s: f64,
    pub rr_s: f64,
    /// Half-width of the triangular QRS (seconds)
    pub qrs_half_width_s: f64,
    /// `(phase, scale)` per lead
    pub leads: Vec<(f64, f64)>,
    /// Peak amplitude of uniform additive noise (millivolts)
    pub noise_mv: f64,
    pub seed: u64,
}

impl Default for SyntheticEcg {
    fn default() -> Self {
        Self {
            fs: 200.0,
            duration_s: 10.0,
            rr_s: 0.8,
            qrs_half_width_s: 0.02,
            leads: vec![(0.0, 1.0), (0.15, 0.9), (0.3, 0.8)],
            noise_mv: 0.0,
            seed: 7,
        }
    }
}

impl SyntheticEcg {
    pub fn sample_count(&self) -> usize {
        ((self.fs * self.duration_s).round() as usize).max(1)
    }

    pub fn lead(&self, phase: f64, scale: f64, rng: &mut StdRng) -> Vec<f64> {
        let rr = self.rr_s;
        let qrs_w = self.qrs_half_width_s;
        (0..self.sample_count())
            .map(|i| {
                let t = i as f64 / self.fs;
                let mut v = 0.03 * (2.0 * PI * 0.33 * t + phase).sin();
                let d = t % rr;
                let near = d.min(rr - d);
                v += (qrs_w - near).max(0.0) / qrs_w;
                v += 0.12 * (2.0 * PI * t / rr + phase * 0.6).sin();
                if self.noise_mv > 0.0 {
                    v += rng.gen_range(-self.noise_mv..=self.noise_mv);
                }
                scale * v
            })
            .collect()
    }

    pub fn generate(&self) -> Result<Recording> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let leads: Vec<Vec<f64>> = self
            .leads
            .iter()
            .map(|&(phase, scale)| self.lead(phase, scale, &mut rng))
            .collect();
        Recording::new(self.fs, leads)
    }
}
