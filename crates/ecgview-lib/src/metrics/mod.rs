pub mod hrv;
pub mod scale;
pub mod smoothing;
