//! Per-channel descriptive statistics and a coarse signal-quality grade.
//!
//! The grade looks only at the standard deviation (µV) of the most recent
//! second of a channel:
//! - below 1 µV the electrode is most likely flat or off the skin (`Poor`);
//! - below 10 µV the trace looks like ordinary resting EEG (`Good`);
//! - anything larger is reported as `Excellent`.
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
/// Standard deviation below which a channel is graded `Poor` (µV).
pub const POOR_STD_MICROVOLTS: f64 = 1.0;
/// Standard deviation below which a channel is graded `Good` (µV).
pub const GOOD_STD_MICROVOLTS: f64 = 10.0;
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}
impl ChannelStats {
    /// Population statistics over `data`; all zero for an empty slice.
    pub fn from_samples(data: &[f64]) -> Self {
        let view = ArrayView1::from(data);
        let Some(mean) = view.mean() else {
            return Self::default();
        };
        let (min, max) = view
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self {
            mean,
            std: view.std(0.0),
            min,
            max,
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalQuality {
    Poor,
    Good,
    Excellent,
}
impl SignalQuality {
    pub fn from_std(std_microvolts: f64) -> Self {
        if std_microvolts < POOR_STD_MICROVOLTS {
            SignalQuality::Poor
        } else if std_microvolts < GOOD_STD_MICROVOLTS {
            SignalQuality::Good
        } else {
            SignalQuality::Excellent
        }
    }
    /// Grades the last `sample_rate_hz` samples (one second) of `window`.
    pub fn assess(window: &[f64], sample_rate_hz: f64) -> Self {
        let recent = (sample_rate_hz.round() as usize).clamp(1, window.len().max(1));
        let start = window.len().saturating_sub(recent);
        Self::from_std(std_dev(&window[start..]))
    }
}
/// Population standard deviation; zero for an empty slice.
fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    ArrayView1::from(data).std(0.0)
}
