use std::f64::consts::TAU;
use std::fmt;
use std::sync::Arc;
use ndarray::Array1;
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use crate::drivers::NeuroStateError;
/// Smallest FFT length used regardless of window size.
pub const MIN_FFT_SIZE: usize = 256;
/// Named EEG frequency bands. Bounds are inclusive on both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}
impl Band {
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];
    pub fn range_hz(self) -> (f64, f64) {
        match self {
            Band::Delta => (0.5, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 50.0),
        }
    }
    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "Delta",
            Band::Theta => "Theta",
            Band::Alpha => "Alpha",
            Band::Beta => "Beta",
            Band::Gamma => "Gamma",
        }
    }
}
impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
/// Mean spectral power per band. Also used for relative powers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}
impl BandPowers {
    pub fn from_fn(mut f: impl FnMut(Band) -> f64) -> Self {
        Self {
            delta: f(Band::Delta),
            theta: f(Band::Theta),
            alpha: f(Band::Alpha),
            beta: f(Band::Beta),
            gamma: f(Band::Gamma),
        }
    }
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (Band, f64)> + '_ {
        Band::ALL.into_iter().map(move |band| (band, self.get(band)))
    }
    pub fn total(&self) -> f64 {
        Band::ALL.iter().map(|&band| self.get(band)).sum()
    }
    /// Each band divided by the total; all zero when the total is zero.
    pub fn relative(&self) -> BandPowers {
        let total = self.total();
        if total > 0.0 {
            BandPowers::from_fn(|band| self.get(band) / total)
        } else {
            BandPowers::default()
        }
    }
    pub fn ratios(&self) -> BandRatios {
        BandRatios::from_powers(self)
    }
    /// Element-wise mean; zero for an empty input.
    pub fn mean<'a>(items: impl IntoIterator<Item = &'a BandPowers>) -> BandPowers {
        let mut count = 0usize;
        let mut sum = BandPowers::default();
        for item in items {
            count += 1;
            sum = BandPowers::from_fn(|band| sum.get(band) + item.get(band));
        }
        if count == 0 {
            return sum;
        }
        BandPowers::from_fn(|band| sum.get(band) / count as f64)
    }
}
/// `numerator / denominator`, or zero when the denominator is not positive.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}
/// Cross-band ratios derived from [`BandPowers`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BandRatios {
    pub theta_beta: f64,
    pub alpha_beta: f64,
    pub alpha_theta: f64,
    pub delta_theta: f64,
    pub gamma_alpha: f64,
}
impl BandRatios {
    pub fn from_powers(p: &BandPowers) -> Self {
        Self {
            theta_beta: safe_ratio(p.theta, p.beta),
            alpha_beta: safe_ratio(p.alpha, p.beta),
            alpha_theta: safe_ratio(p.alpha, p.theta),
            delta_theta: safe_ratio(p.delta, p.theta),
            gamma_alpha: safe_ratio(p.gamma, p.alpha),
        }
    }
    /// Average of per-channel ratios (not the ratio of averaged powers).
    pub fn mean<'a>(items: impl IntoIterator<Item = &'a BandRatios>) -> Option<BandRatios> {
        let items: Vec<&BandRatios> = items.into_iter().collect();
        if items.is_empty() {
            return None;
        }
        let n = items.len() as f64;
        let avg = |f: fn(&BandRatios) -> f64| items.iter().map(|r| f(r)).sum::<f64>() / n;
        Some(Self {
            theta_beta: avg(|r| r.theta_beta),
            alpha_beta: avg(|r| r.alpha_beta),
            alpha_theta: avg(|r| r.alpha_theta),
            delta_theta: avg(|r| r.delta_theta),
            gamma_alpha: avg(|r| r.gamma_alpha),
        })
    }
}
/// Analysis window applied before the FFT. The choice changes absolute
/// power values, so deployments should pin it in their config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowFunction {
    Hann,
    #[default]
    Hamming,
}
impl WindowFunction {
    /// Symmetric window coefficients of the given length.
    pub fn coefficients(self, len: usize) -> Array1<f64> {
        if len <= 1 {
            return Array1::ones(len);
        }
        let denom = (len - 1) as f64;
        Array1::from_shape_fn(len, |n| {
            let c = (TAU * n as f64 / denom).cos();
            match self {
                WindowFunction::Hann => 0.5 - 0.5 * c,
                WindowFunction::Hamming => 0.54 - 0.46 * c,
            }
        })
    }
}
/// How a window is turned into a power spectrum.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpectralMethod {
    /// One tapered, zero-padded FFT over the whole window.
    #[default]
    Periodogram,
    /// Average of tapered FFTs over overlapping segments.
    Welch { segment_seconds: f64, overlap: f64 },
}
/// `max(MIN_FFT_SIZE, next_power_of_two(frame_len))`.
pub fn fft_size_for(frame_len: usize) -> usize {
    frame_len.next_power_of_two().max(MIN_FFT_SIZE)
}
/// Turns one channel's window into band powers.
pub struct SpectralEstimator {
    window_fn: WindowFunction,
    method: SpectralMethod,
    frame_len: usize,
    fft_size: usize,
    taper: Array1<f64>,
    fft: Arc<dyn Fft<f64>>,
    frequencies_hz: Array1<f64>,
}
impl SpectralEstimator {
    /// `window_len` is the number of samples handed to [`band_powers`]
    /// (the ring buffer capacity).
    ///
    /// [`band_powers`]: SpectralEstimator::band_powers
    pub fn new(
        sample_rate_hz: f64,
        window_len: usize,
        window_fn: WindowFunction,
        method: SpectralMethod,
    ) -> Result<Self, NeuroStateError> {
        if sample_rate_hz.is_nan() || sample_rate_hz <= 0.0 {
            return Err(NeuroStateError::InvalidSampleRate);
        }
        if window_len == 0 {
            return Err(NeuroStateError::InvalidConfig(
                "spectral window must hold at least one sample".into(),
            ));
        }
        let frame_len = match method {
            SpectralMethod::Periodogram => window_len,
            SpectralMethod::Welch {
                segment_seconds,
                overlap,
            } => {
                if segment_seconds.is_nan() || segment_seconds <= 0.0 {
                    return Err(NeuroStateError::InvalidConfig(format!(
                        "welch segment must be positive, got {segment_seconds}s"
                    )));
                }
                if !(0.0..1.0).contains(&overlap) {
                    return Err(NeuroStateError::InvalidConfig(format!(
                        "welch overlap must be in [0, 1), got {overlap}"
                    )));
                }
                ((segment_seconds * sample_rate_hz).round() as usize).clamp(1, window_len)
            }
        };
        let fft_size = fft_size_for(frame_len);
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(fft_size);
        let bin_hz = sample_rate_hz / fft_size as f64;
        let frequencies_hz = Array1::from_shape_fn(fft_size / 2 + 1, |k| k as f64 * bin_hz);
        Ok(Self {
            window_fn,
            method,
            frame_len,
            fft_size,
            taper: window_fn.coefficients(frame_len),
            fft,
            frequencies_hz,
        })
    }
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
    pub fn frequencies_hz(&self) -> &Array1<f64> {
        &self.frequencies_hz
    }
    /// Non-negative power spectrum with `fft_size / 2 + 1` bins.
    pub fn power_spectrum(&self, samples: &[f64]) -> Array1<f64> {
        match self.method {
            SpectralMethod::Periodogram => self.frame_spectrum(samples),
            SpectralMethod::Welch { overlap, .. } => {
                if samples.len() <= self.frame_len {
                    return self.frame_spectrum(samples);
                }
                let overlap_len = (self.frame_len as f64 * overlap) as usize;
                let step = (self.frame_len - overlap_len).max(1);
                let mut acc = Array1::<f64>::zeros(self.frequencies_hz.len());
                let mut segments = 0usize;
                let mut start = 0usize;
                while start + self.frame_len <= samples.len() {
                    acc += &self.frame_spectrum(&samples[start..start + self.frame_len]);
                    segments += 1;
                    start += step;
                }
                acc / segments as f64
            }
        }
    }
    /// Mean power of the spectrum bins falling inside each band. A band with
    /// no bins (e.g. above Nyquist) has power zero.
    pub fn band_powers(&self, samples: &[f64]) -> BandPowers {
        let spectrum = self.power_spectrum(samples);
        BandPowers::from_fn(|band| {
            let (low, high) = band.range_hz();
            let selected: Vec<f64> = self
                .frequencies_hz
                .iter()
                .zip(spectrum.iter())
                .filter(|(freq, _)| **freq >= low && **freq <= high)
                .map(|(_, power)| *power)
                .collect();
            Array1::from(selected).mean().unwrap_or(0.0)
        })
    }
    fn frame_spectrum(&self, frame: &[f64]) -> Array1<f64> {
        // Frames longer than the FFT keep their most recent samples.
        let frame = &frame[frame.len().saturating_sub(self.fft_size)..];
        let taper = if frame.len() == self.frame_len {
            self.taper.clone()
        } else {
            self.window_fn.coefficients(frame.len())
        };
        let windowed = Array1::from(frame.to_vec()) * &taper;
        let mut buffer: Vec<Complex64> = windowed.iter().map(|&v| Complex64::new(v, 0.0)).collect();
        buffer.resize(self.fft_size, Complex64::new(0.0, 0.0));
        self.fft.process(&mut buffer);
        buffer
            .iter()
            .take(self.fft_size / 2 + 1)
            .map(|c| c.norm_sqr())
            .collect()
    }
}
