//! Spectral primitives shared by the feature extractor.
//!
//! Everything here is deterministic: fixed window, fixed frame layout, no
//! randomness. Frame layout follows the librosa conventions the classifier
//! artifacts were trained against (n_fft=2048, hop=512, Hann window, no
//! center padding).

use crate::error::AnalysisError;
use realfft::{RealFftPlanner, RealToComplex};
use std::f32::consts::PI;
use std::sync::Arc;

/// FFT window size for all framed analyses.
pub const N_FFT: usize = 2048;
/// Hop between consecutive analysis frames.
pub const HOP_LENGTH: usize = 512;

/// Short-time Fourier transform over fixed-size Hann-windowed frames.
pub struct Stft {
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    n_fft: usize,
    hop: usize,
}

impl Stft {
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            fft,
            window: hann_window(n_fft),
            n_fft,
            hop,
        }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Number of frequency bins per frame (n_fft/2 + 1).
    pub fn n_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of complete frames for a signal of `num_samples` samples.
    pub fn num_frames(&self, num_samples: usize) -> usize {
        if num_samples < self.n_fft {
            0
        } else {
            (num_samples - self.n_fft) / self.hop + 1
        }
    }

    /// Center frequency of each FFT bin at the given sample rate.
    pub fn bin_frequencies(&self, sample_rate: u32) -> Vec<f32> {
        (0..self.n_bins())
            .map(|i| i as f32 * sample_rate as f32 / self.n_fft as f32)
            .collect()
    }

    /// Compute magnitude spectra, one row per frame.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::TooShort`] when the signal does not contain a
    /// single complete frame.
    pub fn magnitudes(&self, samples: &[f32]) -> Result<Vec<Vec<f32>>, AnalysisError> {
        let n_frames = self.num_frames(samples.len());
        if n_frames == 0 {
            return Err(AnalysisError::TooShort {
                needed: self.n_fft,
                actual: samples.len(),
            });
        }

        let mut spectrum = self.fft.make_output_vec();
        let mut frames = Vec::with_capacity(n_frames);

        for i in 0..n_frames {
            let start = i * self.hop;
            let mut input: Vec<f32> = samples[start..start + self.n_fft]
                .iter()
                .zip(self.window.iter())
                .map(|(s, w)| s * w)
                .collect();

            self.fft
                .process(&mut input, &mut spectrum)
                .map_err(|e| AnalysisError::FftError {
                    reason: e.to_string(),
                })?;

            frames.push(spectrum.iter().map(|c| c.norm()).collect());
        }

        Ok(frames)
    }
}

impl Default for Stft {
    fn default() -> Self {
        Self::new(N_FFT, HOP_LENGTH)
    }
}

/// Hann window of the given size.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / (size as f32 - 1.0)).cos()))
        .collect()
}

/// Root-mean-square energy of a sample slice.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Median of a slice; 0.0 for empty input.
pub fn median(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Mean of a slice; 0.0 for empty input.
pub fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}

/// Population variance of a slice; 0.0 for empty input.
pub fn variance(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f32>() / values.len() as f32
}

/// Convert frequency in Hz to the Slaney mel scale (librosa default).
pub fn hz_to_mel(f: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74;

    if f < MIN_LOG_HZ {
        f / F_SP
    } else {
        MIN_LOG_MEL + (f / MIN_LOG_HZ).ln() / LOGSTEP
    }
}

/// Convert a Slaney mel value back to Hz.
pub fn mel_to_hz(m: f32) -> f32 {
    const F_SP: f32 = 200.0 / 3.0;
    const MIN_LOG_HZ: f32 = 1000.0;
    const MIN_LOG_MEL: f32 = MIN_LOG_HZ / F_SP;
    const LOGSTEP: f32 = 0.068_751_74;

    if m < MIN_LOG_MEL {
        m * F_SP
    } else {
        MIN_LOG_HZ * ((m - MIN_LOG_MEL) * LOGSTEP).exp()
    }
}

/// Triangular mel filterbank of `n_mels` rows over `n_fft/2 + 1` bins.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f32>> {
    let n_bins = n_fft / 2 + 1;
    let fmax = sample_rate as f32 / 2.0;

    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(fmax);
    let hz_points: Vec<f32> = (0..=n_mels + 1)
        .map(|i| mel_to_hz(mel_min + (mel_max - mel_min) * i as f32 / (n_mels + 1) as f32))
        .collect();

    let bin_freqs: Vec<f32> = (0..n_bins)
        .map(|i| i as f32 * sample_rate as f32 / n_fft as f32)
        .collect();

    let mut filterbank = vec![vec![0.0f32; n_bins]; n_mels];
    for (m, filter) in filterbank.iter_mut().enumerate() {
        let f_lower = hz_points[m];
        let f_center = hz_points[m + 1];
        let f_upper = hz_points[m + 2];

        for (b, &freq) in bin_freqs.iter().enumerate() {
            if freq >= f_lower && freq <= f_center && f_center > f_lower {
                filter[b] = (freq - f_lower) / (f_center - f_lower);
            } else if freq > f_center && freq <= f_upper && f_upper > f_center {
                filter[b] = (f_upper - freq) / (f_upper - f_center);
            }
        }
    }

    filterbank
}

/// Orthonormal DCT-II of `input`, truncated to `n_out` coefficients.
pub fn dct_ii(input: &[f32], n_out: usize) -> Vec<f32> {
    let n = input.len();
    if n == 0 {
        return vec![0.0; n_out];
    }

    let scale0 = (1.0 / n as f32).sqrt();
    let scale = (2.0 / n as f32).sqrt();

    (0..n_out)
        .map(|k| {
            let sum: f32 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| x * (PI / n as f32 * (i as f32 + 0.5) * k as f32).cos())
                .sum();
            sum * if k == 0 { scale0 } else { scale }
        })
        .collect()
}

/// Median-filter a spectrogram along the time axis, one bin at a time.
///
/// Harmonic content is stable across frames, so a time-axis median suppresses
/// transients and leaves the tonal component for chroma/tonnetz analysis.
pub fn median_filter_time(frames: &[Vec<f32>], width: usize) -> Vec<Vec<f32>> {
    if frames.is_empty() || width <= 1 {
        return frames.to_vec();
    }

    let n_frames = frames.len();
    let n_bins = frames[0].len();
    let half = width / 2;

    let mut out = vec![vec![0.0f32; n_bins]; n_frames];
    let mut column = Vec::with_capacity(width);

    for b in 0..n_bins {
        for t in 0..n_frames {
            column.clear();
            let lo = t.saturating_sub(half);
            let hi = (t + half + 1).min(n_frames);
            for frame in &frames[lo..hi] {
                column.push(frame[b]);
            }
            out[t][b] = median(&column);
        }
    }

    out
}
