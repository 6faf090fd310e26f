//! Acoustic feature extraction.
//!
//! Two profiles share one framing scheme:
//!
//! * [`LightweightFeatures`]: five scalar descriptors consumed by the
//!   rule-based strategies (duration, silence ratio, spectral centroid,
//!   spectral bandwidth, pitch variance).
//! * [`FeatureVector`]: the fixed 233-dimensional vector consumed by the
//!   trained classifier: 40 cepstral means, 40 cepstral standard deviations,
//!   12 chroma bins, 128 mel-band energies, 7 spectral-contrast bands and
//!   6 tonnetz dimensions, in that order. The ordering is a contract with
//!   the classifier artifact and is versioned with it.
//!
//! Both profiles are deterministic for identical waveform input.

use crate::audio::Waveform;
use crate::dsp::{self, Stft};
use crate::error::AnalysisError;

/// Cepstral coefficients retained per frame.
pub const N_MFCC: usize = 40;
/// Chroma pitch classes.
pub const N_CHROMA: usize = 12;
/// Mel filterbank bands.
pub const N_MELS: usize = 128;
/// Spectral contrast bands (6 octave bands plus the residual top band).
pub const N_CONTRAST: usize = 7;
/// Tonnetz harmonic-network dimensions.
pub const N_TONNETZ: usize = 6;

/// Layout offsets into the comprehensive vector, in contract order.
pub const MFCC_MEAN_OFFSET: usize = 0;
pub const MFCC_STD_OFFSET: usize = N_MFCC;
pub const CHROMA_OFFSET: usize = 2 * N_MFCC;
pub const MEL_OFFSET: usize = CHROMA_OFFSET + N_CHROMA;
pub const CONTRAST_OFFSET: usize = MEL_OFFSET + N_MELS;
pub const TONNETZ_OFFSET: usize = CONTRAST_OFFSET + N_CONTRAST;

/// Pitch tracking search range in Hz.
const PITCH_FMIN_HZ: f32 = 150.0;
const PITCH_FMAX_HZ: f32 = 4000.0;

/// Time-axis median filter width for harmonic enhancement.
const HARMONIC_FILTER_WIDTH: usize = 17;

/// Octave-scale band edges for spectral contrast, in Hz.
const CONTRAST_EDGES_HZ: [f32; 7] = [0.0, 200.0, 400.0, 800.0, 1600.0, 3200.0, 6400.0];
/// Fraction of a band's bins treated as its peak/valley quantile.
const CONTRAST_QUANTILE: f32 = 0.02;

const LOG_FLOOR: f32 = 1e-10;

/// Scalar descriptors for the rule-based strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct LightweightFeatures {
    pub duration_secs: f32,
    pub silence_ratio: f32,
    pub spectral_centroid_hz: f32,
    pub spectral_bandwidth_hz: f32,
    pub pitch_variance: f32,
}

/// Fixed-length feature vector for the trained classifier.
///
/// Length is a compile-time constant; the classifier rejects any other
/// length instead of silently misaligning.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub const LEN: usize = TONNETZ_OFFSET + N_TONNETZ;

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Wrap raw values without a length check. Intended for tests that need
    /// deliberately malformed vectors.
    pub fn from_raw(values: Vec<f32>) -> Self {
        Self(values)
    }
}

/// Deterministic extractor for both feature profiles.
///
/// The STFT plan and mel filterbank are built once per extractor and reused
/// across invocations; the extractor itself is immutable after construction.
pub struct FeatureExtractor {
    stft: Stft,
    mel_filterbank: Vec<Vec<f32>>,
    sample_rate: u32,
    silence_rms_threshold: f32,
}

impl FeatureExtractor {
    pub fn new(sample_rate: u32, silence_rms_threshold: f32) -> Self {
        Self {
            stft: Stft::default(),
            mel_filterbank: dsp::mel_filterbank(sample_rate, dsp::N_FFT, N_MELS),
            sample_rate,
            silence_rms_threshold,
        }
    }

    /// Minimum number of samples for any extraction (one analysis frame).
    pub fn min_samples(&self) -> usize {
        self.stft.n_fft()
    }

    fn validate(&self, waveform: &Waveform) -> Result<(), AnalysisError> {
        if waveform.is_empty() {
            return Err(AnalysisError::Empty);
        }
        if waveform.len() < self.min_samples() {
            return Err(AnalysisError::TooShort {
                needed: self.min_samples(),
                actual: waveform.len(),
            });
        }
        Ok(())
    }

    /// Extract the lightweight profile.
    pub fn lightweight(&self, waveform: &Waveform) -> Result<LightweightFeatures, AnalysisError> {
        self.validate(waveform)?;

        let magnitudes = self.stft.magnitudes(&waveform.samples)?;
        let bin_freqs = self.stft.bin_frequencies(self.sample_rate);

        let silence_ratio = self.silence_ratio(&waveform.samples);

        let mut centroids = Vec::with_capacity(magnitudes.len());
        let mut bandwidths = Vec::with_capacity(magnitudes.len());
        for frame in &magnitudes {
            let centroid = spectral_centroid(frame, &bin_freqs);
            centroids.push(centroid);
            bandwidths.push(spectral_bandwidth(frame, &bin_freqs, centroid));
        }

        let pitch_variance = self.pitch_variance(&magnitudes, &bin_freqs);

        Ok(LightweightFeatures {
            duration_secs: waveform.duration_secs(),
            silence_ratio,
            spectral_centroid_hz: dsp::mean(&centroids),
            spectral_bandwidth_hz: dsp::mean(&bandwidths),
            pitch_variance,
        })
    }

    /// Extract the comprehensive profile.
    pub fn comprehensive(&self, waveform: &Waveform) -> Result<FeatureVector, AnalysisError> {
        self.validate(waveform)?;

        let magnitudes = self.stft.magnitudes(&waveform.samples)?;
        let power: Vec<Vec<f32>> = magnitudes
            .iter()
            .map(|frame| frame.iter().map(|m| m * m).collect())
            .collect();

        // Mel energies feed both the mel block and the cepstral block.
        let mel_frames: Vec<Vec<f32>> = power
            .iter()
            .map(|frame| apply_filterbank(&self.mel_filterbank, frame))
            .collect();

        let mfcc_frames: Vec<Vec<f32>> = mel_frames
            .iter()
            .map(|mel| {
                let log_mel: Vec<f32> =
                    mel.iter().map(|&e| 10.0 * e.max(LOG_FLOOR).log10()).collect();
                dsp::dct_ii(&log_mel, N_MFCC)
            })
            .collect();

        let (mfcc_means, mfcc_stds) = column_stats(&mfcc_frames, N_MFCC);
        let (mel_means, _) = column_stats(&mel_frames, N_MELS);

        let chroma_frames: Vec<[f32; N_CHROMA]> = power
            .iter()
            .map(|frame| chroma_frame(frame, self.sample_rate))
            .collect();
        let chroma_means = chroma_column_means(&chroma_frames);

        let contrast_means = self.spectral_contrast(&magnitudes);

        // Tonnetz runs on the harmonically enhanced spectrogram so percussive
        // transients do not smear the pitch-class geometry.
        let harmonic = dsp::median_filter_time(&magnitudes, HARMONIC_FILTER_WIDTH);
        let tonnetz_means = tonnetz(&harmonic, self.sample_rate);

        let mut vector = Vec::with_capacity(FeatureVector::LEN);
        vector.extend_from_slice(&mfcc_means);
        vector.extend_from_slice(&mfcc_stds);
        vector.extend_from_slice(&chroma_means);
        vector.extend_from_slice(&mel_means);
        vector.extend_from_slice(&contrast_means);
        vector.extend_from_slice(&tonnetz_means);

        debug_assert_eq!(vector.len(), FeatureVector::LEN);
        Ok(FeatureVector(vector))
    }

    /// Fraction of analysis frames whose RMS falls below the silence
    /// threshold.
    fn silence_ratio(&self, samples: &[f32]) -> f32 {
        let n_frames = self.stft.num_frames(samples.len());
        if n_frames == 0 {
            return 0.0;
        }

        let silent = (0..n_frames)
            .filter(|i| {
                let start = i * dsp::HOP_LENGTH;
                dsp::rms(&samples[start..start + dsp::N_FFT]) < self.silence_rms_threshold
            })
            .count();

        silent as f32 / n_frames as f32
    }

    /// Variance of the per-frame pitch track.
    ///
    /// Each frame contributes its strongest parabolic-interpolated spectral
    /// peak inside the pitch search range. Frames whose peak magnitude falls
    /// below the median across frames are treated as unvoiced and skipped;
    /// when no frame qualifies the variance is 0.0.
    fn pitch_variance(&self, magnitudes: &[Vec<f32>], bin_freqs: &[f32]) -> f32 {
        let bin_width = self.sample_rate as f32 / self.stft.n_fft() as f32;
        let min_bin = ((PITCH_FMIN_HZ / bin_width).ceil() as usize).max(1);
        let max_bin = ((PITCH_FMAX_HZ / bin_width).floor() as usize).min(bin_freqs.len() - 1);
        if min_bin + 1 >= max_bin {
            return 0.0;
        }

        let mut pitches = Vec::with_capacity(magnitudes.len());
        let mut mags = Vec::with_capacity(magnitudes.len());

        for frame in magnitudes {
            let mut best: Option<(f32, f32)> = None;

            for b in min_bin..max_bin {
                let m = frame[b];
                if m <= 0.0 || m <= frame[b - 1] || m < frame[b + 1] {
                    continue;
                }
                if best.is_some_and(|(_, bm)| m <= bm) {
                    continue;
                }

                // Parabolic interpolation around the peak bin refines the
                // frequency estimate below bin resolution.
                let denom = frame[b - 1] - 2.0 * m + frame[b + 1];
                let delta = if denom.abs() > f32::EPSILON {
                    0.5 * (frame[b - 1] - frame[b + 1]) / denom
                } else {
                    0.0
                };

                best = Some(((b as f32 + delta) * bin_width, m));
            }

            if let Some((pitch, m)) = best {
                pitches.push(pitch);
                mags.push(m);
            }
        }

        if pitches.is_empty() {
            return 0.0;
        }

        // Median gate marks the weaker half of frames as unvoiced.
        let threshold = dsp::median(&mags);
        let voiced: Vec<f32> = pitches
            .iter()
            .zip(mags.iter())
            .filter(|(_, &m)| m >= threshold)
            .map(|(&p, _)| p)
            .collect();

        dsp::variance(&voiced)
    }

    /// Per-band spectral contrast means (peak-to-valley spread in dB).
    fn spectral_contrast(&self, magnitudes: &[Vec<f32>]) -> Vec<f32> {
        let bin_width = self.sample_rate as f32 / self.stft.n_fft() as f32;
        let nyquist = self.sample_rate as f32 / 2.0;

        // Band edges, capped at Nyquist with the residual top band appended.
        let mut edges: Vec<usize> = CONTRAST_EDGES_HZ
            .iter()
            .map(|&f| ((f.min(nyquist) / bin_width) as usize).min(self.stft.n_bins() - 1))
            .collect();
        edges.push(self.stft.n_bins() - 1);

        let mut sums = vec![0.0f32; N_CONTRAST];
        for frame in magnitudes {
            for band in 0..N_CONTRAST {
                let lo = edges[band];
                let hi = edges[band + 1].max(lo + 1);
                let mut band_mags: Vec<f32> = frame[lo..=hi.min(frame.len() - 1)].to_vec();
                band_mags.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

                let q = ((band_mags.len() as f32 * CONTRAST_QUANTILE).round() as usize).max(1);
                let valley = dsp::mean(&band_mags[..q]);
                let peak = dsp::mean(&band_mags[band_mags.len() - q..]);

                sums[band] +=
                    10.0 * ((peak + LOG_FLOOR).log10() - (valley + LOG_FLOOR).log10());
            }
        }

        let n = magnitudes.len().max(1) as f32;
        sums.iter().map(|s| s / n).collect()
    }
}

/// One filterbank application: energies per band for one power frame.
fn apply_filterbank(filterbank: &[Vec<f32>], power_frame: &[f32]) -> Vec<f32> {
    filterbank
        .iter()
        .map(|filter| {
            filter
                .iter()
                .zip(power_frame.iter())
                .map(|(f, p)| f * p)
                .sum()
        })
        .collect()
}

/// Column-wise mean and population standard deviation over frames.
fn column_stats(frames: &[Vec<f32>], n_cols: usize) -> (Vec<f32>, Vec<f32>) {
    let n = frames.len().max(1) as f32;

    let mut means = vec![0.0f32; n_cols];
    for frame in frames {
        for (m, &v) in means.iter_mut().zip(frame.iter()) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }

    let mut stds = vec![0.0f32; n_cols];
    for frame in frames {
        for (s, (&v, &m)) in stds.iter_mut().zip(frame.iter().zip(means.iter())) {
            *s += (v - m) * (v - m);
        }
    }
    for s in &mut stds {
        *s = (*s / n).sqrt();
    }

    (means, stds)
}

/// Pitch-class energy profile for one power frame, normalized to peak 1.0.
fn chroma_frame(power_frame: &[f32], sample_rate: u32) -> [f32; N_CHROMA] {
    let n_fft = (power_frame.len() - 1) * 2;
    let bin_width = sample_rate as f32 / n_fft as f32;

    let mut chroma = [0.0f32; N_CHROMA];
    for (b, &p) in power_frame.iter().enumerate().skip(1) {
        let freq = b as f32 * bin_width;
        if freq < 20.0 {
            continue;
        }
        let midi = 69.0 + 12.0 * (freq / 440.0).log2();
        let pc = (midi.round() as i32).rem_euclid(12) as usize;
        chroma[pc] += p;
    }

    let max = chroma.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for c in &mut chroma {
            *c /= max;
        }
    }
    chroma
}

fn chroma_column_means(frames: &[[f32; N_CHROMA]]) -> Vec<f32> {
    let n = frames.len().max(1) as f32;
    let mut means = vec![0.0f32; N_CHROMA];
    for frame in frames {
        for (m, &v) in means.iter_mut().zip(frame.iter()) {
            *m += v;
        }
    }
    for m in &mut means {
        *m /= n;
    }
    means
}

/// Per-dimension tonnetz means over the harmonically enhanced spectrogram.
///
/// Projects L1-normalized chroma onto the circles of fifths, minor thirds
/// and major thirds (Harte's 6-D tonal centroid space).
fn tonnetz(harmonic_magnitudes: &[Vec<f32>], sample_rate: u32) -> Vec<f32> {
    use std::f32::consts::PI;

    let mut sums = vec![0.0f32; N_TONNETZ];
    for frame in harmonic_magnitudes {
        let power: Vec<f32> = frame.iter().map(|m| m * m).collect();
        let chroma = chroma_frame(&power, sample_rate);

        let l1: f32 = chroma.iter().sum();
        if l1 <= 0.0 {
            continue;
        }

        for (pc, &c) in chroma.iter().enumerate() {
            let weight = c / l1;
            let p = pc as f32;
            sums[0] += weight * (p * 7.0 * PI / 6.0).sin();
            sums[1] += weight * (p * 7.0 * PI / 6.0).cos();
            sums[2] += weight * (p * 3.0 * PI / 2.0).sin();
            sums[3] += weight * (p * 3.0 * PI / 2.0).cos();
            sums[4] += weight * 0.5 * (p * 2.0 * PI / 3.0).sin();
            sums[5] += weight * 0.5 * (p * 2.0 * PI / 3.0).cos();
        }
    }

    let n = harmonic_magnitudes.len().max(1) as f32;
    sums.iter().map(|s| s / n).collect()
}

/// Spectral centroid of one magnitude frame in Hz.
fn spectral_centroid(frame: &[f32], bin_freqs: &[f32]) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    frame
        .iter()
        .zip(bin_freqs.iter())
        .map(|(m, f)| m * f)
        .sum::<f32>()
        / total
}

/// Magnitude-weighted spread around the centroid in Hz.
fn spectral_bandwidth(frame: &[f32], bin_freqs: &[f32], centroid: f32) -> f32 {
    let total: f32 = frame.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    (frame
        .iter()
        .zip(bin_freqs.iter())
        .map(|(m, f)| m * (f - centroid) * (f - centroid))
        .sum::<f32>()
        / total)
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::CANONICAL_SAMPLE_RATE;
    use crate::test_fixtures::{generate_sine_wave, generate_white_noise};

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(CANONICAL_SAMPLE_RATE, 0.01)
    }

    fn sine_waveform(duration_secs: f32) -> Waveform {
        Waveform::new(
            generate_sine_wave(440.0, duration_secs, CANONICAL_SAMPLE_RATE, 0.5),
            CANONICAL_SAMPLE_RATE,
        )
    }

    #[test]
    fn test_empty_waveform_rejected() {
        let w = Waveform::new(Vec::new(), CANONICAL_SAMPLE_RATE);
        assert!(matches!(
            extractor().lightweight(&w),
            Err(AnalysisError::Empty)
        ));
        assert!(matches!(
            extractor().comprehensive(&w),
            Err(AnalysisError::Empty)
        ));
    }

    #[test]
    fn test_short_waveform_rejected() {
        let w = Waveform::new(vec![0.1; 100], CANONICAL_SAMPLE_RATE);
        assert!(matches!(
            extractor().lightweight(&w),
            Err(AnalysisError::TooShort { .. })
        ));
    }

    #[test]
    fn test_lightweight_duration() {
        let features = extractor().lightweight(&sine_waveform(0.99)).unwrap();
        assert!((features.duration_secs - 0.99).abs() < 0.01);
    }

    #[test]
    fn test_lightweight_sine_is_tonal_and_uniform() {
        let features = extractor().lightweight(&sine_waveform(1.5)).unwrap();

        // A steady sine has no pauses and a near-constant pitch track.
        assert!(features.silence_ratio < 0.05);
        assert!(features.pitch_variance < 50.0);

        // Centroid sits near the tone frequency.
        assert!(
            (features.spectral_centroid_hz - 440.0).abs() < 150.0,
            "centroid {}",
            features.spectral_centroid_hz
        );
    }

    #[test]
    fn test_silence_ratio_mixed_signal() {
        let mut samples = generate_sine_wave(440.0, 1.0, CANONICAL_SAMPLE_RATE, 0.5);
        samples.extend(vec![0.0f32; CANONICAL_SAMPLE_RATE as usize]);
        let w = Waveform::new(samples, CANONICAL_SAMPLE_RATE);

        let features = extractor().lightweight(&w).unwrap();
        assert!(
            features.silence_ratio > 0.3 && features.silence_ratio < 0.7,
            "silence ratio {}",
            features.silence_ratio
        );
    }

    #[test]
    fn test_noise_has_wider_bandwidth_than_sine() {
        let e = extractor();
        let sine = e.lightweight(&sine_waveform(1.0)).unwrap();
        let noise = e
            .lightweight(&Waveform::new(
                generate_white_noise(1.0, CANONICAL_SAMPLE_RATE, 0.5),
                CANONICAL_SAMPLE_RATE,
            ))
            .unwrap();

        assert!(noise.spectral_bandwidth_hz > sine.spectral_bandwidth_hz);
    }

    #[test]
    fn test_comprehensive_length_is_fixed() {
        let vector = extractor().comprehensive(&sine_waveform(1.0)).unwrap();
        assert_eq!(vector.len(), FeatureVector::LEN);
        assert_eq!(FeatureVector::LEN, 233);
    }

    #[test]
    fn test_comprehensive_deterministic() {
        let w = sine_waveform(1.0);
        let e = extractor();
        let a = e.comprehensive(&w).unwrap();
        let b = e.comprehensive(&w).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_chroma_peak_matches_note() {
        // 440 Hz is A: pitch class 9 in the C-based chroma layout.
        let vector = extractor().comprehensive(&sine_waveform(1.0)).unwrap();
        let chroma = &vector.as_slice()[CHROMA_OFFSET..CHROMA_OFFSET + N_CHROMA];

        let peak = chroma
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, 9);
    }

    #[test]
    fn test_layout_offsets_are_consistent() {
        assert_eq!(MFCC_STD_OFFSET, 40);
        assert_eq!(CHROMA_OFFSET, 80);
        assert_eq!(MEL_OFFSET, 92);
        assert_eq!(CONTRAST_OFFSET, 220);
        assert_eq!(TONNETZ_OFFSET, 227);
        assert_eq!(FeatureVector::LEN, TONNETZ_OFFSET + N_TONNETZ);
    }

    #[test]
    fn test_all_features_finite() {
        let e = extractor();
        for waveform in [
            sine_waveform(1.0),
            Waveform::new(
                generate_white_noise(1.0, CANONICAL_SAMPLE_RATE, 0.3),
                CANONICAL_SAMPLE_RATE,
            ),
            Waveform::new(
                vec![0.0; CANONICAL_SAMPLE_RATE as usize],
                CANONICAL_SAMPLE_RATE,
            ),
        ] {
            let vector = e.comprehensive(&waveform).unwrap();
            assert!(vector.as_slice().iter().all(|v| v.is_finite()));

            let light = e.lightweight(&waveform).unwrap();
            assert!(light.pitch_variance.is_finite());
            assert!(light.spectral_centroid_hz.is_finite());
        }
    }
}
