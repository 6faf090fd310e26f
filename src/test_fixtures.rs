//! Synthetic audio test fixtures for development and testing
//!
//! Provides deterministic signals with known properties, allowing testing
//! without committing binary audio files to the repository.

use std::f32::consts::PI;

/// Generate a pure sine wave at the given frequency
///
/// # Arguments
/// * `frequency` - Frequency in Hz (e.g., 440.0 for A4)
/// * `duration_secs` - Duration in seconds
/// * `sample_rate` - Sample rate in Hz (typically 16000 for the pipeline)
/// * `amplitude` - Peak amplitude, 0.0 to 1.0
pub fn generate_sine_wave(
    frequency: f32,
    duration_secs: f32,
    sample_rate: u32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Generate a linear chirp (frequency sweep)
///
/// Sweeping pitch gives the pitch tracker a wide spread of candidates,
/// useful for exercising the pitch-variance path.
pub fn generate_chirp(
    start_freq: f32,
    end_freq: f32,
    duration_secs: f32,
    sample_rate: u32,
    amplitude: f32,
) -> Vec<f32> {
    let num_samples = (duration_secs * sample_rate as f32) as usize;
    let freq_range = end_freq - start_freq;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let t_norm = t / duration_secs; // 0.0 to 1.0
            let freq = start_freq + freq_range * t_norm;
            let phase = 2.0 * PI * freq * t;
            amplitude * phase.sin()
        })
        .collect()
}

/// Generate pseudo-random white noise
///
/// Deterministic noise based on sample index for reproducible tests.
pub fn generate_white_noise(duration_secs: f32, sample_rate: u32, amplitude: f32) -> Vec<f32> {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let num_samples = (duration_secs * sample_rate as f32) as usize;
    (0..num_samples)
        .map(|i| {
            let mut hasher = DefaultHasher::new();
            i.hash(&mut hasher);
            let hash = hasher.finish();
            // Convert hash to [-1.0, 1.0] range
            let normalized = ((hash % 2000) as f32 / 1000.0) - 1.0;
            amplitude * normalized
        })
        .collect()
}

/// Generate a speech-like composite: voiced tone bursts with varying pitch,
/// separated by pauses.
///
/// The pitch wobble and the silent gaps push both the pitch-variance and
/// silence-ratio features toward their "natural speech" ranges.
pub fn generate_speechlike_signal(duration_secs: f32, sample_rate: u32) -> Vec<f32> {
    let mut signal = Vec::new();
    let burst_secs = 0.25;
    let pause_secs = 0.15;
    let mut elapsed = 0.0f32;
    let mut burst_index = 0u32;

    while elapsed < duration_secs {
        // Each burst sits on a different fundamental, like syllables do.
        let fundamental = 140.0 + 60.0 * ((burst_index % 5) as f32);
        signal.extend(generate_sine_wave(fundamental, burst_secs, sample_rate, 0.5));
        signal.extend(vec![0.0; (pause_secs * sample_rate as f32) as usize]);

        elapsed += burst_secs + pause_secs;
        burst_index += 1;
    }

    signal.truncate((duration_secs * sample_rate as f32) as usize);
    signal
}

/// Encode f32 samples as an in-memory 16-bit PCM WAV byte stream.
///
/// For multi-channel data the samples must already be interleaved.
pub fn wav_bytes(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("create WAV writer");
        for &sample in samples {
            let clamped = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(clamped).expect("write WAV sample");
        }
        writer.finalize().expect("finalize WAV stream");
    }
    cursor.into_inner()
}

/// Write samples to a temporary WAV file on disk.
pub fn create_test_wav_file(
    samples: &[f32],
    sample_rate: u32,
    channels: u16,
) -> tempfile::NamedTempFile {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(&wav_bytes(samples, sample_rate, channels))
        .expect("write WAV bytes");
    file.flush().expect("flush temp file");
    file
}

/// Two-tree stub classifier over `feature_len` features: feature 0 above
/// 0.5 leans AI_GENERATED (class 1), at or below leans HUMAN_GENERATED
/// (class 0). Averaged confidence for either side is 0.85.
pub fn stub_classifier_model(feature_len: usize) -> crate::model::ClassifierModel {
    let json = format!(
        r#"{{
            "version": 1,
            "feature_len": {feature_len},
            "labels": ["HUMAN_GENERATED", "AI_GENERATED"],
            "trees": [
                {{ "nodes": [
                    {{ "feature": 0, "threshold": 0.5, "left": 1, "right": 2 }},
                    {{ "probabilities": [0.9, 0.1] }},
                    {{ "probabilities": [0.2, 0.8] }}
                ] }},
                {{ "nodes": [
                    {{ "feature": 0, "threshold": 0.5, "left": 1, "right": 2 }},
                    {{ "probabilities": [0.8, 0.2] }},
                    {{ "probabilities": [0.1, 0.9] }}
                ] }}
            ]
        }}"#
    );
    serde_json::from_str(&json).expect("stub model JSON should parse")
}
