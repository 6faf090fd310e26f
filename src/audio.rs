//! Waveform loading: container bytes in, canonical mono waveform out.
//!
//! Decoding is delegated to symphonia so the pipeline accepts whatever the
//! enabled codec set can handle (MP3, WAV, M4A/AAC, FLAC, OGG). The decoded
//! stream is downmixed to mono, resampled to the canonical rate with a
//! windowed-sinc kernel, and normalized to `[-1.0, 1.0]`.

use crate::error::{AudioError, Result};
use std::f64::consts::PI;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Canonical pipeline sample rate in Hz. All feature extraction assumes
/// waveforms at this rate.
pub const CANONICAL_SAMPLE_RATE: u32 = 16_000;

/// Half-width of the windowed-sinc resampling kernel, in input samples.
const SINC_HALF_WIDTH: isize = 32;

/// Opaque audio container bytes handed to the loader by a collaborator.
///
/// The optional hint is a file extension ("mp3", "wav", ...) that speeds up
/// format probing; decoding works without it.
#[derive(Debug, Clone)]
pub struct RawAudio {
    pub bytes: Vec<u8>,
    pub hint: Option<String>,
}

impl RawAudio {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes, hint: None }
    }

    pub fn with_hint(bytes: Vec<u8>, hint: impl Into<String>) -> Self {
        Self {
            bytes,
            hint: Some(hint.into()),
        }
    }
}

/// Normalized mono waveform at a known sample rate.
///
/// Samples are `f32` in `[-1.0, 1.0]`. After [`load`] the sample rate always
/// equals the requested target rate.
#[derive(Debug, Clone)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Decode arbitrary container bytes into a mono waveform at `target_rate`.
///
/// # Errors
///
/// Returns [`AudioError::DecodeFailed`] when the byte stream is not a
/// decodable audio container, and [`AudioError::UnsupportedFormat`] when the
/// container is recognized but its codec is not enabled in this build.
/// Returns [`AudioError::EmptyAudio`] when decoding yields no samples.
pub fn load(raw: RawAudio, target_rate: u32) -> Result<Waveform, AudioError> {
    if !(8_000..=192_000).contains(&target_rate) {
        return Err(AudioError::InvalidSampleRate { rate: target_rate });
    }

    let (interleaved, native_rate, channels) = decode_container(raw)?;

    if interleaved.is_empty() {
        return Err(AudioError::EmptyAudio);
    }

    let mono = downmix_to_mono(&interleaved, channels);

    // Resample only when rates differ; the common 16kHz case skips the kernel
    // entirely.
    let samples = if native_rate == target_rate {
        mono
    } else {
        resample(&mono, native_rate, target_rate)
    };

    tracing::debug!(
        native_rate,
        target_rate,
        channels,
        samples = samples.len(),
        "Loaded waveform"
    );

    Ok(Waveform::new(samples, target_rate))
}

/// Decode the container to interleaved f32 samples at native rate/channels.
fn decode_container(raw: RawAudio) -> Result<(Vec<f32>, u32, usize), AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(raw.bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = &raw.hint {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::DecodeFailed {
            reason: e.to_string(),
        })?;

    let mut reader = probed.format;

    let track = reader
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(AudioError::NoAudioTrack)?
        .clone();

    let track_id = track.id;
    let native_rate = track
        .codec_params
        .sample_rate
        .ok_or(AudioError::MissingMetadata {
            field: "sample rate",
        })?;

    // A recognized container with a codec we cannot instantiate is the
    // unsupported-format case, distinct from unparseable bytes.
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::UnsupportedFormat {
            reason: e.to_string(),
        })?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut channels = 0usize;
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match reader.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            // Corrupt packets are skipped; the remaining stream may decode.
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(AudioError::DecodeFailed {
                    reason: e.to_string(),
                });
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => {
                return Err(AudioError::DecodeFailed {
                    reason: e.to_string(),
                });
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            // SampleBuffer normalizes integer PCM by 2^(bits-1) during the
            // f32 conversion.
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    if channels == 0 {
        return Err(AudioError::EmptyAudio);
    }

    Ok((interleaved, native_rate, channels))
}

/// Average interleaved channels down to a single channel.
fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Band-limited resampling via a Hann-windowed sinc kernel.
///
/// Output length is `round(n * to_rate / from_rate)`. The kernel cutoff sits
/// just below the lower of the two Nyquist frequencies, so downsampling does
/// not alias energy into the band the spectral features read.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = to_rate as f64 / from_rate as f64;
    let out_len = (samples.len() as f64 * ratio).round() as usize;
    let cutoff = ratio.min(1.0) * 0.98;

    let mut out = Vec::with_capacity(out_len);
    for i in 0..out_len {
        // Position of this output sample on the input time axis.
        let center = i as f64 / ratio;
        let first_tap = center.floor() as isize - SINC_HALF_WIDTH + 1;

        let mut acc = 0.0f64;
        for tap in first_tap..(first_tap + 2 * SINC_HALF_WIDTH) {
            if tap < 0 || tap as usize >= samples.len() {
                continue;
            }
            acc += samples[tap as usize] as f64 * windowed_sinc(center - tap as f64, cutoff);
        }
        out.push((acc as f32).clamp(-1.0, 1.0));
    }

    out
}

/// Hann-windowed sinc, scaled by the cutoff for unity passband gain.
fn windowed_sinc(x: f64, cutoff: f64) -> f64 {
    let half_width = SINC_HALF_WIDTH as f64;
    if x.abs() >= half_width {
        return 0.0;
    }

    let t = cutoff * x;
    let sinc = if t == 0.0 {
        1.0
    } else {
        (PI * t).sin() / (PI * t)
    };
    let window = 0.5 * (1.0 + (PI * x / half_width).cos());

    cutoff * sinc * window
}
