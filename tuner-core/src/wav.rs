//! # WAV Decode Module
//!
//! Minimal WAV ingestion for the offline path: 16-bit PCM and 32-bit
//! float RIFF/WAVE files, down-mixed to mono by taking the first
//! channel, with a deliberately simple resampler to the pipeline rate
//! (integer decimation when the rates divide, nearest neighbour
//! otherwise).

use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::TunerError;

/// Decoded mono audio in unit scale (samples within ±1.0 for sane input).
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub samples: Vec<f64>,
    pub sample_rate: u32,
}

/// Decodes a WAV file from disk.
pub fn decode_file(path: &Path) -> Result<WavAudio, TunerError> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| TunerError::MalformedWav(e.to_string()))?;
    decode(reader)
}

/// Decodes a WAV stream from any reader, e.g. an in-memory buffer.
pub fn decode_reader<R: Read>(reader: R) -> Result<WavAudio, TunerError> {
    let reader = hound::WavReader::new(reader)
        .map_err(|e| TunerError::MalformedWav(e.to_string()))?;
    decode(reader)
}

fn decode<R: Read>(reader: hound::WavReader<R>) -> Result<WavAudio, TunerError> {
    let spec = reader.spec();
    let channels = spec.channels as usize;
    if channels == 0 {
        return Err(TunerError::MalformedWav("zero channels".into()));
    }

    let interleaved: Vec<f64> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| {
                s.map(|v| v as f64 / 32768.0)
                    .map_err(|e| TunerError::MalformedWav(e.to_string()))
            })
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .map(|s| {
                s.map(f64::from)
                    .map_err(|e| TunerError::MalformedWav(e.to_string()))
            })
            .collect::<Result<_, _>>()?,
        (format, bits) => {
            return Err(TunerError::UnsupportedWav(format!(
                "{bits}-bit {format:?} samples"
            )))
        }
    };

    // First channel only.
    let samples: Vec<f64> = interleaved.into_iter().step_by(channels).collect();

    debug!(
        sample_rate = spec.sample_rate,
        channels,
        len = samples.len(),
        "decoded wav"
    );

    Ok(WavAudio {
        samples,
        sample_rate: spec.sample_rate,
    })
}

/// Resamples to a target rate.
///
/// Integer ratios decimate; everything else indexes the source at the
/// rate ratio, which is crude but adequate for pitch analysis at the
/// pipeline's bandwidth.
pub fn resample(samples: &[f64], from: u32, to: u32) -> Vec<f64> {
    if from == to || samples.is_empty() {
        return samples.to_vec();
    }

    if from % to == 0 {
        let ratio = (from / to) as usize;
        return samples.iter().step_by(ratio).copied().collect();
    }

    let ratio = from as f64 / to as f64;
    let count = (samples.len() as f64 / ratio) as usize;
    (0..count)
        .map(|i| {
            let index = (i as f64 * ratio) as usize;
            samples[index.min(samples.len() - 1)]
        })
        .collect()
}
