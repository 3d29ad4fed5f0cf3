//! # Offline Analysis Module
//!
//! Runs the whole pipeline over a decoded recording and aggregates the
//! per-frame detections into a stable note report. This is the engine
//! behind the command-line tool; the report serializes directly to the
//! JSON shape it prints.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, info};

use crate::cluster::{ClusterAggregator, DetectedNote};
use crate::detector::{Detector, DetectorConfig};
use crate::temperament::EQUAL;
use crate::wav::{self, WavAudio};
use crate::{A4_REFERENCE, SAMPLE_RATE, STEP};

/// Scale from the decoder's unit samples to the detector's full-scale
/// 16-bit units.
const UNIT_TO_PCM: f64 = 32768.0;

/// Options for one offline analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Reference frequency for A4 in Hz.
    pub reference: f64,
    /// Registry index of the temperament to report against.
    pub temperament: usize,
    /// Key the temperament is transposed to.
    pub key: i32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            reference: A4_REFERENCE,
            temperament: EQUAL,
            key: 0,
        }
    }
}

impl AnalysisOptions {
    pub fn with_reference(reference: f64) -> Self {
        Self {
            reference,
            ..Default::default()
        }
    }
}

/// Report for one analysed file.
///
/// Serializes to either the detection object or the failure object, so
/// callers can hand it straight to a JSON writer.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FileReport {
    Detection {
        valid: bool,
        num_notes: usize,
        notes: Vec<DetectedNote>,
        primary_note: &'static str,
        primary_octave: i32,
        primary_frequency: f64,
        primary_cents: f64,
        num_valid_frames: u32,
    },
    Failure {
        valid: bool,
        error: String,
    },
}

impl FileReport {
    fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            valid: false,
            error: message.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Detection { .. })
    }
}

/// Analyses a WAV file on disk.
pub fn analyze_file(path: &Path, options: &AnalysisOptions) -> FileReport {
    info!(path = %path.display(), "analysing file");
    match wav::decode_file(path) {
        Ok(audio) => analyze_samples(&audio, options),
        Err(e) => FileReport::failure(e.to_string()),
    }
}

/// Analyses decoded audio: resamples to the pipeline rate, drives the
/// detector hop by hop, and aggregates the detections.
pub fn analyze_samples(audio: &WavAudio, options: &AnalysisOptions) -> FileReport {
    let samples = wav::resample(&audio.samples, audio.sample_rate, SAMPLE_RATE);

    let config = DetectorConfig {
        reference: options.reference,
        temperament: options.temperament,
        key: options.key,
        ..Default::default()
    };
    let mut detector = match Detector::new(config) {
        Ok(d) => d,
        Err(e) => return FileReport::failure(e.to_string()),
    };

    let mut aggregator = ClusterAggregator::new();
    let mut hop = vec![0.0; STEP];

    for chunk in samples.chunks_exact(STEP) {
        for (out, &sample) in hop.iter_mut().zip(chunk) {
            *out = sample * UNIT_TO_PCM;
        }
        let result = detector.process(&hop);
        aggregator.add_frame(&result);
    }

    let notes = aggregator.finish(options.reference);
    debug!(
        valid_frames = aggregator.valid_frames(),
        notes = notes.len(),
        "aggregation complete"
    );

    if notes.is_empty() {
        return FileReport::failure("No pitch detected");
    }

    let primary = &notes[0];
    let (primary_note, primary_octave) = (primary.note_name, primary.octave);
    let (primary_frequency, primary_cents) = (primary.frequency, primary.cents);

    FileReport::Detection {
        valid: true,
        num_notes: notes.len(),
        primary_note,
        primary_octave,
        primary_frequency,
        primary_cents,
        num_valid_frames: aggregator.valid_frames(),
        notes,
    }
}
