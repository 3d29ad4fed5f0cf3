//! # Pitch Detection Module
//!
//! Peak selection and the final note decision. The picker walks the
//! refined spectrum in bin order collecting local maxima under the
//! amplitude and filter rules; the decision stage turns the resulting
//! peak list into a note, reference frequency, and cent deviation.
//!
//! ## Features
//! - Local-maximum detection with amplitude and derivative-sign rules
//! - Fundamental and note/octave filtering
//! - Search window clamped one octave above the first accepted peak
//! - Reference snapping so the displayed frequency lands on a real peak

use crate::detector::DetectorConfig;
use crate::spectrum::SpectrumFrame;
use crate::temperament::TemperamentRegistry;
use crate::{tuning, Peak, PitchResult, SpectrumMarks, FPS, MAXIMA, MIN_AMPLITUDE, RANGE};

/// Outcome of one pass over the spectrum.
#[derive(Debug, Clone, Default)]
pub struct PeakScan {
    /// Accepted peaks in bin order, at most [`MAXIMA`] of them.
    pub peaks: Vec<Peak>,
    /// Largest magnitude among bins that passed the filters.
    pub max_magnitude: f64,
}

/// Scans a spectrum frame for peaks.
///
/// A bin is accepted when its magnitude exceeds the fixed floor and a
/// quarter of the running maximum, and the magnitude derivative changes
/// sign across it. Unless the harmonic product spectrum is active, the
/// first accepted peak clamps the search window just below the octave
/// above it, which biases selection strongly toward the fundamental.
pub fn find_peaks(
    frame: &SpectrumFrame,
    config: &DetectorConfig,
    registry: &TemperamentRegistry,
) -> PeakScan {
    let mut scan = PeakScan::default();
    let mut limit = RANGE - 1;

    let mut i = 1;
    while i < limit {
        let frequency = frame.frequency[i];

        let semitones = tuning::semitones_above_reference(config.reference, frequency);
        if !semitones.is_finite() {
            i += 1;
            continue;
        }

        let note = tuning::note_number(semitones);
        if note < 0 {
            i += 1;
            continue;
        }

        // Fundamental filter: once a peak exists, only its pitch class passes.
        if config.fundamental_filter
            && !scan.peaks.is_empty()
            && note % crate::OCTAVE != scan.peaks[0].note % crate::OCTAVE
        {
            i += 1;
            continue;
        }

        if !config.note_filter.accepts(note) {
            i += 1;
            continue;
        }

        if frame.magnitude[i] > scan.max_magnitude {
            scan.max_magnitude = frame.magnitude[i];
        }

        if scan.peaks.len() < MAXIMA
            && frame.magnitude[i] > MIN_AMPLITUDE
            && frame.magnitude[i] > scan.max_magnitude / 4.0
            && frame.derivative[i] > 0.0
            && frame.derivative[i + 1] < 0.0
        {
            let adjust = registry.adjustment(config.temperament, note, config.key);
            let ref_frequency = tuning::reference_frequency(config.reference, semitones, adjust);

            scan.peaks.push(Peak {
                frequency,
                ref_frequency,
                note,
            });

            if !config.harmonic_product && limit > i * 2 {
                limit = i * 2 - 1;
            }
        }

        i += 1;
    }

    scan
}

/// Decides the frame's note and cent deviation from a peak scan.
///
/// The first peak fixes the candidate note and its reference frequency;
/// among all peaks, the one closest to that reference becomes the final
/// frequency. Frames whose deviation is not finite or exceeds 50 cents
/// come back invalid, carrying the peak list but no note.
pub fn decide(
    scan: &PeakScan,
    config: &DetectorConfig,
    registry: &TemperamentRegistry,
) -> (PitchResult, SpectrumMarks) {
    let mut result = PitchResult {
        peaks: scan.peaks.clone(),
        ..Default::default()
    };
    let marks = SpectrumMarks::default();

    if scan.peaks.is_empty() || scan.max_magnitude <= MIN_AMPLITUDE {
        return (result, marks);
    }

    // The first peak is the fundamental candidate.
    let mut frequency = scan.peaks[0].frequency;

    let semitones = tuning::semitones_above_reference(config.reference, frequency);
    if !semitones.is_finite() {
        return (result, marks);
    }

    let note = tuning::note_number(semitones);
    if note < 0 {
        return (result, marks);
    }

    let adjust = registry.adjustment(config.temperament, note, config.key);
    let ref_frequency = tuning::reference_frequency(config.reference, semitones, adjust);
    let (low, high) = tuning::band_edges(config.reference, semitones, adjust);

    // Snap to the peak nearest the reference note.
    let mut distance = 1000.0;
    for peak in &scan.peaks {
        if (peak.frequency - ref_frequency).abs() < distance {
            distance = (peak.frequency - ref_frequency).abs();
            frequency = peak.frequency;
        }
    }

    let cents = tuning::cents_deviation(frequency, ref_frequency);
    if !cents.is_finite() || cents.abs() > 50.0 {
        return (result, marks);
    }

    result.valid = true;
    result.frequency = frequency;
    result.ref_frequency = ref_frequency;
    result.cents = cents;
    result.note = note;
    result.octave = tuning::octave(note);
    result.note_name = tuning::note_name(note);
    result.confidence = scan.max_magnitude;

    let marks = SpectrumMarks {
        frequency: frequency / FPS,
        reference: ref_frequency / FPS,
        low: low / FPS,
        high: high / FPS,
    };

    (result, marks)
}
