//! # Musical Tuning Module
//!
//! This module provides the note arithmetic shared by the whole pipeline.
//! It handles note name lookups, note number conversions, and cent
//! deviation measurements against a configurable reference pitch.
//!
//! ## Features
//! - Chromatic note naming (C, C#, D, Eb, E, F, F#, G, Ab, A, Bb, B)
//! - Note numbers with C0 = 0, so A4 sits at 57
//! - Cent deviation calculations for tuning accuracy
//! - Temperament-adjusted reference frequency computation

use crate::{C5_OFFSET, OCTAVE};

/// Pitch class names, flats spelled the way wind and reed players expect.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "Eb", "E", "F", "F#", "G", "Ab", "A", "Bb", "B",
];

/// Semitones of a frequency above the reference pitch.
///
/// This is the `cf` value the detector works in: 0.0 for the reference
/// itself, positive above it, negative below. Non-finite results occur
/// for zero or negative frequencies and must be handled by the caller.
///
/// # Arguments
/// * `reference` - Reference frequency for A4 in Hz
/// * `frequency` - Measured frequency in Hz
pub fn semitones_above_reference(reference: f64, frequency: f64) -> f64 {
    -12.0 * (reference / frequency).log2()
}

/// Converts a semitone offset from the reference into a note number.
///
/// Uses arithmetic rounding (half away from zero), then shifts so that
/// C0 = 0. The result is negative for frequencies far below C0 and must
/// be rejected by the caller.
pub fn note_number(semitones: f64) -> i32 {
    semitones.round() as i32 + C5_OFFSET
}

/// Name of a note's pitch class.
pub fn note_name(note: i32) -> &'static str {
    NOTE_NAMES[(note % OCTAVE) as usize]
}

/// Octave number of a note (C0 = octave 0).
pub fn octave(note: i32) -> i32 {
    note / OCTAVE
}

/// Reference frequency of the note nearest to a semitone offset.
///
/// # Arguments
/// * `reference` - Reference frequency for A4 in Hz
/// * `semitones` - Offset from the reference as returned by
///   [`semitones_above_reference`]
/// * `adjust` - Temperament adjustment factor, 1.0 under equal temperament
pub fn reference_frequency(reference: f64, semitones: f64, adjust: f64) -> f64 {
    reference * 2.0_f64.powf(semitones.round() / 12.0) * adjust
}

/// Lower and upper band edges around the nearest note, at ±0.55 semitones.
///
/// Used by spectrum displays to shade the capture band of the current note.
pub fn band_edges(reference: f64, semitones: f64, adjust: f64) -> (f64, f64) {
    let low = reference * 2.0_f64.powf((semitones.round() - 0.55) / 12.0) * adjust;
    let high = reference * 2.0_f64.powf((semitones.round() + 0.55) / 12.0) * adjust;
    (low, high)
}

/// Deviation of a frequency from a reference note in cents.
///
/// Positive values indicate sharpness, negative values flatness.
pub fn cents_deviation(frequency: f64, ref_frequency: f64) -> f64 {
    -12.0 * (ref_frequency / frequency).log2() * 100.0
}
