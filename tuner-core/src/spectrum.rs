//! # Spectrum Refinement Module
//!
//! Phase-vocoder frequency refinement and the optional harmonic product
//! spectrum. Both operate on the per-hop spectrum frame produced by the
//! FFT front end.
//!
//! The phase vocoder compares each bin's phase against the previous hop;
//! the residual after removing the expected advance, folded into a single
//! interval, yields a sub-bin frequency estimate with resolution
//! proportional to the overlap factor.

use crate::{EXPECT, FPS, OVERSAMPLE, RANGE};

/// Per-hop spectrum data: magnitude, refined frequency, and the
/// first-difference of magnitude used for peak detection. The three
/// arrays are index-aligned; entry `i` of each describes bin `i` of the
/// same hop.
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub magnitude: Vec<f64>,
    pub frequency: Vec<f64>,
    pub derivative: Vec<f64>,
}

impl Default for SpectrumFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectrumFrame {
    pub fn new() -> Self {
        Self {
            magnitude: vec![0.0; RANGE],
            frequency: vec![0.0; RANGE],
            derivative: vec![0.0; RANGE],
        }
    }
}

/// Folds a phase residual into the principal interval.
///
/// The quotient of the residual by pi is truncated and then pushed away
/// from zero to the nearest even integer; subtracting that many half
/// turns folds whole cycles out of the residual. Truncate-then-even is
/// load-bearing: ordinary rounding lands one bin off near the fold
/// points.
pub(crate) fn fold_phase(dp: f64) -> f64 {
    let mut qpd = (dp / std::f64::consts::PI) as i64;
    if qpd >= 0 {
        qpd += qpd & 1;
    } else {
        qpd -= qpd & 1;
    }
    dp - std::f64::consts::PI * qpd as f64
}

/// Refines per-bin frequencies from the phase difference across hops.
///
/// For every usable bin the previous hop's phase is consumed and
/// replaced with the current one, so each stored phase is used exactly
/// once. The magnitude derivative is recomputed alongside.
///
/// # Arguments
/// * `frame` - Spectrum frame whose magnitudes are already filled in
/// * `phase` - Current hop's phases, length `RANGE`
/// * `prev_phase` - Phase memory from the previous hop, updated in place
pub fn refine(frame: &mut SpectrumFrame, phase: &[f64], prev_phase: &mut [f64]) {
    for i in 1..RANGE {
        let mut dp = prev_phase[i] - phase[i];
        prev_phase[i] = phase[i];

        dp -= i as f64 * EXPECT;
        let dp = fold_phase(dp);

        let df = OVERSAMPLE as f64 * dp / (2.0 * std::f64::consts::PI);
        frame.frequency[i] = i as f64 * FPS + df * FPS;

        frame.derivative[i] = frame.magnitude[i] - frame.magnitude[i - 1];
    }
}

/// Harmonic product spectrum accumulator.
///
/// Builds four downsampled copies of the magnitude array by summing
/// groups of 2, 3, 4, and 5 adjacent bins, then multiplies the original
/// magnitudes by all four. Bins whose integer multiples also carry
/// energy are reinforced, which pushes the fundamental above its
/// harmonics at the cost of spectral resolution. Bin 0 is untouched;
/// bins beyond the shortest downsampled array are zeroed.
pub struct HarmonicProduct {
    ds2: Vec<f64>,
    ds3: Vec<f64>,
    ds4: Vec<f64>,
    ds5: Vec<f64>,
}

impl Default for HarmonicProduct {
    fn default() -> Self {
        Self::new()
    }
}

impl HarmonicProduct {
    pub fn new() -> Self {
        Self {
            ds2: vec![0.0; RANGE / 2],
            ds3: vec![0.0; RANGE / 3],
            ds4: vec![0.0; RANGE / 4],
            ds5: vec![0.0; RANGE / 5],
        }
    }

    /// Applies the harmonic product to a frame and recomputes the
    /// magnitude derivative.
    pub fn apply(&mut self, frame: &mut SpectrumFrame) {
        let mag = &mut frame.magnitude;

        for (i, out) in self.ds2.iter_mut().enumerate() {
            *out = mag[i * 2] + mag[i * 2 + 1];
        }
        for (i, out) in self.ds3.iter_mut().enumerate() {
            *out = mag[i * 3] + mag[i * 3 + 1] + mag[i * 3 + 2];
        }
        for (i, out) in self.ds4.iter_mut().enumerate() {
            *out = mag[i * 4] + mag[i * 4 + 1] + mag[i * 4 + 2] + mag[i * 4 + 3];
        }
        for (i, out) in self.ds5.iter_mut().enumerate() {
            *out = mag[i * 5] + mag[i * 5 + 1] + mag[i * 5 + 2] + mag[i * 5 + 3] + mag[i * 5 + 4];
        }

        for i in 1..RANGE {
            mag[i] *= if i < self.ds2.len() { self.ds2[i] } else { 0.0 };
            mag[i] *= if i < self.ds3.len() { self.ds3[i] } else { 0.0 };
            mag[i] *= if i < self.ds4.len() { self.ds4[i] } else { 0.0 };
            mag[i] *= if i < self.ds5.len() { self.ds5[i] } else { 0.0 };

            frame.derivative[i] = mag[i] - mag[i - 1];
        }
    }
}
