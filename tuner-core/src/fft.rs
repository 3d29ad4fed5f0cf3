//! # Fast Fourier Transform (FFT) Module
//!
//! This module provides the spectral front end of the analysis pipeline.
//! It handles windowing, normalisation, the forward transform, and the
//! extraction of per-bin magnitude and phase for the phase vocoder.
//!
//! ## Features
//! - High-performance FFT using RustFFT with a 64-bit planner
//! - Hann windowing for reduced spectral leakage
//! - DC bin removal for accurate low-frequency analysis
//! - Fixed output scaling shared with the peak thresholds

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::{FFT_SCALE, RANGE, SAMPLES};

/// Spectral analyser holding the planned FFT, the window table, and the
/// scratch buffer reused every hop.
pub struct FftAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    window: Vec<f64>,
    scratch: Vec<Complex<f64>>,
}

impl Default for FftAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl FftAnalyzer {
    /// Plans the forward transform and precomputes the Hann window.
    pub fn new() -> Self {
        debug_assert!(SAMPLES.is_power_of_two());

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(SAMPLES);

        let window = (0..SAMPLES)
            .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / SAMPLES as f64).cos())
            .collect();

        Self {
            fft,
            window,
            scratch: vec![Complex::new(0.0, 0.0); SAMPLES],
        }
    }

    /// Transforms one buffer of samples into magnitude and phase arrays.
    ///
    /// The input is divided by `norm`, windowed, and transformed; the DC
    /// bin is zeroed and every bin is divided by the fixed output scale
    /// before magnitude and phase are taken. Only the usable bin range is
    /// written; index 0 of both outputs is zero.
    ///
    /// # Arguments
    /// * `buffer` - The most recent `SAMPLES` audio samples
    /// * `norm` - Normalisation divisor from the running peak tracker
    /// * `magnitude` - Output magnitudes, length `RANGE`
    /// * `phase` - Output phases in radians, length `RANGE`
    ///
    /// # Returns
    /// * The largest absolute sample value seen, for the next frame's
    ///   normalisation divisor
    pub fn transform(
        &mut self,
        buffer: &[f64],
        norm: f64,
        magnitude: &mut [f64],
        phase: &mut [f64],
    ) -> f64 {
        debug_assert_eq!(buffer.len(), SAMPLES);
        debug_assert_eq!(magnitude.len(), RANGE);
        debug_assert_eq!(phase.len(), RANGE);

        let mut dmax: f64 = 0.0;

        for i in 0..SAMPLES {
            let sample = buffer[i];
            if dmax < sample.abs() {
                dmax = sample.abs();
            }
            self.scratch[i] = Complex::new(sample / norm * self.window[i], 0.0);
        }

        self.fft.process(&mut self.scratch);

        // Remove DC
        self.scratch[0] = Complex::new(0.0, 0.0);

        magnitude[0] = 0.0;
        phase[0] = 0.0;

        for i in 1..RANGE {
            let real = self.scratch[i].re / FFT_SCALE;
            let imag = self.scratch[i].im / FFT_SCALE;

            magnitude[i] = real.hypot(imag);
            phase[i] = imag.atan2(real);
        }

        dmax
    }
}
