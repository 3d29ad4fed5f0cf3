//! # Frame Driver Module
//!
//! Owns every piece of state the analysis pipeline needs between hops:
//! the sample ring, the phase memory, the low-pass taps, the running
//! normalisation peak, and the display hold-off. Each call to
//! [`Detector::process`] consumes one hop of samples and runs the whole
//! chain: window + FFT, phase-vocoder refinement, optional harmonic
//! product, peak picking, and the note decision.
//!
//! The driver is single-threaded and never blocks; the caller decides
//! which thread feeds it. Consumers read the last exposed result, which
//! survives brief dropouts and can be frozen with the display lock.

use tracing::debug;

use crate::error::TunerError;
use crate::fft::FftAnalyzer;
use crate::filter::{LowPass, NoteFilter};
use crate::pitch;
use crate::settings::Settings;
use crate::spectrum::{self, HarmonicProduct, SpectrumFrame};
use crate::temperament::{Temperament, TemperamentRegistry, BUILT_IN_COUNT, EQUAL};
use crate::{PitchResult, SpectrumMarks, RANGE, SAMPLES, STEP};

/// Normalisation divisor floor, in full-scale 16-bit units. Keeps the
/// normaliser from blowing up on near-silence.
const NORM_FLOOR: f64 = 4096.0;

/// Consecutive invalid frames before the exposed result is cleared.
const HOLD_OFF_FRAMES: u32 = 16;

/// Analysis configuration, fixed at detector construction.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Reference frequency for A4 in Hz.
    pub reference: f64,
    /// Registry index of the active temperament.
    pub temperament: usize,
    /// Key the temperament is transposed to, 0 (C) through 11 (B).
    pub key: i32,
    /// Whether the low-pass prefilter runs on incoming samples.
    pub filter: bool,
    /// Restrict later peaks to the first peak's pitch class.
    pub fundamental_filter: bool,
    /// Pitch-class and octave masks for the peak picker.
    pub note_filter: NoteFilter,
    /// Whether the harmonic product spectrum sharpens the magnitudes.
    pub harmonic_product: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            reference: crate::A4_REFERENCE,
            temperament: EQUAL,
            key: 0,
            filter: false,
            fundamental_filter: false,
            note_filter: NoteFilter::default(),
            harmonic_product: false,
        }
    }
}

impl DetectorConfig {
    /// Builds an analysis configuration from persisted settings.
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            reference: settings.reference,
            filter: settings.filter,
            ..Default::default()
        }
    }

    fn validate(&self) -> Result<(), TunerError> {
        if !self.reference.is_finite() || self.reference <= 0.0 {
            return Err(TunerError::InvalidConfig(format!(
                "reference frequency must be positive, got {}",
                self.reference
            )));
        }
        if !(0..crate::OCTAVE).contains(&self.key) {
            return Err(TunerError::InvalidConfig(format!(
                "key must be a pitch class 0..11, got {}",
                self.key
            )));
        }
        Ok(())
    }
}

/// The analysis pipeline with all of its inter-hop state.
pub struct Detector {
    config: DetectorConfig,
    registry: TemperamentRegistry,

    buffer: Vec<f64>,
    phase: Vec<f64>,
    prev_phase: Vec<f64>,
    frame: SpectrumFrame,

    fft: FftAnalyzer,
    harmonic: HarmonicProduct,
    low_pass: LowPass,

    dmax: f64,
    hold_off: u32,

    /// When set by the consumer, newly computed results no longer
    /// replace the exposed one.
    pub display_lock: bool,

    exposed: PitchResult,
    marks: SpectrumMarks,
}

impl Detector {
    /// Creates a detector with the built-in temperaments only.
    pub fn new(config: DetectorConfig) -> Result<Self, TunerError> {
        Self::with_registry(config, TemperamentRegistry::new())
    }

    /// Creates a detector with a caller-provided temperament registry,
    /// typically one that already carries custom tunings.
    pub fn with_registry(
        config: DetectorConfig,
        registry: TemperamentRegistry,
    ) -> Result<Self, TunerError> {
        config.validate()?;
        if config.temperament >= registry.len() {
            return Err(TunerError::InvalidConfig(format!(
                "temperament index {} out of range ({} known)",
                config.temperament,
                registry.len()
            )));
        }

        debug!(
            reference = config.reference,
            temperament = config.temperament,
            "detector ready"
        );

        Ok(Self {
            config,
            registry,
            buffer: vec![0.0; SAMPLES],
            phase: vec![0.0; RANGE],
            prev_phase: vec![0.0; RANGE],
            frame: SpectrumFrame::new(),
            fft: FftAnalyzer::new(),
            harmonic: HarmonicProduct::new(),
            low_pass: LowPass::new(),
            dmax: 0.0,
            hold_off: 0,
            display_lock: false,
            exposed: PitchResult::default(),
            marks: SpectrumMarks::default(),
        })
    }

    /// Consumes one hop of samples and returns the frame's result.
    ///
    /// Samples are in full-scale 16-bit units. At most [`STEP`] samples
    /// are taken per call; the ring keeps the most recent [`SAMPLES`].
    /// The returned result is the raw per-frame outcome; the exposed
    /// display result additionally honours the lock and hold-off rules.
    pub fn process(&mut self, samples: &[f64]) -> PitchResult {
        let take = samples.len().min(STEP);

        // Shift the ring and append the new hop, filtered or raw.
        self.buffer.copy_within(take.., 0);
        let tail = SAMPLES - take;
        for (i, &sample) in samples[..take].iter().enumerate() {
            let filtered = self.low_pass.process(sample);
            self.buffer[tail + i] = if self.config.filter { filtered } else { sample };
        }

        // Normalise by the previous frame's peak, floored.
        if self.dmax < NORM_FLOOR {
            self.dmax = NORM_FLOOR;
        }
        let norm = self.dmax;

        self.dmax = self
            .fft
            .transform(&self.buffer, norm, &mut self.frame.magnitude, &mut self.phase);

        spectrum::refine(&mut self.frame, &self.phase, &mut self.prev_phase);

        if self.config.harmonic_product {
            self.harmonic.apply(&mut self.frame);
        }

        let scan = pitch::find_peaks(&self.frame, &self.config, &self.registry);
        let (result, marks) = pitch::decide(&scan, &self.config, &self.registry);

        if !self.display_lock {
            if result.valid {
                self.hold_off = 0;
                self.exposed = result.clone();
                self.marks = marks;
            } else {
                self.hold_off += 1;
                if self.hold_off > HOLD_OFF_FRAMES {
                    self.exposed = PitchResult::default();
                    self.marks = SpectrumMarks::default();
                }
            }
        }

        result
    }

    /// Last exposed result, after lock and hold-off filtering.
    pub fn exposed(&self) -> &PitchResult {
        &self.exposed
    }

    /// Spectrum marker positions matching the exposed result.
    pub fn spectrum_marks(&self) -> SpectrumMarks {
        self.marks
    }

    /// Magnitude spectrum of the most recent frame.
    pub fn magnitudes(&self) -> &[f64] {
        &self.frame.magnitude
    }

    /// The temperament registry backing this detector.
    pub fn registry(&self) -> &TemperamentRegistry {
        &self.registry
    }

    /// Adds a custom temperament, returning its registry index.
    pub fn add_custom_temperament(&mut self, temperament: Temperament) -> usize {
        self.registry.add_custom(temperament)
    }

    /// Selects the active temperament and key.
    pub fn set_temperament(&mut self, index: usize, key: i32) -> Result<(), TunerError> {
        if index >= self.registry.len() {
            return Err(TunerError::InvalidConfig(format!(
                "temperament index {index} out of range"
            )));
        }
        if !(0..crate::OCTAVE).contains(&key) {
            return Err(TunerError::InvalidConfig(format!(
                "key must be a pitch class 0..11, got {key}"
            )));
        }
        self.config.temperament = index;
        self.config.key = key;
        Ok(())
    }

    /// Number of built-in temperaments (immutable registry prefix).
    pub fn builtin_temperaments(&self) -> usize {
        BUILT_IN_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SAMPLE_RATE;

    fn tone(frequency: f64, amplitude: f64, samples: usize) -> Vec<f64> {
        (0..samples)
            .map(|i| {
                amplitude
                    * 32768.0
                    * (2.0 * std::f64::consts::PI * frequency * i as f64 / SAMPLE_RATE as f64).sin()
            })
            .collect()
    }

    fn feed(detector: &mut Detector, samples: &[f64]) -> PitchResult {
        let mut last = PitchResult::default();
        for hop in samples.chunks_exact(STEP) {
            last = detector.process(hop);
        }
        last
    }

    #[test]
    fn rejects_bad_reference() {
        let config = DetectorConfig {
            reference: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            Detector::new(config),
            Err(TunerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_unknown_temperament_index() {
        let config = DetectorConfig {
            temperament: 99,
            ..Default::default()
        };
        assert!(Detector::new(config).is_err());
    }

    #[test]
    fn detects_a4_in_a_steady_tone() {
        let mut detector = Detector::new(DetectorConfig::default()).unwrap();
        let samples = tone(440.0, 0.5, SAMPLE_RATE as usize * 2);
        let result = feed(&mut detector, &samples);

        assert!(result.valid);
        assert_eq!(result.note_name, "A");
        assert_eq!(result.octave, 4);
        assert!(result.cents.abs() < 2.0, "cents {}", result.cents);
        assert!((result.frequency - 440.0).abs() < 1.0);
    }

    #[test]
    fn results_are_deterministic() {
        let samples = tone(329.63, 0.4, SAMPLE_RATE as usize);

        let mut a = Detector::new(DetectorConfig::default()).unwrap();
        let mut b = Detector::new(DetectorConfig::default()).unwrap();
        let result_a = feed(&mut a, &samples);
        let result_b = feed(&mut b, &samples);

        assert_eq!(result_a.valid, result_b.valid);
        assert_eq!(result_a.frequency, result_b.frequency);
        assert_eq!(result_a.cents, result_b.cents);
    }

    #[test]
    fn hold_off_clears_the_exposed_result() {
        let mut detector = Detector::new(DetectorConfig::default()).unwrap();
        feed(&mut detector, &tone(440.0, 0.5, SAMPLE_RATE as usize));
        assert!(detector.exposed().valid);

        // A short dropout keeps the last result on display.
        let silence = vec![0.0; STEP];
        for _ in 0..HOLD_OFF_FRAMES {
            detector.process(&silence);
        }
        assert!(detector.exposed().valid);

        // A long one clears it.
        for _ in 0..(SAMPLES / STEP + HOLD_OFF_FRAMES as usize) {
            detector.process(&silence);
        }
        assert!(!detector.exposed().valid);
        assert_eq!(detector.spectrum_marks(), SpectrumMarks::default());
    }

    #[test]
    fn display_lock_freezes_the_exposed_result() {
        let mut detector = Detector::new(DetectorConfig::default()).unwrap();
        feed(&mut detector, &tone(440.0, 0.5, SAMPLE_RATE as usize));
        let frozen = detector.exposed().frequency;

        detector.display_lock = true;
        feed(&mut detector, &tone(523.25, 0.5, SAMPLE_RATE as usize * 2));
        assert_eq!(detector.exposed().frequency, frozen);

        detector.display_lock = false;
        feed(&mut detector, &tone(523.25, 0.5, SAMPLE_RATE as usize));
        assert_eq!(detector.exposed().note_name, "C");
    }

    #[test]
    fn silence_stays_invalid() {
        let mut detector = Detector::new(DetectorConfig::default()).unwrap();
        let result = feed(&mut detector, &vec![0.0; SAMPLE_RATE as usize]);
        assert!(!result.valid);
        assert!(result.peaks.is_empty());
    }
}
