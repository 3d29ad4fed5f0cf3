//! Error taxonomy for the analysis core.
//!
//! Input-shape and configuration problems are the only failures the
//! library reports; numerical non-values on edge inputs are absorbed
//! by the pipeline as invalid frames and never surface as errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TunerError {
    /// The WAV container uses a sample format the decoder does not handle.
    #[error("unsupported WAV format: {0}")]
    UnsupportedWav(String),

    /// The WAV container is damaged or not a RIFF/WAVE file at all.
    #[error("malformed WAV data: {0}")]
    MalformedWav(String),

    /// A constructor argument makes the pipeline unable to start.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A custom tuning record failed validation.
    #[error("invalid tuning: {0}")]
    InvalidTuning(String),
}
