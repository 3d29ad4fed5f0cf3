//! # Audio Capture Module
//!
//! This module handles real-time audio capture using CPAL (Cross-Platform
//! Audio Library). It selects an input device, configures a mono stream
//! near the pipeline sample rate, and delivers hop-sized frames to the
//! analysis thread over a channel.
//!
//! ## Features
//! - Automatic audio device selection
//! - Configuration chosen closest to the 11 025 Hz pipeline rate
//! - Rebuffering of arbitrary callback sizes into fixed hops
//! - Conversion to the detector's full-scale 16-bit sample units

use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::Sender;
use tracing::{info, warn};

use crate::{SAMPLE_RATE, STEP};

/// Scale from unit float samples to the detector's units.
const UNIT_TO_PCM: f64 = 32768.0;

/// Starts audio capture from the default input device.
///
/// This function:
/// 1. Selects the default audio input device
/// 2. Picks the supported mono f32 configuration nearest the pipeline rate
/// 3. Streams hop-sized sample frames to the analysis thread
///
/// Frames are `STEP` samples long, already converted to the detector's
/// units. If the device cannot run at the pipeline rate the caller must
/// resample; the actual rate is returned alongside the stream.
///
/// # Arguments
/// * `sender` - Channel sender for streaming frames to the analysis thread
///
/// # Returns
/// * `Ok((stream, sample_rate))` - Audio stream handle and actual rate
/// * `Err(e)` - Error if audio setup fails
pub fn start_capture(sender: Sender<Vec<f64>>) -> Result<(cpal::Stream, u32)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("No input device available"))?;

    let device_name = device.name()?;
    info!(device = %device_name, "using audio input device");

    let configs = device.supported_input_configs()?.collect::<Vec<_>>();
    let supported_config = find_supported_config(configs, SAMPLE_RATE)
        .ok_or_else(|| anyhow!("No suitable f32 input format found"))?;

    let sample_rate = supported_config
        .clone()
        .try_with_sample_rate(cpal::SampleRate(SAMPLE_RATE))
        .unwrap_or_else(|| supported_config.with_max_sample_rate());

    let rate = sample_rate.sample_rate().0;
    if rate != SAMPLE_RATE {
        warn!(rate, "device does not support the pipeline rate; resample before analysis");
    }

    let config: cpal::StreamConfig = sample_rate.into();
    let err_fn = |err| warn!("audio stream error: {err}");

    // Accumulates callback data until full hops are available.
    let mut pending: Vec<f64> = Vec::with_capacity(STEP * 2);

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            pending.extend(data.iter().map(|&s| s as f64 * UNIT_TO_PCM));

            while pending.len() >= STEP {
                let frame: Vec<f64> = pending[..STEP].to_vec();

                // Drop frames rather than block the audio callback.
                let _ = sender.try_send(frame);

                pending.drain(..STEP);
            }
        },
        err_fn,
        None,
    )?;

    stream.play()?;

    Ok((stream, rate))
}

/// Finds the best supported audio configuration for the target rate.
///
/// Filters for mono 32-bit float input and picks the configuration whose
/// supported rate range lies closest to the target.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.channels() == 1 && c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let min_diff = (c.min_sample_rate().0 as i64 - target_rate as i64).abs();
            let max_diff = (c.max_sample_rate().0 as i64 - target_rate as i64).abs();
            min_diff.min(max_diff)
        })
}
