//! # Frequency Cluster Aggregator
//!
//! Merges per-frame peak detections from a whole recording into a stable
//! set of notes. Per-frame peak choice jitters across harmonics on
//! sustained polyphonic content; clustering by frequency recovers the
//! set of tones that were actually sounding, including reeds detuned by
//! only a few cents.

use serde::Serialize;

use crate::{tuning, PitchResult, MAXIMA};

/// Frequencies within this distance of a cluster's running mean join it.
pub const CLUSTER_THRESHOLD_HZ: f64 = 1.5;

/// Fixed arena size; recordings never need more simultaneous clusters.
pub const MAX_CLUSTERS: usize = 64;

/// A cluster is dropped when its mean lands within this distance of 2 or
/// 3 times an already kept cluster's mean. Octaves and twelfths only;
/// fifths are legitimate co-sounding notes and pass through.
const HARMONIC_TOLERANCE: f64 = 0.05;

/// Running mean of one group of nearby peak frequencies.
#[derive(Debug, Clone, Copy)]
struct Cluster {
    freq_sum: f64,
    cents_sum: f64,
    count: u32,
}

impl Cluster {
    fn mean_frequency(&self) -> f64 {
        self.freq_sum / self.count as f64
    }
}

/// A note that survived aggregation, ready for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedNote {
    pub note_name: &'static str,
    pub octave: i32,
    pub frequency: f64,
    pub cents: f64,
}

/// Accumulates peaks frame by frame, then emits the stable note list.
#[derive(Debug, Default)]
pub struct ClusterAggregator {
    clusters: Vec<Cluster>,
    valid_frames: u32,
}

impl ClusterAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of valid frames folded in so far.
    pub fn valid_frames(&self) -> u32 {
        self.valid_frames
    }

    /// Folds one frame's peaks into the clusters. Invalid frames are
    /// ignored entirely.
    pub fn add_frame(&mut self, result: &PitchResult) {
        if !result.valid {
            return;
        }
        self.valid_frames += 1;

        for peak in &result.peaks {
            let found = self
                .clusters
                .iter()
                .position(|c| (peak.frequency - c.mean_frequency()).abs() < CLUSTER_THRESHOLD_HZ);

            match found {
                Some(index) => {
                    let cluster = &mut self.clusters[index];
                    cluster.freq_sum += peak.frequency;
                    cluster.cents_sum += peak.cents();
                    cluster.count += 1;
                }
                None if self.clusters.len() < MAX_CLUSTERS => {
                    self.clusters.push(Cluster {
                        freq_sum: peak.frequency,
                        cents_sum: peak.cents(),
                        count: 1,
                    });
                }
                None => {}
            }
        }
    }

    /// Emits the stable notes: clusters present in at least a quarter of
    /// the valid frames, ordered by mean frequency, with octave and
    /// twelfth harmonics of kept notes removed. The first entry is the
    /// lowest surviving frequency, taken as the recording's fundamental.
    pub fn finish(&self, reference: f64) -> Vec<DetectedNote> {
        let mut detected: Vec<DetectedNote> = Vec::with_capacity(MAXIMA);

        for cluster in &self.clusters {
            if detected.len() >= MAXIMA {
                break;
            }
            if cluster.count < self.valid_frames / 4 {
                continue;
            }

            let frequency = cluster.mean_frequency();
            let semitones = tuning::semitones_above_reference(reference, frequency);
            if !semitones.is_finite() {
                continue;
            }
            let note = tuning::note_number(semitones);
            if note < 0 {
                continue;
            }

            detected.push(DetectedNote {
                note_name: tuning::note_name(note),
                octave: tuning::octave(note),
                frequency,
                cents: cluster.cents_sum / cluster.count as f64,
            });
        }

        detected.sort_by(|a, b| a.frequency.total_cmp(&b.frequency));

        let mut kept: Vec<DetectedNote> = Vec::with_capacity(detected.len());
        for note in detected {
            let harmonic = kept.iter().any(|k| {
                let ratio = note.frequency / k.frequency;
                (ratio - 2.0).abs() < HARMONIC_TOLERANCE || (ratio - 3.0).abs() < HARMONIC_TOLERANCE
            });
            if !harmonic {
                kept.push(note);
            }
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Peak;

    fn frame(frequencies: &[f64]) -> PitchResult {
        let peaks = frequencies
            .iter()
            .map(|&frequency| Peak {
                frequency,
                ref_frequency: 440.0,
                note: 57,
            })
            .collect();
        PitchResult {
            valid: true,
            peaks,
            ..Default::default()
        }
    }

    #[test]
    fn nearby_frequencies_share_a_cluster() {
        let mut agg = ClusterAggregator::new();
        for _ in 0..8 {
            agg.add_frame(&frame(&[440.0]));
            agg.add_frame(&frame(&[440.8]));
        }
        let notes = agg.finish(440.0);
        assert_eq!(notes.len(), 1);
        assert!((notes[0].frequency - 440.4).abs() < 0.1);
    }

    #[test]
    fn distant_frequencies_split() {
        let mut agg = ClusterAggregator::new();
        for _ in 0..8 {
            agg.add_frame(&frame(&[440.0, 442.0]));
        }
        let notes = agg.finish(440.0);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].note_name, "A");
        assert_eq!(notes[1].note_name, "A");
        assert!(notes[0].frequency < notes[1].frequency);
    }

    #[test]
    fn rare_clusters_are_discarded() {
        let mut agg = ClusterAggregator::new();
        for _ in 0..20 {
            agg.add_frame(&frame(&[440.0]));
        }
        // One stray detection out of 21 valid frames.
        agg.add_frame(&frame(&[440.0, 600.0]));

        let notes = agg.finish(440.0);
        assert_eq!(notes.len(), 1);
        assert!((notes[0].frequency - 440.0).abs() < 0.01);
    }

    #[test]
    fn octave_and_twelfth_harmonics_are_filtered() {
        let mut agg = ClusterAggregator::new();
        for _ in 0..8 {
            agg.add_frame(&frame(&[220.0, 440.0, 660.0]));
        }
        let notes = agg.finish(440.0);

        // 440 is twice 220 and gets dropped; 660 is three times 220 and
        // gets dropped too.
        assert_eq!(notes.len(), 1);
        assert!((notes[0].frequency - 220.0).abs() < 0.01);
    }

    #[test]
    fn fifths_survive_the_harmonic_filter() {
        let mut agg = ClusterAggregator::new();
        for _ in 0..8 {
            agg.add_frame(&frame(&[440.0, 659.26]));
        }
        let notes = agg.finish(440.0);
        assert_eq!(notes.len(), 2);
    }

    #[test]
    fn invalid_frames_do_not_count() {
        let mut agg = ClusterAggregator::new();
        agg.add_frame(&PitchResult::default());
        assert_eq!(agg.valid_frames(), 0);
        assert!(agg.finish(440.0).is_empty());
    }

    #[test]
    fn aggregation_is_idempotent_for_a_single_note() {
        let mut once = ClusterAggregator::new();
        let mut twice = ClusterAggregator::new();
        for _ in 0..10 {
            once.add_frame(&frame(&[329.63]));
        }
        for _ in 0..20 {
            twice.add_frame(&frame(&[329.63]));
        }

        let a = once.finish(440.0);
        let b = twice.finish(440.0);
        assert_eq!(a.len(), b.len());
        assert!((a[0].frequency - b[0].frequency).abs() < 1e-9);
        assert_eq!(a[0].note_name, b[0].note_name);
    }

    #[test]
    fn cluster_arena_is_bounded() {
        let mut agg = ClusterAggregator::new();
        // 100 well-separated frequencies; only 64 clusters may open.
        for k in 0..100 {
            agg.add_frame(&frame(&[100.0 + k as f64 * 10.0]));
        }
        let notes = agg.finish(440.0);
        assert!(notes.len() <= MAXIMA);
    }
}
