//! Pulse Morphology Analyzer
//!
//! Time-domain beat detection on a raw or lightly filtered PPG segment. The slow baseline is
//! removed first, then every local maximum is traced back to its onset and forward to its
//! offset. Peaks without a measurable rise and fall, with too little amplitude, or closer
//! than the minimum beat distance to a stronger beat are discarded.

use crate::{
    api::model::BeatDetectorApi,
    math::signal::{detrend, mean, median, robust_range},
    model::{beat::Beat, config::MorphologyConfig},
};
use anyhow::Result;
use log::{debug, trace, warn};

/// Tolerance for converting second-based limits to whole samples.
const SAMPLE_EPSILON: f64 = 1e-9;
/// Relative peak-to-peak range below which a signal counts as flat.
const FLAT_RANGE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct PulseMorphologyAnalyzer {
    config: MorphologyConfig,
}

impl Default for PulseMorphologyAnalyzer {
    fn default() -> Self {
        Self {
            config: MorphologyConfig::default(),
        }
    }
}

impl PulseMorphologyAnalyzer {
    pub fn new(config: MorphologyConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Creates an analyzer with default limits for the given sample rate.
    pub fn with_sample_rate(sample_rate_hz: f64) -> Result<Self> {
        Self::new(MorphologyConfig::with_sample_rate(sample_rate_hz))
    }

    pub fn config(&self) -> &MorphologyConfig {
        &self.config
    }

    pub fn min_peak_distance_seconds(&self) -> f64 {
        self.config.min_peak_distance_seconds
    }

    pub fn sample_rate_hz(&self) -> f64 {
        self.config.sample_rate_hz
    }

    fn seconds_to_samples(&self, seconds: f64) -> usize {
        (seconds * self.config.sample_rate_hz - SAMPLE_EPSILON)
            .ceil()
            .max(0.0) as usize
    }

    /// `detect_beats` function.
    ///
    /// # Arguments
    /// - `signal`: PPG samples at the configured sample rate. Larger values mean more blood volume.
    ///
    /// # Returns
    /// Beats ordered by peak index, with amplitudes measured on the detrended signal.
    /// Empty for signals shorter than 3 samples, flat signals and signals containing
    /// non-finite values.
    pub fn detect_beats(&self, signal: &[f64]) -> Vec<Beat> {
        if signal.len() < 3 {
            return Vec::new();
        }
        if signal.iter().any(|v| !v.is_finite()) {
            warn!("beat detection skipped: signal contains non-finite values");
            return Vec::new();
        }

        let (min, max) = signal
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = max - min;
        let scale = mean(signal).map_or(1.0, |m| m.abs().max(1.0));
        if range <= FLAT_RANGE * scale {
            trace!("flat signal, range {}", range);
            return Vec::new();
        }

        let baseline_len = (self.config.baseline_window_seconds * self.config.sample_rate_hz)
            .round() as usize;
        let signal = detrend(signal, baseline_len);
        let spread = robust_range(&signal)
            .filter(|spread| *spread > FLAT_RANGE * scale)
            .unwrap_or(range);
        let min_amplitude = self.config.prominence_fraction * spread;
        let min_slope = self.seconds_to_samples(self.config.min_slope_seconds);
        let candidates: Vec<Beat> = (1..signal.len() - 1)
            .filter(|&idx| signal[idx - 1] < signal[idx] && signal[idx] >= signal[idx + 1])
            .filter_map(|idx| self.trace_beat(&signal, idx))
            .filter(|beat| {
                let rise = beat.peak_index - beat.onset_index;
                let fall = beat.offset_index - beat.peak_index;
                let fall_amplitude = signal[beat.peak_index] - signal[beat.offset_index];
                rise >= min_slope
                    && fall >= min_slope
                    && beat.amplitude >= min_amplitude
                    && fall_amplitude >= min_amplitude
            })
            .collect();

        let beats = self.debounce(candidates);
        debug!(
            "detected {} beats in {} samples",
            beats.len(),
            signal.len()
        );
        beats
    }

    /// Walks from the peak at `peak` to the surrounding local minima.
    ///
    /// Returns `None` if either walk runs into the end of the signal, because the rise
    /// or fall time is then unknown.
    fn trace_beat(&self, signal: &[f64], peak: usize) -> Option<Beat> {
        let mut onset = peak;
        while onset > 0 && signal[onset - 1] <= signal[onset] {
            onset -= 1;
        }
        let mut offset = peak;
        while offset < signal.len() - 1 && signal[offset + 1] <= signal[offset] {
            offset += 1;
        }
        if onset == 0 || offset == signal.len() - 1 || onset == peak || offset == peak {
            trace!("peak at {} has no bounding minima", peak);
            return None;
        }

        let fs = self.config.sample_rate_hz;
        Some(Beat {
            peak_index: peak,
            onset_index: onset,
            offset_index: offset,
            rise_time_seconds: (peak - onset) as f64 / fs,
            fall_time_seconds: (offset - peak) as f64 / fs,
            amplitude: signal[peak] - signal[onset],
        })
    }

    /// Keeps the largest beats that are at least the minimum distance apart.
    fn debounce(&self, mut candidates: Vec<Beat>) -> Vec<Beat> {
        let min_distance = self.seconds_to_samples(self.config.min_peak_distance_seconds);
        candidates.sort_by(|a, b| {
            b.amplitude
                .total_cmp(&a.amplitude)
                .then(a.peak_index.cmp(&b.peak_index))
        });

        let mut accepted: Vec<Beat> = Vec::with_capacity(candidates.len());
        for beat in candidates {
            if accepted
                .iter()
                .all(|kept| kept.peak_index.abs_diff(beat.peak_index) >= min_distance)
            {
                accepted.push(beat);
            } else {
                trace!("peak at {} suppressed by a stronger neighbour", beat.peak_index);
            }
        }
        accepted.sort_by_key(|beat| beat.peak_index);
        accepted
    }

    /// Median beat rate in bpm from consecutive peak distances.
    ///
    /// # Returns
    /// `None` with less than two beats.
    pub fn beat_rate_bpm(&self, beats: &[Beat]) -> Option<f64> {
        let periods: Vec<f64> = beats
            .windows(2)
            .map(|pair| {
                (pair[1].peak_index - pair[0].peak_index) as f64 / self.config.sample_rate_hz
            })
            .collect();
        median(&periods).map(|period| 60.0 / period)
    }
}

impl BeatDetectorApi for PulseMorphologyAnalyzer {
    fn detect_beats(&self, signal: &[f64]) -> Vec<Beat> {
        PulseMorphologyAnalyzer::detect_beats(self, signal)
    }

    fn min_peak_distance_seconds(&self) -> f64 {
        self.config.min_peak_distance_seconds
    }

    fn sample_rate_hz(&self) -> f64 {
        self.config.sample_rate_hz
    }
}
