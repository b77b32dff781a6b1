//! Configuration Model
//!
//! Explicit constructor parameters for every processor. All structs deserialize with
//! defaults for missing fields, so a config file only needs to name what it changes.

use crate::core::constants::*;
use crate::math::oximetry::CalibrationCurve;
use anyhow::{anyhow, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Parameters of the unified biometric processor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub sample_rate_hz: f64,
    /// Length of the heart rate / SpO2 window.
    pub window_seconds: f64,
    /// Raw accelerometer reading equal to 1 g.
    pub one_g_raw: f64,
    pub motion_window_seconds: f64,
    pub stationary_threshold_g: f64,
    pub motion_threshold_g: f64,
    pub min_bpm: f64,
    pub max_bpm: f64,
    pub min_correlation: f64,
    /// Baseline removed from the IR window before the periodicity search. 0 disables it.
    pub baseline_window_seconds: f64,
    /// Inclusive bounds of the accepted R value.
    pub r_bounds: (f64, f64),
    pub calibration: CalibrationCurve,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            window_seconds: DEFAULT_WINDOW_SECONDS,
            one_g_raw: ONE_G_RAW,
            motion_window_seconds: DEFAULT_MOTION_WINDOW_SECONDS,
            stationary_threshold_g: STATIONARY_THRESHOLD_G,
            motion_threshold_g: MOTION_THRESHOLD_G,
            min_bpm: MIN_HEART_RATE_BPM,
            max_bpm: MAX_HEART_RATE_BPM,
            min_correlation: MIN_PULSE_CORRELATION,
            baseline_window_seconds: DEFAULT_BASELINE_WINDOW_SECONDS,
            r_bounds: (MIN_R_VALUE, MAX_R_VALUE),
            calibration: CalibrationCurve::default(),
        }
    }
}

impl ProcessorConfig {
    pub fn with_sample_rate(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            ..Default::default()
        }
    }

    /// Number of samples in the heart rate / SpO2 window.
    pub fn window_len(&self) -> usize {
        (self.sample_rate_hz * self.window_seconds).round() as usize
    }

    /// Baseline window in samples; 0 or 1 leaves the signal untouched.
    pub fn baseline_window_len(&self) -> usize {
        (self.sample_rate_hz * self.baseline_window_seconds).round() as usize
    }

    pub fn motion_window_len(&self) -> usize {
        ((self.sample_rate_hz * self.motion_window_seconds).round() as usize).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        positive(self.sample_rate_hz, "sample_rate_hz")?;
        positive(self.one_g_raw, "one_g_raw")?;
        positive(self.motion_window_seconds, "motion_window_seconds")?;
        if self.window_len() < 3 {
            return Err(anyhow!(
                "analysis window must hold at least 3 samples, got {}",
                self.window_len()
            ));
        }
        ordered(self.min_bpm, self.max_bpm, "bpm bounds")?;
        if self.min_bpm < MIN_CONFIGURABLE_BPM {
            return Err(anyhow!(
                "min_bpm must be at least {}, got {}",
                MIN_CONFIGURABLE_BPM,
                self.min_bpm
            ));
        }
        if !(0.0..=1.0).contains(&self.min_correlation) {
            return Err(anyhow!(
                "min_correlation must be in [0, 1], got {}",
                self.min_correlation
            ));
        }
        non_negative(self.baseline_window_seconds, "baseline_window_seconds")?;
        ordered(self.r_bounds.0, self.r_bounds.1, "r_bounds")?;
        ordered(
            self.stationary_threshold_g,
            self.motion_threshold_g,
            "motion thresholds",
        )?;
        self.calibration.validate()
    }
}

/// Parameters of the pulse morphology analyzer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphologyConfig {
    pub sample_rate_hz: f64,
    pub min_peak_distance_seconds: f64,
    /// Minimum duration of both the rise and the fall of a beat.
    pub min_slope_seconds: f64,
    /// Minimum rise and fall amplitude relative to the 5th to 95th percentile spread of
    /// the detrended signal.
    pub prominence_fraction: f64,
    /// Baseline removed before peak search. 0 disables it.
    pub baseline_window_seconds: f64,
}

impl Default for MorphologyConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            min_peak_distance_seconds: DEFAULT_MIN_PEAK_DISTANCE_SECONDS,
            min_slope_seconds: DEFAULT_MIN_SLOPE_SECONDS,
            prominence_fraction: DEFAULT_PROMINENCE_FRACTION,
            baseline_window_seconds: DEFAULT_BASELINE_WINDOW_SECONDS,
        }
    }
}

impl MorphologyConfig {
    pub fn with_sample_rate(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        positive(self.sample_rate_hz, "sample_rate_hz")?;
        non_negative(self.min_peak_distance_seconds, "min_peak_distance_seconds")?;
        non_negative(self.min_slope_seconds, "min_slope_seconds")?;
        non_negative(self.baseline_window_seconds, "baseline_window_seconds")?;
        if !(0.0..1.0).contains(&self.prominence_fraction) {
            return Err(anyhow!(
                "prominence_fraction must be in [0, 1), got {}",
                self.prominence_fraction
            ));
        }
        Ok(())
    }
}

/// Parameters of the HRV analyzer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HrvConfig {
    pub min_rr_seconds: f64,
    pub max_rr_seconds: f64,
    pub embedding_dimension: usize,
    pub max_peak_history: usize,
}

impl Default for HrvConfig {
    fn default() -> Self {
        Self {
            min_rr_seconds: MIN_RR_SECONDS,
            max_rr_seconds: MAX_RR_SECONDS,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            max_peak_history: DEFAULT_MAX_PEAK_HISTORY,
        }
    }
}

impl HrvConfig {
    pub fn validate(&self) -> Result<()> {
        positive(self.min_rr_seconds, "min_rr_seconds")?;
        ordered(self.min_rr_seconds, self.max_rr_seconds, "RR bounds")?;
        if self.embedding_dimension < 2 {
            return Err(anyhow!(
                "embedding_dimension must be at least 2, got {}",
                self.embedding_dimension
            ));
        }
        if self.max_peak_history < 2 {
            return Err(anyhow!("max_peak_history must be at least 2"));
        }
        Ok(())
    }
}

/// PPG channel fed to the beat detector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PpgChannel {
    Infrared,
    Red,
    #[default]
    Green,
}

/// Parameters of the full processing pipeline.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub processor: ProcessorConfig,
    pub morphology: MorphologyConfig,
    pub hrv: HrvConfig,
    pub stream: StreamConfig,
}

/// Beat scanning parameters of the pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub ppg_channel: PpgChannel,
    /// Length of the PPG window scanned for beats.
    pub beat_window_seconds: f64,
    /// Time between two beat scans.
    pub beat_scan_interval_seconds: f64,
    /// Width of the moving average applied before beat detection.
    pub smoothing_samples: usize,
    /// Window reported with every pipeline update.
    pub hrv_window_seconds: f64,
    /// Capacity of the command and update channels.
    pub channel_capacity: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            ppg_channel: PpgChannel::default(),
            beat_window_seconds: 8.0,
            beat_scan_interval_seconds: 1.0,
            smoothing_samples: 5,
            hrv_window_seconds: 60.0,
            channel_capacity: 256,
        }
    }
}

impl PipelineConfig {
    /// Checks all sections and their consistency.
    pub fn validate(&self) -> Result<()> {
        self.processor.validate().context("invalid processor config")?;
        self.morphology
            .validate()
            .context("invalid morphology config")?;
        self.hrv.validate().context("invalid hrv config")?;
        if (self.processor.sample_rate_hz - self.morphology.sample_rate_hz).abs() > f64::EPSILON {
            return Err(anyhow!(
                "processor and morphology sample rates differ ({} vs {})",
                self.processor.sample_rate_hz,
                self.morphology.sample_rate_hz
            ));
        }
        positive(self.stream.beat_window_seconds, "beat_window_seconds")?;
        positive(
            self.stream.beat_scan_interval_seconds,
            "beat_scan_interval_seconds",
        )?;
        positive(self.stream.hrv_window_seconds, "hrv_window_seconds")?;
        if self.stream.channel_capacity == 0 {
            return Err(anyhow!("channel_capacity must be positive"));
        }
        Ok(())
    }

    /// Loads and validates a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("could not read config {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("could not parse config {}", path.display()))?;
        config.validate()?;
        debug!("loaded pipeline config from {}", path.display());
        Ok(config)
    }

    /// Stores the config as pretty-printed JSON.
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)
            .with_context(|| format!("could not write config {}", path.as_ref().display()))
    }
}

fn positive(value: f64, name: &str) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(anyhow!("{} must be positive, got {}", name, value))
    }
}

fn non_negative(value: f64, name: &str) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(anyhow!("{} must not be negative, got {}", name, value))
    }
}

fn ordered(lower: f64, upper: f64, name: &str) -> Result<()> {
    if lower.is_finite() && upper.is_finite() && lower < upper {
        Ok(())
    } else {
        Err(anyhow!("{} must satisfy {} < {}", name, lower, upper))
    }
}
