//! Core Constants
//!
//! Physiological bounds and sensor scaling shared by the processors. Every value here is only a
//! default: the config structs in `model::config` carry the values actually used at runtime.

/// Nominal sample rate of the PPG front end in Hz.
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 50.0;
/// Length of the heart rate / SpO2 analysis window in seconds.
pub const DEFAULT_WINDOW_SECONDS: f64 = 3.0;

/// Raw accelerometer reading corresponding to 1 g (±2 g range, 16 bit).
pub const ONE_G_RAW: f64 = 16384.0;
/// Length of the accelerometer averaging window in seconds.
pub const DEFAULT_MOTION_WINDOW_SECONDS: f64 = 1.0;
/// Below this mean deviation from 1 g (in g) the wearer is considered stationary.
pub const STATIONARY_THRESHOLD_G: f64 = 0.05;
/// At or above this mean deviation from 1 g (in g) the wearer is considered moving.
pub const MOTION_THRESHOLD_G: f64 = 0.15;

/// Lowest heart rate reported, in beats per minute.
pub const MIN_HEART_RATE_BPM: f64 = 40.0;
/// Highest heart rate reported, in beats per minute.
pub const MAX_HEART_RATE_BPM: f64 = 180.0;
/// Slowest heart rate a config may request; keeps autocorrelation lags bounded.
pub const MIN_CONFIGURABLE_BPM: f64 = 1.0;
/// Minimum normalized autocorrelation accepted as a periodic pulse.
pub const MIN_PULSE_CORRELATION: f64 = 0.3;

/// Lower bound of the red/IR ratio of ratios accepted for SpO2.
pub const MIN_R_VALUE: f64 = 0.4;
/// Upper bound of the red/IR ratio of ratios accepted for SpO2.
pub const MAX_R_VALUE: f64 = 3.4;

/// Shortest plausible RR interval in seconds (180 bpm).
pub const MIN_RR_SECONDS: f64 = 0.33;
/// Longest plausible RR interval in seconds (40 bpm).
pub const MAX_RR_SECONDS: f64 = 1.5;
/// Default embedding dimension of the SVD biomarker.
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 3;
/// Number of peak timestamps kept by the HRV analyzer.
pub const DEFAULT_MAX_PEAK_HISTORY: usize = 4096;

/// Minimum distance between two accepted beats in seconds.
pub const DEFAULT_MIN_PEAK_DISTANCE_SECONDS: f64 = 0.4;
/// Minimum duration of the monotone rise and fall around a beat in seconds.
pub const DEFAULT_MIN_SLOPE_SECONDS: f64 = 0.08;
/// Minimum rise and fall amplitude of a beat, as a fraction of the 5th to 95th percentile
/// spread of the detrended signal.
pub const DEFAULT_PROMINENCE_FRACTION: f64 = 0.3;
/// Length of the moving average removed as baseline before pulse analysis, in seconds.
pub const DEFAULT_BASELINE_WINDOW_SECONDS: f64 = 1.0;
