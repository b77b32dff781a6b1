//! This module defines the read only API of the processing components.
//! The pipeline is generic over these traits, which keeps it testable with mocks.
use crate::model::{
    beat::Beat,
    biometric::BiometricResult,
    hrv::{HrvMetric, HrvWindowResult, Readiness},
};
use std::fmt::Debug;

/// `BiometricModelApi` trait.
///
/// Read access to the latest snapshot of a biometric processor.
pub trait BiometricModelApi: Debug + Send {
    /// Returns the estimate produced by the most recent sample.
    fn snapshot(&self) -> BiometricResult;

    /// Number of samples currently held in the heart rate window, and its capacity.
    fn window_fill(&self) -> (usize, usize);
}

/// `BeatDetectorApi` trait.
///
/// Stateless beat detection over a signal segment.
pub trait BeatDetectorApi: Debug + Send {
    /// Detects beats in `signal`, ordered by peak index.
    fn detect_beats(&self, signal: &[f64]) -> Vec<Beat>;

    /// Minimum distance between two accepted beats in seconds.
    fn min_peak_distance_seconds(&self) -> f64;

    /// Sample rate the detector converts indices with.
    fn sample_rate_hz(&self) -> f64;
}

/// `HrvModelApi` trait.
///
/// Read access to the peak history of an HRV analyzer.
pub trait HrvModelApi: Debug + Send {
    /// Aggregates all metrics over the trailing `window_seconds`.
    fn analyze_window(&self, window_seconds: f64) -> HrvWindowResult;

    /// Timestamp of the newest peak, in seconds.
    fn last_peak_time(&self) -> Option<f64>;

    /// Number of stored peak timestamps.
    fn peak_count(&self) -> usize;

    /// Readiness of `metric` for the trailing `window_seconds`.
    fn readiness(&self, metric: HrvMetric, window_seconds: f64) -> Readiness;
}
