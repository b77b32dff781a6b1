//! Controller API
//!
//! Mutating counterparts of the read only traits in `api::model`. Every mutator takes
//! `&mut self`: a component has exactly one writer at a time.
use crate::model::biometric::{BiometricResult, Sample};

use super::model::{BiometricModelApi, HrvModelApi};

/// BiometricProcessorApi trait
///
/// Feeds samples into a processor holding rolling windows.
pub trait BiometricProcessorApi: BiometricModelApi {
    /// Consumes one sample and returns the updated estimate.
    fn process_sample(&mut self, sample: &Sample) -> BiometricResult;

    /// Clears all windows, returning to the initial state.
    fn reset(&mut self);
}

/// HrvApi trait
///
/// Feeds beat timestamps into an HRV analyzer.
pub trait HrvApi: HrvModelApi {
    /// Appends a peak timestamp in seconds.
    fn add_peak_time(&mut self, timestamp: f64);

    /// Clears the peak history.
    fn reset(&mut self);
}
