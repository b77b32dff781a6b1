//! Beat Model

use serde::{Deserialize, Serialize};

/// One detected pulse.
///
/// Indices refer to the signal slice the beat was detected in. Both timings are
/// strictly positive for every emitted beat.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub peak_index: usize,
    /// Index of the local minimum preceding the peak.
    pub onset_index: usize,
    /// Index of the local minimum following the peak.
    pub offset_index: usize,
    /// Onset to peak, in seconds.
    pub rise_time_seconds: f64,
    /// Peak to offset, in seconds.
    pub fall_time_seconds: f64,
    /// Peak value minus onset value after baseline removal.
    pub amplitude: f64,
}

impl Beat {
    /// Total beat duration from onset to offset in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.rise_time_seconds + self.fall_time_seconds
    }
}
