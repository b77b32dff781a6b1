//! Biometric Model
//!
//! Sensor samples as delivered by the transport layer and the snapshot produced for
//! every processed sample.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::Duration;

/// One instant of sensor data.
///
/// PPG intensities are raw photodiode counts; accelerometer axes are raw signed counts
/// in the device's native scale.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub ir: f64,
    pub red: f64,
    pub green: f64,
    pub accel_x: i16,
    pub accel_y: i16,
    pub accel_z: i16,
    /// Time since the start of the session.
    pub timestamp: Duration,
}

impl Sample {
    pub fn new(
        ir: f64,
        red: f64,
        green: f64,
        accel: [i16; 3],
        timestamp: Duration,
    ) -> Self {
        Self {
            ir,
            red,
            green,
            accel_x: accel[0],
            accel_y: accel[1],
            accel_z: accel[2],
            timestamp,
        }
    }

    /// Euclidean norm of the accelerometer vector in raw units.
    pub fn accel_magnitude(&self) -> f64 {
        let (x, y, z) = (
            self.accel_x as f64,
            self.accel_y as f64,
            self.accel_z as f64,
        );
        (x * x + y * y + z * z).sqrt()
    }
}

/// Coarse activity classification derived from the accelerometer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivityState {
    Stationary,
    Motion,
    /// No accelerometer data yet, or a level between the stationary and motion thresholds.
    #[default]
    Unknown,
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ActivityState::Stationary => "stationary",
            ActivityState::Motion => "motion",
            ActivityState::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// `BiometricResult` structure.
///
/// Snapshot returned by the processor. Zero values are regular states meaning
/// "not determinable yet" or "outside physiological bounds".
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BiometricResult {
    /// Heart rate in beats per minute, 0 until the analysis window is full.
    pub heart_rate: u32,
    /// Oxygen saturation in percent, 0 when the R value is out of bounds.
    pub spo2: u8,
    /// Mean deviation of the accelerometer magnitude from 1 g, in g.
    pub motion_level: f64,
    pub activity: ActivityState,
    /// Ratio of ratios behind `spo2`, if it could be computed.
    pub r_value: Option<f64>,
    /// IR perfusion index in percent.
    pub perfusion_index: f64,
}

impl BiometricResult {
    pub fn has_heart_rate(&self) -> bool {
        self.heart_rate > 0
    }

    pub fn has_spo2(&self) -> bool {
        self.spo2 > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accel_magnitude() {
        let sample = Sample::new(0.0, 0.0, 0.0, [0, 0, 16384], Duration::ZERO);
        assert_eq!(sample.accel_magnitude(), 16384.0);
        let sample = Sample::new(0.0, 0.0, 0.0, [3, 4, 0], Duration::ZERO);
        assert_eq!(sample.accel_magnitude(), 5.0);
    }

    #[test]
    fn test_default_result_is_empty() {
        let result = BiometricResult::default();
        assert!(!result.has_heart_rate());
        assert!(!result.has_spo2());
        assert_eq!(result.activity, ActivityState::Unknown);
        assert!(result.r_value.is_none());
    }

    #[test]
    fn test_sample_serde() {
        let sample = Sample::new(1.0, 2.0, 3.0, [-1, 2, 16384], Duration::milliseconds(20));
        let json = serde_json::to_string(&sample).unwrap();
        let back: Sample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn test_activity_display() {
        assert_eq!(ActivityState::Motion.to_string(), "motion");
    }
}
