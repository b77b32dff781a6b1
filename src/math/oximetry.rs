//! Pulse Oximetry
//!
//! Ratio-of-ratios computation and the calibration table mapping R to an SpO2 percentage.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// `ratio_of_ratios` function.
///
/// Computes `R = (AC_red / DC_red) / (AC_ir / DC_ir)`.
///
/// # Returns
/// `None` if a DC component is not positive or the IR channel carries no pulsatile component.
pub fn ratio_of_ratios(red_ac: f64, red_dc: f64, ir_ac: f64, ir_dc: f64) -> Option<f64> {
    if red_dc <= 0.0 || ir_dc <= 0.0 || ir_ac <= f64::EPSILON * ir_dc {
        return None;
    }
    let r = (red_ac / red_dc) / (ir_ac / ir_dc);
    r.is_finite().then_some(r)
}

/// Perfusion index in percent (AC/DC × 100). Zero when the baseline is not positive.
pub fn perfusion_index(ac: f64, dc: f64) -> f64 {
    if dc > 0.0 {
        ac / dc * 100.0
    } else {
        0.0
    }
}

/// Piecewise-linear calibration table from R value to SpO2 percentage.
///
/// Points are `(r, spo2)` pairs sorted by increasing `r` with non-increasing `spo2`.
/// Values outside the table are extrapolated from the nearest segment and clamped to 0–100.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    pub points: Vec<(f64, f64)>,
}

impl Default for CalibrationCurve {
    /// The common empirical line `SpO2 = 110 - 25 R`.
    fn default() -> Self {
        Self {
            points: vec![(0.4, 100.0), (3.4, 25.0)],
        }
    }
}

impl CalibrationCurve {
    /// Checks that the table has at least two points and is monotonic.
    pub fn validate(&self) -> Result<()> {
        if self.points.len() < 2 {
            return Err(anyhow!("calibration table needs at least two points"));
        }
        for pair in self.points.windows(2) {
            let ((r0, s0), (r1, s1)) = (pair[0], pair[1]);
            if !(r1 > r0) {
                return Err(anyhow!("calibration R values must be strictly increasing"));
            }
            if s1 > s0 {
                return Err(anyhow!("calibration SpO2 values must not increase with R"));
            }
        }
        Ok(())
    }

    /// Maps an R value to an SpO2 percentage in `[0, 100]`.
    pub fn spo2(&self, r: f64) -> f64 {
        let segment = match self.points.len() {
            0 => return 0.0,
            1 => return self.points[0].1.clamp(0.0, 100.0),
            n => {
                let idx = self
                    .points
                    .iter()
                    .position(|(pr, _)| r <= *pr)
                    .unwrap_or(n - 1)
                    .clamp(1, n - 1);
                (self.points[idx - 1], self.points[idx])
            }
        };
        let ((r0, s0), (r1, s1)) = segment;
        let spo2 = s0 + (r - r0) * (s1 - s0) / (r1 - r0);
        spo2.clamp(0.0, 100.0)
    }
}
