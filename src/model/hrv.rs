//! HRV Model
//!
//! This module defines the data structures produced by the HRV analyzer.
//! Metrics that need more intervals than available are `None`, never zero.

use crate::math::hrv::PoincareMetrics;
use serde::{Deserialize, Serialize};

/// Nonlinear biomarker derived from the singular values of the RR embedding matrix.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SvdBiomarker {
    /// Largest singular value, in the unit of the intervals it was computed from.
    pub s1: Option<f64>,
    /// Second over first singular value. Close to 0 for a regular rhythm.
    pub ratio: Option<f64>,
}

impl SvdBiomarker {
    pub fn is_available(&self) -> bool {
        self.s1.is_some()
    }
}

/// Stores heart rate variability (HRV) results for a trailing window.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HrvWindowResult {
    /// Number of RR intervals that passed the plausibility gate.
    pub rr_count: usize,
    /// Mean RR interval in seconds.
    pub mean_rr: Option<f64>,
    /// Mean heart rate in bpm derived from `mean_rr`.
    pub mean_hr: Option<f64>,
    /// Standard deviation of RR intervals in milliseconds.
    pub sdnn: Option<f64>,
    /// Root Mean Square of Successive Differences in milliseconds.
    pub rmssd: Option<f64>,
    pub svd: SvdBiomarker,
    /// Poincare SD1/SD2 in milliseconds.
    pub poincare: Option<PoincareMetrics>,
}

/// Metrics computed by the analyzer, each with its own minimum interval count.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HrvMetric {
    Sdnn,
    Rmssd,
    Svd,
    Poincare,
}

/// Readiness of a single metric.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Readiness {
    /// Not enough intervals yet.
    Accumulating { have: usize, need: usize },
    Ready,
}

impl Readiness {
    pub fn from_counts(have: usize, need: usize) -> Self {
        if have >= need {
            Readiness::Ready
        } else {
            Readiness::Accumulating { have, need }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }
}
