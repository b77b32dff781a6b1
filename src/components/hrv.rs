//! HRV Analyzer
//!
//! Collects beat peak timestamps, derives physiologically plausible RR intervals and
//! computes linear (SDNN, RMSSD, Poincare) and nonlinear (SVD embedding) variability
//! metrics. Each metric has its own minimum interval count and degrades on its own.

use crate::{
    api::{controller::HrvApi, model::HrvModelApi},
    math::{
        hrv::{calc_embedding_singular_values, calc_poincare_metrics, calc_rmssd, calc_sdnn},
        signal::mean,
    },
    model::{
        config::HrvConfig,
        hrv::{HrvMetric, HrvWindowResult, Readiness, SvdBiomarker},
    },
};
use anyhow::Result;
use log::{debug, trace, warn};
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct HrvAnalyzer {
    config: HrvConfig,
    /// Peak timestamps in seconds, ascending and without duplicates.
    peak_times: VecDeque<f64>,
}

impl Default for HrvAnalyzer {
    fn default() -> Self {
        Self {
            config: HrvConfig::default(),
            peak_times: VecDeque::new(),
        }
    }
}

impl HrvAnalyzer {
    pub fn new(config: HrvConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            peak_times: VecDeque::new(),
        })
    }

    pub fn config(&self) -> &HrvConfig {
        &self.config
    }

    pub fn embedding_dimension(&self) -> usize {
        self.config.embedding_dimension
    }

    /// Stores a peak timestamp in seconds.
    ///
    /// Out-of-order timestamps are inserted at their sorted position, exact duplicates and
    /// non-finite values are dropped. The oldest peak is evicted once the history is full.
    pub fn add_peak_time(&mut self, timestamp: f64) {
        if !timestamp.is_finite() {
            warn!("ignoring non-finite peak time {}", timestamp);
            return;
        }
        match self
            .peak_times
            .binary_search_by(|existing| existing.total_cmp(&timestamp))
        {
            Ok(_) => trace!("ignoring duplicate peak time {}", timestamp),
            Err(pos) => {
                if pos < self.peak_times.len() {
                    debug!("out-of-order peak time {} inserted at {}", timestamp, pos);
                }
                self.peak_times.insert(pos, timestamp);
                if self.peak_times.len() > self.config.max_peak_history {
                    self.peak_times.pop_front();
                }
            }
        }
    }

    pub fn peak_times(&self) -> impl Iterator<Item = f64> + '_ {
        self.peak_times.iter().copied()
    }

    /// `get_rr_intervals` function.
    ///
    /// # Arguments
    /// - `from`, `to`: inclusive time range in seconds.
    ///
    /// # Returns
    /// Successive differences of the peaks inside the range, keeping only intervals
    /// within the configured RR bounds (default 0.33–1.5 s).
    pub fn get_rr_intervals(&self, from: f64, to: f64) -> Vec<f64> {
        let peaks: Vec<f64> = self
            .peak_times
            .iter()
            .copied()
            .filter(|t| *t >= from && *t <= to)
            .collect();
        let (min_rr, max_rr) = (self.config.min_rr_seconds, self.config.max_rr_seconds);
        let intervals: Vec<f64> = peaks
            .windows(2)
            .map(|pair| pair[1] - pair[0])
            .filter(|rr| *rr >= min_rr && *rr <= max_rr)
            .collect();
        trace!(
            "{} peaks in [{}, {}] give {} plausible RR intervals",
            peaks.len(),
            from,
            to,
            intervals.len()
        );
        intervals
    }

    /// SDNN in milliseconds; 0 with fewer than two intervals.
    pub fn calculate_sdnn(&self, intervals: &[f64]) -> f64 {
        calc_sdnn(intervals).map_or(0.0, |sdnn| sdnn * 1000.0)
    }

    /// RMSSD in milliseconds; 0 with fewer than two intervals.
    pub fn calculate_rmssd(&self, intervals: &[f64]) -> f64 {
        calc_rmssd(intervals).map_or(0.0, |rmssd| rmssd * 1000.0)
    }

    /// `calculate_svd_biomarker` function.
    ///
    /// Needs at least `embedding_dimension + 1` intervals; below that both fields are absent.
    pub fn calculate_svd_biomarker(&self, intervals: &[f64]) -> SvdBiomarker {
        let Some(singular_values) =
            calc_embedding_singular_values(intervals, self.config.embedding_dimension)
        else {
            return SvdBiomarker::default();
        };
        let s1 = singular_values[0];
        let ratio = if s1 > f64::EPSILON {
            singular_values.get(1).map(|s2| s2 / s1)
        } else {
            None
        };
        SvdBiomarker {
            s1: Some(s1),
            ratio,
        }
    }

    /// Minimum number of RR intervals needed by `metric`.
    pub fn required_intervals(&self, metric: HrvMetric) -> usize {
        match metric {
            HrvMetric::Sdnn | HrvMetric::Rmssd => 2,
            HrvMetric::Poincare => 3,
            HrvMetric::Svd => self.config.embedding_dimension + 1,
        }
    }

    /// RR intervals of the trailing `window_seconds` ending at the newest peak.
    fn window_intervals(&self, window_seconds: f64) -> Vec<f64> {
        match self.peak_times.back() {
            Some(&last) if window_seconds.is_finite() && window_seconds > 0.0 => {
                self.get_rr_intervals(last - window_seconds, last)
            }
            _ => Vec::new(),
        }
    }

    /// `analyze_window` function.
    ///
    /// Aggregates every metric over the trailing `window_seconds`.
    pub fn analyze_window(&self, window_seconds: f64) -> HrvWindowResult {
        let intervals = self.window_intervals(window_seconds);
        let mean_rr = mean(&intervals);
        let intervals_ms: Vec<f64> = intervals.iter().map(|rr| rr * 1000.0).collect();

        let result = HrvWindowResult {
            rr_count: intervals.len(),
            mean_rr,
            mean_hr: mean_rr.map(|rr| 60.0 / rr),
            sdnn: calc_sdnn(&intervals_ms),
            rmssd: calc_rmssd(&intervals_ms),
            svd: self.calculate_svd_biomarker(&intervals),
            poincare: calc_poincare_metrics(&intervals_ms),
        };
        debug!(
            "HRV over {} s: {} intervals, sdnn {:?}, rmssd {:?}, svd {:?}",
            window_seconds, result.rr_count, result.sdnn, result.rmssd, result.svd
        );
        result
    }

    pub fn readiness(&self, metric: HrvMetric, window_seconds: f64) -> Readiness {
        Readiness::from_counts(
            self.window_intervals(window_seconds).len(),
            self.required_intervals(metric),
        )
    }

    /// Clears the peak history.
    pub fn reset(&mut self) {
        debug!("resetting HRV analyzer with {} peaks", self.peak_times.len());
        self.peak_times.clear();
    }
}

impl HrvModelApi for HrvAnalyzer {
    fn analyze_window(&self, window_seconds: f64) -> HrvWindowResult {
        HrvAnalyzer::analyze_window(self, window_seconds)
    }

    fn last_peak_time(&self) -> Option<f64> {
        self.peak_times.back().copied()
    }

    fn peak_count(&self) -> usize {
        self.peak_times.len()
    }

    fn readiness(&self, metric: HrvMetric, window_seconds: f64) -> Readiness {
        HrvAnalyzer::readiness(self, metric, window_seconds)
    }
}

impl HrvApi for HrvAnalyzer {
    fn add_peak_time(&mut self, timestamp: f64) {
        HrvAnalyzer::add_peak_time(self, timestamp)
    }

    fn reset(&mut self) {
        HrvAnalyzer::reset(self)
    }
}
