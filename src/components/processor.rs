//! Unified Biometric Processor
//!
//! Ingests multi-channel samples one at a time, keeps rolling windows per channel and
//! produces a heart rate, SpO2 and motion snapshot on every call. Insufficient or
//! out-of-range data degrades to zero / `Unknown` outputs and never to an error.

use crate::{
    api::{controller::BiometricProcessorApi, model::BiometricModelApi},
    math::{
        oximetry::{perfusion_index, ratio_of_ratios},
        signal::{ac_dc, detrend, dominant_period, mean},
        window::RollingWindow,
    },
    model::{
        biometric::{ActivityState, BiometricResult, Sample},
        config::ProcessorConfig,
    },
};
use anyhow::{anyhow, Result};
use log::{debug, trace, warn};
use time::Duration;

/// `UnifiedBiometricProcessor` structure.
///
/// Heart rate and SpO2 are only estimated once the IR window holds
/// `sample_rate_hz × window_seconds` samples.
#[derive(Debug, Clone)]
pub struct UnifiedBiometricProcessor {
    config: ProcessorConfig,
    ir: RollingWindow<f64>,
    red: RollingWindow<f64>,
    /// Per-sample deviation of the accelerometer magnitude from 1 g, in g.
    motion: RollingWindow<f64>,
    /// Samples consumed since construction or the last reset.
    sample_count: u64,
    latest: BiometricResult,
}

impl Default for UnifiedBiometricProcessor {
    fn default() -> Self {
        Self::from_valid_config(ProcessorConfig::default())
    }
}

impl UnifiedBiometricProcessor {
    /// Creates a processor after validating `config`.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    fn from_valid_config(config: ProcessorConfig) -> Self {
        let window_len = config.window_len();
        let motion_len = config.motion_window_len();
        debug!(
            "creating biometric processor: {} Hz, window {} samples, motion window {} samples",
            config.sample_rate_hz, window_len, motion_len
        );
        Self {
            ir: RollingWindow::new(window_len),
            red: RollingWindow::new(window_len),
            motion: RollingWindow::new(motion_len),
            sample_count: 0,
            latest: BiometricResult::default(),
            config,
        }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Consumes one sample given as raw channel values.
    ///
    /// The timestamp is derived from the number of samples seen and the sample rate.
    pub fn process(
        &mut self,
        ir: f64,
        red: f64,
        green: f64,
        accel_x: i16,
        accel_y: i16,
        accel_z: i16,
    ) -> BiometricResult {
        let timestamp =
            Duration::seconds_f64(self.sample_count as f64 / self.config.sample_rate_hz);
        self.process_sample(&Sample::new(
            ir,
            red,
            green,
            [accel_x, accel_y, accel_z],
            timestamp,
        ))
    }

    /// Feeds aligned channel arrays through [`Self::process`] and returns the final estimate.
    ///
    /// # Errors
    /// All six slices must have the same length. On mismatch nothing is consumed.
    pub fn process_batch(
        &mut self,
        ir: &[f64],
        red: &[f64],
        green: &[f64],
        accel_x: &[i16],
        accel_y: &[i16],
        accel_z: &[i16],
    ) -> Result<BiometricResult> {
        let len = ir.len();
        let lengths = [
            red.len(),
            green.len(),
            accel_x.len(),
            accel_y.len(),
            accel_z.len(),
        ];
        if lengths.iter().any(|&l| l != len) {
            warn!(
                "rejecting batch with mismatched lengths: ir {}, others {:?}",
                len, lengths
            );
            return Err(anyhow!(
                "batch channels must have equal length (ir {}, red {}, green {}, accel {}/{}/{})",
                len,
                lengths[0],
                lengths[1],
                lengths[2],
                lengths[3],
                lengths[4]
            ));
        }

        for idx in 0..len {
            self.process(
                ir[idx],
                red[idx],
                green[idx],
                accel_x[idx],
                accel_y[idx],
                accel_z[idx],
            );
        }
        Ok(self.latest)
    }

    /// Clears every window and the sample counter.
    pub fn reset(&mut self) {
        debug!("resetting biometric processor after {} samples", self.sample_count);
        self.ir.clear();
        self.red.clear();
        self.motion.clear();
        self.sample_count = 0;
        self.latest = BiometricResult::default();
    }

    pub fn snapshot(&self) -> BiometricResult {
        self.latest
    }

    /// Samples consumed since construction or the last reset.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Consumes one sample.
    ///
    /// Samples with a non-finite PPG channel only update the motion window.
    pub fn process_sample(&mut self, sample: &Sample) -> BiometricResult {
        self.sample_count += 1;

        let deviation =
            (sample.accel_magnitude() - self.config.one_g_raw).abs() / self.config.one_g_raw;
        self.motion.push(deviation);

        if [sample.ir, sample.red, sample.green]
            .iter()
            .all(|v| v.is_finite())
        {
            self.ir.push(sample.ir);
            self.red.push(sample.red);
        } else {
            warn!(
                "dropping non-finite PPG sample at {}: ir {}, red {}, green {}",
                sample.timestamp, sample.ir, sample.red, sample.green
            );
        }

        self.latest = self.estimate();
        trace!("sample {}: {:?}", self.sample_count, self.latest);
        self.latest
    }

    fn estimate(&self) -> BiometricResult {
        let (motion_level, activity) = self.estimate_motion();
        let mut result = BiometricResult {
            motion_level,
            activity,
            ..Default::default()
        };

        // never estimate on partial windows
        if !self.ir.is_full() {
            return result;
        }

        let ir = self.ir.to_vec();
        let red = self.red.to_vec();
        result.heart_rate = self.estimate_heart_rate(&ir);

        if let (Some((ir_ac, ir_dc)), Some((red_ac, red_dc))) = (ac_dc(&ir), ac_dc(&red)) {
            result.perfusion_index = perfusion_index(ir_ac, ir_dc);
            result.r_value = ratio_of_ratios(red_ac, red_dc, ir_ac, ir_dc);
            result.spo2 = result.r_value.map_or(0, |r| self.spo2_from_r(r));
        }
        result
    }

    /// Dominant periodicity of the baseline-corrected IR window inside the configured bpm band.
    fn estimate_heart_rate(&self, ir: &[f64]) -> u32 {
        let fs = self.config.sample_rate_hz;
        let min_lag = (60.0 * fs / self.config.max_bpm).floor().max(1.0) as usize;
        let max_lag = (60.0 * fs / self.config.min_bpm).ceil() as usize;

        let pulsatile = detrend(ir, self.config.baseline_window_len());
        let Some(period) =
            dominant_period(&pulsatile, min_lag, max_lag, self.config.min_correlation)
        else {
            trace!("no periodic component in IR window");
            return 0;
        };
        let bpm = 60.0 * fs / period;
        if bpm < self.config.min_bpm || bpm > self.config.max_bpm {
            debug!("heart rate {:.1} bpm outside physiological band", bpm);
            return 0;
        }
        bpm.round() as u32
    }

    /// Maps an R value through the calibration table; 0 outside the accepted bounds.
    fn spo2_from_r(&self, r: f64) -> u8 {
        let (lower, upper) = self.config.r_bounds;
        if r < lower || r > upper {
            trace!("R value {:.3} outside [{}, {}]", r, lower, upper);
            return 0;
        }
        self.config.calibration.spo2(r).round().clamp(0.0, 100.0) as u8
    }

    fn estimate_motion(&self) -> (f64, ActivityState) {
        let deviations = self.motion.to_vec();
        let Some(level) = mean(&deviations) else {
            return (0.0, ActivityState::Unknown);
        };
        let activity = if level < self.config.stationary_threshold_g {
            ActivityState::Stationary
        } else if level >= self.config.motion_threshold_g {
            ActivityState::Motion
        } else {
            ActivityState::Unknown
        };
        (level, activity)
    }
}

impl BiometricModelApi for UnifiedBiometricProcessor {
    fn snapshot(&self) -> BiometricResult {
        self.latest
    }

    fn window_fill(&self) -> (usize, usize) {
        (self.ir.len(), self.ir.capacity())
    }
}

impl BiometricProcessorApi for UnifiedBiometricProcessor {
    fn process_sample(&mut self, sample: &Sample) -> BiometricResult {
        UnifiedBiometricProcessor::process_sample(self, sample)
    }

    fn reset(&mut self) {
        UnifiedBiometricProcessor::reset(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const FS: f64 = 50.0;
    const ONE_G: i16 = 16384;

    fn pulse(freq: f64, idx: usize, dc: f64, ac: f64) -> f64 {
        dc + ac * (2.0 * PI * freq * idx as f64 / FS).sin()
    }

    #[test]
    fn test_heart_rate_clean_sine() {
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..(6.0 * FS) as usize {
            let ir = pulse(1.2, idx, 50_000.0, 500.0);
            let red = pulse(1.2, idx, 40_000.0, 300.0);
            result = processor.process(ir, red, 20_000.0, 0, 0, ONE_G);
        }
        assert!(
            (62..=82).contains(&result.heart_rate),
            "expected 72 ± 10 bpm, got {}",
            result.heart_rate
        );
    }

    #[test]
    fn test_heart_rate_fast_pulse() {
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..(6.0 * FS) as usize {
            let ir = pulse(2.0, idx, 50_000.0, 500.0);
            result = processor.process(ir, ir, ir, 0, 0, ONE_G);
        }
        assert!(
            (110..=130).contains(&result.heart_rate),
            "expected 120 ± 10 bpm, got {}",
            result.heart_rate
        );
    }

    #[test]
    fn test_no_heart_rate_on_partial_window() {
        let mut processor = UnifiedBiometricProcessor::default();
        let window_len = processor.config().window_len();
        for idx in 0..window_len - 1 {
            let ir = pulse(1.2, idx, 50_000.0, 500.0);
            let result = processor.process(ir, ir, ir, 0, 0, ONE_G);
            assert_eq!(result.heart_rate, 0);
            assert_eq!(result.spo2, 0);
        }
        assert_eq!(processor.window_fill(), (window_len - 1, window_len));
    }

    #[test]
    fn test_flat_signal_has_no_heart_rate() {
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for _ in 0..300 {
            result = processor.process(50_000.0, 40_000.0, 20_000.0, 0, 0, ONE_G);
        }
        assert_eq!(result.heart_rate, 0);
        assert_eq!(result.spo2, 0);
        assert!(result.r_value.is_none());
    }

    #[test]
    fn test_spo2_within_bounds() {
        // red modulation half of IR modulation: R = 0.5 -> 97.5 %
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..200 {
            let ir = pulse(1.2, idx, 50_000.0, 1000.0);
            let red = pulse(1.2, idx, 50_000.0, 500.0);
            result = processor.process(ir, red, 0.0, 0, 0, ONE_G);
        }
        let r = result.r_value.unwrap();
        assert!((r - 0.5).abs() < 0.01, "got R {}", r);
        assert!((97..=98).contains(&result.spo2), "got {}", result.spo2);
        assert!(result.perfusion_index > 0.0);
    }

    #[test]
    fn test_spo2_zero_when_r_above_bound() {
        // red modulation four times IR modulation: R = 4.0
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..200 {
            let ir = pulse(1.2, idx, 50_000.0, 100.0);
            let red = pulse(1.2, idx, 50_000.0, 400.0);
            result = processor.process(ir, red, 0.0, 0, 0, ONE_G);
        }
        assert!(result.r_value.unwrap() > 3.4);
        assert_eq!(result.spo2, 0);
    }

    #[test]
    fn test_spo2_zero_when_r_below_bound() {
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..200 {
            let ir = pulse(1.2, idx, 50_000.0, 1000.0);
            let red = pulse(1.2, idx, 50_000.0, 100.0);
            result = processor.process(ir, red, 0.0, 0, 0, ONE_G);
        }
        assert!(result.r_value.unwrap() < 0.4);
        assert_eq!(result.spo2, 0);
    }

    #[test]
    fn test_spo2_r_bounds_are_inclusive() {
        let processor = UnifiedBiometricProcessor::default();
        assert_eq!(processor.spo2_from_r(3.4), 25);
        assert_eq!(processor.spo2_from_r(3.4 + 1e-9), 0);
        assert_eq!(processor.spo2_from_r(0.4), 100);
        assert_eq!(processor.spo2_from_r(0.4 - 1e-9), 0);
    }

    #[test]
    fn test_heart_rate_under_baseline_wander() {
        // slow 0.25 Hz drift three times stronger than the pulse
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..(6.0 * FS) as usize {
            let wander = 1500.0 * (2.0 * PI * 0.25 * idx as f64 / FS).sin();
            let ir = pulse(1.2, idx, 50_000.0, 500.0) + wander;
            let red = pulse(1.2, idx, 40_000.0, 300.0) + wander;
            result = processor.process(ir, red, 20_000.0, 0, 0, ONE_G);
        }
        assert!(
            (62..=82).contains(&result.heart_rate),
            "expected 72 ± 10 bpm, got {}",
            result.heart_rate
        );
    }

    #[test]
    fn test_stationary_motion_and_reset() {
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..300 {
            let ir = pulse(1.2, idx, 50_000.0, 500.0);
            result = processor.process(ir, ir, ir, 0, 0, ONE_G);
        }
        assert!(result.motion_level < 0.1);
        assert_ne!(result.activity, ActivityState::Motion);
        assert_eq!(result.activity, ActivityState::Stationary);
        assert!(result.heart_rate > 0);

        processor.reset();
        assert_eq!(processor.snapshot(), BiometricResult::default());
        for idx in 0..10 {
            let ir = pulse(1.2, idx, 50_000.0, 500.0);
            result = processor.process(ir, ir, ir, 0, 0, ONE_G);
        }
        assert_eq!(result.heart_rate, 0);
        assert_eq!(processor.sample_count(), 10);
    }

    #[test]
    fn test_vigorous_motion() {
        let mut processor = UnifiedBiometricProcessor::default();
        let mut result = BiometricResult::default();
        for idx in 0..100 {
            let swing = if idx % 2 == 0 { 12_000 } else { -12_000 };
            result = processor.process(50_000.0, 40_000.0, 0.0, swing, 8_000, ONE_G);
        }
        assert!(result.motion_level > 0.0);
        assert_eq!(result.activity, ActivityState::Motion);
    }

    #[test]
    fn test_one_g_is_configurable() {
        let config = ProcessorConfig {
            one_g_raw: 4096.0,
            ..Default::default()
        };
        let mut processor = UnifiedBiometricProcessor::new(config).unwrap();
        let result = processor.process(1.0, 1.0, 1.0, 0, 0, 4096);
        assert!(result.motion_level < 1e-12);
        assert_eq!(result.activity, ActivityState::Stationary);
        let result = processor.process(1.0, 1.0, 1.0, 0, 0, ONE_G);
        assert!(result.motion_level > 1.0);
    }

    #[test]
    fn test_batch_matches_streaming() {
        let n = 200;
        let ir: Vec<f64> = (0..n).map(|i| pulse(1.2, i, 50_000.0, 500.0)).collect();
        let red: Vec<f64> = (0..n).map(|i| pulse(1.2, i, 40_000.0, 300.0)).collect();
        let green = vec![10_000.0; n];
        let ax = vec![0i16; n];
        let ay = vec![0i16; n];
        let az = vec![ONE_G; n];

        let mut batch = UnifiedBiometricProcessor::default();
        let batch_result = batch
            .process_batch(&ir, &red, &green, &ax, &ay, &az)
            .unwrap();

        let mut streaming = UnifiedBiometricProcessor::default();
        let mut stream_result = BiometricResult::default();
        for i in 0..n {
            stream_result = streaming.process(ir[i], red[i], green[i], ax[i], ay[i], az[i]);
        }
        assert_eq!(batch_result, stream_result);
    }

    #[test]
    fn test_batch_rejects_mismatched_lengths() {
        let mut processor = UnifiedBiometricProcessor::default();
        let result = processor.process_batch(
            &[1.0, 2.0],
            &[1.0],
            &[1.0, 2.0],
            &[0, 0],
            &[0, 0],
            &[0, 0],
        );
        assert!(result.is_err());
        assert_eq!(processor.sample_count(), 0);
    }

    #[test]
    fn test_empty_batch_returns_snapshot() {
        let mut processor = UnifiedBiometricProcessor::default();
        processor.process(1.0, 1.0, 1.0, 0, 0, ONE_G);
        let snapshot = processor.snapshot();
        let result = processor.process_batch(&[], &[], &[], &[], &[], &[]).unwrap();
        assert_eq!(result, snapshot);
    }

    #[test]
    fn test_non_finite_sample_dropped() {
        let mut processor = UnifiedBiometricProcessor::default();
        let result = processor.process(f64::NAN, 1.0, 1.0, 0, 0, ONE_G);
        assert_eq!(result.heart_rate, 0);
        assert_eq!(processor.window_fill().0, 0);
        assert_eq!(result.activity, ActivityState::Stationary);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ProcessorConfig {
            sample_rate_hz: -1.0,
            ..Default::default()
        };
        assert!(UnifiedBiometricProcessor::new(config).is_err());
    }
}
