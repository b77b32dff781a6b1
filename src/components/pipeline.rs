//! Biometric Pipeline
//!
//! Runs the processor, the beat detector and the HRV analyzer as one task. Commands
//! arrive through an mpsc channel and every handled command broadcasts a
//! [`PipelineUpdate`]. Components are owned by the task, so each has a single writer.

use crate::{
    api::{
        controller::{BiometricProcessorApi, HrvApi},
        model::{BeatDetectorApi, BiometricModelApi, HrvModelApi},
    },
    components::{
        hrv::HrvAnalyzer, morphology::PulseMorphologyAnalyzer,
        processor::UnifiedBiometricProcessor,
    },
    core::events::{PipelineCommand, PipelineUpdate},
    math::{signal::moving_average, window::RollingWindow},
    model::{
        biometric::Sample,
        config::{PipelineConfig, PpgChannel, StreamConfig},
    },
};

use anyhow::{anyhow, Result};
use log::{debug, error, trace};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Pipeline built from the default components.
pub type DefaultPipeline =
    BiometricPipeline<UnifiedBiometricProcessor, PulseMorphologyAnalyzer, HrvAnalyzer>;

fn ppg_value(sample: &Sample, channel: PpgChannel) -> f64 {
    match channel {
        PpgChannel::Infrared => sample.ir,
        PpgChannel::Red => sample.red,
        PpgChannel::Green => sample.green,
    }
}

/// `BiometricPipeline` structure.
///
/// Beats are searched in a trailing PPG window once per scan interval. A beat seen in
/// consecutive scans is forwarded only once.
#[derive(Debug)]
pub struct BiometricPipeline<P: BiometricProcessorApi, B: BeatDetectorApi, H: HrvApi> {
    config: StreamConfig,
    processor: P,
    detector: B,
    hrv: H,
    /// Timestamp in seconds and value of the selected PPG channel.
    ppg: RollingWindow<(f64, f64)>,
    scan_interval: usize,
    samples_since_scan: usize,
    last_forwarded_peak: Option<f64>,
    beats_detected: usize,
    update_tx: broadcast::Sender<PipelineUpdate>,
}

impl DefaultPipeline {
    /// Creates a pipeline with the default components after validating `config`.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            config.stream,
            UnifiedBiometricProcessor::new(config.processor)?,
            PulseMorphologyAnalyzer::new(config.morphology)?,
            HrvAnalyzer::new(config.hrv)?,
        ))
    }
}

impl<P, B, H> BiometricPipeline<P, B, H>
where
    P: BiometricProcessorApi + 'static,
    B: BeatDetectorApi + 'static,
    H: HrvApi + 'static,
{
    /// Creates a new `BiometricPipeline`.
    ///
    /// # Arguments
    /// - `config`: Beat scanning parameters.
    /// - `processor`: Heart rate, SpO2 and motion estimation.
    /// - `detector`: Beat detection on the PPG window. Its sample rate sizes the window.
    /// - `hrv`: Receives the detected peak times.
    pub fn new(config: StreamConfig, processor: P, detector: B, hrv: H) -> Self {
        let fs = detector.sample_rate_hz();
        let window_len = (config.beat_window_seconds * fs).ceil().max(1.0) as usize;
        let scan_interval = (config.beat_scan_interval_seconds * fs).round().max(1.0) as usize;
        let (update_tx, _) = broadcast::channel(config.channel_capacity.max(1));
        debug!(
            "creating pipeline: {:?} channel, beat window {} samples, scan every {} samples",
            config.ppg_channel, window_len, scan_interval
        );
        Self {
            config,
            processor,
            detector,
            hrv,
            ppg: RollingWindow::new(window_len),
            scan_interval,
            samples_since_scan: 0,
            last_forwarded_peak: None,
            beats_detected: 0,
            update_tx,
        }
    }

    /// Receives updates published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineUpdate> {
        self.update_tx.subscribe()
    }

    /// Current state of all components.
    pub fn update(&self) -> PipelineUpdate {
        PipelineUpdate {
            biometric: self.processor.snapshot(),
            beats_detected: self.beats_detected,
            hrv: self.hrv.analyze_window(self.config.hrv_window_seconds),
        }
    }

    fn publish(&self) {
        if self.update_tx.send(self.update()).is_err() {
            trace!("no pipeline subscribers");
        }
    }

    fn ingest(&mut self, sample: &Sample) {
        self.processor.process_sample(sample);

        let value = ppg_value(sample, self.config.ppg_channel);
        if !value.is_finite() {
            return;
        }
        self.ppg.push((sample.timestamp.as_seconds_f64(), value));
        self.samples_since_scan += 1;
        if self.samples_since_scan >= self.scan_interval {
            self.samples_since_scan = 0;
            self.scan_beats();
        }
    }

    /// Runs beat detection over the PPG window and forwards peaks newer than the last one.
    fn scan_beats(&mut self) {
        let entries = self.ppg.to_vec();
        let values: Vec<f64> = entries.iter().map(|(_, value)| *value).collect();
        let smoothed = moving_average(&values, self.config.smoothing_samples);
        let beats = self.detector.detect_beats(&smoothed);
        let tolerance = self.detector.min_peak_distance_seconds() / 2.0;

        let mut forwarded = 0;
        for beat in &beats {
            let Some(&(peak_time, _)) = entries.get(beat.peak_index) else {
                continue;
            };
            if self
                .last_forwarded_peak
                .is_some_and(|last| peak_time <= last + tolerance)
            {
                continue;
            }
            self.hrv.add_peak_time(peak_time);
            self.last_forwarded_peak = Some(peak_time);
            forwarded += 1;
        }
        self.beats_detected += forwarded;
        trace!(
            "beat scan over {} samples: {} beats, {} new",
            entries.len(),
            beats.len(),
            forwarded
        );
    }

    fn reset(&mut self) {
        debug!("resetting pipeline after {} beats", self.beats_detected);
        self.processor.reset();
        self.hrv.reset();
        self.ppg.clear();
        self.samples_since_scan = 0;
        self.last_forwarded_peak = None;
        self.beats_detected = 0;
    }

    /// Dispatches one command to the components.
    pub fn handle_command(&mut self, command: PipelineCommand) -> Result<()> {
        match command {
            PipelineCommand::Sample(sample) => self.ingest(&sample),
            PipelineCommand::Batch(samples) => {
                for sample in &samples {
                    self.ingest(sample);
                }
            }
            PipelineCommand::PeakTime(timestamp) => self.hrv.add_peak_time(timestamp),
            PipelineCommand::Reset => self.reset(),
            PipelineCommand::Snapshot(reply) => {
                return reply
                    .send(self.update())
                    .map_err(|_| anyhow!("snapshot requester went away"));
            }
        }
        self.publish();
        Ok(())
    }

    /// Asynchronous command loop. Returns once every handle has been dropped.
    pub async fn run(mut self, mut commands: mpsc::Receiver<PipelineCommand>) {
        while let Some(command) = commands.recv().await {
            if let Err(e) = self.handle_command(command) {
                error!("error during pipeline command handling: {}", e);
            }
        }
        debug!("pipeline command channel closed");
    }

    /// Moves the pipeline onto a tokio task and returns a handle to it.
    pub fn spawn(self) -> PipelineHandle {
        let (command_tx, command_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let handle = PipelineHandle {
            commands: command_tx,
            updates: self.update_tx.clone(),
        };
        tokio::spawn(self.run(command_rx));
        handle
    }
}

/// Cloneable handle to a running pipeline.
#[derive(Clone, Debug)]
pub struct PipelineHandle {
    commands: mpsc::Sender<PipelineCommand>,
    updates: broadcast::Sender<PipelineUpdate>,
}

impl PipelineHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineUpdate> {
        self.updates.subscribe()
    }

    async fn send(&self, command: PipelineCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("pipeline has stopped"))
    }

    pub async fn push_sample(&self, sample: Sample) -> Result<()> {
        self.send(PipelineCommand::Sample(sample)).await
    }

    pub async fn push_batch(&self, samples: Vec<Sample>) -> Result<()> {
        self.send(PipelineCommand::Batch(samples)).await
    }

    pub async fn add_peak_time(&self, timestamp: f64) -> Result<()> {
        self.send(PipelineCommand::PeakTime(timestamp)).await
    }

    pub async fn reset(&self) -> Result<()> {
        self.send(PipelineCommand::Reset).await
    }

    /// Current state, after all previously sent commands have been handled.
    pub async fn snapshot(&self) -> Result<PipelineUpdate> {
        let (tx, rx) = oneshot::channel();
        self.send(PipelineCommand::Snapshot(tx)).await?;
        rx.await.map_err(|_| anyhow!("pipeline dropped the snapshot request"))
    }
}
