//! Core Events
//!
//! This module defines the messages exchanged with the pipeline task: commands flowing
//! in through an mpsc channel and updates broadcast to every subscriber.
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::model::{
    biometric::{BiometricResult, Sample},
    hrv::HrvWindowResult,
};

/// Enumeration of commands accepted by the pipeline.
#[derive(Debug)]
pub enum PipelineCommand {
    /// A single sensor sample.
    Sample(Sample),

    /// Samples in arrival order, published as one update.
    Batch(Vec<Sample>),

    /// A beat timestamp in seconds from an external detector.
    ///
    /// # Fields
    /// - `f64`: Peak time since the start of the session.
    PeakTime(f64),

    /// Clears every window and the peak history.
    Reset,

    /// Requests the current state without feeding data.
    Snapshot(oneshot::Sender<PipelineUpdate>),
}

/// State published after every handled command.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineUpdate {
    pub biometric: BiometricResult,
    /// Beats forwarded to the HRV analyzer since the last reset.
    pub beats_detected: usize,
    pub hrv: HrvWindowResult,
}
