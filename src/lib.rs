//! Pulse Core
//!
//! Streaming processing of wrist-worn PPG and accelerometer data. Samples are turned into
//! heart rate, SpO2 and motion estimates, pulse beats are detected in the PPG waveform and
//! the resulting beat timestamps feed heart rate variability (HRV) metrics.

/// Trait definitions the pipeline is generic over.
pub mod api {
    /// Mutating component interfaces.
    pub mod controller;
    /// Read only component interfaces.
    pub mod model;
}

/// Processing components.
pub mod components {
    /// HRV analysis over beat timestamps.
    pub mod hrv;
    /// Beat detection in the PPG waveform.
    pub mod morphology;
    /// Task wiring all components together.
    pub mod pipeline;
    /// Heart rate, SpO2 and motion estimation.
    pub mod processor;
}

/// Core utilities shared by all components.
pub mod core {
    /// Default parameters.
    pub mod constants;
    /// Messages exchanged with the pipeline task.
    pub mod events;
}

/// Numerical building blocks.
pub mod math {
    /// Functions and structures for HRV computation.
    pub mod hrv;
    /// Pulse oximetry.
    pub mod oximetry;
    /// Statistics, smoothing and periodicity.
    pub mod signal;
    /// Fixed-capacity circular buffer.
    pub mod window;
}

/// Data models.
pub mod model {
    /// Detected pulse beats.
    pub mod beat;
    /// Sensor samples and biometric snapshots.
    pub mod biometric;
    /// Component and pipeline configuration.
    pub mod config;
    /// HRV results.
    pub mod hrv;
}

pub use components::{
    hrv::HrvAnalyzer,
    morphology::PulseMorphologyAnalyzer,
    pipeline::{BiometricPipeline, DefaultPipeline, PipelineHandle},
    processor::UnifiedBiometricProcessor,
};
pub use core::events::{PipelineCommand, PipelineUpdate};
pub use model::{
    beat::Beat,
    biometric::{ActivityState, BiometricResult, Sample},
    config::{HrvConfig, MorphologyConfig, PipelineConfig, ProcessorConfig},
    hrv::{HrvWindowResult, SvdBiomarker},
};
