pub mod core;
pub mod models;
pub mod platform;

pub use crate::core::config::Config;
pub use crate::core::frame_pipeline::{FrameOutcome, FramePipeline, PipelineOptions};
pub use crate::core::prediction_client::{Classifier, HttpClassifier, PredictionClient};
pub use crate::models::landmark::{DetectorOutput, FeatureVector, LandmarkPoint, LandmarkSet};
pub use crate::models::prediction::{
    DisplayState, DisplayStatus, PipelineError, PipelineResult, Prediction, PredictionResult,
};
