// Data models for classifier requests, prediction results, and display state

use serde::{Deserialize, Serialize};

// ==============================================================================
// Prediction Result
// ==============================================================================

/// A label returned by the remote classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: Option<f64>, // Passed through as received, expected in [0, 1]
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence: Some(confidence),
        }
    }

    /// Confidence rendered as a percentage with one decimal, e.g. "92.0%"
    pub fn confidence_percent(&self) -> Option<String> {
        self.confidence.map(|c| format!("{:.1}%", c * 100.0))
    }
}

/// Outcome of one classify call after failures have been folded in
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionResult {
    Available(Prediction),
    Unavailable,
}

// ==============================================================================
// Display State
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    NoHandDetected,
    InvalidHandData,
    WaitingForStableHand,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::NoHandDetected => "no hand detected",
            DisplayStatus::InvalidHandData => "invalid hand data",
            DisplayStatus::WaitingForStableHand => "waiting for stable hand",
        }
    }
}

/// What the presentation layer should currently show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayState {
    Prediction {
        label: String,
        confidence_percent: Option<String>,
    },
    Status {
        status: DisplayStatus,
    },
}

impl DisplayState {
    pub fn status(status: DisplayStatus) -> Self {
        DisplayState::Status { status }
    }

    pub fn from_result(result: &PredictionResult) -> Self {
        match result {
            PredictionResult::Available(prediction) => DisplayState::Prediction {
                label: prediction.label.clone(),
                confidence_percent: prediction.confidence_percent(),
            },
            PredictionResult::Unavailable => Self::status(DisplayStatus::WaitingForStableHand),
        }
    }

    /// Text for the large letter slot; "-" whenever a status is shown
    pub fn label(&self) -> &str {
        match self {
            DisplayState::Prediction { label, .. } => label,
            DisplayState::Status { .. } => "-",
        }
    }

    /// Text for the detail line under the letter
    pub fn detail(&self) -> String {
        match self {
            DisplayState::Prediction {
                confidence_percent: Some(percent),
                ..
            } => format!("Confidence: {}", percent),
            DisplayState::Prediction {
                confidence_percent: None,
                ..
            } => "Confidence: n/a".to_string(),
            DisplayState::Status { status } => status.as_str().to_string(),
        }
    }
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::status(DisplayStatus::NoHandDetected)
    }
}

// ==============================================================================
// DTOs (classifier wire format)
// ==============================================================================

/// Request body for `POST <classifier_endpoint>`
#[derive(Debug, Serialize)]
pub struct ClassifyRequest<'a> {
    pub keypoints: &'a [f32],
}

/// Success body from the classifier; both fields are checked after decoding
#[derive(Debug, Deserialize)]
pub struct ClassifyResponse {
    #[serde(default)]
    pub prediction: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Body of the classifier's `GET /` probe
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Landmark shape mismatch: expected {expected} values, got {actual}")]
    Shape { expected: usize, actual: usize },

    #[error("Classifier unreachable: {0}")]
    Transport(String),

    #[error("Classifier protocol error: {0}")]
    Protocol(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_percent_formatting() {
        assert_eq!(Prediction::new("A", 0.92).confidence_percent().as_deref(), Some("92.0%"));
        assert_eq!(Prediction::new("B", 1.0).confidence_percent().as_deref(), Some("100.0%"));
        assert_eq!(Prediction::new("C", 0.0456).confidence_percent().as_deref(), Some("4.6%"));
    }

    #[test]
    fn test_display_state_from_result() {
        let state = DisplayState::from_result(&PredictionResult::Available(Prediction::new("A", 0.92)));
        assert_eq!(
            state,
            DisplayState::Prediction {
                label: "A".to_string(),
                confidence_percent: Some("92.0%".to_string()),
            }
        );
        assert_eq!(state.label(), "A");
        assert_eq!(state.detail(), "Confidence: 92.0%");

        let state = DisplayState::from_result(&PredictionResult::Unavailable);
        assert_eq!(state, DisplayState::status(DisplayStatus::WaitingForStableHand));
        assert_eq!(state.label(), "-");
        assert_eq!(state.detail(), "waiting for stable hand");
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(DisplayStatus::NoHandDetected.as_str(), "no hand detected");
        assert_eq!(DisplayStatus::InvalidHandData.as_str(), "invalid hand data");
        assert_eq!(DisplayStatus::WaitingForStableHand.as_str(), "waiting for stable hand");
        assert_eq!(DisplayState::default(), DisplayState::status(DisplayStatus::NoHandDetected));
    }

    #[test]
    fn test_classify_request_serialization() {
        let keypoints = [0.25f32, 0.5, -0.125];
        let json = serde_json::to_string(&ClassifyRequest { keypoints: &keypoints }).unwrap();
        assert_eq!(json, r#"{"keypoints":[0.25,0.5,-0.125]}"#);
    }
}
