// Data models for hand landmark detection and keypoint vectors

use serde::{Deserialize, Serialize};

/// Number of landmarks the hand tracker reports per hand
pub const LANDMARK_COUNT: usize = 21;

/// Coordinates per landmark (x, y, z)
pub const COORDS_PER_LANDMARK: usize = 3;

/// Length of a flattened keypoint vector (21 x 3)
pub const FEATURE_LENGTH: usize = LANDMARK_COUNT * COORDS_PER_LANDMARK;

// ==============================================================================
// Landmarks
// ==============================================================================

/// A single detected hand joint in the detector's normalized coordinate space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LandmarkPoint {
    pub x: f32, // Normalized [0, 1] for image coordinates
    pub y: f32, // Normalized [0, 1] for image coordinates
    pub z: f32, // Depth relative to the wrist
}

impl LandmarkPoint {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Hand landmark indices (21 total), fixed by the tracker's output contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HandLandmark {
    Wrist = 0,
    ThumbCmc = 1,
    ThumbMcp = 2,
    ThumbIp = 3,
    ThumbTip = 4,
    IndexFingerMcp = 5,
    IndexFingerPip = 6,
    IndexFingerDip = 7,
    IndexFingerTip = 8,
    MiddleFingerMcp = 9,
    MiddleFingerPip = 10,
    MiddleFingerDip = 11,
    MiddleFingerTip = 12,
    RingFingerMcp = 13,
    RingFingerPip = 14,
    RingFingerDip = 15,
    RingFingerTip = 16,
    PinkyMcp = 17,
    PinkyPip = 18,
    PinkyDip = 19,
    PinkyTip = 20,
}

impl HandLandmark {
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Ordered landmarks of one hand. Only a set of exactly 21 points is valid;
/// the length is checked by the validator and again by the vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkSet(Vec<LandmarkPoint>);

impl LandmarkSet {
    pub fn new(points: Vec<LandmarkPoint>) -> Self {
        Self(points)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.0
    }

    pub fn get(&self, landmark: HandLandmark) -> Option<&LandmarkPoint> {
        self.0.get(landmark.index())
    }
}

// ==============================================================================
// Detector Output
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    #[serde(alias = "Left")]
    Left,
    #[serde(alias = "Right")]
    Right,
}

/// One hand reported by the detector for a frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    pub landmarks: LandmarkSet,
    #[serde(default)]
    pub handedness: Option<Handedness>,
    #[serde(default)]
    pub score: Option<f32>, // Detector confidence [0, 1]
}

impl HandDetection {
    pub fn new(landmarks: Vec<LandmarkPoint>) -> Self {
        Self {
            landmarks: LandmarkSet::new(landmarks),
            handedness: None,
            score: None,
        }
    }
}

/// Everything the detector reported for a single video frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorOutput {
    #[serde(default)]
    pub timestamp_ms: Option<u64>, // Capture time on the detector's monotonic clock
    #[serde(default)]
    pub hands: Vec<HandDetection>,
}

impl DetectorOutput {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_hands(hands: Vec<HandDetection>) -> Self {
        Self {
            timestamp_ms: None,
            hands,
        }
    }
}

// ==============================================================================
// Feature Vector
// ==============================================================================

/// Flattened keypoints in landmark order: x0, y0, z0, x1, y1, z1, ...
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub(crate) fn from_values(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

// ==============================================================================
// Configuration
// ==============================================================================

/// Settings handed to the hand tracker when it is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub max_num_hands: u32,                 // Single-hand mode (default: 1)
    pub model_complexity: ModelComplexity,  // Model complexity (default: full)
    pub min_detection_confidence: f32,      // Minimum confidence for detection (default: 0.6)
    pub min_tracking_confidence: f32,       // Minimum confidence for tracking (default: 0.6)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelComplexity {
    Lite = 0,
    Full = 1,
    Heavy = 2,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            max_num_hands: 1,
            model_complexity: ModelComplexity::Full,
            min_detection_confidence: 0.6,
            min_tracking_confidence: 0.6,
        }
    }
}

// ==============================================================================
// Error Types
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Detector not initialized")]
    NotInitialized,

    #[error("Failed to read detector input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed detector output on line {line}: {message}")]
    Parse { line: usize, message: String },
}

pub type DetectorResult<T> = Result<T, DetectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landmark_indices_cover_the_hand() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::IndexFingerTip.index(), 8);
        assert_eq!(HandLandmark::PinkyTip.index(), LANDMARK_COUNT - 1);
        assert_eq!(FEATURE_LENGTH, 63);
    }

    #[test]
    fn test_landmark_point_finiteness() {
        assert!(LandmarkPoint::new(0.5, 0.5, -0.02).is_finite());
        assert!(!LandmarkPoint::new(f32::NAN, 0.5, 0.0).is_finite());
        assert!(!LandmarkPoint::new(0.5, 0.5, f32::INFINITY).is_finite());
    }

    #[test]
    fn test_detector_output_deserializes_with_defaults() {
        let json = r#"{"hands": [{"landmarks": [{"x": 0.1, "y": 0.2, "z": 0.3}], "handedness": "Right"}]}"#;
        let output: DetectorOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.timestamp_ms, None);
        assert_eq!(output.hands.len(), 1);
        assert_eq!(output.hands[0].handedness, Some(Handedness::Right));
        assert_eq!(output.hands[0].landmarks.len(), 1);
        assert_eq!(
            output.hands[0].landmarks.get(HandLandmark::Wrist),
            Some(&LandmarkPoint::new(0.1, 0.2, 0.3))
        );
    }

    #[test]
    fn test_detector_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.max_num_hands, 1);
        assert_eq!(config.model_complexity, ModelComplexity::Full);
        assert_eq!(config.min_detection_confidence, 0.6);
        assert_eq!(config.min_tracking_confidence, 0.6);
    }
}
