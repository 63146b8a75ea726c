// Landmark validation - classifies a detector output before any keypoint is used

use crate::models::landmark::{DetectorOutput, LandmarkSet, LANDMARK_COUNT};

/// Result of checking one frame's detector output
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationOutcome {
    /// The detector reported no hands
    NoHand,
    /// A hand was reported but cannot be used: wrong landmark count, non-finite
    /// coordinates, or more than one hand in single-hand mode
    InvalidHand,
    ValidHand(LandmarkSet),
}

/// Validate a detector output for single-hand classification.
///
/// The tracker is configured for one hand, but that setting is not trusted:
/// several simultaneous hands are rejected rather than picking the first.
pub fn validate_detection(output: &DetectorOutput) -> ValidationOutcome {
    match output.hands.as_slice() {
        [] => ValidationOutcome::NoHand,
        [hand] => {
            let landmarks = &hand.landmarks;
            if landmarks.len() != LANDMARK_COUNT {
                return ValidationOutcome::InvalidHand;
            }
            if !landmarks.points().iter().all(|p| p.is_finite()) {
                return ValidationOutcome::InvalidHand;
            }
            ValidationOutcome::ValidHand(landmarks.clone())
        }
        _ => ValidationOutcome::InvalidHand,
    }
}
