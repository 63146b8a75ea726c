// Keypoint vectorization (21 x 3 = 63)

use crate::models::landmark::{
    FeatureVector, LandmarkSet, COORDS_PER_LANDMARK, FEATURE_LENGTH, LANDMARK_COUNT,
};
use crate::models::prediction::{PipelineError, PipelineResult};

/// Flatten a landmark set into x, y, z per landmark in index order.
/// No scaling or re-centering is applied.
pub fn vectorize(landmarks: &LandmarkSet) -> PipelineResult<FeatureVector> {
    if landmarks.len() != LANDMARK_COUNT {
        return Err(PipelineError::Shape {
            expected: FEATURE_LENGTH,
            actual: landmarks.len() * COORDS_PER_LANDMARK,
        });
    }

    let mut values = Vec::with_capacity(FEATURE_LENGTH);
    for point in landmarks.points() {
        values.push(point.x);
        values.push(point.y);
        values.push(point.z);
    }

    Ok(FeatureVector::from_values(values))
}
