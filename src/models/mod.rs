// Data models for hand landmarks, keypoint vectors, and classifier results

pub mod landmark;
pub mod prediction;
