// Hand tracker bridge
// The tracking model is an opaque collaborator: it produces one DetectorOutput
// per video frame and receives nothing back.

use crate::core::throttle::MonotonicClock;
use crate::models::landmark::{
    DetectorConfig, DetectorError, DetectorOutput, DetectorResult, HandDetection, Handedness,
    LandmarkPoint, LandmarkSet,
};
use serde_json::Value;
use std::collections::VecDeque;
use std::io::BufRead;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Source of per-frame hand detections
pub trait HandTracker: Send {
    /// Next frame's detections, or `None` once the source is exhausted
    fn next_detection(&mut self) -> DetectorResult<Option<DetectorOutput>>;

    /// Check if the tracker is ready to produce frames
    fn is_initialized(&self) -> bool;

    /// Get tracker info
    fn get_model_info(&self) -> String;
}

// ==============================================================================
// Replay Tracker (recorded detections, one JSON object per line)
// ==============================================================================

/// Plays back tracker output recorded as JSON lines.
///
/// Each line is either `{"timestamp_ms": .., "hands": [{"landmarks": [{x,y,z}..]}]}`
/// or the tracker's native `{"multiHandLandmarks": [[{x,y,z}..]], "multiHandedness": [..]}`.
pub struct ReplayTracker {
    frames: VecDeque<DetectorOutput>,
    source: String,
    config: DetectorConfig,
}

impl ReplayTracker {
    pub fn open(path: &Path, config: &DetectorConfig) -> DetectorResult<Self> {
        let file = std::fs::File::open(path)?;
        let mut tracker = Self::from_reader(std::io::BufReader::new(file), config)?;
        tracker.source = path.display().to_string();
        Ok(tracker)
    }

    pub fn from_reader<R: BufRead>(reader: R, config: &DetectorConfig) -> DetectorResult<Self> {
        let mut frames = VecDeque::new();
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            frames.push_back(parse_frame(&line, index + 1)?);
        }

        info!(
            frames = frames.len(),
            max_num_hands = config.max_num_hands,
            min_detection_confidence = config.min_detection_confidence,
            "Replay tracker loaded"
        );

        Ok(Self {
            frames,
            source: "<reader>".to_string(),
            config: config.clone(),
        })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl HandTracker for ReplayTracker {
    fn next_detection(&mut self) -> DetectorResult<Option<DetectorOutput>> {
        Ok(self.frames.pop_front())
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn get_model_info(&self) -> String {
        format!(
            "Replay tracker ({}) - {} frames left, model complexity {:?}",
            self.source,
            self.frames.len(),
            self.config.model_complexity
        )
    }
}

/// Time base for one replay, fixed by its first frame.
///
/// If the first frame carries `timestamp_ms`, recorded time is used throughout
/// and a frame without one reuses the previous timestamp. Otherwise the process
/// clock is used and recorded timestamps are ignored.
#[derive(Debug, Clone, Copy)]
pub enum ReplayClock {
    Recorded { last_ms: u64 },
    Live(MonotonicClock),
}

impl ReplayClock {
    pub fn for_first_frame(frame: &DetectorOutput) -> Self {
        match frame.timestamp_ms {
            Some(ts) => ReplayClock::Recorded { last_ms: ts },
            None => ReplayClock::Live(MonotonicClock::new()),
        }
    }

    /// Time of `frame` in milliseconds, and how long to wait before handling
    /// it to keep the recorded spacing
    pub fn advance(&mut self, frame: &DetectorOutput) -> (u64, Option<Duration>) {
        match self {
            ReplayClock::Recorded { last_ms } => {
                let ts = frame.timestamp_ms.unwrap_or(*last_ms);
                let wait = ts
                    .checked_sub(*last_ms)
                    .filter(|gap| *gap > 0)
                    .map(Duration::from_millis);
                *last_ms = ts;
                (ts, wait)
            }
            ReplayClock::Live(clock) => (clock.now_ms(), None),
        }
    }
}

/// Parse one recorded frame. Landmark shape is not checked here; that is the
/// validator's job.
pub fn parse_frame(line: &str, line_number: usize) -> DetectorResult<DetectorOutput> {
    let parse_error = |message: String| DetectorError::Parse {
        line: line_number,
        message,
    };

    let value: Value = serde_json::from_str(line).map_err(|e| parse_error(e.to_string()))?;
    if !value.is_object() {
        return Err(parse_error("Expected a JSON object".to_string()));
    }

    let timestamp_ms = match value.get("timestamp_ms") {
        None | Some(Value::Null) => None,
        Some(ts) => Some(
            ts.as_u64()
                .ok_or_else(|| parse_error("timestamp_ms must be a non-negative integer".to_string()))?,
        ),
    };

    let hands = if let Some(hands) = value.get("hands") {
        let hands = hands
            .as_array()
            .ok_or_else(|| parse_error("hands must be an array".to_string()))?;
        hands
            .iter()
            .map(|hand| parse_hand(hand).map_err(&parse_error))
            .collect::<DetectorResult<Vec<_>>>()?
    } else if let Some(multi) = value.get("multiHandLandmarks") {
        let multi = match multi {
            Value::Null => Vec::new(),
            Value::Array(hands) => hands.clone(),
            _ => return Err(parse_error("multiHandLandmarks must be an array".to_string())),
        };
        let handedness = value.get("multiHandedness").and_then(|h| h.as_array());

        multi
            .iter()
            .enumerate()
            .map(|(i, landmarks)| {
                let landmarks = parse_landmarks(landmarks).map_err(&parse_error)?;
                let meta = handedness.and_then(|h| h.get(i));
                Ok(HandDetection {
                    landmarks,
                    handedness: meta.and_then(parse_handedness),
                    score: meta
                        .and_then(|m| m.get("score"))
                        .and_then(|s| s.as_f64())
                        .map(|s| s as f32),
                })
            })
            .collect::<DetectorResult<Vec<_>>>()?
    } else {
        Vec::new()
    };

    Ok(DetectorOutput { timestamp_ms, hands })
}

fn parse_hand(data: &Value) -> Result<HandDetection, String> {
    let landmarks = data
        .get("landmarks")
        .or_else(|| data.get("keypoints"))
        .ok_or_else(|| "Missing hand landmarks".to_string())?;

    Ok(HandDetection {
        landmarks: parse_landmarks(landmarks)?,
        handedness: parse_handedness(data),
        score: data
            .get("score")
            .or_else(|| data.get("confidence"))
            .and_then(|c| c.as_f64())
            .map(|c| c as f32),
    })
}

fn parse_landmarks(data: &Value) -> Result<LandmarkSet, String> {
    let points = data
        .as_array()
        .ok_or_else(|| "Landmarks must be an array".to_string())?;

    points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let coord = |axis: &str| {
                point
                    .get(axis)
                    .and_then(|v| v.as_f64())
                    .map(|v| v as f32)
                    .ok_or_else(|| format!("Landmark {} is missing numeric {}", i, axis))
            };
            Ok(LandmarkPoint::new(coord("x")?, coord("y")?, coord("z")?))
        })
        .collect::<Result<Vec<_>, String>>()
        .map(LandmarkSet::new)
}

fn parse_handedness(data: &Value) -> Option<Handedness> {
    let label = data
        .get("handedness")
        .or_else(|| data.get("label"))
        .and_then(|t| t.as_str())?;

    match label {
        "Left" | "left" => Some(Handedness::Left),
        "Right" | "right" => Some(Handedness::Right),
        _ => None,
    }
}
