// Frame pipeline - per-frame orchestration from detector output to display
//
// Detector event -> validate -> vectorize -> throttle gate -> classify task.
// Classify calls run as independent tasks and are never cancelled; each one
// writes its result to the display sink when it resolves.

use crate::core::config::Config;
use crate::core::display::DisplaySink;
use crate::core::prediction_client::PredictionClient;
use crate::core::throttle::{should_send, ThrottleState, DEFAULT_MIN_INTERVAL_MS};
use crate::core::validator::{validate_detection, ValidationOutcome};
use crate::core::vectorizer::vectorize;
use crate::models::landmark::DetectorOutput;
use crate::models::prediction::{DisplayState, DisplayStatus, PipelineResult};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, trace, warn};

/// What happened to one detector event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No hand in frame; display shows "no hand detected"
    NoHand,
    /// Unusable hand data; display shows "invalid hand data"
    InvalidHand,
    /// Valid hand inside the throttle window; display unchanged
    Throttled,
    /// A classify request was started with this sequence number
    Dispatched { seq: u64 },
}

/// Options fixed when the pipeline is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOptions {
    pub min_interval_ms: u64,
    pub discard_stale_predictions: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            min_interval_ms: DEFAULT_MIN_INTERVAL_MS,
            discard_stale_predictions: false,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            min_interval_ms: config.throttle_interval_ms,
            discard_stale_predictions: config.discard_stale_predictions,
        }
    }
}

pub struct FramePipeline {
    client: PredictionClient,
    options: PipelineOptions,
    throttle: ThrottleState,
    display: Arc<DisplaySink>,
    in_flight: JoinSet<()>,
    next_seq: u64,
}

impl FramePipeline {
    pub fn new(client: PredictionClient, options: PipelineOptions) -> Self {
        let display = Arc::new(DisplaySink::new(options.discard_stale_predictions));
        Self {
            client,
            options,
            throttle: ThrottleState::new(),
            display,
            in_flight: JoinSet::new(),
            next_seq: 0,
        }
    }

    pub fn from_config(client: PredictionClient, config: &Config) -> Self {
        Self::new(client, PipelineOptions::from(config))
    }

    /// Handle one detector event observed at `now_ms` (monotonic milliseconds).
    ///
    /// Must be called from within a Tokio runtime. Returns once the classify
    /// request, if any, has been started; it never waits on the network.
    /// The only error is a shape mismatch from the vectorizer, which means the
    /// validator was bypassed.
    pub fn handle_detection(
        &mut self,
        output: &DetectorOutput,
        now_ms: u64,
    ) -> PipelineResult<FrameOutcome> {
        self.reap_finished();

        let landmarks = match validate_detection(output) {
            ValidationOutcome::NoHand => {
                self.display.show_status(DisplayStatus::NoHandDetected);
                return Ok(FrameOutcome::NoHand);
            }
            ValidationOutcome::InvalidHand => {
                self.display.show_status(DisplayStatus::InvalidHandData);
                return Ok(FrameOutcome::InvalidHand);
            }
            ValidationOutcome::ValidHand(landmarks) => landmarks,
        };

        let features = vectorize(&landmarks)?;

        if !should_send(now_ms, self.throttle.last_sent(), self.options.min_interval_ms) {
            trace!(now_ms, last_sent = ?self.throttle.last_sent(), "Frame throttled");
            return Ok(FrameOutcome::Throttled);
        }

        // Recorded before the request resolves so a slow classifier cannot
        // cause a burst of requests.
        self.throttle.record_dispatch(now_ms);
        self.next_seq += 1;
        let seq = self.next_seq;

        debug!(seq, now_ms, in_flight = self.in_flight.len(), "Dispatching classify request");

        let client = self.client.clone();
        let display = Arc::clone(&self.display);
        self.in_flight.spawn(async move {
            let result = client.classify(&features).await;
            display.apply_prediction(seq, &result);
        });

        Ok(FrameOutcome::Dispatched { seq })
    }

    pub fn display(&self) -> Arc<DisplaySink> {
        Arc::clone(&self.display)
    }

    pub fn subscribe(&self) -> watch::Receiver<DisplayState> {
        self.display.subscribe()
    }

    pub fn current_display(&self) -> DisplayState {
        self.display.current()
    }

    pub fn throttle_state(&self) -> &ThrottleState {
        &self.throttle
    }

    /// Classify tasks started and not yet collected
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Wait for every outstanding classify task to finish
    pub async fn drain(&mut self) {
        while let Some(joined) = self.in_flight.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "Classify task failed");
            }
        }
    }

    fn reap_finished(&mut self) {
        while let Some(joined) = self.in_flight.try_join_next() {
            if let Err(e) = joined {
                warn!(error = %e, "Classify task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prediction_client::Classifier;
    use crate::models::landmark::{
        FeatureVector, HandDetection, LandmarkPoint, LANDMARK_COUNT,
    };
    use crate::models::prediction::{PipelineError, Prediction};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    /// Answers every request with the same result and counts calls
    struct CountingClassifier {
        calls: AtomicUsize,
        response: Option<Prediction>,
    }

    impl CountingClassifier {
        fn answering(prediction: Prediction) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: Some(prediction),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                response: None,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Classifier for CountingClassifier {
        async fn predict(&self, _features: &FeatureVector) -> PipelineResult<Prediction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response
                .clone()
                .ok_or_else(|| PipelineError::Transport("connection reset".to_string()))
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    /// Holds each request until the test releases it, keyed by the first keypoint
    struct GatedClassifier {
        gates: Mutex<HashMap<u32, oneshot::Receiver<Prediction>>>,
    }

    #[async_trait]
    impl Classifier for GatedClassifier {
        async fn predict(&self, features: &FeatureVector) -> PipelineResult<Prediction> {
            let key = features.as_slice()[0].to_bits();
            let gate = self.gates.lock().unwrap().remove(&key);
            match gate {
                Some(rx) => rx
                    .await
                    .map_err(|_| PipelineError::Transport("gate dropped".to_string())),
                None => Err(PipelineError::Protocol("unexpected request".to_string())),
            }
        }

        fn describe(&self) -> String {
            "gated".to_string()
        }
    }

    fn hand_frame(first_x: f32) -> DetectorOutput {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5, 0.0); LANDMARK_COUNT];
        points[0].x = first_x;
        DetectorOutput::with_hands(vec![HandDetection::new(points)])
    }

    fn pipeline(classifier: Arc<dyn Classifier>, discard_stale: bool) -> FramePipeline {
        FramePipeline::new(
            PredictionClient::new(classifier),
            PipelineOptions {
                min_interval_ms: 500,
                discard_stale_predictions: discard_stale,
            },
        )
    }

    #[tokio::test]
    async fn test_prediction_reaches_display() {
        let classifier = CountingClassifier::answering(Prediction::new("A", 0.92));
        let mut pipeline = pipeline(classifier.clone(), false);

        let outcome = pipeline.handle_detection(&hand_frame(0.5), 1_000).unwrap();
        assert_eq!(outcome, FrameOutcome::Dispatched { seq: 1 });
        pipeline.drain().await;

        assert_eq!(
            pipeline.current_display(),
            DisplayState::Prediction {
                label: "A".to_string(),
                confidence_percent: Some("92.0%".to_string()),
            }
        );
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_classifier_failure_shows_waiting_status() {
        let classifier = CountingClassifier::failing();
        let mut pipeline = pipeline(classifier.clone(), false);

        assert!(pipeline.handle_detection(&hand_frame(0.5), 1_000).is_ok());
        pipeline.drain().await;

        assert_eq!(
            pipeline.current_display(),
            DisplayState::status(DisplayStatus::WaitingForStableHand)
        );
        assert_eq!(classifier.calls(), 1);
    }

    #[tokio::test]
    async fn test_frames_inside_interval_are_dropped() {
        let classifier = CountingClassifier::answering(Prediction::new("B", 0.8));
        let mut pipeline = pipeline(classifier.clone(), false);

        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.5), 1_000).unwrap(),
            FrameOutcome::Dispatched { seq: 1 }
        );
        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.5), 1_100).unwrap(),
            FrameOutcome::Throttled
        );
        pipeline.drain().await;
        assert_eq!(classifier.calls(), 1);
        assert_eq!(pipeline.throttle_state().last_sent(), Some(1_000));
    }

    #[tokio::test]
    async fn test_frames_past_interval_are_both_sent() {
        let classifier = CountingClassifier::answering(Prediction::new("C", 0.7));
        let mut pipeline = pipeline(classifier.clone(), false);

        pipeline.handle_detection(&hand_frame(0.5), 1_000).unwrap();
        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.5), 1_600).unwrap(),
            FrameOutcome::Dispatched { seq: 2 }
        );
        pipeline.drain().await;
        assert_eq!(classifier.calls(), 2);
    }

    #[tokio::test]
    async fn test_exact_interval_is_throttled() {
        let classifier = CountingClassifier::answering(Prediction::new("D", 0.7));
        let mut pipeline = pipeline(classifier.clone(), false);

        pipeline.handle_detection(&hand_frame(0.5), 1_000).unwrap();
        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.5), 1_500).unwrap(),
            FrameOutcome::Throttled
        );
        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.5), 1_501).unwrap(),
            FrameOutcome::Dispatched { seq: 2 }
        );
        pipeline.drain().await;
        assert_eq!(classifier.calls(), 2);
    }

    #[tokio::test]
    async fn test_no_hand_and_invalid_hand_statuses() {
        let classifier = CountingClassifier::answering(Prediction::new("E", 0.9));
        let mut pipeline = pipeline(classifier.clone(), false);

        assert_eq!(
            pipeline.handle_detection(&DetectorOutput::empty(), 0).unwrap(),
            FrameOutcome::NoHand
        );
        assert_eq!(
            pipeline.current_display(),
            DisplayState::status(DisplayStatus::NoHandDetected)
        );

        let two_hands = DetectorOutput::with_hands(vec![
            hand_frame(0.1).hands.remove(0),
            hand_frame(0.2).hands.remove(0),
        ]);
        assert_eq!(
            pipeline.handle_detection(&two_hands, 10).unwrap(),
            FrameOutcome::InvalidHand
        );
        assert_eq!(
            pipeline.current_display(),
            DisplayState::status(DisplayStatus::InvalidHandData)
        );

        assert_eq!(classifier.calls(), 0);
        assert_eq!(pipeline.throttle_state().last_sent(), None);
    }

    #[tokio::test]
    async fn test_throttled_frame_keeps_previous_display() {
        let classifier = CountingClassifier::answering(Prediction::new("F", 0.66));
        let mut pipeline = pipeline(classifier.clone(), false);

        pipeline.handle_detection(&hand_frame(0.5), 1_000).unwrap();
        pipeline.drain().await;
        let shown = pipeline.current_display();

        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.5), 1_200).unwrap(),
            FrameOutcome::Throttled
        );
        assert_eq!(pipeline.current_display(), shown);
    }

    #[tokio::test]
    async fn test_throttle_starts_before_response_arrives() {
        let (tx, rx) = oneshot::channel();
        let gates = HashMap::from([(0.1f32.to_bits(), rx)]);
        let classifier = Arc::new(GatedClassifier {
            gates: Mutex::new(gates),
        });
        let mut pipeline = pipeline(classifier, false);

        pipeline.handle_detection(&hand_frame(0.1), 1_000).unwrap();
        assert_eq!(pipeline.in_flight(), 1);
        assert_eq!(
            pipeline.handle_detection(&hand_frame(0.1), 1_300).unwrap(),
            FrameOutcome::Throttled
        );

        tx.send(Prediction::new("G", 0.5)).unwrap();
        pipeline.drain().await;
        assert_eq!(pipeline.current_display().label(), "G");
    }

    async fn run_out_of_order(discard_stale: bool) -> DisplayState {
        let (tx_first, rx_first) = oneshot::channel();
        let (tx_second, rx_second) = oneshot::channel();
        let gates = HashMap::from([(0.1f32.to_bits(), rx_first), (0.2f32.to_bits(), rx_second)]);
        let classifier = Arc::new(GatedClassifier {
            gates: Mutex::new(gates),
        });
        let mut pipeline = pipeline(classifier, discard_stale);
        let display = pipeline.display();
        let mut rx = pipeline.subscribe();

        pipeline.handle_detection(&hand_frame(0.1), 1_000).unwrap();
        pipeline.handle_detection(&hand_frame(0.2), 1_600).unwrap();

        // The newer request resolves first, then the older one
        tx_second.send(Prediction::new("NEW", 0.9)).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(display.current().label(), "NEW");

        tx_first.send(Prediction::new("OLD", 0.4)).unwrap();
        pipeline.drain().await;
        pipeline.current_display()
    }

    #[tokio::test]
    async fn test_last_resolved_result_wins() {
        assert_eq!(run_out_of_order(false).await.label(), "OLD");
    }

    #[tokio::test]
    async fn test_stale_result_discarded_when_enabled() {
        assert_eq!(run_out_of_order(true).await.label(), "NEW");
    }
}
