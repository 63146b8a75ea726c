// Prediction client - sends keypoint vectors to the remote classifier
//
// Transport and protocol failures stop here: `PredictionClient::classify`
// always resolves to a `PredictionResult`, so one bad request never reaches
// the frame loop.

use crate::core::config::Config;
use crate::models::landmark::FeatureVector;
use crate::models::prediction::{
    ClassifyRequest, ClassifyResponse, HealthResponse, PipelineError, PipelineResult, Prediction,
    PredictionResult,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Remote classification backend
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Classify one keypoint vector. Errors are `Transport` or `Protocol`.
    async fn predict(&self, features: &FeatureVector) -> PipelineResult<Prediction>;

    /// Human-readable description of the backend, for logs
    fn describe(&self) -> String;
}

// ==============================================================================
// HTTP Classifier
// ==============================================================================

/// Classifier reached over HTTP: `POST {keypoints: [63 floats]}` and
/// `{prediction, confidence}` back
pub struct HttpClassifier {
    client: Client,
    endpoint: Url,
}

impl HttpClassifier {
    /// Build a client for `endpoint`. No timeout is set unless one is given;
    /// the transport's own limits apply otherwise.
    pub fn new(endpoint: &str, timeout: Option<Duration>) -> PipelineResult<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            PipelineError::InvalidConfig(format!("Invalid classifier endpoint {}: {}", endpoint, e))
        })?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| PipelineError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &Config) -> PipelineResult<Self> {
        Self::new(
            &config.classifier_endpoint,
            config.request_timeout_ms.map(Duration::from_millis),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Query the service root (`GET /`) and return its reported status
    pub async fn health(&self) -> PipelineResult<String> {
        let url = self
            .endpoint
            .join("/")
            .map_err(|e| PipelineError::InvalidConfig(format!("Invalid health URL: {}", e)))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(PipelineError::Protocol(format!("Health check returned {}", status)));
        }

        let health: HealthResponse = serde_json::from_slice(&body)
            .map_err(|e| PipelineError::Protocol(format!("Malformed health response: {}", e)))?;
        Ok(health.status)
    }
}

#[async_trait]
impl Classifier for HttpClassifier {
    async fn predict(&self, features: &FeatureVector) -> PipelineResult<Prediction> {
        let request = ClassifyRequest {
            keypoints: features.as_slice(),
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        parse_prediction(status, &body)
    }

    fn describe(&self) -> String {
        format!("HTTP classifier at {}", self.endpoint)
    }
}

/// Turn a classifier HTTP response into a prediction.
///
/// Anything but a 2xx status with a non-empty `prediction` string is a
/// protocol error. `confidence` is optional and is not range-checked.
pub fn parse_prediction(status: StatusCode, body: &[u8]) -> PipelineResult<Prediction> {
    if !status.is_success() {
        return Err(PipelineError::Protocol(format!("Classifier returned {}", status)));
    }

    let response: ClassifyResponse = serde_json::from_slice(body)
        .map_err(|e| PipelineError::Protocol(format!("Malformed response body: {}", e)))?;

    let label = match response.prediction {
        Some(label) if !label.is_empty() => label,
        _ => return Err(PipelineError::Protocol("Response is missing a prediction".to_string())),
    };

    Ok(Prediction {
        label,
        confidence: response.confidence,
    })
}

// ==============================================================================
// Fail-soft Client
// ==============================================================================

/// Wraps a classifier and folds every failure into `PredictionResult::Unavailable`
#[derive(Clone)]
pub struct PredictionClient {
    classifier: Arc<dyn Classifier>,
}

impl PredictionClient {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub async fn classify(&self, features: &FeatureVector) -> PredictionResult {
        match self.classifier.predict(features).await {
            Ok(prediction) => {
                debug!(label = %prediction.label, confidence = ?prediction.confidence, "Prediction received");
                PredictionResult::Available(prediction)
            }
            Err(e) => {
                warn!(error = %e, "Prediction unavailable");
                PredictionResult::Unavailable
            }
        }
    }

    pub fn describe(&self) -> String {
        self.classifier.describe()
    }
}
