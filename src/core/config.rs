use crate::models::landmark::DetectorConfig;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Classifier URL that receives `POST {keypoints: [...]}`
    pub classifier_endpoint: String,
    /// Minimum gap between two classify requests (ms)
    pub throttle_interval_ms: u64,
    /// Per-request timeout (ms); unset leaves only the transport's own limits
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
    /// Drop a prediction that resolves after a newer one was already shown
    #[serde(default)]
    pub discard_stale_predictions: bool,
    /// Settings handed to the hand tracker
    #[serde(default)]
    pub detector: DetectorConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            classifier_endpoint: "http://127.0.0.1:8000/predict".to_string(),
            throttle_interval_ms: 500,
            request_timeout_ms: None,
            discard_stale_predictions: false,
            detector: DetectorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it with defaults if missing
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, creating it with defaults if missing
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        let endpoint = Url::parse(&self.classifier_endpoint).map_err(|e| {
            format!(
                "Invalid classifier endpoint: {} ({})",
                self.classifier_endpoint, e
            )
        })?;
        if endpoint.scheme() != "http" && endpoint.scheme() != "https" {
            return Err(format!(
                "Invalid classifier endpoint scheme: {}. Must be http or https",
                endpoint.scheme()
            )
            .into());
        }

        if self.throttle_interval_ms == 0 || self.throttle_interval_ms > 60_000 {
            return Err(format!(
                "Invalid throttle interval: {}. Must be between 1 and 60000 ms",
                self.throttle_interval_ms
            )
            .into());
        }

        if let Some(timeout) = self.request_timeout_ms {
            if timeout == 0 || timeout > 120_000 {
                return Err(format!(
                    "Invalid request timeout: {}. Must be between 1 and 120000 ms",
                    timeout
                )
                .into());
            }
        }

        // Multi-hand tracking is not supported
        if self.detector.max_num_hands != 1 {
            return Err(format!(
                "Invalid max_num_hands: {}. Only single-hand mode (1) is supported",
                self.detector.max_num_hands
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.detector.min_detection_confidence) {
            return Err(format!(
                "Invalid detection confidence: {}. Must be between 0.0 and 1.0",
                self.detector.min_detection_confidence
            )
            .into());
        }

        if !(0.0..=1.0).contains(&self.detector.min_tracking_confidence) {
            return Err(format!(
                "Invalid tracking confidence: {}. Must be between 0.0 and 1.0",
                self.detector.min_tracking_confidence
            )
            .into());
        }

        Ok(())
    }

    /// Reset the default location to the default configuration
    pub fn reset() -> Result<Self, Box<dyn std::error::Error>> {
        Self::reset_at(&Self::config_path()?)
    }

    pub fn reset_at(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| "Could not determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".signlens");
        path.push("config");
        path.push("settings.json");

        Ok(path)
    }
}
