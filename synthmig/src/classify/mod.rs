//! Monitor classification.
//!
//! Classification is a fixed-order chain of [`Classifier`] links ending in the infallible
//! [`FallbackClassifier`]:
//!
//! 1. [`RuleClassifier`] for simple monitors (skipped when hybrid classification is disabled)
//! 2. [`InferenceClassifier`] for everything the rules decline
//! 3. [`FallbackClassifier`] when inference is unreachable or its output is unusable
//!
//! The first link that produces a classification wins.

use async_trait::async_trait;
use tracing::debug;

use crate::config::{ClassificationConfig, InferenceConfig};
use crate::errors::Result;
use crate::models::{Archetype, Classification, MonitorRecord, ValidationResult};

pub mod extract;
pub mod fallback;
pub mod inference;
pub mod rules;

pub use fallback::FallbackClassifier;
pub use inference::{InferenceClassifier, InferenceError};
pub use rules::{RuleClassifier, schedule_for_interval};

/// Classifications below this confidence are reported as violations.
pub const MIN_CONFIDENCE: f64 = 0.70;

/// One link of the classification chain. Returning `None` defers to the next link.
#[async_trait]
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    async fn classify(&self, record: &MonitorRecord) -> Option<Classification>;
}

pub struct ClassifierChain {
    links: Vec<Box<dyn Classifier>>,
    terminal: FallbackClassifier,
}

impl ClassifierChain {
    pub fn new(links: Vec<Box<dyn Classifier>>) -> Self {
        Self {
            links,
            terminal: FallbackClassifier,
        }
    }

    /// Rules first (when hybrid), then inference, then the fallback table.
    pub fn from_config(classification: &ClassificationConfig, inference: InferenceConfig) -> Result<Self> {
        let mut links: Vec<Box<dyn Classifier>> = Vec::new();
        if classification.hybrid {
            links.push(Box::new(RuleClassifier));
        }
        links.push(Box::new(InferenceClassifier::new(inference)?));
        Ok(Self::new(links))
    }

    pub async fn classify(&self, record: &MonitorRecord) -> Classification {
        for link in &self.links {
            if let Some(classification) = link.classify(record).await {
                debug!(monitor = %record.name, classifier = link.name(), archetype = %classification.archetype, "Classified");
                return classification;
            }
        }
        debug!(monitor = %record.name, classifier = "fallback", "Classified");
        self.terminal.classify(record)
    }
}

/// Shape check on a classification's recommended configuration.
///
/// Low confidence is reported alongside any missing field; the caller decides what to do.
pub fn validate_classification(classification: &Classification) -> ValidationResult {
    let mut result = ValidationResult::new();
    let config = &classification.recommended_config;

    if classification.confidence < MIN_CONFIDENCE {
        result.push("Very low confidence in classification");
    }
    if config.schedule.is_none() {
        result.push("Missing schedule configuration");
    }
    if config.timeout.is_none() {
        result.push("Missing timeout configuration");
    }
    if config.locations.as_ref().is_none_or(Vec::is_empty) {
        result.push("Missing locations configuration");
    }
    if classification.archetype == Archetype::Http && config.max_redirects.is_none() {
        result.push("HTTP monitor must have max_redirects configured");
    }

    result
}
