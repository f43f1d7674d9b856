//! Network-free classification used when inference is unavailable or unusable.

use crate::models::{Archetype, Classification, ClassificationOrigin, MonitorRecord, RecommendedConfig, SourceMonitorType};

use super::rules::DEFAULT_LOCATION;

/// Terminal classifier of the chain. Infallible: every record gets an archetype.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackClassifier;

impl FallbackClassifier {
    pub fn classify(&self, record: &MonitorRecord) -> Classification {
        let (archetype, confidence, reasoning, config) = match record.monitor_type {
            SourceMonitorType::Transaction | SourceMonitorType::MultiStepApi => (
                Archetype::Browser,
                0.9,
                "Transaction monitor requires browser",
                RecommendedConfig::basic("@every 5m", "60s", DEFAULT_LOCATION),
            ),
            SourceMonitorType::Ping => (
                Archetype::Icmp,
                0.95,
                "Ping monitor uses ICMP",
                RecommendedConfig::basic("@every 1m", "10s", DEFAULT_LOCATION),
            ),
            SourceMonitorType::Http | SourceMonitorType::Https => (
                Archetype::Http,
                0.8,
                "Simple HTTP monitor",
                RecommendedConfig::basic("@every 3m", "30s", DEFAULT_LOCATION).with_max_redirects(3),
            ),
            _ => (
                Archetype::Http,
                0.5,
                "Unknown type, using HTTP as default",
                RecommendedConfig::basic("@every 5m", "30s", DEFAULT_LOCATION),
            ),
        };

        Classification::new(archetype, confidence, ClassificationOrigin::Fallback, reasoning, config)
    }
}
