//! Classification results: which Elastic Synthetics monitor type a source monitor becomes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Target monitor archetype. `Browser` is the scripted-check (journey) archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    Http,
    Tcp,
    Icmp,
    Browser,
}

impl Archetype {
    pub const ALL: [Archetype; 4] = [Archetype::Http, Archetype::Tcp, Archetype::Icmp, Archetype::Browser];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Http => "http",
            Archetype::Tcp => "tcp",
            Archetype::Icmp => "icmp",
            Archetype::Browser => "browser",
        }
    }

    /// Lightweight archetypes are persisted as YAML; browser monitors as journey scripts.
    pub fn is_lightweight(&self) -> bool {
        !matches!(self, Archetype::Browser)
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Archetype {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Archetype::ALL
            .into_iter()
            .find(|archetype| archetype.as_str() == s)
            .ok_or_else(|| format!("unknown monitor type '{s}'"))
    }
}

/// Where a classification came from. Rendered as a prefix on the reasoning string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassificationOrigin {
    Rule,
    Inference,
    Fallback,
}

impl ClassificationOrigin {
    fn tag(&self) -> &'static str {
        match self {
            ClassificationOrigin::Rule => "RULE",
            ClassificationOrigin::Inference => "AI",
            ClassificationOrigin::Fallback => "FALLBACK",
        }
    }
}

/// Recommended monitor settings attached to a classification.
///
/// The inference backend may send keys we do not model; they are kept in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendedConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redirects: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RecommendedConfig {
    /// Schedule, timeout and a single location; the shape every classifier starts from.
    pub fn basic(schedule: &str, timeout: &str, location: &str) -> Self {
        Self {
            schedule: Some(schedule.to_string()),
            timeout: Some(timeout.to_string()),
            locations: Some(vec![location.to_string()]),
            ..Default::default()
        }
    }

    pub fn with_max_redirects(mut self, max_redirects: u32) -> Self {
        self.max_redirects = Some(max_redirects);
        self
    }

    pub fn with_mode(mut self, mode: &str) -> Self {
        self.mode = Some(mode.to_string());
        self
    }

    pub fn with_wait(mut self, wait: &str) -> Self {
        self.wait = Some(wait.to_string());
        self
    }
}

/// Output of the classification stage. Created per monitor and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub archetype: Archetype,
    /// Self-reported certainty in `[0.0, 1.0]`
    pub confidence: f64,
    /// Human-readable explanation, prefixed with its origin tag (`RULE:`, `AI:`, `FALLBACK:`)
    pub reasoning: String,
    pub origin: ClassificationOrigin,
    pub recommended_config: RecommendedConfig,
}

impl Classification {
    pub fn new(
        archetype: Archetype,
        confidence: f64,
        origin: ClassificationOrigin,
        reasoning: impl AsRef<str>,
        recommended_config: RecommendedConfig,
    ) -> Self {
        Self {
            archetype,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: format!("{}: {}", origin.tag(), reasoning.as_ref()),
            origin,
            recommended_config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_archetype_from_str() {
        assert_eq!("icmp".parse::<Archetype>(), Ok(Archetype::Icmp));
        assert!("ICMP".parse::<Archetype>().is_err());
        assert!("grpc".parse::<Archetype>().is_err());
    }

    #[test]
    fn test_reasoning_is_tagged_with_origin() {
        let classification = Classification::new(
            Archetype::Http,
            0.8,
            ClassificationOrigin::Inference,
            "simple page check",
            RecommendedConfig::default(),
        );
        assert_eq!(classification.reasoning, "AI: simple page check");
    }

    #[test]
    fn test_recommended_config_keeps_unknown_keys() {
        let config: RecommendedConfig = serde_json::from_value(json!({
            "schedule": "@every 5m",
            "timeout": "30s",
            "locations": ["us_central", "us_east"],
            "max_redirects": 3,
            "additional_config": {"ssl": true}
        }))
        .unwrap();

        assert_eq!(config.max_redirects, Some(3));
        assert_eq!(config.locations.as_ref().map(Vec::len), Some(2));
        assert_eq!(config.extra["additional_config"], json!({"ssl": true}));
    }
}
