//! Migration report persisted at the end of every run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use super::classification::{Archetype, Classification};
use super::monitor::{MonitorRecord, MonitorSummary};

/// Result of migrating a single monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorOutcome {
    pub monitor_name: String,
    pub monitor_guid: String,
    pub original_type: Option<String>,
    pub success: bool,
    pub elastic_type: Option<Archetype>,
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
    pub errors: Vec<String>,
}

impl MonitorOutcome {
    /// A failure for a monitor whose details could not be processed at all.
    pub fn failed(summary: &MonitorSummary, errors: Vec<String>) -> Self {
        Self {
            monitor_name: summary.name.clone(),
            monitor_guid: summary.guid.clone(),
            original_type: summary.monitor_type.as_ref().map(|t| t.to_string()),
            success: false,
            elastic_type: None,
            confidence: 0.0,
            reasoning: None,
            output_file: None,
            errors,
        }
    }

    /// A failure after the record was fetched, optionally carrying the classification reached.
    pub fn rejected(record: &MonitorRecord, classification: Option<&Classification>, errors: Vec<String>) -> Self {
        Self {
            monitor_name: record.name.clone(),
            monitor_guid: record.guid.clone(),
            original_type: Some(record.monitor_type.to_string()),
            success: false,
            elastic_type: classification.map(|c| c.archetype),
            confidence: classification.map_or(0.0, |c| c.confidence),
            reasoning: classification.map(|c| c.reasoning.clone()),
            output_file: None,
            errors,
        }
    }

    pub fn migrated(record: &MonitorRecord, classification: &Classification, output_file: String) -> Self {
        Self {
            monitor_name: record.name.clone(),
            monitor_guid: record.guid.clone(),
            original_type: Some(record.monitor_type.to_string()),
            success: true,
            elastic_type: Some(classification.archetype),
            confidence: classification.confidence,
            reasoning: Some(classification.reasoning.clone()),
            output_file: Some(output_file),
            errors: Vec::new(),
        }
    }
}

/// Successful migrations bucketed by output kind and archetype. Every archetype has a bucket,
/// empty ones included.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorStats {
    pub lightweight: usize,
    pub journey: usize,
    pub by_archetype: BTreeMap<Archetype, usize>,
}

impl Default for MonitorStats {
    fn default() -> Self {
        Self {
            lightweight: 0,
            journey: 0,
            by_archetype: Archetype::ALL.into_iter().map(|archetype| (archetype, 0)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub generated_at: DateTime<Utc>,
    pub name_pattern: Option<String>,
    pub total_monitors: usize,
    pub successful_migrations: usize,
    pub failed_migrations: usize,
    pub monitors: Vec<MonitorOutcome>,
    pub monitor_stats: MonitorStats,
}

impl MigrationReport {
    pub fn new(name_pattern: Option<String>, total_monitors: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            name_pattern,
            total_monitors,
            successful_migrations: 0,
            failed_migrations: 0,
            monitors: Vec::new(),
            monitor_stats: MonitorStats::default(),
        }
    }

    pub fn record(&mut self, outcome: MonitorOutcome) {
        if outcome.success {
            self.successful_migrations += 1;
            if let Some(archetype) = outcome.elastic_type {
                if archetype.is_lightweight() {
                    self.monitor_stats.lightweight += 1;
                } else {
                    self.monitor_stats.journey += 1;
                }
                *self.monitor_stats.by_archetype.entry(archetype).or_default() += 1;
            }
        } else {
            self.failed_migrations += 1;
        }
        self.monitors.push(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::classification::{ClassificationOrigin, RecommendedConfig};

    #[test]
    fn test_record_updates_counters_and_buckets() {
        let ping = MonitorRecord::new("g1", "DNS resolver", "Ping");
        let checkout = MonitorRecord::new("g2", "Checkout", "Transaction");
        let icmp = Classification::new(Archetype::Icmp, 0.98, ClassificationOrigin::Rule, "ping", RecommendedConfig::default());
        let browser = Classification::new(
            Archetype::Browser,
            0.9,
            ClassificationOrigin::Fallback,
            "transaction",
            RecommendedConfig::default(),
        );

        let mut report = MigrationReport::new(Some("prod".to_string()), 3);
        report.record(MonitorOutcome::migrated(&ping, &icmp, "lightweight/dns_resolver.yml".to_string()));
        report.record(MonitorOutcome::migrated(&checkout, &browser, "journey/checkout.journey.ts".to_string()));
        report.record(MonitorOutcome::rejected(&ping, Some(&icmp), vec!["Invalid location: mars".to_string()]));

        assert_eq!(report.successful_migrations, 2);
        assert_eq!(report.failed_migrations, 1);
        assert_eq!(report.monitor_stats.lightweight, 1);
        assert_eq!(report.monitor_stats.journey, 1);
        assert_eq!(report.monitor_stats.by_archetype.get(&Archetype::Icmp), Some(&1));
        assert_eq!(report.monitor_stats.by_archetype.get(&Archetype::Http), Some(&0));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["monitor_stats"]["by_archetype"]["browser"], 1);
        assert_eq!(json["monitors"][2]["errors"][0], "Invalid location: mars");
    }

    #[test]
    fn test_empty_report_lists_every_archetype() {
        let json = serde_json::to_value(MigrationReport::new(None, 0)).unwrap();
        assert_eq!(
            json["monitor_stats"]["by_archetype"],
            serde_json::json!({"http": 0, "tcp": 0, "icmp": 0, "browser": 0})
        );
    }
}
