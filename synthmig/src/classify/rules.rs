//! Deterministic classification for simple monitors.
//!
//! Records carrying any scripted or multi-step signal are never classified here; they defer to
//! the inference backend. Everything else is looked up by source type:
//!
//! | source type              | archetype | confidence | extras                  |
//! |--------------------------|-----------|------------|-------------------------|
//! | http, https              | http      | 0.95       | max_redirects 3, mode any |
//! | ping                     | icmp      | 0.98       | wait 1s                 |
//! | tcp                      | tcp       | 0.95       |                         |
//! | dns                      | icmp      | 0.85       | wait 1s                 |
//! | smtp, pop3, imap, sftp   | tcp       | 0.90       |                         |

use async_trait::async_trait;
use tracing::debug;

use super::Classifier;
use crate::models::{Archetype, Classification, ClassificationOrigin, MonitorRecord, RecommendedConfig, SourceMonitorType};

/// Interval assumed when the source record does not carry one.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 300;

pub(crate) const DEFAULT_LOCATION: &str = "us_central";

/// Upper bounds (inclusive, seconds) of each schedule bucket.
const SCHEDULE_BUCKETS: [(u64, &str); 7] = [
    (60, "@every 1m"),
    (180, "@every 3m"),
    (300, "@every 5m"),
    (600, "@every 10m"),
    (900, "@every 15m"),
    (1800, "@every 30m"),
    (3600, "@every 1h"),
];

/// Intervals above the last bucket fall back to this schedule rather than being rejected.
const SCHEDULE_OVERFLOW: &str = "@every 5m";

/// Map a check interval in seconds onto the nearest schedule bucket at or above it.
pub fn schedule_for_interval(interval_secs: u64) -> &'static str {
    SCHEDULE_BUCKETS
        .iter()
        .find(|(upper, _)| interval_secs <= *upper)
        .map_or(SCHEDULE_OVERFLOW, |&(_, schedule)| schedule)
}

/// The rule classifier. Stateless; pure function of the record.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn classify_record(&self, record: &MonitorRecord) -> Option<Classification> {
        if let Some(signal) = record.complexity_signal() {
            debug!(monitor = %record.name, signal, "Deferring classification, record is not simple");
            return None;
        }

        let schedule = schedule_for_interval(record.check_interval.unwrap_or(DEFAULT_CHECK_INTERVAL_SECS));
        let kind = record.monitor_type.as_str().to_uppercase();

        let (archetype, confidence, reasoning, config) = match record.monitor_type {
            SourceMonitorType::Http | SourceMonitorType::Https => (
                Archetype::Http,
                0.95,
                format!("Simple {kind} monitor without complex features"),
                RecommendedConfig::basic(schedule, "30s", DEFAULT_LOCATION)
                    .with_max_redirects(3)
                    .with_mode("any"),
            ),
            SourceMonitorType::Ping => (
                Archetype::Icmp,
                0.98,
                "Ping monitor maps directly to ICMP".to_string(),
                RecommendedConfig::basic(schedule, "10s", DEFAULT_LOCATION).with_wait("1s"),
            ),
            SourceMonitorType::Tcp => (
                Archetype::Tcp,
                0.95,
                "TCP monitor maps directly".to_string(),
                RecommendedConfig::basic(schedule, "30s", DEFAULT_LOCATION),
            ),
            SourceMonitorType::Dns => (
                Archetype::Icmp,
                0.85,
                "DNS monitor can be verified with ICMP".to_string(),
                RecommendedConfig::basic(schedule, "10s", DEFAULT_LOCATION).with_wait("1s"),
            ),
            SourceMonitorType::Smtp | SourceMonitorType::Pop3 | SourceMonitorType::Imap | SourceMonitorType::Sftp => (
                Archetype::Tcp,
                0.90,
                format!("{kind} monitor is verified with TCP"),
                RecommendedConfig::basic(schedule, "30s", DEFAULT_LOCATION),
            ),
            _ => return None,
        };

        Some(Classification::new(archetype, confidence, ClassificationOrigin::Rule, reasoning, config))
    }
}

#[async_trait]
impl Classifier for RuleClassifier {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn classify(&self, record: &MonitorRecord) -> Option<Classification> {
        self.classify_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(monitor_type: &str, interval: Option<u64>) -> MonitorRecord {
        MonitorRecord {
            url: Some("https://example.com".to_string()),
            check_interval: interval,
            ..MonitorRecord::new("guid", "Monitor", monitor_type)
        }
    }

    #[test]
    fn test_schedule_buckets() {
        let cases = [
            (0, "@every 1m"),
            (45, "@every 1m"),
            (60, "@every 1m"),
            (61, "@every 3m"),
            (180, "@every 3m"),
            (300, "@every 5m"),
            (301, "@every 10m"),
            (900, "@every 15m"),
            (1800, "@every 30m"),
            (3600, "@every 1h"),
            (3601, "@every 5m"),
            (u64::MAX, "@every 5m"),
        ];
        for (interval, expected) in cases {
            assert_eq!(schedule_for_interval(interval), expected, "interval {interval}");
        }
    }

    #[test]
    fn test_schedule_is_monotonic_up_to_an_hour() {
        let minutes = |schedule: &str| -> u64 {
            let value = schedule.trim_start_matches("@every ");
            match value.strip_suffix('h') {
                Some(hours) => hours.parse::<u64>().unwrap() * 60,
                None => value.trim_end_matches('m').parse().unwrap(),
            }
        };
        let mut previous = 0;
        for interval in 0..=3600 {
            let current = minutes(schedule_for_interval(interval));
            assert!(current >= previous, "schedule went down at {interval}s");
            previous = current;
        }
    }

    #[test]
    fn test_rule_table() {
        let cases = [
            ("Http", Archetype::Http, 0.95),
            ("https", Archetype::Http, 0.95),
            ("Ping", Archetype::Icmp, 0.98),
            ("Tcp", Archetype::Tcp, 0.95),
            ("Dns", Archetype::Icmp, 0.85),
            ("Smtp", Archetype::Tcp, 0.90),
            ("Pop3", Archetype::Tcp, 0.90),
            ("Imap", Archetype::Tcp, 0.90),
            ("Sftp", Archetype::Tcp, 0.90),
        ];
        for (monitor_type, archetype, confidence) in cases {
            let classification = RuleClassifier.classify_record(&record(monitor_type, Some(120))).unwrap();
            assert_eq!(classification.archetype, archetype, "{monitor_type}");
            assert_eq!(classification.confidence, confidence, "{monitor_type}");
            assert_eq!(classification.origin, ClassificationOrigin::Rule);
            assert!(classification.reasoning.starts_with("RULE: "));
            assert_eq!(classification.recommended_config.schedule.as_deref(), Some("@every 3m"));
        }
    }

    #[test]
    fn test_archetype_extras() {
        let http = RuleClassifier.classify_record(&record("Https", None)).unwrap();
        assert_eq!(http.recommended_config.max_redirects, Some(3));
        assert_eq!(http.recommended_config.mode.as_deref(), Some("any"));
        assert_eq!(http.recommended_config.timeout.as_deref(), Some("30s"));
        assert_eq!(http.recommended_config.schedule.as_deref(), Some("@every 5m"));
        assert_eq!(http.reasoning, "RULE: Simple HTTPS monitor without complex features");

        let dns = RuleClassifier.classify_record(&record("Dns", Some(600))).unwrap();
        assert_eq!(dns.recommended_config.wait.as_deref(), Some("1s"));
        assert_eq!(dns.recommended_config.timeout.as_deref(), Some("10s"));
        assert_eq!(dns.recommended_config.schedule.as_deref(), Some("@every 10m"));

        let smtp = RuleClassifier.classify_record(&record("Smtp", None)).unwrap();
        assert_eq!(smtp.recommended_config.max_redirects, None);
        assert_eq!(smtp.reasoning, "RULE: SMTP monitor is verified with TCP");
    }

    #[test]
    fn test_unmatched_types_defer() {
        for monitor_type in ["Ftp", "Udp", "Certificate", ""] {
            assert!(RuleClassifier.classify_record(&record(monitor_type, None)).is_none(), "{monitor_type}");
        }
    }

    #[test]
    fn test_complexity_signals_always_defer() {
        for monitor_type in ["Http", "Https", "Ping", "Tcp", "Dns", "Smtp"] {
            let scripted = MonitorRecord {
                transaction_script: Some("navigate".to_string()),
                ..record(monitor_type, None)
            };
            assert!(RuleClassifier.classify_record(&scripted).is_none());

            let multi_step = MonitorRecord {
                multi_step_api_script: Some("step 1".to_string()),
                ..record(monitor_type, None)
            };
            assert!(RuleClassifier.classify_record(&multi_step).is_none());

            let browser = MonitorRecord {
                browser_type: Some("Chrome".to_string()),
                ..record(monitor_type, None)
            };
            assert!(RuleClassifier.classify_record(&browser).is_none());
        }

        assert!(RuleClassifier.classify_record(&record("Transaction", None)).is_none());
        assert!(RuleClassifier.classify_record(&record("MultiStepApi", None)).is_none());
    }
}
