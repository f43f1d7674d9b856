//! The migration driver.
//!
//! For each selected monitor, sequentially: fetch details, classify, check the classification
//! shape, generate, strictly validate (plus the script check for browser monitors) and write. A
//! monitor that fails at any step is recorded in the report and the batch moves on.

use tracing::{error, info, instrument, warn};

use crate::classify::{ClassifierChain, validate_classification};
use crate::config::{Config, OutputConfig};
use crate::errors::Result;
use crate::generator::ConfigGenerator;
use crate::models::{Archetype, MigrationReport, MonitorOutcome, MonitorRecord, MonitorSummary};
use crate::output::ArtifactWriter;
use crate::source::{FetchMonitors, FetchMonitorsReqwest, filter_summaries};
use crate::validator::{StrictValidator, validate_script};

pub struct Migration {
    source: Box<dyn FetchMonitors>,
    classifier: ClassifierChain,
    generator: ConfigGenerator,
    validator: StrictValidator,
    output: OutputConfig,
    predefined: Vec<MonitorSummary>,
    monitor_limit: Option<usize>,
}

impl Migration {
    /// Wire a driver around an existing source and classifier chain.
    pub fn new(source: Box<dyn FetchMonitors>, classifier: ClassifierChain, config: &Config) -> Self {
        Self {
            source,
            classifier,
            generator: ConfigGenerator::new(config.generation.clone()),
            validator: StrictValidator::new(&config.validation),
            output: config.output.clone(),
            predefined: config.source.monitors.clone(),
            monitor_limit: config.source.monitor_limit,
        }
    }

    /// Build the production driver. Fails before touching any monitor when credentials are missing.
    pub fn from_config(config: &Config) -> Result<Self> {
        let source = FetchMonitorsReqwest::new(&config.source)?;
        let classifier = ClassifierChain::from_config(&config.classification, config.inference.clone())?;
        Ok(Self::new(Box::new(source), classifier, config))
    }

    /// Monitors to migrate: the predefined list when configured, otherwise the source listing.
    pub async fn select(&self, name_pattern: Option<&str>, limit: Option<usize>) -> Result<Vec<MonitorSummary>> {
        let limit = limit.or(self.monitor_limit);
        if !self.predefined.is_empty() {
            info!("Using predefined list of {} monitors", self.predefined.len());
            return Ok(filter_summaries(self.predefined.iter().cloned(), name_pattern, limit));
        }

        let mut monitors = self.source.list_monitors(name_pattern).await?;
        if let Some(limit) = limit {
            monitors.truncate(limit);
        }
        Ok(monitors)
    }

    /// Run a full migration and persist its report.
    pub async fn run(&self, name_pattern: Option<&str>, limit: Option<usize>) -> Result<MigrationReport> {
        let mut writer = ArtifactWriter::new(self.output.clone())?;
        let monitors = self.select(name_pattern, limit).await?;
        if monitors.is_empty() {
            warn!(pattern = ?name_pattern, "No monitors matched");
        } else {
            info!("Migrating {} monitors", monitors.len());
        }

        let mut report = MigrationReport::new(name_pattern.map(str::to_string), monitors.len());
        for (index, summary) in monitors.iter().enumerate() {
            info!("[{}/{}] Processing {}", index + 1, monitors.len(), summary.name);
            let outcome = self.migrate_one(summary, &mut writer).await;
            if outcome.success {
                info!(
                    monitor = %outcome.monitor_name,
                    archetype = ?outcome.elastic_type,
                    output = ?outcome.output_file,
                    "Migrated"
                );
            } else {
                error!(monitor = %outcome.monitor_name, errors = ?outcome.errors, "Migration failed");
            }
            report.record(outcome);
        }

        writer.write_report(&report)?;
        info!(
            total = report.total_monitors,
            successful = report.successful_migrations,
            failed = report.failed_migrations,
            "Migration finished"
        );
        Ok(report)
    }

    #[instrument(skip(self, summary, writer), fields(monitor = %summary.name, guid = %summary.guid))]
    async fn migrate_one(&self, summary: &MonitorSummary, writer: &mut ArtifactWriter) -> MonitorOutcome {
        match self.source.fetch_monitor(&summary.guid).await {
            Ok(record) => self.process(&record, writer).await,
            Err(e) => MonitorOutcome::failed(summary, vec![format!("Could not fetch monitor details: {e}")]),
        }
    }

    async fn process(&self, record: &MonitorRecord, writer: &mut ArtifactWriter) -> MonitorOutcome {
        let classification = self.classifier.classify(record).await;

        let shape = validate_classification(&classification);
        if !shape.is_valid() {
            return MonitorOutcome::rejected(record, Some(&classification), shape.into_violations());
        }

        let generated = self.generator.generate(record, &classification);
        let document = match generated.to_document() {
            Ok(document) => document,
            Err(e) => return MonitorOutcome::rejected(record, Some(&classification), vec![e.to_string()]),
        };

        let mut validation = self.validator.validate(&document, classification.archetype);
        if classification.archetype == Archetype::Browser {
            validation.merge(validate_script(generated.script().unwrap_or_default()));
        }
        if !validation.is_valid() {
            return MonitorOutcome::rejected(record, Some(&classification), validation.into_violations());
        }

        match writer.write_monitor(&generated) {
            Ok(output_file) => MonitorOutcome::migrated(record, &classification, output_file),
            Err(e) => MonitorOutcome::rejected(record, Some(&classification), vec![e.to_string()]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::RuleClassifier;
    use crate::source::StaticMonitorsFetcher;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> Config {
        Config {
            output: OutputConfig {
                base_dir: dir.path().to_path_buf(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn records() -> Vec<MonitorRecord> {
        vec![
            MonitorRecord {
                url: Some("8.8.8.8".to_string()),
                check_interval: Some(45),
                ..MonitorRecord::new("g-ping", "Google DNS", "Ping")
            },
            MonitorRecord {
                url: Some("https://www.example.com".to_string()),
                check_interval: Some(300),
                ..MonitorRecord::new("g-http", "Example Home", "Https")
            },
            MonitorRecord {
                url: Some("https://app.example.com".to_string()),
                ..MonitorRecord::new("g-tx", "Example Checkout", "Transaction")
            },
            MonitorRecord {
                url: Some("https://www.example.com".to_string()),
                ..MonitorRecord::new("g-cert", "Example Certificate", "Certificate")
            },
            MonitorRecord {
                url: Some("not a url".to_string()),
                ..MonitorRecord::new("g-bad", "Example Broken", "Http")
            },
        ]
    }

    /// Rules only, so anything they decline goes straight to the fallback table.
    fn migration(config: &Config) -> Migration {
        Migration::new(
            Box::new(StaticMonitorsFetcher::new(records())),
            ClassifierChain::new(vec![Box::new(RuleClassifier)]),
            config,
        )
    }

    #[tokio::test]
    async fn test_mixed_batch() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);

        let report = migration(&config).run(Some("example"), None).await.unwrap();

        assert_eq!(report.total_monitors, 4);
        assert_eq!(report.successful_migrations, 2);
        assert_eq!(report.failed_migrations, 2);
        assert_eq!(report.monitor_stats.lightweight, 1);
        assert_eq!(report.monitor_stats.journey, 1);

        let by_guid = |guid: &str| report.monitors.iter().find(|m| m.monitor_guid == guid).unwrap();
        assert_eq!(by_guid("g-http").output_file.as_deref(), Some("lightweight/example_home.yml"));
        assert_eq!(by_guid("g-tx").output_file.as_deref(), Some("journey/example_checkout.journey.ts"));
        assert!(by_guid("g-tx").reasoning.as_deref().unwrap().starts_with("FALLBACK: "));

        let cert = by_guid("g-cert");
        assert!(!cert.success);
        assert_eq!(cert.errors[0], "Very low confidence in classification");

        let broken = by_guid("g-bad");
        assert_eq!(broken.errors, ["Invalid URL: not a url"]);
        assert!(!dir.path().join("lightweight/example_broken.yml").exists());

        let reports: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().starts_with("migration_results_"))
            .collect();
        assert_eq!(reports.len(), 1);
    }

    #[tokio::test]
    async fn test_limit_and_fetch_failure() {
        let dir = TempDir::new().unwrap();
        let mut config = config(&dir);
        config.source.monitors = vec![
            MonitorSummary {
                guid: "missing".to_string(),
                name: "Gone".to_string(),
                monitor_type: None,
                active: true,
            },
            MonitorSummary {
                guid: "g-ping".to_string(),
                name: "Google DNS".to_string(),
                monitor_type: None,
                active: true,
            },
            MonitorSummary {
                guid: "g-http".to_string(),
                name: "Example Home".to_string(),
                monitor_type: None,
                active: true,
            },
        ];

        let report = migration(&config).run(None, Some(2)).await.unwrap();

        assert_eq!(report.total_monitors, 2);
        assert_eq!(report.successful_migrations, 1);
        let gone = &report.monitors[0];
        assert!(!gone.success);
        assert_eq!(gone.errors, ["Could not fetch monitor details: Monitor with ID missing not found"]);
        assert_eq!(report.monitors[1].elastic_type, Some(Archetype::Icmp));
    }

    #[tokio::test]
    async fn test_no_match_still_reports() {
        let dir = TempDir::new().unwrap();
        let report = migration(&config(&dir)).run(Some("nothing"), None).await.unwrap();
        assert_eq!(report.total_monitors, 0);
        assert_eq!(report.failed_migrations, 0);
    }

    #[tokio::test]
    async fn test_colliding_names_keep_one_file_per_monitor() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let records = vec![
            MonitorRecord {
                url: Some("https://a.example.com".to_string()),
                ..MonitorRecord::new("g-a", "Shop Home", "Https")
            },
            MonitorRecord {
                url: Some("https://b.example.com".to_string()),
                ..MonitorRecord::new("g-b", "shop home!", "Https")
            },
        ];
        let migration = Migration::new(
            Box::new(StaticMonitorsFetcher::new(records)),
            ClassifierChain::new(vec![Box::new(RuleClassifier)]),
            &config,
        );

        let report = migration.run(None, None).await.unwrap();
        assert_eq!(report.successful_migrations, 2);

        let files: Vec<_> = report.monitors.iter().filter_map(|m| m.output_file.clone()).collect();
        assert_eq!(files, ["lightweight/shop_home.yml", "lightweight/shop_home-g-b.yml"]);
        for (file, url) in files.iter().zip(["https://a.example.com", "https://b.example.com"]) {
            let contents = std::fs::read_to_string(dir.path().join(file)).unwrap();
            assert!(contents.contains(url), "{file}");
        }

        // A second run reuses the plain names instead of piling up suffixes.
        let again = migration.run(None, None).await.unwrap();
        assert_eq!(again.monitors[0].output_file.as_deref(), Some("lightweight/shop_home.yml"));
        assert_eq!(again.monitors[1].output_file.as_deref(), Some("lightweight/shop_home-g-b.yml"));
    }

    #[test]
    fn test_missing_credentials_abort_before_any_monitor() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            Migration::from_config(&config(&dir)),
            Err(crate::errors::Error::MissingCredentials { .. })
        ));
    }
}
