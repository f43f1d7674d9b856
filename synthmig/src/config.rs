//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable overrides. The configuration
//! file path defaults to `config.yaml` but can be specified via `-f` flag or `SYNTHMIG_CONFIG`
//! environment variable. A missing file is not an error; every field has a default.
//!
//! ## Loading Priority
//!
//! Configuration sources are merged in the following order (later sources override earlier ones):
//!
//! 1. **YAML config file** - Base configuration (default: `config.yaml`)
//! 2. **Environment variables** - Variables prefixed with `SYNTHMIG_` override YAML values
//! 3. **Well-known variables** - `UPTRENDS_USERNAME`, `UPTRENDS_PASSWORD`, `OLLAMA_HOST` and
//!    `OLLAMA_MODEL` override `source.username`, `source.password`, `inference.host` and
//!    `inference.model`
//!
//! For nested config values, use double underscores in environment variables. For example,
//! `SYNTHMIG_INFERENCE__RETRY__MAX_ATTEMPTS=5` sets `inference.retry.max_attempts`.
//!
//! ## Example
//!
//! ```yaml
//! source:
//!   monitor_limit: 20
//! inference:
//!   model: qwen2.5-coder:7b
//!   retry:
//!     min_delay: 4s
//!     max_delay: 10s
//! output:
//!   base_dir: ../nodejs-monitors/monitors
//! ```

use clap::{Args as ClapArgs, Parser, Subcommand};
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};
use url::Url;

use crate::errors::Error;
use crate::models::MonitorSummary;

/// CLI args: config file location plus the command to run
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "SYNTHMIG_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without contacting any API.
    #[arg(long)]
    pub validate: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Migrate source monitors into Elastic Synthetics monitors
    Run(RunArgs),
    /// List source monitors, optionally filtered by name
    List {
        /// Case-insensitive substring to match against monitor names
        #[arg(short, long)]
        pattern: Option<String>,
    },
    /// Re-validate previously generated monitor files
    Check {
        /// Files or directories containing `.yml` monitors and `.journey.ts` scripts
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
}

#[derive(ClapArgs, Debug, Clone, Default)]
pub struct RunArgs {
    /// Case-insensitive substring to match against monitor names
    #[arg(short, long)]
    pub pattern: Option<String>,

    /// Maximum number of monitors to migrate (overrides `source.monitor_limit`)
    #[arg(short, long)]
    pub limit: Option<usize>,
}

/// Main application configuration.
///
/// All fields have defaults defined in the `Default` implementations.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Source (Uptrends) API access
    pub source: SourceConfig,
    /// Inference backend used for monitors the rules cannot classify
    pub inference: InferenceConfig,
    pub classification: ClassificationConfig,
    /// Defaults applied when a classification does not recommend a value
    pub generation: GenerationConfig,
    pub validation: ValidationConfig,
    /// Where generated monitors and reports are written
    pub output: OutputConfig,
    pub log_format: LogFormat,
}

/// Source API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceConfig {
    /// Base URL of the Uptrends v4 API
    pub base_url: Url,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Stop listing after this many matching monitors
    pub monitor_limit: Option<usize>,
    /// Predefined monitors to migrate instead of listing the whole account
    pub monitors: Vec<MonitorSummary>,
}

/// Inference backend configuration (Ollama-compatible `/api/generate`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct InferenceConfig {
    pub host: Url,
    pub model: String,
    /// Per-request timeout for a single backend call
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    pub temperature: f32,
    pub top_p: f32,
    /// Maximum number of tokens to generate
    pub num_predict: u32,
    pub retry: RetryConfig,
}

/// Exponential backoff for transient inference backend failures.
///
/// The delay before retry `n` (1-based) is `multiplier * 2^(n-1)`, clamped to
/// `[min_delay, max_delay]`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    #[serde(with = "humantime_serde")]
    pub multiplier: Duration,
    #[serde(with = "humantime_serde")]
    pub min_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassificationConfig {
    /// Try the deterministic rules before asking the inference backend.
    /// When disabled every monitor is sent to inference.
    pub hybrid: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    pub schedule: String,
    pub timeout: String,
    pub locations: Vec<String>,
    /// Tags attached to every generated monitor
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Region codes accepted in `locations`
    pub allowed_locations: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub base_dir: PathBuf,
    /// Directory (relative to `base_dir`) for lightweight YAML monitors
    pub lightweight_dir: String,
    /// Directory (relative to `base_dir`) for browser journeys
    pub journey_dir: String,
}

/// Console log format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse("https://api.uptrends.com/v4").expect("default source URL is valid"),
            username: None,
            password: None,
            request_timeout: Duration::from_secs(30),
            monitor_limit: None,
            monitors: Vec::new(),
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            host: Url::parse("http://localhost:11434").expect("default inference URL is valid"),
            model: "qwen2.5-coder:7b".to_string(),
            request_timeout: Duration::from_secs(30),
            temperature: 0.1,
            top_p: 0.9,
            num_predict: 1000,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self { hybrid: true }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            schedule: "@every 5m".to_string(),
            timeout: "30s".to_string(),
            locations: vec!["us_central".to_string()],
            tags: vec!["migrated-from-uptrends".to_string()],
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            allowed_locations: [
                "us_central",
                "us_east",
                "us_west",
                "europe_west",
                "asia_pacific",
                "south_america",
                "africa",
                "australia_southeast",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("monitors"),
            lightweight_dir: "lightweight".to_string(),
            journey_dir: "journey".to_string(),
        }
    }
}

impl SourceConfig {
    /// Basic-auth credentials. Missing credentials are fatal for any command that talks to the
    /// source API.
    pub fn credentials(&self) -> Result<(&str, &str), Error> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => Ok((user, pass)),
            _ => Err(Error::MissingCredentials {
                message: "set UPTRENDS_USERNAME and UPTRENDS_PASSWORD (or source.username / source.password)".to_string(),
            }),
        }
    }
}

impl RetryConfig {
    /// Backoff to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.multiplier
            .saturating_mul(factor)
            .clamp(self.min_delay, self.max_delay)
    }
}

impl OutputConfig {
    pub fn lightweight_path(&self) -> PathBuf {
        self.base_dir.join(&self.lightweight_dir)
    }

    pub fn journey_path(&self) -> PathBuf {
        self.base_dir.join(&self.journey_dir)
    }
}

impl Config {
    #[allow(clippy::result_large_err)]
    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config.validate().map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Prefixed environment variables override specific values
            .merge(Env::prefixed("SYNTHMIG_").split("__").ignore(&["config"]))
            // Well-known variables shared with the rest of the tooling
            .merge(Env::raw().only(&["UPTRENDS_USERNAME"]).map(|_| "source.username".into()))
            .merge(Env::raw().only(&["UPTRENDS_PASSWORD"]).map(|_| "source.password".into()))
            .merge(Env::raw().only(&["OLLAMA_HOST"]).map(|_| "inference.host".into()))
            .merge(Env::raw().only(&["OLLAMA_MODEL"]).map(|_| "inference.model".into()))
    }

    /// Validate the configuration for consistency
    pub fn validate(&self) -> Result<(), Error> {
        let retry = &self.inference.retry;
        if retry.max_attempts == 0 {
            return Err(Error::InvalidConfig {
                message: "inference.retry.max_attempts must be at least 1".to_string(),
            });
        }
        if retry.min_delay > retry.max_delay {
            return Err(Error::InvalidConfig {
                message: format!(
                    "inference.retry.min_delay ({:?}) cannot be greater than max_delay ({:?})",
                    retry.min_delay, retry.max_delay
                ),
            });
        }

        if self.validation.allowed_locations.is_empty() {
            return Err(Error::InvalidConfig {
                message: "validation.allowed_locations cannot be empty".to_string(),
            });
        }

        if self.generation.locations.is_empty() {
            return Err(Error::InvalidConfig {
                message: "generation.locations cannot be empty".to_string(),
            });
        }
        if let Some(unknown) = self
            .generation
            .locations
            .iter()
            .find(|location| !self.validation.allowed_locations.contains(location))
        {
            return Err(Error::InvalidConfig {
                message: format!("generation.locations contains '{unknown}', which is not in validation.allowed_locations"),
            });
        }

        if self.output.lightweight_dir == self.output.journey_dir {
            return Err(Error::InvalidConfig {
                message: "output.lightweight_dir and output.journey_dir must differ".to_string(),
            });
        }

        Ok(())
    }
}
