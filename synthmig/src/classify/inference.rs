//! Classification through an Ollama-compatible inference backend.
//!
//! The backend is treated as an unreliable oracle. Transport failures and non-200 statuses are
//! retried with exponential backoff; malformed output is not retried. Either way the classifier
//! yields `None` and the chain moves on to the fallback classifier.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use tracing::{debug, instrument, warn};
use url::Url;

use super::Classifier;
use super::extract::parse_inference_payload;
use crate::config::InferenceConfig;
use crate::errors::{Error, Result};
use crate::models::{Classification, MonitorRecord};

const CLASSIFICATION_PROMPT: &str = r#"You are an expert in synthetic monitoring. Your task is to analyze an Uptrends monitor and determine:
1. The most appropriate monitor type for Elastic Synthetics (http, tcp, icmp, browser)
2. The ideal configuration for the monitor
3. Strict validations to ensure it works correctly

Available monitor types in Elastic Synthetics:
- http: For simple HTTP/HTTPS monitoring with response validations
- tcp: For verifying TCP connectivity to a specific port
- icmp: For basic ping connectivity checks
- browser: For complex tests that require a real browser

Decision criteria:
- If the original monitor is simple HTTP/HTTPS without complex interactions -> http
- If the original monitor is Transaction/MultiStepApi with multiple steps -> browser
- If the original monitor is Ping -> icmp
- If the original monitor verifies specific ports -> tcp
- If the original monitor has transaction scripts -> browser

Respond ONLY with valid JSON in this format:
{
    "elastic_type": "http|tcp|icmp|browser",
    "confidence": 0.0-1.0,
    "reasoning": "detailed explanation of the decision",
    "recommended_config": {
        "schedule": "@every 5m",
        "timeout": "30s",
        "max_redirects": 3,
        "locations": ["us_central", "us_east"],
        "additional_config": {}
    }
}"#;

/// Why an inference attempt did not produce a classification.
#[derive(Debug, ThisError)]
pub enum InferenceError {
    #[error("inference request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("inference backend returned status {status}")]
    Status { status: u16 },

    #[error("no JSON object found in inference output")]
    MissingJsonSpan,

    #[error("inference output is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("inference output is missing required key '{0}'")]
    MissingKey(&'static str),

    #[error("invalid '{key}' in inference output: {reason}")]
    InvalidField { key: &'static str, reason: String },

    #[error("unknown monitor type '{0}' in inference output")]
    UnknownArchetype(String),

    #[error("confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
}

impl InferenceError {
    /// Transient failures are worth another attempt; malformed output is not.
    pub fn is_transient(&self) -> bool {
        matches!(self, InferenceError::Transport(_) | InferenceError::Status { .. })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct InferenceClassifier {
    client: Client,
    endpoint: Url,
    config: InferenceConfig,
}

impl InferenceClassifier {
    pub fn new(config: InferenceConfig) -> Result<Self> {
        let endpoint = Url::parse(&format!("{}/api/generate", config.host.as_str().trim_end_matches('/'))).map_err(|e| {
            Error::InvalidConfig {
                message: format!("inference.host '{}' cannot be used as a base URL: {e}", config.host),
            }
        })?;
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self { client, endpoint, config })
    }

    /// Ask the backend, retrying transient failures, and parse whatever comes back.
    #[instrument(skip(self, record), fields(monitor = %record.name))]
    pub async fn try_classify(&self, record: &MonitorRecord) -> std::result::Result<Classification, InferenceError> {
        let prompt = format!("{CLASSIFICATION_PROMPT}\n\n{}", describe(record));
        let text = self.generate_with_retry(&prompt).await?;
        debug!("Inference backend answered with {} bytes", text.len());
        parse_inference_payload(&text)
    }

    async fn generate_with_retry(&self, prompt: &str) -> std::result::Result<String, InferenceError> {
        let max_attempts = self.config.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.generate(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.config.retry.delay_for(attempt);
                    warn!(attempt, max_attempts, ?delay, "Inference call failed, retrying: {}", e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// A single, non-streamed call to `/api/generate`.
    async fn generate(&self, prompt: &str) -> std::result::Result<String, InferenceError> {
        let request = GenerateRequest {
            model: &self.config.model,
            prompt: prompt.to_string(),
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                num_predict: self.config.num_predict,
            },
        };

        let response = self.client.post(self.endpoint.clone()).json(&request).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(InferenceError::Status { status: status.as_u16() });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl Classifier for InferenceClassifier {
    fn name(&self) -> &'static str {
        "inference"
    }

    async fn classify(&self, record: &MonitorRecord) -> Option<Classification> {
        match self.try_classify(record).await {
            Ok(classification) => Some(classification),
            Err(e) => {
                warn!(monitor = %record.name, "Inference classification unavailable, falling back: {}", e);
                None
            }
        }
    }
}

/// Human-readable description of the record appended to the prompt. Credentials are left out.
fn describe(record: &MonitorRecord) -> String {
    fn or_na<T: ToString>(value: Option<T>) -> String {
        value.map_or_else(|| "N/A".to_string(), |v| v.to_string())
    }

    let headers = (!record.request_headers.is_empty()).then(|| {
        record
            .request_headers
            .iter()
            .map(|h| format!("{}: {}", h.key, h.value))
            .collect::<Vec<_>>()
            .join(", ")
    });
    let msa_steps = (!record.msa_steps.is_empty()).then(|| serde_json::Value::from(record.msa_steps.clone()));

    let lines = [
        ("Name", Some(record.name.clone())),
        ("Type", Some(record.monitor_type.to_string())),
        ("URL", record.url.clone()),
        ("HTTP Method", record.http_method.clone()),
        ("Check Interval", record.check_interval.map(|secs| format!("{secs} seconds"))),
        ("Request Headers", headers),
        ("Request Body", record.request_body.clone()),
        ("Expected HTTP Status Code", record.expected_http_status_code.map(|c| c.to_string())),
        ("Authentication Type", record.authentication_type.clone()),
        ("Transaction Script", record.transaction_script.clone()),
        ("MultiStep API Script", record.multi_step_api_script.clone()),
        ("MSA Steps", msa_steps.map(|steps| steps.to_string())),
        ("Transaction Step Definition", record.transaction_step_definition.as_ref().map(|d| d.to_string())),
        ("Browser Type", record.browser_type.clone()),
        ("Port", record.port.map(|p| p.to_string())),
        ("Notes", record.notes.clone()),
    ];

    let mut description = String::from("Uptrends Monitor:");
    for (label, value) in lines {
        description.push_str(&format!("\n- {label}: {}", or_na(value)));
    }
    description
}
