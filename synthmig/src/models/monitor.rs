//! Normalized representation of a source monitor.
//!
//! A [`MonitorRecord`] is built once from a detail fetch, read by the classifiers and the
//! generator, and dropped at the end of the monitor's migration. Every optional field is
//! `None` (or empty) when the source omitted it, never a sentinel value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Declared monitor type on the source side.
///
/// Unknown type strings are kept verbatim in [`SourceMonitorType::Other`] so that the
/// classifiers can still reason about them (the fallback classifier maps them to HTTP).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourceMonitorType {
    Http,
    Https,
    Ping,
    Dns,
    Smtp,
    Pop3,
    Imap,
    Ftp,
    Sftp,
    Tcp,
    Udp,
    Transaction,
    MultiStepApi,
    Other(String),
}

impl SourceMonitorType {
    /// Canonical spelling used by the source API.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Http => "Http",
            Self::Https => "Https",
            Self::Ping => "Ping",
            Self::Dns => "Dns",
            Self::Smtp => "Smtp",
            Self::Pop3 => "Pop3",
            Self::Imap => "Imap",
            Self::Ftp => "Ftp",
            Self::Sftp => "Sftp",
            Self::Tcp => "Tcp",
            Self::Udp => "Udp",
            Self::Transaction => "Transaction",
            Self::MultiStepApi => "MultiStepApi",
            Self::Other(raw) => raw,
        }
    }

    /// Whether this type always describes a scripted, multi-step check.
    pub fn is_scripted(&self) -> bool {
        matches!(self, Self::Transaction | Self::MultiStepApi)
    }
}

impl From<String> for SourceMonitorType {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "http" => Self::Http,
            "https" => Self::Https,
            "ping" => Self::Ping,
            "dns" => Self::Dns,
            "smtp" => Self::Smtp,
            "pop3" => Self::Pop3,
            "imap" => Self::Imap,
            "ftp" => Self::Ftp,
            "sftp" => Self::Sftp,
            "tcp" => Self::Tcp,
            "udp" => Self::Udp,
            "transaction" => Self::Transaction,
            "multistepapi" => Self::MultiStepApi,
            _ => Self::Other(value),
        }
    }
}

impl From<&str> for SourceMonitorType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<SourceMonitorType> for String {
    fn from(value: SourceMonitorType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SourceMonitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the source monitor list, enough to pick monitors for migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSummary {
    pub guid: String,
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub monitor_type: Option<SourceMonitorType>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// A single request header as the source API reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestHeader {
    pub key: String,
    pub value: String,
}

/// Immutable snapshot of one source monitor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorRecord {
    pub guid: String,
    pub name: String,
    pub monitor_type: SourceMonitorType,
    pub url: Option<String>,
    pub port: Option<u16>,
    /// Check interval in seconds
    pub check_interval: Option<u64>,
    pub is_active: bool,

    pub http_method: Option<String>,
    pub request_headers: Vec<RequestHeader>,
    pub request_body: Option<String>,
    pub expected_http_status_code: Option<u16>,
    pub match_pattern: Option<String>,
    pub user_agent: Option<String>,
    pub load_time_limit1: Option<u64>,
    pub load_time_limit2: Option<u64>,
    pub authentication_type: Option<String>,
    pub username: Option<String>,
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Legacy scripted-transaction body
    pub transaction_script: Option<String>,
    pub multi_step_api_script: Option<String>,
    pub msa_steps: Vec<Value>,
    pub transaction_step_definition: Option<Value>,
    pub browser_type: Option<String>,
    pub browser_window_dimensions: Option<Value>,

    pub dns_server: Option<String>,
    pub dns_query: Option<String>,
    pub dns_expected_result: Option<String>,

    pub notes: Option<String>,
    pub generate_alert: Option<bool>,
    pub monitor_mode: Option<String>,
    pub selected_checkpoints: Option<Value>,
}

impl MonitorRecord {
    /// A record with identity and type set and every optional field absent.
    pub fn new(guid: impl Into<String>, name: impl Into<String>, monitor_type: impl Into<SourceMonitorType>) -> Self {
        Self {
            guid: guid.into(),
            name: name.into(),
            monitor_type: monitor_type.into(),
            url: None,
            port: None,
            check_interval: None,
            is_active: true,
            http_method: None,
            request_headers: Vec::new(),
            request_body: None,
            expected_http_status_code: None,
            match_pattern: None,
            user_agent: None,
            load_time_limit1: None,
            load_time_limit2: None,
            authentication_type: None,
            username: None,
            password: None,
            transaction_script: None,
            multi_step_api_script: None,
            msa_steps: Vec::new(),
            transaction_step_definition: None,
            browser_type: None,
            browser_window_dimensions: None,
            dns_server: None,
            dns_query: None,
            dns_expected_result: None,
            notes: None,
            generate_alert: None,
            monitor_mode: None,
            selected_checkpoints: None,
        }
    }

    /// Returns the first signal that marks this monitor as a scripted / multi-step check,
    /// or `None` when the record is simple enough for rule-based classification.
    pub fn complexity_signal(&self) -> Option<&'static str> {
        if has_text(&self.transaction_script) {
            return Some("transaction script");
        }
        if has_text(&self.multi_step_api_script) {
            return Some("multi-step API script");
        }
        if !self.msa_steps.is_empty() {
            return Some("multi-step definitions");
        }
        if self.transaction_step_definition.as_ref().is_some_and(is_meaningful) {
            return Some("transaction step definition");
        }
        if has_text(&self.browser_type) {
            return Some("browser engine");
        }
        if self.monitor_type.is_scripted() {
            return Some("scripted monitor type");
        }
        None
    }
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.is_empty())
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Number(_) => true,
    }
}
