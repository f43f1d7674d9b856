//! Strict validation of generated monitors, the last gate before anything is written to disk.
//!
//! The validator works on the serialized document rather than the typed [`GeneratedConfig`], so a
//! generator bug that produces an inconsistent document is still caught. Every check runs and all
//! violations are collected; nothing short-circuits except a missing field, which suppresses the
//! format checks for that same field.
//!
//! [`GeneratedConfig`]: crate::models::GeneratedConfig

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::config::ValidationConfig;
use crate::models::{Archetype, ValidationResult};

static SCHEDULE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@every\s+([0-9]+)([smh])$").expect("valid regex"));
static DURATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]+)([smh])$").expect("valid regex"));
static ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").expect("valid regex"));
static HOST_PORT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.-]+:[0-9]+$").expect("valid regex"));
static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9.-]+$").expect("valid regex"));
static IPV4_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([0-9]{1,3}\.){3}[0-9]{1,3}$").expect("valid regex"));

const REQUIRED_FIELDS: [&str; 7] = ["name", "id", "type", "enabled", "schedule", "timeout", "locations"];
const HTTP_METHODS: [&str; 7] = ["GET", "POST", "PUT", "DELETE", "HEAD", "OPTIONS", "PATCH"];
const MIN_SCHEDULE_SECS: u64 = 10;
const SYNTHETICS_MODULE: &str = "@elastic/synthetics";

#[derive(Debug, Clone)]
pub struct StrictValidator {
    allowed_locations: Vec<String>,
}

impl Default for StrictValidator {
    fn default() -> Self {
        Self::new(&ValidationConfig::default())
    }
}

impl StrictValidator {
    pub fn new(config: &ValidationConfig) -> Self {
        Self {
            allowed_locations: config.allowed_locations.clone(),
        }
    }

    /// Validate a generated monitor document against the rules for `archetype`.
    pub fn validate(&self, document: &Value, archetype: Archetype) -> ValidationResult {
        let mut result = ValidationResult::new();
        let Some(doc) = document.as_object() else {
            result.push("Monitor configuration must be a mapping");
            return result;
        };

        self.check_common(doc, Some(archetype), &mut result);
        match archetype {
            Archetype::Http => check_http(doc, &mut result),
            Archetype::Tcp => check_tcp(doc, &mut result),
            Archetype::Icmp => check_icmp(doc, &mut result),
            Archetype::Browser => check_browser(doc, &mut result),
        }
        result
    }

    /// Validate a document against its own declared `type`, as read back from disk.
    pub fn validate_document(&self, document: &Value) -> ValidationResult {
        match document.get("type").and_then(Value::as_str).and_then(|t| t.parse().ok()) {
            Some(archetype) => self.validate(document, archetype),
            None => {
                let mut result = ValidationResult::new();
                match document.as_object() {
                    Some(doc) => self.check_common(doc, None, &mut result),
                    None => result.push("Monitor configuration must be a mapping"),
                }
                result
            }
        }
    }

    fn check_common(&self, doc: &Map<String, Value>, expected: Option<Archetype>, result: &mut ValidationResult) {
        for field in REQUIRED_FIELDS {
            if !doc.contains_key(field) {
                result.push(format!("Missing required field: {field}"));
            }
        }

        if let Some(kind) = doc.get("type") {
            match kind.as_str().map(str::parse::<Archetype>) {
                Some(Ok(actual)) => {
                    if let Some(expected) = expected.filter(|expected| *expected != actual) {
                        result.push(format!("Monitor type '{actual}' does not match expected type '{expected}'"));
                    }
                }
                _ => result.push(format!(
                    "Invalid monitor type: {}. Valid types: http, tcp, icmp, browser",
                    display(kind)
                )),
            }
        }

        if let Some(name) = doc.get("name") {
            match name.as_str() {
                Some(name) if name.chars().count() >= 3 => {}
                Some(_) => result.push("Name must be at least 3 characters long"),
                None => result.push("Field 'name' must be a string"),
            }
        }

        if let Some(id) = doc.get("id")
            && !id.as_str().is_some_and(|id| ID_RE.is_match(id))
        {
            result.push(format!(
                "Invalid id '{}': only letters, digits, hyphens and underscores are allowed",
                display(id)
            ));
        }

        if let Some(enabled) = doc.get("enabled")
            && !enabled.is_boolean()
        {
            result.push("Field 'enabled' must be a boolean");
        }

        if let Some(schedule) = doc.get("schedule") {
            check_schedule(schedule, result);
        }
        if let Some(timeout) = doc.get("timeout") {
            check_timeout(timeout, result);
        }
        if let Some(locations) = doc.get("locations") {
            self.check_locations(locations, result);
        }
    }

    fn check_locations(&self, locations: &Value, result: &mut ValidationResult) {
        let Some(locations) = locations.as_array() else {
            result.push("Locations must be a list");
            return;
        };
        if locations.is_empty() {
            result.push("At least one location is required");
        }
        for location in locations {
            if !location
                .as_str()
                .is_some_and(|location| self.allowed_locations.iter().any(|allowed| allowed == location))
            {
                result.push(format!("Invalid location: {}", display(location)));
            }
        }
    }
}

/// Structural sanity check on a journey script. Not a parser.
pub fn validate_script(script: &str) -> ValidationResult {
    let mut result = ValidationResult::new();
    if script.trim().is_empty() {
        result.push("Script must not be empty");
        return result;
    }

    if !script.contains(SYNTHETICS_MODULE) {
        result.push("Script must import @elastic/synthetics");
    }
    if !script.contains("journey(") {
        result.push("Script must define a journey");
    }
    if !script.contains("step(") {
        result.push("Script must contain at least one step");
    }
    if script.matches('{').count() != script.matches('}').count() {
        result.push("Unbalanced braces in script");
    }
    if script.matches('(').count() != script.matches(')').count() {
        result.push("Unbalanced parentheses in script");
    }
    result
}

fn check_schedule(schedule: &Value, result: &mut ValidationResult) {
    let Some(captures) = schedule.as_str().and_then(|s| SCHEDULE_RE.captures(s)) else {
        result.push(format!(
            "Invalid schedule format: {}. Expected e.g. @every 5m",
            display(schedule)
        ));
        return;
    };
    if &captures[2] == "s" && captures[1].parse::<u64>().map_or(true, |secs| secs < MIN_SCHEDULE_SECS) {
        result.push(format!("Minimum schedule interval is {MIN_SCHEDULE_SECS} seconds"));
    }
}

fn check_timeout(timeout: &Value, result: &mut ValidationResult) {
    let Some(captures) = timeout.as_str().and_then(|s| DURATION_RE.captures(s)) else {
        result.push(format!("Invalid timeout format: {}. Expected e.g. 30s", display(timeout)));
        return;
    };
    let value = captures[1].parse::<u64>().unwrap_or(u64::MAX);
    match &captures[2] {
        "s" if !(1..=180).contains(&value) => result.push("Timeout must be between 1s and 180s"),
        "m" if !(1..=3).contains(&value) => result.push("Timeout must be between 1m and 3m"),
        // Hours are accepted without a bound.
        _ => {}
    }
}

/// Checks that `field` holds a non-empty list; returns its entries when it does.
fn required_list<'a>(
    doc: &'a Map<String, Value>,
    field: &str,
    kind: &str,
    noun: &str,
    result: &mut ValidationResult,
) -> &'a [Value] {
    match doc.get(field) {
        None => result.push(format!("{kind} monitor requires '{field}'")),
        Some(Value::Array(items)) if !items.is_empty() => return items,
        Some(_) => result.push(format!("{kind} monitor requires at least one {noun}")),
    }
    &[]
}

fn check_http(doc: &Map<String, Value>, result: &mut ValidationResult) {
    for url in required_list(doc, "urls", "HTTP", "URL", result) {
        if !url.as_str().is_some_and(is_valid_http_url) {
            result.push(format!("Invalid URL: {}", display(url)));
        }
    }

    if let Some(method) = doc.get("method")
        && !method
            .as_str()
            .is_some_and(|method| HTTP_METHODS.contains(&method.to_uppercase().as_str()))
    {
        result.push(format!("Invalid HTTP method: {}", display(method)));
    }

    if let Some(max_redirects) = doc.get("max_redirects")
        && max_redirects.as_u64().is_none()
    {
        result.push("max_redirects must be a non-negative integer");
    }

    if let Some(headers) = doc.get("headers")
        && !headers.is_object()
    {
        result.push("Headers must be a key-value mapping");
    }

    if let Some(statuses) = doc.get("check.response.status") {
        match statuses.as_array() {
            Some(statuses) => {
                for status in statuses {
                    if !status.as_u64().is_some_and(|code| (100..=599).contains(&code)) {
                        result.push(format!("Invalid status code: {}", display(status)));
                    }
                }
            }
            None => result.push("check.response.status must be a list"),
        }
    }
}

fn check_tcp(doc: &Map<String, Value>, result: &mut ValidationResult) {
    for host in required_list(doc, "hosts", "TCP", "host", result) {
        if !host.as_str().is_some_and(|host| HOST_PORT_RE.is_match(host)) {
            result.push(format!("Invalid host:port: {}", display(host)));
        }
    }
}

fn check_icmp(doc: &Map<String, Value>, result: &mut ValidationResult) {
    for host in required_list(doc, "hosts", "ICMP", "host", result) {
        if !host
            .as_str()
            .is_some_and(|host| HOSTNAME_RE.is_match(host) || IPV4_RE.is_match(host))
        {
            result.push(format!("Invalid host: {}", display(host)));
        }
    }

    if let Some(wait) = doc.get("wait")
        && !wait.as_str().is_some_and(|wait| DURATION_RE.is_match(wait))
    {
        result.push(format!("Invalid wait format: {}", display(wait)));
    }
}

fn check_browser(doc: &Map<String, Value>, result: &mut ValidationResult) {
    let script = match doc.get("source") {
        None => {
            result.push("Browser monitor requires 'source'");
            return;
        }
        Some(source) => match source.get("inline") {
            None => {
                result.push("Browser monitor requires source.inline");
                return;
            }
            Some(inline) => match inline.get("script") {
                None => {
                    result.push("Browser monitor requires source.inline.script");
                    ""
                }
                Some(script) => script.as_str().unwrap_or_default(),
            },
        },
    };

    if !script.contains("journey") {
        result.push("Browser script must define a journey");
    }
    if !script.contains(SYNTHETICS_MODULE) {
        result.push("Browser script must import '@elastic/synthetics'");
    }
}

fn is_valid_http_url(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty()))
}

/// Strings without quotes, everything else as JSON.
fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
