//! Monitor fetching from the source (Uptrends) API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use crate::config::SourceConfig;
use crate::errors::{Error, Result};
use crate::models::{MonitorRecord, MonitorSummary, RequestHeader, SourceMonitorType};

/// A trait for fetching monitors from the source platform.
/// In practice this is backed by `FetchMonitorsReqwest`; `StaticMonitorsFetcher` serves a fixed
/// set of records.
#[async_trait]
pub trait FetchMonitors: Send + Sync {
    /// List monitors whose name contains `name_pattern` (case-insensitive).
    async fn list_monitors(&self, name_pattern: Option<&str>) -> Result<Vec<MonitorSummary>>;

    /// Fetch the full record of a single monitor.
    async fn fetch_monitor(&self, guid: &str) -> Result<MonitorRecord>;
}

/// The concrete implementation of `FetchMonitors` over HTTPS with basic auth.
pub struct FetchMonitorsReqwest {
    client: Client,
    base_url: Url,
    username: String,
    password: String,
    request_timeout: Duration,
    monitor_limit: Option<usize>,
}

impl FetchMonitorsReqwest {
    /// Build a client from configuration. Fails when credentials are missing.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let (username, password) = config.credentials()?;
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self {
            client,
            base_url: ensure_slash(&config.base_url),
            username: username.to_string(),
            password: password.to_string(),
            request_timeout: config.request_timeout,
            monitor_limit: config.monitor_limit,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| anyhow::anyhow!("Failed to construct source URL for '{}': {}", path, e))?;

        debug!("Fetching {}", url);
        let response = self
            .client
            .get(url.clone())
            .basic_auth(&self.username, Some(&self.password))
            .header("Accept", "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Source API request to {} failed with {}", url, status);
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        let body_text = response.text().await?;
        serde_json::from_str::<T>(&body_text).map_err(|e| {
            tracing::error!("Failed to parse source API response as JSON. Error: {}", e);
            tracing::debug!("Response body was: {}", body_text);
            Error::Json(e)
        })
    }
}

/// Makes sure a url has a trailing slash, so that `join` appends instead of replacing the last
/// path segment.
fn ensure_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        url.clone()
    } else {
        let mut new_url = url.clone();
        let path = format!("{}/", new_url.path());
        new_url.set_path(&path);
        new_url
    }
}

/// Keep summaries whose name contains `name_pattern`, case-insensitively, up to `limit` entries.
pub fn filter_summaries(
    summaries: impl IntoIterator<Item = MonitorSummary>,
    name_pattern: Option<&str>,
    limit: Option<usize>,
) -> Vec<MonitorSummary> {
    let needle = name_pattern.map(str::to_lowercase);
    summaries
        .into_iter()
        .filter(|summary| {
            needle
                .as_deref()
                .is_none_or(|needle| summary.name.to_lowercase().contains(needle))
        })
        .take(limit.unwrap_or(usize::MAX))
        .collect()
}

#[async_trait]
impl FetchMonitors for FetchMonitorsReqwest {
    #[instrument(skip(self))]
    async fn list_monitors(&self, name_pattern: Option<&str>) -> Result<Vec<MonitorSummary>> {
        let items: Vec<SourceMonitorListItem> = self.get_json("Monitor").await?;
        debug!("Source API returned {} monitors", items.len());

        let summaries = filter_summaries(items.into_iter().map(MonitorSummary::from), name_pattern, self.monitor_limit);
        debug!("{} monitors matched", summaries.len());
        Ok(summaries)
    }

    #[instrument(skip(self))]
    async fn fetch_monitor(&self, guid: &str) -> Result<MonitorRecord> {
        let payload: SourceMonitorPayload = self.get_json(&format!("Monitor/{guid}")).await?;
        Ok(payload.into_record(guid))
    }
}

/// A static implementation of `FetchMonitors` serving a predefined set of records.
pub struct StaticMonitorsFetcher {
    records: Vec<MonitorRecord>,
}

impl StaticMonitorsFetcher {
    pub fn new(records: Vec<MonitorRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl FetchMonitors for StaticMonitorsFetcher {
    async fn list_monitors(&self, name_pattern: Option<&str>) -> Result<Vec<MonitorSummary>> {
        let summaries = self.records.iter().map(|record| MonitorSummary {
            guid: record.guid.clone(),
            name: record.name.clone(),
            monitor_type: Some(record.monitor_type.clone()),
            active: record.is_active,
        });
        Ok(filter_summaries(summaries, name_pattern, None))
    }

    async fn fetch_monitor(&self, guid: &str) -> Result<MonitorRecord> {
        self.records
            .iter()
            .find(|record| record.guid == guid)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                resource: "Monitor".to_string(),
                id: guid.to_string(),
            })
    }
}

/// One entry of `GET /Monitor`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SourceMonitorListItem {
    #[serde(default)]
    monitor_guid: String,
    #[serde(default)]
    name: String,
    monitor_type: Option<String>,
    is_active: Option<bool>,
}

impl From<SourceMonitorListItem> for MonitorSummary {
    fn from(item: SourceMonitorListItem) -> Self {
        Self {
            guid: item.monitor_guid,
            name: item.name,
            monitor_type: item.monitor_type.map(SourceMonitorType::from),
            active: item.is_active.unwrap_or(true),
        }
    }
}

/// Body of `GET /Monitor/{guid}`. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SourceMonitorPayload {
    monitor_guid: Option<String>,
    name: Option<String>,
    monitor_type: Option<String>,
    url: Option<String>,
    port: Option<u16>,
    check_interval: Option<u64>,
    is_active: Option<bool>,
    http_method: Option<String>,
    request_headers: Option<Vec<RequestHeader>>,
    request_body: Option<String>,
    expected_http_status_code: Option<u16>,
    expected_http_status_code_specified: Option<bool>,
    match_pattern: Option<String>,
    user_agent: Option<String>,
    load_time_limit1: Option<u64>,
    load_time_limit2: Option<u64>,
    authentication_type: Option<String>,
    username: Option<String>,
    password: Option<String>,
    self_service_transaction_script: Option<String>,
    multi_step_api_transaction_script: Option<String>,
    msa_steps: Option<Vec<Value>>,
    transaction_step_definition: Option<Value>,
    browser_type: Option<String>,
    browser_window_dimensions: Option<Value>,
    dns_server: Option<String>,
    dns_query: Option<String>,
    dns_expected_result: Option<String>,
    notes: Option<String>,
    generate_alert: Option<bool>,
    monitor_mode: Option<String>,
    selected_checkpoints: Option<Value>,
}

impl SourceMonitorPayload {
    fn into_record(self, requested_guid: &str) -> MonitorRecord {
        let expected_http_status_code = match self.expected_http_status_code_specified {
            Some(false) => None,
            _ => self.expected_http_status_code,
        };

        MonitorRecord {
            guid: self.monitor_guid.unwrap_or_else(|| requested_guid.to_string()),
            name: self.name.unwrap_or_default(),
            monitor_type: SourceMonitorType::from(self.monitor_type.unwrap_or_default()),
            url: self.url.filter(|url| !url.is_empty()),
            port: self.port.filter(|port| *port != 0),
            check_interval: self.check_interval,
            is_active: self.is_active.unwrap_or(true),
            http_method: self.http_method,
            request_headers: self.request_headers.unwrap_or_default(),
            request_body: self.request_body,
            expected_http_status_code,
            match_pattern: self.match_pattern.filter(|pattern| !pattern.is_empty()),
            user_agent: self.user_agent,
            load_time_limit1: self.load_time_limit1,
            load_time_limit2: self.load_time_limit2,
            authentication_type: self.authentication_type,
            username: self.username,
            password: self.password,
            transaction_script: self.self_service_transaction_script,
            multi_step_api_script: self.multi_step_api_transaction_script,
            msa_steps: self.msa_steps.unwrap_or_default(),
            transaction_step_definition: self.transaction_step_definition,
            browser_type: self.browser_type,
            browser_window_dimensions: self.browser_window_dimensions,
            dns_server: self.dns_server,
            dns_query: self.dns_query,
            dns_expected_result: self.dns_expected_result,
            notes: self.notes,
            generate_alert: self.generate_alert,
            monitor_mode: self.monitor_mode,
            selected_checkpoints: self.selected_checkpoints,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source_config(server: &MockServer) -> SourceConfig {
        SourceConfig {
            base_url: Url::parse(&format!("{}/v4", server.uri())).unwrap(),
            username: Some("user".to_string()),
            password: Some("pass".to_string()),
            request_timeout: Duration::from_secs(5),
            monitor_limit: None,
            monitors: Vec::new(),
        }
    }

    #[test]
    fn test_missing_credentials_are_fatal() {
        let config = SourceConfig::default();
        assert!(matches!(FetchMonitorsReqwest::new(&config), Err(Error::MissingCredentials { .. })));
    }

    #[test]
    fn test_filter_summaries() {
        let summaries = ["CLVT-US-ALM-Beta", "CCDM Common Service Prod", "clvt-us-alm-prd"]
            .into_iter()
            .enumerate()
            .map(|(i, name)| MonitorSummary {
                guid: i.to_string(),
                name: name.to_string(),
                monitor_type: None,
                active: true,
            });

        let matched = filter_summaries(summaries.clone(), Some("CLVT"), None);
        assert_eq!(matched.len(), 2);
        assert_eq!(matched[1].name, "clvt-us-alm-prd");

        assert_eq!(filter_summaries(summaries.clone(), None, Some(1)).len(), 1);
        assert!(filter_summaries(summaries, Some("nomatch"), None).is_empty());
    }

    #[tokio::test]
    async fn test_list_monitors_filters_and_limits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/Monitor"))
            .and(header("authorization", "Basic dXNlcjpwYXNz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"MonitorGuid": "a", "Name": "CLVT Portal", "MonitorType": "Https", "IsActive": true},
                {"MonitorGuid": "b", "Name": "Jenkins", "MonitorType": "Http", "IsActive": true},
                {"MonitorGuid": "c", "Name": "clvt mail", "MonitorType": "Smtp", "IsActive": false},
                {"MonitorGuid": "d", "Name": "CLVT dns", "MonitorType": "Dns"}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = source_config(&server);
        config.monitor_limit = Some(2);
        let fetcher = FetchMonitorsReqwest::new(&config).unwrap();

        let monitors = fetcher.list_monitors(Some("clvt")).await.unwrap();
        assert_eq!(monitors.len(), 2);
        assert_eq!(monitors[0].guid, "a");
        assert_eq!(monitors[1].monitor_type, Some(SourceMonitorType::Smtp));
        assert!(!monitors[1].active);
    }

    #[tokio::test]
    async fn test_fetch_monitor_parses_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/Monitor/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "MonitorGuid": "abc",
                "Name": "Checkout API",
                "MonitorType": "Https",
                "Url": "https://shop.example.com/api/health",
                "CheckInterval": 120,
                "IsActive": true,
                "HttpMethod": "POST",
                "RequestHeaders": [{"Key": "X-Token", "Value": "t"}],
                "RequestBody": "{}",
                "ExpectedHttpStatusCode": 201,
                "ExpectedHttpStatusCodeSpecified": true,
                "Password": "secret",
                "MsaSteps": null,
                "Port": 0
            })))
            .mount(&server)
            .await;

        let fetcher = FetchMonitorsReqwest::new(&source_config(&server)).unwrap();
        let record = fetcher.fetch_monitor("abc").await.unwrap();

        assert_eq!(record.name, "Checkout API");
        assert_eq!(record.monitor_type, SourceMonitorType::Https);
        assert_eq!(record.check_interval, Some(120));
        assert_eq!(record.expected_http_status_code, Some(201));
        assert_eq!(record.request_headers[0].key, "X-Token");
        assert!(record.msa_steps.is_empty());
        assert_eq!(record.port, None);
        assert_eq!(record.browser_type, None);
    }

    #[tokio::test]
    async fn test_unspecified_status_code_is_ignored() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v4/Monitor/abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Name": "Homepage",
                "MonitorType": "Http",
                "ExpectedHttpStatusCode": 200,
                "ExpectedHttpStatusCodeSpecified": false
            })))
            .mount(&server)
            .await;

        let fetcher = FetchMonitorsReqwest::new(&source_config(&server)).unwrap();
        let record = fetcher.fetch_monitor("abc").await.unwrap();

        assert_eq!(record.guid, "abc");
        assert_eq!(record.expected_http_status_code, None);
        assert_eq!(record.url, None);
    }

    #[tokio::test]
    async fn test_fetch_monitor_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("unknown monitor"))
            .mount(&server)
            .await;

        let fetcher = FetchMonitorsReqwest::new(&source_config(&server)).unwrap();
        let err = fetcher.fetch_monitor("missing").await.unwrap_err();

        assert!(matches!(err, Error::UnexpectedStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_static_fetcher() {
        let fetcher = StaticMonitorsFetcher::new(vec![MonitorRecord::new("g1", "Ping gateway", "Ping")]);

        assert_eq!(fetcher.list_monitors(Some("PING")).await.unwrap().len(), 1);
        assert!(fetcher.fetch_monitor("g1").await.is_ok());
        assert!(matches!(fetcher.fetch_monitor("g2").await, Err(Error::NotFound { .. })));
    }
}
