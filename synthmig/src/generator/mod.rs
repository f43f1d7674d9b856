//! Turns a classified source monitor into an Elastic Synthetics monitor configuration.

use std::collections::BTreeMap;
use tracing::debug;
use url::Url;

use crate::config::GenerationConfig;
use crate::models::generated::{
    ArchetypeFields, BrowserFields, BrowserParams, GeneratedConfig, HttpFields, IcmpFields, InlineScript, ScriptSource,
    TcpFields,
};
use crate::models::{Archetype, Classification, MonitorRecord};

pub mod script;

pub use script::journey_script;

const DEFAULT_MAX_REDIRECTS: u32 = 3;
const DEFAULT_TCP_PORT: u16 = 80;
const ICMP_WAIT: &str = "1s";

#[derive(Debug, Clone)]
pub struct ConfigGenerator {
    defaults: GenerationConfig,
}

impl ConfigGenerator {
    pub fn new(defaults: GenerationConfig) -> Self {
        Self { defaults }
    }

    pub fn generate(&self, record: &MonitorRecord, classification: &Classification) -> GeneratedConfig {
        let recommended = &classification.recommended_config;
        let fields = match classification.archetype {
            Archetype::Http => ArchetypeFields::Http(HttpFields {
                urls: record.url.iter().cloned().collect(),
                max_redirects: recommended.max_redirects.unwrap_or(DEFAULT_MAX_REDIRECTS),
                mode: recommended.mode.clone().unwrap_or_else(|| "any".to_string()),
                method: record.http_method.as_ref().map(|m| m.to_uppercase()),
                headers: (!record.request_headers.is_empty()).then(|| {
                    record
                        .request_headers
                        .iter()
                        .map(|h| (h.key.clone(), h.value.clone()))
                        .collect::<BTreeMap<_, _>>()
                }),
                body: record.request_body.clone().filter(|body| !body.is_empty()),
                check_response_status: record.expected_http_status_code.map(|code| vec![code]),
                check_response_body_positive: record.match_pattern.clone().map(|pattern| vec![pattern]),
            }),
            Archetype::Tcp => ArchetypeFields::Tcp(TcpFields {
                hosts: record
                    .url
                    .as_deref()
                    .map(|raw| {
                        let (host, port) = host_and_port(raw);
                        format!("{host}:{}", port.or(record.port).unwrap_or(DEFAULT_TCP_PORT))
                    })
                    .into_iter()
                    .collect(),
                check_send: String::new(),
                check_receive: String::new(),
            }),
            Archetype::Icmp => ArchetypeFields::Icmp(IcmpFields {
                hosts: record.url.as_deref().map(|raw| host_and_port(raw).0).into_iter().collect(),
                wait: ICMP_WAIT.to_string(),
            }),
            Archetype::Browser => ArchetypeFields::Browser(BrowserFields {
                source: ScriptSource {
                    inline: InlineScript {
                        script: journey_script(record),
                    },
                },
                params: BrowserParams { url: record.url.clone() },
            }),
        };

        debug!(monitor = %record.name, archetype = %classification.archetype, "Generated monitor configuration");

        GeneratedConfig {
            name: record.name.clone(),
            id: format!("monitor-{}", record.guid),
            archetype: classification.archetype,
            enabled: record.is_active,
            schedule: recommended.schedule.clone().unwrap_or_else(|| self.defaults.schedule.clone()),
            timeout: recommended.timeout.clone().unwrap_or_else(|| self.defaults.timeout.clone()),
            locations: recommended
                .locations
                .clone()
                .filter(|locations| !locations.is_empty())
                .unwrap_or_else(|| self.defaults.locations.clone()),
            tags: self.defaults.tags.clone(),
            original_monitor_id: record.guid.clone(),
            fields,
        }
    }
}

/// Host and explicit port of a monitor target.
///
/// Targets with a scheme are parsed as URLs. Bare `host` or `host:port` strings (common for ping
/// and mail monitors) are split by hand.
fn host_and_port(raw: &str) -> (String, Option<u16>) {
    let raw = raw.trim();
    if let Ok(url) = Url::parse(raw)
        && let Some(host) = url.host_str()
    {
        return (host.to_string(), url.port());
    }

    match raw.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() => match port.parse::<u16>() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (raw.to_string(), None),
        },
        _ => (raw.to_string(), None),
    }
}
