//! Elastic Synthetics monitor configuration produced by the generator.
//!
//! The typed [`GeneratedConfig`] is what the generator builds; the strict validator never trusts
//! the types and checks the serialized document instead (see [`GeneratedConfig::to_document`]).

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::classification::Archetype;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedConfig {
    pub name: String,
    pub id: String,
    #[serde(rename = "type")]
    pub archetype: Archetype,
    pub enabled: bool,
    pub schedule: String,
    pub timeout: String,
    pub locations: Vec<String>,
    pub tags: Vec<String>,
    /// Back-reference to the source monitor guid
    pub original_monitor_id: String,
    #[serde(flatten)]
    pub fields: ArchetypeFields,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ArchetypeFields {
    Http(HttpFields),
    Tcp(TcpFields),
    Icmp(IcmpFields),
    Browser(BrowserFields),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HttpFields {
    pub urls: Vec<String>,
    pub max_redirects: u32,
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(rename = "check.response.status", skip_serializing_if = "Option::is_none")]
    pub check_response_status: Option<Vec<u16>>,
    #[serde(rename = "check.response.body.positive", skip_serializing_if = "Option::is_none")]
    pub check_response_body_positive: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TcpFields {
    pub hosts: Vec<String>,
    #[serde(rename = "check.send")]
    pub check_send: String,
    #[serde(rename = "check.receive")]
    pub check_receive: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IcmpFields {
    pub hosts: Vec<String>,
    pub wait: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserFields {
    pub source: ScriptSource,
    pub params: BrowserParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptSource {
    pub inline: InlineScript,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineScript {
    pub script: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl GeneratedConfig {
    /// Serialize into the loosely typed document that validators and writers consume.
    pub fn to_document(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }

    /// Inline journey source, for browser monitors.
    pub fn script(&self) -> Option<&str> {
        match &self.fields {
            ArchetypeFields::Browser(browser) => Some(&browser.source.inline.script),
            _ => None,
        }
    }
}
