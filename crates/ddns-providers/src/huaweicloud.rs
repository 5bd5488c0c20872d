// # Huawei Cloud DNS Driver
//
// ## API Reference
//
// - List record sets: GET `/v2/recordsets?type=...&name=...`
// - List zones: GET `/v2/zones?name=...`
// - Create: POST `/v2/zones/{zone_id}/recordsets`
// - Update: PUT `/v2/zones/{zone_id}/recordsets/{recordset_id}`
//
// Names on the wire are absolute (trailing dot). The record set search
// matches by prefix, so results are filtered for the exact name.

use crate::http::{query_string, send_signed};
use crate::sign::HuaweiSigner;
use async_trait::async_trait;
use ddns_core::reconcile::{Reconciler, confirm_echo};
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpTransport, Method, RecordApi, RecordMetadata,
    expect_success,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const PROVIDER: &str = "huaweicloud";
const HUAWEI_ENDPOINT: &str = "https://dns.myhuaweicloud.com";
const DEFAULT_TTL: u32 = 300;

#[derive(Debug, Deserialize)]
struct RecordSets {
    #[serde(default)]
    recordsets: Vec<RecordSet>,
}

#[derive(Debug, Deserialize)]
struct RecordSet {
    id: String,
    name: String,
    #[serde(default)]
    zone_id: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: Option<u32>,
    #[serde(default)]
    records: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Zones {
    #[serde(default)]
    zones: Vec<HuaweiZone>,
}

#[derive(Debug, Deserialize)]
struct HuaweiZone {
    id: String,
    name: String,
}

/// Huawei Cloud DNS driver
pub struct HuaweiCloud {
    signer: HuaweiSigner,
    transport: Arc<dyn HttpTransport>,
    ttl: u32,
    /// Zone ids resolved during this cycle, by zone name
    zones: Mutex<HashMap<String, String>>,
}

impl std::fmt::Debug for HuaweiCloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuaweiCloud")
            .field("signer", &self.signer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl HuaweiCloud {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            signer: HuaweiSigner::new(&entry.dns.id, &entry.dns.secret),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
            zones: Mutex::new(HashMap::new()),
        }
    }

    async fn call<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let request = request.header("Content-Type", "application/json");
        let response = send_signed(self.transport.as_ref(), &self.signer, request).await?;
        expect_success(response)?.json()
    }

    /// Zone whose name equals the root exactly
    async fn zone_id(&self, root: &str) -> Result<String> {
        let cached = self
            .zones
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(root)
            .cloned();
        if let Some(id) = cached {
            return Ok(id);
        }

        let url = format!("{}/v2/zones?{}", HUAWEI_ENDPOINT, query_string([("name", root)]));
        let response: Zones = self.call(HttpRequest::get(url)).await?;
        let absolute = format!("{}.", root);
        let zone = response
            .zones
            .into_iter()
            .find(|z| z.name == absolute)
            .ok_or_else(|| Error::provider(PROVIDER, format!("No zone named {}", root)))?;

        debug!("[{}] Found zone ID {} for {}", PROVIDER, zone.id, root);
        self.zones
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(root.to_string(), zone.id.clone());
        Ok(zone.id)
    }
}

#[async_trait]
impl RecordApi for HuaweiCloud {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let fqdn = domain.fqdn();
        let url = format!(
            "{}/v2/recordsets?{}",
            HUAWEI_ENDPOINT,
            query_string([("type", record_type.as_str()), ("name", fqdn.as_str())])
        );
        let response: RecordSets = self.call(HttpRequest::get(url)).await?;

        let absolute = format!("{}.", fqdn);
        Ok(response
            .recordsets
            .into_iter()
            .find(|r| r.name == absolute && r.record_type == record_type.as_str())
            .map(|r| {
                let value = r.records.first().cloned().unwrap_or_default();
                let mut record = RecordMetadata::new(r.id, r.name, value);
                record.ttl = r.ttl;
                record.zone_id = Some(r.zone_id);
                record
            }))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        let zone_id = self.zone_id(&domain.domain_name).await?;
        let payload = json!({
            "name": format!("{}.", domain.fqdn()),
            "type": record_type.as_str(),
            "records": [addr],
            "ttl": self.ttl,
        });

        let url = format!("{}/v2/zones/{}/recordsets", HUAWEI_ENDPOINT, zone_id);
        let created: RecordSet = self
            .call(HttpRequest::new(Method::Post, url).json(&payload)?)
            .await?;
        confirm_echo(PROVIDER, domain, addr, created.records.first().map(String::as_str))
    }

    async fn modify_record(
        &self,
        record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let zone_id = match record.zone_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => self.zone_id(&domain.domain_name).await?,
        };
        let payload = json!({
            "name": record.name,
            "type": record_type.as_str(),
            "records": [addr],
            "ttl": self.ttl,
        });

        let url = format!(
            "{}/v2/zones/{}/recordsets/{}",
            HUAWEI_ENDPOINT, zone_id, record.id
        );
        let updated: RecordSet = self
            .call(HttpRequest::new(Method::Put, url).json(&payload)?)
            .await?;
        confirm_echo(PROVIDER, domain, addr, updated.records.first().map(String::as_str))
    }
}

/// Factory for [`HuaweiCloud`] drivers
pub struct HuaweiCloudFactory {
    transport: Arc<dyn HttpTransport>,
}

impl HuaweiCloudFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for HuaweiCloudFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(Reconciler::new(HuaweiCloud::new(entry, self.transport.clone()))))
    }
}
