// # GoDaddy Driver
//
// GoDaddy Domains API v1 with `Authorization: sso-key {key}:{secret}`.
//
// - Find: GET `/v1/domains/{root}/records/{type}/{name}`
// - Create: PATCH `/v1/domains/{root}/records` (appends)
// - Modify: PUT `/v1/domains/{root}/records/{type}/{name}` (replaces)
//
// Writes return an empty 200, so a 2xx is the confirmation.

use async_trait::async_trait;
use ddns_core::reconcile::Reconciler;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpResponse, HttpTransport, Method, RecordApi,
    RecordMetadata, expect_success,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

const PROVIDER: &str = "godaddy";
const GODADDY_API_BASE: &str = "https://api.godaddy.com/v1";
const DEFAULT_TTL: u32 = 600;

#[derive(Debug, Deserialize)]
struct GoDaddyRecord {
    data: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    ttl: Option<u32>,
}

/// GoDaddy driver
pub struct GoDaddy {
    key: String,
    secret: String,
    transport: Arc<dyn HttpTransport>,
    ttl: u32,
}

impl std::fmt::Debug for GoDaddy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoDaddy")
            .field("key", &self.key)
            .field("secret", &"<REDACTED>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl GoDaddy {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            key: entry.dns.id.clone(),
            secret: entry.dns.secret.clone(),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = request
            .header("Authorization", format!("sso-key {}:{}", self.key, self.secret))
            .header("Accept", "application/json");
        expect_success(self.transport.send(request).await?)
    }

    fn records_url(domain: &Domain, record_type: RecordType) -> String {
        format!(
            "{}/domains/{}/records/{}/{}",
            GODADDY_API_BASE,
            domain.domain_name,
            record_type,
            urlencoding::encode(domain.sub_domain_or_apex())
        )
    }
}

#[async_trait]
impl RecordApi for GoDaddy {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let url = Self::records_url(domain, record_type);
        let records: Vec<GoDaddyRecord> = self.send(HttpRequest::get(url)).await?.json()?;

        let name = domain.sub_domain_or_apex();
        Ok(records
            .into_iter()
            .find(|r| r.name == name && r.record_type == record_type.as_str())
            .map(|r| {
                let mut record = RecordMetadata::new(r.name.clone(), domain.fqdn(), r.data);
                record.ttl = r.ttl;
                record
            }))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        let url = format!("{}/domains/{}/records", GODADDY_API_BASE, domain.domain_name);
        let payload = json!([{
            "data": addr,
            "name": domain.sub_domain_or_apex(),
            "ttl": self.ttl,
            "type": record_type.as_str(),
        }]);
        self.send(HttpRequest::new(Method::Patch, url).json(&payload)?)
            .await?;
        Ok(())
    }

    async fn modify_record(
        &self,
        _record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let url = Self::records_url(domain, record_type);
        let payload = json!([{ "data": addr, "ttl": self.ttl }]);
        self.send(HttpRequest::new(Method::Put, url).json(&payload)?)
            .await?;
        Ok(())
    }
}

/// Factory for [`GoDaddy`] drivers
pub struct GoDaddyFactory {
    transport: Arc<dyn HttpTransport>,
}

impl GoDaddyFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for GoDaddyFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        if entry.dns.id.trim().is_empty() || entry.dns.secret.trim().is_empty() {
            return Err(Error::config("GoDaddy key and secret are required"));
        }
        Ok(Box::new(Reconciler::new(GoDaddy::new(entry, self.transport.clone()))))
    }
}
