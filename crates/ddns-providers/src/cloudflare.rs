// # Cloudflare Driver
//
// ## Security Requirements
//
// - API token NEVER appears in logs
// - Driver creation fails fast if the token is empty
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
//
// `?proxied=true` on a configured domain creates the record proxied. Updates
// keep whatever proxy setting the record already has.

use crate::http::query_string;
use async_trait::async_trait;
use ddns_core::reconcile::{Reconciler, confirm_echo};
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpResponse, HttpTransport, Method, RecordApi,
    RecordMetadata,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

const PROVIDER: &str = "cloudflare";

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// TTL 1 means "automatic"
const DEFAULT_TTL: u32 = 1;

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Zone {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct CfRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
    #[serde(default)]
    proxied: bool,
    ttl: Option<u32>,
}

/// Cloudflare driver
pub struct Cloudflare {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    transport: Arc<dyn HttpTransport>,

    ttl: u32,

    /// Zone ids resolved during this cycle, by zone name
    zones: Mutex<HashMap<String, String>>,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for Cloudflare {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cloudflare")
            .field("api_token", &"<REDACTED>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Cloudflare {
    /// Create a Cloudflare driver
    ///
    /// # Parameters
    ///
    /// - `entry`: Configuration entry; `secret` holds an API token with Zone:DNS:Edit permission
    /// - `transport`: Shared HTTP transport
    ///
    /// # Returns
    ///
    /// - `Err(Error::Config)`: The token is empty
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        if entry.dns.secret.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }
        Ok(Self {
            api_token: entry.dns.secret.clone(),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
            zones: Mutex::new(HashMap::new()),
        })
    }

    async fn request<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T> {
        let request = request.header("Authorization", format!("Bearer {}", self.api_token));
        let response = self.transport.send(request).await?;
        decode(response)
    }

    /// Get the zone ID for a root domain
    ///
    /// Only a zone whose name equals the root exactly is accepted.
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones?name=example.com&status=active
    /// Authorization: Bearer <token>
    /// ```
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

        let url = format!(
            "{}/zones?{}",
            CLOUDFLARE_API_BASE,
            query_string([("name", root), ("status", "active"), ("per_page", "50")])
        );
        let zones: Vec<Zone> = self.request(HttpRequest::get(url)).await?;
        let zone = zones
            .into_iter()
            .find(|z| z.name == root)
            .ok_or_else(|| Error::provider(PROVIDER, format!("Zone not found: {}", root)))?;

        debug!("[{}] Found zone ID {} for {}", PROVIDER, zone.id, root);
        self.zones
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(root.to_string(), zone.id.clone());
        Ok(zone.id)
    }
}

/// Decode an API v4 envelope, mapping HTTP status codes to the error taxonomy
fn decode<T: DeserializeOwned>(response: HttpResponse) -> Result<T> {
    if matches!(response.status, 401 | 403) {
        return Err(Error::auth(
            PROVIDER,
            format!(
                "Invalid API token or insufficient permissions. Status: {}",
                response.status
            ),
        ));
    }

    let envelope: ApiResponse<T> = match response.json() {
        Ok(envelope) => envelope,
        Err(_) if !response.is_success() => {
            return Err(Error::http_status(response.status, response.text()));
        }
        Err(e) => return Err(e),
    };
    if !envelope.success || !response.is_success() {
        let message = envelope
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        return Err(Error::http_status(response.status, message));
    }
    envelope
        .result
        .ok_or_else(|| Error::decode("Cloudflare response has no result"))
}

#[async_trait]
impl RecordApi for Cloudflare {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let zone_id = self.zone_id(&domain.domain_name).await?;
        let fqdn = domain.fqdn();
        let url = format!(
            "{}/zones/{}/dns_records?{}",
            CLOUDFLARE_API_BASE,
            zone_id,
            query_string([("type", record_type.as_str()), ("name", fqdn.as_str()), ("per_page", "50")])
        );

        let records: Vec<CfRecord> = self.request(HttpRequest::get(url)).await?;
        Ok(records
            .into_iter()
            .find(|r| r.name == fqdn && r.record_type == record_type.as_str())
            .map(|r| {
                let mut record = RecordMetadata::new(r.id, r.name, r.content);
                record.ttl = r.ttl;
                record.zone_id = Some(zone_id);
                record.extra = json!({ "proxied": r.proxied });
                record
            }))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        let zone_id = self.zone_id(&domain.domain_name).await?;
        let payload = json!({
            "type": record_type.as_str(),
            "name": domain.fqdn(),
            "content": addr,
            "proxied": domain.param("proxied") == Some("true"),
            "ttl": self.ttl,
        });

        let url = format!("{}/zones/{}/dns_records", CLOUDFLARE_API_BASE, zone_id);
        let created: CfRecord = self
            .request(HttpRequest::new(Method::Post, url).json(&payload)?)
            .await?;
        confirm_echo(PROVIDER, domain, addr, Some(&created.content))
    }

    async fn modify_record(
        &self,
        record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let zone_id = match &record.zone_id {
            Some(id) => id.clone(),
            None => self.zone_id(&domain.domain_name).await?,
        };
        let payload = json!({
            "type": record_type.as_str(),
            "name": domain.fqdn(),
            "content": addr,
            "proxied": record.extra["proxied"].as_bool().unwrap_or(false),
            "ttl": self.ttl,
        });

        let url = format!(
            "{}/zones/{}/dns_records/{}",
            CLOUDFLARE_API_BASE, zone_id, record.id
        );
        let updated: CfRecord = self
            .request(HttpRequest::new(Method::Put, url).json(&payload)?)
            .await?;
        confirm_echo(PROVIDER, domain, addr, Some(&updated.content))
    }
}

/// Factory for creating Cloudflare drivers
pub struct CloudflareFactory {
    transport: Arc<dyn HttpTransport>,
}

impl CloudflareFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for CloudflareFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(Reconciler::new(Cloudflare::new(entry, self.transport.clone())?)))
    }
}
