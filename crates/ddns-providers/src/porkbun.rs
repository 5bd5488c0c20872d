// # Porkbun Driver
//
// Porkbun JSON API v3: every call is a POST carrying `apikey` (ID) and
// `secretapikey` (Secret) in the body, answered with `"status": "SUCCESS"`
// or `"status": "ERROR"` plus a message.
//
// - Find: `/dns/retrieveByNameType/{root}/{type}/{sub}`
// - Create: `/dns/create/{root}`
// - Modify: `/dns/editByNameType/{root}/{type}/{sub}`

use async_trait::async_trait;
use ddns_core::reconcile::Reconciler;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpResponse, HttpTransport, Method, RecordApi,
    RecordMetadata,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const PROVIDER: &str = "porkbun";
const PORKBUN_API_BASE: &str = "https://api.porkbun.com/api/json/v3";
const DEFAULT_TTL: u32 = 600;

#[derive(Debug, Deserialize)]
struct Status {
    status: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct Records {
    #[serde(default)]
    records: Vec<PorkbunRecord>,
}

#[derive(Debug, Deserialize)]
struct PorkbunRecord {
    id: String,
    name: String,
    #[serde(rename = "type")]
    record_type: String,
    content: String,
}

/// Porkbun driver
pub struct Porkbun {
    api_key: String,
    secret_api_key: String,
    transport: Arc<dyn HttpTransport>,
    ttl: u32,
}

impl std::fmt::Debug for Porkbun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Porkbun")
            .field("api_key", &self.api_key)
            .field("secret_api_key", &"<REDACTED>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Porkbun {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            api_key: entry.dns.id.clone(),
            secret_api_key: entry.dns.secret.clone(),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
        }
    }

    async fn call<T: DeserializeOwned>(&self, path: &str, mut body: Value) -> Result<T> {
        body["apikey"] = json!(self.api_key);
        body["secretapikey"] = json!(self.secret_api_key);

        let url = format!("{}{}", PORKBUN_API_BASE, path);
        let response = self
            .transport
            .send(HttpRequest::new(Method::Post, url).json(&body)?)
            .await?;
        check_status(&response)?;
        response.json()
    }

    /// Subdomain segment of a path, empty for the apex
    fn path_sub(domain: &Domain) -> String {
        urlencoding::encode(&domain.sub_domain).into_owned()
    }
}

fn check_status(response: &HttpResponse) -> Result<()> {
    let status = match response.json::<Status>() {
        Ok(status) => status,
        Err(_) if response.is_success() => {
            return Err(Error::decode("Porkbun response has no status"));
        }
        Err(_) => return Err(Error::http_status(response.status, response.text())),
    };
    if status.status == "SUCCESS" {
        return Ok(());
    }
    if status.message.contains("API key") || matches!(response.status, 401 | 403) {
        return Err(Error::auth(PROVIDER, status.message));
    }
    if response.is_success() {
        return Err(Error::provider(PROVIDER, status.message));
    }
    Err(Error::http_status(response.status, status.message))
}

#[async_trait]
impl RecordApi for Porkbun {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let path = format!(
            "/dns/retrieveByNameType/{}/{}/{}",
            domain.domain_name,
            record_type,
            Self::path_sub(domain)
        );
        let response: Records = self.call(&path, json!({})).await?;

        let fqdn = domain.fqdn();
        Ok(response
            .records
            .into_iter()
            .find(|r| r.name == fqdn && r.record_type == record_type.as_str())
            .map(|r| RecordMetadata::new(r.id, r.name, r.content)))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        let path = format!("/dns/create/{}", domain.domain_name);
        let body = json!({
            "name": domain.sub_domain,
            "type": record_type.as_str(),
            "content": addr,
            "ttl": self.ttl.to_string(),
        });
        let _: Value = self.call(&path, body).await?;
        Ok(())
    }

    async fn modify_record(
        &self,
        _record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let path = format!(
            "/dns/editByNameType/{}/{}/{}",
            domain.domain_name,
            record_type,
            Self::path_sub(domain)
        );
        let body = json!({ "content": addr, "ttl": self.ttl.to_string() });
        let _: Value = self.call(&path, body).await?;
        Ok(())
    }
}

/// Factory for [`Porkbun`] drivers
pub struct PorkbunFactory {
    transport: Arc<dyn HttpTransport>,
}

impl PorkbunFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for PorkbunFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(Reconciler::new(Porkbun::new(entry, self.transport.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_status() {
        assert!(check_status(&HttpResponse::new(200, r#"{"status":"SUCCESS"}"#)).is_ok());

        let invalid_key = HttpResponse::new(
            400,
            r#"{"status":"ERROR","message":"Invalid API key. (002)"}"#,
        );
        assert!(check_status(&invalid_key).unwrap_err().is_auth_failure());

        let refused = HttpResponse::new(200, r#"{"status":"ERROR","message":"Edit error"}"#);
        assert!(matches!(
            check_status(&refused),
            Err(Error::Provider { .. })
        ));

        let gateway = HttpResponse::new(502, "<html>Bad Gateway</html>");
        assert!(check_status(&gateway).unwrap_err().aborts_record_loop());
    }
}
