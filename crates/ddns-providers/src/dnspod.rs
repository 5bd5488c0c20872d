// # DNSPod Driver
//
// DNSPod through Tencent Cloud API 3.0 (version 2021-03-23), signed with
// TC3-HMAC-SHA256. Every call is a JSON POST to the service root; the
// action travels in `X-TC-Action`.
//
// A domain may pick a resolution line with `?RecordLine=...` (default "默认").

use crate::http::send_signed;
use crate::sign::TencentSigner;
use async_trait::async_trait;
use ddns_core::reconcile::Reconciler;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpTransport, Method, RecordApi, RecordMetadata,
    expect_success,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const PROVIDER: &str = "dnspod";
const DNSPOD_ENDPOINT: &str = "https://dnspod.tencentcloudapi.com";
const DNSPOD_VERSION: &str = "2021-03-23";
const DEFAULT_RECORD_LINE: &str = "默认";
const DEFAULT_TTL: u32 = 600;

/// Returned by DescribeRecordList when nothing matches
const NO_DATA_OF_RECORD: &str = "ResourceNotFound.NoDataOfRecord";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope<T> {
    response: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordList {
    #[serde(default)]
    record_list: Vec<PodRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct PodRecord {
    record_id: u64,
    name: String,
    #[serde(rename = "Type")]
    record_type: String,
    value: String,
    #[serde(rename = "TTL")]
    ttl: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordIdResponse {
    record_id: Option<u64>,
}

/// DNSPod driver
pub struct Dnspod {
    signer: TencentSigner,
    transport: Arc<dyn HttpTransport>,
    ttl: u32,
}

impl std::fmt::Debug for Dnspod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dnspod")
            .field("signer", &self.signer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Dnspod {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            signer: TencentSigner::new(&entry.dns.id, &entry.dns.secret),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
        }
    }

    /// Issue one action
    ///
    /// # Returns
    ///
    /// - `Ok(Ok(T))`: The action succeeded
    /// - `Ok(Err(ApiError))`: The API answered with an error code not mapped here
    /// - `Err(Error)`: Transport, status or authentication failure
    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        payload: &Value,
    ) -> Result<std::result::Result<T, ApiError>> {
        let request = HttpRequest::new(Method::Post, DNSPOD_ENDPOINT)
            .header("Content-Type", "application/json; charset=utf-8")
            .header("X-TC-Action", action)
            .header("X-TC-Version", DNSPOD_VERSION)
            .body(serde_json::to_vec(payload)?);

        let response = expect_success(
            send_signed(self.transport.as_ref(), &self.signer, request).await?,
        )?;
        let envelope: Envelope<Value> = response.json()?;

        if let Some(error) = envelope.response.get("Error") {
            let error: ApiError = serde_json::from_value(error.clone())
                .map_err(|e| Error::decode(e.to_string()))?;
            if error.code.starts_with("AuthFailure") {
                return Err(Error::auth(PROVIDER, format!("{}: {}", error.code, error.message)));
            }
            return Ok(Err(error));
        }

        serde_json::from_value(envelope.response)
            .map(Ok)
            .map_err(|e| Error::decode(e.to_string()))
    }

    fn write_payload(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Value {
        json!({
            "Domain": domain.domain_name,
            "SubDomain": domain.sub_domain_or_apex(),
            "RecordType": record_type.as_str(),
            "RecordLine": domain.param("RecordLine").unwrap_or(DEFAULT_RECORD_LINE),
            "Value": addr,
            "TTL": self.ttl,
        })
    }
}

fn into_result<T>(outcome: std::result::Result<T, ApiError>) -> Result<T> {
    outcome.map_err(|e| Error::provider(PROVIDER, format!("{}: {}", e.code, e.message)))
}

fn confirm_record_id(response: RecordIdResponse, domain: &Domain) -> Result<()> {
    match response.record_id {
        Some(_) => Ok(()),
        None => Err(Error::provider_logic(
            PROVIDER,
            format!("{} write returned no RecordId", domain),
        )),
    }
}

#[async_trait]
impl RecordApi for Dnspod {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let mut payload = json!({
            "Domain": domain.domain_name,
            "Subdomain": domain.sub_domain_or_apex(),
            "RecordType": record_type.as_str(),
        });
        if let Some(line) = domain.param("RecordLine") {
            payload["RecordLine"] = json!(line);
        }

        let list: RecordList = match self.call("DescribeRecordList", &payload).await? {
            Ok(list) => list,
            Err(e) if e.code == NO_DATA_OF_RECORD => return Ok(None),
            Err(e) => return into_result(Err(e)),
        };

        let name = domain.sub_domain_or_apex();
        Ok(list
            .record_list
            .into_iter()
            .find(|r| r.name == name && r.record_type == record_type.as_str())
            .map(|r| {
                let mut record = RecordMetadata::new(r.record_id.to_string(), domain.fqdn(), r.value);
                record.ttl = r.ttl;
                record
            }))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        let payload = self.write_payload(domain, record_type, addr);
        let response = into_result(self.call("CreateRecord", &payload).await?)?;
        confirm_record_id(response, domain)
    }

    async fn modify_record(
        &self,
        record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let mut payload = self.write_payload(domain, record_type, addr);
        let record_id: u64 = record
            .id
            .parse()
            .map_err(|_| Error::invalid_input(format!("DNSPod record id '{}'", record.id)))?;
        payload["RecordId"] = json!(record_id);

        let response = into_result(self.call("ModifyRecord", &payload).await?)?;
        confirm_record_id(response, domain)
    }
}

/// Factory for [`Dnspod`] drivers
pub struct DnspodFactory {
    transport: Arc<dyn HttpTransport>,
}

impl DnspodFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for DnspodFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(Reconciler::new(Dnspod::new(entry, self.transport.clone()))))
    }
}
