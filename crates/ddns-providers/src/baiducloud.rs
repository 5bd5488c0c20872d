// # Baidu Cloud DNS Driver
//
// Baidu Cloud Domain (BCD) resolve API: <https://cloud.baidu.com/doc/BCD/s/4jwvymhs7>
//
// - List: POST `/v1/domain/resolve/list` (by root domain)
// - Create: POST `/v1/domain/resolve/add`
// - Modify: POST `/v1/domain/resolve/edit`
//
// The list call returns every record of the zone; the matching record is
// picked by host label and record type. Writes echo nothing, so a 2xx is
// the confirmation.

use crate::http::send_signed;
use crate::sign::BaiduSigner;
use async_trait::async_trait;
use ddns_core::reconcile::Reconciler;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpTransport, Method, RecordApi, RecordMetadata,
    expect_success,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const PROVIDER: &str = "baiducloud";
const BAIDU_ENDPOINT: &str = "https://bcd.baidubce.com";
const DEFAULT_TTL: u32 = 300;
const PAGE_SIZE: u32 = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordsResponse {
    #[serde(default)]
    result: Vec<BaiduRecord>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaiduRecord {
    record_id: u64,
    domain: String,
    #[serde(default)]
    view: String,
    rdtype: String,
    #[serde(default)]
    ttl: u32,
    rdata: String,
    zone_name: String,
}

/// Baidu Cloud DNS driver
pub struct BaiduCloud {
    signer: BaiduSigner,
    transport: Arc<dyn HttpTransport>,
    ttl: u32,
}

impl std::fmt::Debug for BaiduCloud {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaiduCloud")
            .field("signer", &self.signer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl BaiduCloud {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            signer: BaiduSigner::new(&entry.dns.id, &entry.dns.secret),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
        }
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<String> {
        let request = HttpRequest::new(Method::Post, format!("{}{}", BAIDU_ENDPOINT, path)).json(body)?;
        let response = send_signed(self.transport.as_ref(), &self.signer, request).await?;
        Ok(expect_success(response)?.text())
    }
}

#[async_trait]
impl RecordApi for BaiduCloud {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let body = self
            .post(
                "/v1/domain/resolve/list",
                &json!({ "domain": domain.domain_name, "pageNum": 1, "pageSize": PAGE_SIZE }),
            )
            .await?;
        let response: RecordsResponse =
            serde_json::from_str(&body).map_err(|e| Error::decode(e.to_string()))?;

        let host = domain.sub_domain_or_apex();
        let Some(found) = response
            .result
            .into_iter()
            .find(|r| r.domain == host && r.rdtype == record_type.as_str())
        else {
            return Ok(None);
        };

        let mut record = RecordMetadata::new(found.record_id.to_string(), domain.fqdn(), &found.rdata);
        record.ttl = Some(found.ttl);
        record.zone_id = Some(found.zone_name.clone());
        record.extra = serde_json::to_value(&found)?;
        Ok(Some(record))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        self.post(
            "/v1/domain/resolve/add",
            &json!({
                "domain": domain.sub_domain_or_apex(),
                "rdType": record_type.as_str(),
                "ttl": self.ttl,
                "rdata": addr,
                "zoneName": domain.domain_name,
            }),
        )
        .await?;
        Ok(())
    }

    async fn modify_record(
        &self,
        record: &RecordMetadata,
        _domain: &Domain,
        _record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let original: BaiduRecord = serde_json::from_value(record.extra.clone())
            .map_err(|e| Error::invalid_input(format!("Baidu record {}: {}", record.id, e)))?;

        self.post(
            "/v1/domain/resolve/edit",
            &json!({
                "recordId": original.record_id,
                "domain": original.domain,
                "view": original.view,
                "rdType": original.rdtype,
                "ttl": original.ttl,
                "rdata": addr,
                "zoneName": original.zone_name,
            }),
        )
        .await?;
        Ok(())
    }
}

/// Factory for [`BaiduCloud`] drivers
pub struct BaiduCloudFactory {
    transport: Arc<dyn HttpTransport>,
}

impl BaiduCloudFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for BaiduCloudFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(Reconciler::new(BaiduCloud::new(entry, self.transport.clone()))))
    }
}
