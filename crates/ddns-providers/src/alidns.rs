// # AliDNS Driver
//
// Aliyun DNS over the RPC-style OpenAPI, signed with ACS3-HMAC-SHA256.
//
// ## API Reference
//
// - Find: `DescribeSubDomainRecords` (SubDomain, DomainName, Type)
// - Create: `AddDomainRecord` (DomainName, RR, Type, Value, TTL, Line)
// - Modify: `UpdateDomainRecord` (RecordId, RR, Type, Value, TTL, Line)
//
// All parameters travel in the query string of an empty-bodied POST. A
// domain may pick a resolution line with `?Line=...`.

use crate::http::{query_string, send_signed};
use crate::sign::{AliyunSigner, NONCE_HEADER};
use async_trait::async_trait;
use ddns_core::reconcile::Reconciler;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpResponse, HttpTransport, Method, RecordApi,
    RecordMetadata,
};
use ddns_core::{DnsEntry, Domain, Error, RecordType, Result};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;

const PROVIDER: &str = "alidns";
const ALIDNS_ENDPOINT: &str = "https://alidns.aliyuncs.com/";
const ALIDNS_VERSION: &str = "2015-01-09";
const DEFAULT_TTL: u32 = 600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SubDomainRecordsResponse {
    #[serde(default)]
    domain_records: DomainRecords,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DomainRecords {
    #[serde(default)]
    record: Vec<AliRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AliRecord {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    #[serde(rename = "Type")]
    record_type: String,
    value: String,
    #[serde(rename = "TTL")]
    ttl: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordIdResponse {
    #[serde(default)]
    record_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorResponse {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// AliDNS driver
pub struct Alidns {
    signer: AliyunSigner,
    transport: Arc<dyn HttpTransport>,
    ttl: u32,
}

impl std::fmt::Debug for Alidns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Alidns")
            .field("signer", &self.signer)
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Alidns {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            signer: AliyunSigner::new(&entry.dns.id, &entry.dns.secret),
            transport,
            ttl: entry.ttl_or(DEFAULT_TTL),
        }
    }

    async fn call<T: DeserializeOwned>(&self, action: &str, params: &[(&str, &str)]) -> Result<T> {
        let url = format!("{}?{}", ALIDNS_ENDPOINT, query_string(params.iter().copied()));
        let request = HttpRequest::new(Method::Post, url)
            .header("x-acs-action", action)
            .header("x-acs-version", ALIDNS_VERSION)
            .header(NONCE_HEADER, uuid::Uuid::new_v4().to_string());

        let response = send_signed(self.transport.as_ref(), &self.signer, request).await?;
        check_response(&response)?;
        response.json()
    }
}

/// Map an error body to the error taxonomy
fn check_response(response: &HttpResponse) -> Result<()> {
    if response.is_success() {
        return Ok(());
    }
    let Ok(error) = response.json::<ErrorResponse>() else {
        return Err(Error::http_status(response.status, response.text()));
    };
    let auth_codes = ["InvalidAccessKeyId", "SignatureDoesNotMatch", "IncompleteSignature"];
    if auth_codes.iter().any(|code| error.code.starts_with(code)) {
        return Err(Error::auth(PROVIDER, format!("{}: {}", error.code, error.message)));
    }
    Err(Error::http_status(
        response.status,
        format!("{}: {}", error.code, error.message),
    ))
}

fn confirm_record_id(response: RecordIdResponse, domain: &Domain) -> Result<()> {
    if response.record_id.is_empty() {
        return Err(Error::provider_logic(
            PROVIDER,
            format!("{} write returned no RecordId", domain),
        ));
    }
    Ok(())
}

#[async_trait]
impl RecordApi for Alidns {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn find_record(
        &self,
        domain: &Domain,
        record_type: RecordType,
    ) -> Result<Option<RecordMetadata>> {
        let fqdn = domain.fqdn();
        let response: SubDomainRecordsResponse = self
            .call(
                "DescribeSubDomainRecords",
                &[
                    ("DomainName", domain.domain_name.as_str()),
                    ("SubDomain", fqdn.as_str()),
                    ("Type", record_type.as_str()),
                ],
            )
            .await?;

        // SubDomain is matched loosely server-side
        let rr = domain.sub_domain_or_apex();
        Ok(response
            .domain_records
            .record
            .into_iter()
            .find(|r| r.rr == rr && r.record_type == record_type.as_str())
            .map(|r| {
                let mut record = RecordMetadata::new(r.record_id, fqdn.clone(), r.value);
                record.ttl = r.ttl;
                record
            }))
    }

    async fn create_record(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<()> {
        let ttl = self.ttl.to_string();
        let mut params = vec![
            ("DomainName", domain.domain_name.as_str()),
            ("RR", domain.sub_domain_or_apex()),
            ("Type", record_type.as_str()),
            ("Value", addr),
            ("TTL", ttl.as_str()),
        ];
        if let Some(line) = domain.param("Line") {
            params.push(("Line", line));
        }

        let response: RecordIdResponse = self.call("AddDomainRecord", &params).await?;
        confirm_record_id(response, domain)
    }

    async fn modify_record(
        &self,
        record: &RecordMetadata,
        domain: &Domain,
        record_type: RecordType,
        addr: &str,
    ) -> Result<()> {
        let ttl = self.ttl.to_string();
        let mut params = vec![
            ("RecordId", record.id.as_str()),
            ("RR", domain.sub_domain_or_apex()),
            ("Type", record_type.as_str()),
            ("Value", addr),
            ("TTL", ttl.as_str()),
        ];
        if let Some(line) = domain.param("Line") {
            params.push(("Line", line));
        }

        let response: RecordIdResponse = self.call("UpdateDomainRecord", &params).await?;
        confirm_record_id(response, domain)
    }
}

/// Factory for [`Alidns`] drivers
pub struct AlidnsFactory {
    transport: Arc<dyn HttpTransport>,
}

impl AlidnsFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for AlidnsFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(Reconciler::new(Alidns::new(entry, self.transport.clone()))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_sub_domain_records() {
        let body = r#"{"TotalCount":1,"DomainRecords":{"Record":[
            {"RR":"www","Type":"A","Value":"203.0.113.5","RecordId":"9001","TTL":600,
             "DomainName":"example.com","Line":"default"}]}}"#;
        let decoded: SubDomainRecordsResponse = serde_json::from_str(body).unwrap();
        let record = &decoded.domain_records.record[0];
        assert_eq!(record.rr, "www");
        assert_eq!(record.record_id, "9001");
        assert_eq!(record.ttl, Some(600));
    }

    #[test]
    fn test_auth_error_codes() {
        let response = HttpResponse::new(
            404,
            r#"{"Code":"InvalidAccessKeyId.NotFound","Message":"Specified access key is not found."}"#,
        );
        assert!(check_response(&response).unwrap_err().is_auth_failure());

        let response = HttpResponse::new(400, r#"{"Code":"DomainRecordDuplicate","Message":"dup"}"#);
        let err = check_response(&response).unwrap_err();
        assert!(!err.is_auth_failure());
        assert!(matches!(err, Error::HttpStatus { status: 400, .. }));
    }
}
