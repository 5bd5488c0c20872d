//! Aliyun ACS3-HMAC-SHA256 signature
//!
//! Reference: <https://www.alibabacloud.com/help/zh/sdk/product-overview/v3-request-structure-and-signature>

use super::{RequestSigner, canonical_headers, canonical_query, hmac_sha256, require_credentials, sha256_hex};
use chrono::{DateTime, Utc};
use ddns_core::traits::HttpRequest;
use ddns_core::{Error, Result};
use tracing::trace;

const ALGORITHM: &str = "ACS3-HMAC-SHA256";

/// Nonce header the caller must set before signing
pub const NONCE_HEADER: &str = "x-acs-signature-nonce";

/// Signer for Aliyun OpenAPI V3 requests
///
/// The caller sets `x-acs-action`, `x-acs-version` and
/// `x-acs-signature-nonce`; the signer adds the host, date and
/// payload hash headers and signs every `x-acs-*` header.
#[derive(Clone)]
pub struct AliyunSigner {
    access_key_id: String,
    access_key_secret: String,
}

impl std::fmt::Debug for AliyunSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunSigner")
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<REDACTED>")
            .finish()
    }
}

impl AliyunSigner {
    pub fn new(access_key_id: impl Into<String>, access_key_secret: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            access_key_secret: access_key_secret.into(),
        }
    }
}

impl RequestSigner for AliyunSigner {
    fn sign(&self, request: &mut HttpRequest, now: DateTime<Utc>) -> Result<()> {
        require_credentials(ALGORITHM, &self.access_key_id, &self.access_key_secret)?;
        if request.header_value(NONCE_HEADER).is_none() {
            return Err(Error::signing(format!("{}: missing {}", ALGORITHM, NONCE_HEADER)));
        }

        let payload_hash = sha256_hex(&request.body);
        let host = request.host()?;
        request.set_header("host", host);
        request.set_header("x-acs-date", now.format("%Y-%m-%dT%H:%M:%SZ").to_string());
        request.set_header("x-acs-content-sha256", payload_hash.as_str());

        let (headers, signed_headers) = canonical_headers(&request.headers, |name| {
            name == "host" || name.starts_with("x-acs-")
        });
        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method,
            request.path()?,
            canonical_query(&request.query()?),
            headers,
            signed_headers,
            payload_hash
        );
        trace!("CanonicalRequest:\n{}", canonical_request);

        let string_to_sign = format!("{}\n{}", ALGORITHM, sha256_hex(canonical_request.as_bytes()));
        let signature = hex::encode(hmac_sha256(
            self.access_key_secret.as_bytes(),
            string_to_sign.as_bytes(),
        )?);

        request.set_header(
            "Authorization",
            format!(
                "{} Credential={},SignedHeaders={},Signature={}",
                ALGORITHM, self.access_key_id, signed_headers, signature
            ),
        );
        Ok(())
    }
}
