//! Huawei Cloud SDK-HMAC-SHA256 signature
//!
//! Reference: <https://support.huaweicloud.com/devg-apisign/api-sign-algorithm-005.html>

use super::{RequestSigner, canonical_headers, canonical_query, hmac_sha256, require_credentials, sha256_hex};
use chrono::{DateTime, Utc};
use ddns_core::Result;
use ddns_core::traits::HttpRequest;
use tracing::trace;

const ALGORITHM: &str = "SDK-HMAC-SHA256";

/// Signer for Huawei Cloud APIG-style requests
#[derive(Clone)]
pub struct HuaweiSigner {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for HuaweiSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuaweiSigner")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

impl HuaweiSigner {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl RequestSigner for HuaweiSigner {
    fn sign(&self, request: &mut HttpRequest, now: DateTime<Utc>) -> Result<()> {
        require_credentials(ALGORITHM, &self.access_key, &self.secret_key)?;

        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        let host = request.host()?;
        request.set_header("Host", host);
        request.set_header("X-Sdk-Date", timestamp.as_str());
        if request.header_value("Content-Type").is_none() {
            request.set_header("Content-Type", "application/json");
        }

        // The URI always ends with '/'
        let path = request.path()?;
        let canonical_uri = if path.ends_with('/') {
            path
        } else {
            format!("{}/", path)
        };
        let (headers, signed_headers) = canonical_headers(&request.headers, |name| {
            matches!(name, "host" | "x-sdk-date" | "content-type")
        });

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method,
            canonical_uri,
            canonical_query(&request.query()?),
            headers,
            signed_headers,
            sha256_hex(&request.body)
        );
        trace!("CanonicalRequest:\n{}", canonical_request);

        let string_to_sign = format!(
            "{}\n{}\n{}",
            ALGORITHM,
            timestamp,
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = hex::encode(hmac_sha256(
            self.secret_key.as_bytes(),
            string_to_sign.as_bytes(),
        )?);

        request.set_header(
            "Authorization",
            format!(
                "{} Access={}, SignedHeaders={}, Signature={}",
                ALGORITHM, self.access_key, signed_headers, signature
            ),
        );
        Ok(())
    }
}
