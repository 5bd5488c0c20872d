//! Baidu Cloud BCE v1 signature
//!
//! Reference: <https://cloud.baidu.com/doc/Reference/s/njwvz1yfu>

use super::{RequestSigner, canonical_query, hmac_sha256, require_credentials};
use chrono::{DateTime, Utc};
use ddns_core::Result;
use ddns_core::traits::HttpRequest;

/// Validity of a signature in seconds
const EXPIRATION_SECS: u32 = 1800;

/// Signer for Baidu Cloud (BCE) requests
///
/// Only the host header is signed.
#[derive(Clone)]
pub struct BaiduSigner {
    access_key: String,
    secret_key: String,
}

impl std::fmt::Debug for BaiduSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BaiduSigner")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<REDACTED>")
            .finish()
    }
}

impl BaiduSigner {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }
}

impl RequestSigner for BaiduSigner {
    fn sign(&self, request: &mut HttpRequest, now: DateTime<Utc>) -> Result<()> {
        require_credentials("bce-auth-v1", &self.access_key, &self.secret_key)?;

        let timestamp = now.format("%Y-%m-%dT%H:%M:%SZ").to_string();
        let scope = format!(
            "bce-auth-v1/{}/{}/{}",
            self.access_key, timestamp, EXPIRATION_SECS
        );
        let signing_key = hex::encode(hmac_sha256(self.secret_key.as_bytes(), scope.as_bytes())?);

        let canonical_request = format!(
            "{}\n{}\n{}\nhost:{}",
            request.method,
            request.path()?,
            canonical_query(&request.query()?),
            urlencoding::encode(&request.host()?)
        );
        let signature = hex::encode(hmac_sha256(
            signing_key.as_bytes(),
            canonical_request.as_bytes(),
        )?);

        request.set_header("x-bce-date", timestamp);
        request.set_header("Authorization", format!("{}/host/{}", scope, signature));
        Ok(())
    }
}
