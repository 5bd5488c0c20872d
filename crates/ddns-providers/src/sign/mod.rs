// # Request Signers
//
// Each provider authenticates requests differently. A signer takes a fully
// built request and adds the authentication headers in place.
//
// ## Implementations
//
// - `HuaweiSigner`: SDK-HMAC-SHA256 canonical-request scheme
// - `BaiduSigner`: BCE v1 expiring credential scope
// - `AliyunSigner`: ACS3-HMAC-SHA256 (RPC style, parameters in the query)
// - `TencentSigner`: TC3-HMAC-SHA256 with a date-derived key chain
//
// Signers hold nothing but credentials. The timestamp is passed in and any
// nonce is supplied by the caller as a header, so the same inputs always
// produce the same signature.

mod aliyun;
mod baidu;
mod huawei;
mod tencent;

pub use aliyun::{AliyunSigner, NONCE_HEADER};
pub use baidu::BaiduSigner;
pub use huawei::HuaweiSigner;
pub use tencent::TencentSigner;

use chrono::{DateTime, Utc};
use ddns_core::traits::HttpRequest;
use ddns_core::{Error, Result};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt::Write;

type HmacSha256 = Hmac<Sha256>;

/// Trait for request signer implementations
pub trait RequestSigner: Send + Sync {
    /// Add authentication headers to a request
    ///
    /// # Parameters
    ///
    /// - `request`: Request to sign; headers are added in place
    /// - `now`: Signing time
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Request is signed
    /// - `Err(Error::Signing)`: Credentials are missing or a required header is absent
    fn sign(&self, request: &mut HttpRequest, now: DateTime<Utc>) -> Result<()>;
}

/// HMAC-SHA256
pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| Error::signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Lower-case hex SHA-256 digest
pub(crate) fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Refuse to sign with a blank access key or secret
pub(crate) fn require_credentials(scheme: &str, access_key: &str, secret: &str) -> Result<()> {
    if access_key.trim().is_empty() {
        return Err(Error::signing(format!("{}: access key is empty", scheme)));
    }
    if secret.trim().is_empty() {
        return Err(Error::signing(format!("{}: secret is empty", scheme)));
    }
    Ok(())
}

/// Query parameters sorted by name (then value)
pub(crate) fn canonical_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }
    let mut params: Vec<&str> = query.split('&').filter(|p| !p.is_empty()).collect();
    params.sort_unstable();
    params.join("&")
}

/// Canonical header block and signed-header list
///
/// Names are lower-cased and sorted, values trimmed. Only headers accepted
/// by `include` take part.
pub(crate) fn canonical_headers(
    headers: &[(String, String)],
    include: impl Fn(&str) -> bool,
) -> (String, String) {
    let mut selected: Vec<(String, &str)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .filter(|(name, _)| include(name))
        .collect();
    selected.sort_by(|a, b| a.0.cmp(&b.0));

    let canonical = selected.iter().fold(String::new(), |mut acc, (name, value)| {
        let _ = writeln!(acc, "{}:{}", name, value);
        acc
    });
    let signed = selected
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");

    (canonical, signed)
}
