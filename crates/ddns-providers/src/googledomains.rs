// # Google Domains Driver
//
// Dynamic DNS protocol: <https://support.google.com/domains/answer/6147083>
//
// One authenticated GET per domain:
//
// ```http
// GET /nic/update?hostname=home.example.com&myip=203.0.113.5
// Authorization: Basic base64(username:password)
// ```
//
// | Answer          | Meaning                  |
// |-----------------|--------------------------|
// | `good <ip>`     | written                  |
// | `nochg <ip>`    | already equal            |
// | `badauth`       | credentials rejected     |
// | anything else   | failed for this domain   |

use crate::http::query_string;
use crate::push::{PushApi, push_domain_records};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ddns_core::reconcile::RecordAction;
use ddns_core::traits::{DnsProvider, DnsProviderFactory, HttpRequest, HttpTransport, fetch_text};
use ddns_core::{DnsEntry, Domain, Domains, Error, RecordType, Result};
use std::sync::Arc;

const PROVIDER: &str = "googledomain";
const GOOGLE_DOMAINS_UPDATE_URL: &str = "https://domains.google.com/nic/update";

/// Google Domains dynamic DNS driver
pub struct GoogleDomains {
    username: String,
    password: String,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for GoogleDomains {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDomains")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

impl GoogleDomains {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            username: entry.dns.id.clone(),
            password: entry.dns.secret.clone(),
            transport,
        }
    }
}

/// Interpret a protocol answer
fn parse_answer(answer: &str) -> Result<RecordAction> {
    let answer = answer.trim();
    let code = answer.split_whitespace().next().unwrap_or_default();
    match code {
        "good" => Ok(RecordAction::Modified),
        "nochg" => Ok(RecordAction::Unchanged),
        "badauth" => Err(Error::auth(PROVIDER, answer)),
        _ => Err(Error::provider(PROVIDER, format!("update rejected: {}", answer))),
    }
}

#[async_trait]
impl PushApi for GoogleDomains {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn push(&self, domain: &Domain, _record_type: RecordType, addr: &str) -> Result<RecordAction> {
        let fqdn = domain.fqdn();
        let url = format!(
            "{}?{}",
            GOOGLE_DOMAINS_UPDATE_URL,
            query_string([("hostname", fqdn.as_str()), ("myip", addr)])
        );
        let credentials = STANDARD.encode(format!("{}:{}", self.username, self.password));
        let request = HttpRequest::get(url).header("Authorization", format!("Basic {}", credentials));

        let answer = fetch_text(self.transport.as_ref(), request).await?;
        parse_answer(&answer)
    }
}

#[async_trait]
impl DnsProvider for GoogleDomains {
    async fn add_update_domain_records(&self, domains: &mut Domains) {
        push_domain_records(self, domains).await;
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for [`GoogleDomains`] drivers
pub struct GoogleDomainsFactory {
    transport: Arc<dyn HttpTransport>,
}

impl GoogleDomainsFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for GoogleDomainsFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        Ok(Box::new(GoogleDomains::new(entry, self.transport.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("good 203.0.113.5").unwrap(), RecordAction::Modified);
        assert_eq!(parse_answer("nochg 203.0.113.5\n").unwrap(), RecordAction::Unchanged);
        assert!(parse_answer("badauth").unwrap_err().is_auth_failure());

        let err = parse_answer("nohost").unwrap_err();
        assert!(!err.is_auth_failure());
        assert!(err.to_string().contains("nohost"));
    }
}
