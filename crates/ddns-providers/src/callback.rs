// # Callback Driver
//
// Calls a user-defined URL instead of a DNS provider API. `ID` holds the URL
// template and `Secret` the body template. Both may use:
//
// - `#{ip}`: the new address
// - `#{domain}`: the fully qualified name
// - `#{recordType}`: `A` or `AAAA`
// - `#{ttl}`: the configured TTL
//
// An empty body template sends a GET, otherwise a POST. Any 2xx counts as
// success.

use crate::push::{PushApi, push_domain_records};
use async_trait::async_trait;
use ddns_core::reconcile::RecordAction;
use ddns_core::traits::{
    DnsProvider, DnsProviderFactory, HttpRequest, HttpTransport, Method, expect_success,
};
use ddns_core::{DnsEntry, Domain, Domains, Error, RecordType, Result};
use std::sync::Arc;

const PROVIDER: &str = "callback";
const DEFAULT_TTL: u32 = 600;

/// Callback driver
#[derive(Clone)]
pub struct Callback {
    url_template: String,
    body_template: String,
    ttl: u32,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for Callback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Templates may embed tokens
        f.debug_struct("Callback")
            .field("url_template", &"<REDACTED>")
            .field("body_template", &"<REDACTED>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl Callback {
    pub fn new(entry: &DnsEntry, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url_template: entry.dns.id.trim().to_string(),
            body_template: entry.dns.secret.clone(),
            ttl: entry.ttl_or(DEFAULT_TTL),
            transport,
        }
    }

    /// Substitute the placeholders of a template
    fn render(&self, template: &str, domain: &Domain, record_type: RecordType, addr: &str) -> String {
        template
            .replace("#{ip}", addr)
            .replace("#{domain}", &domain.fqdn())
            .replace("#{recordType}", record_type.as_str())
            .replace("#{ttl}", &self.ttl.to_string())
    }

    /// Build the request for one domain
    fn build_request(&self, domain: &Domain, record_type: RecordType, addr: &str) -> HttpRequest {
        let url = self.render(&self.url_template, domain, record_type, addr);
        if self.body_template.trim().is_empty() {
            return HttpRequest::get(url);
        }

        let body = self.render(&self.body_template, domain, record_type, addr);
        let content_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
            "application/json"
        } else {
            "application/x-www-form-urlencoded"
        };
        HttpRequest::new(Method::Post, url)
            .header("Content-Type", content_type)
            .body(body)
    }
}

#[async_trait]
impl PushApi for Callback {
    fn provider_name(&self) -> &'static str {
        PROVIDER
    }

    async fn push(&self, domain: &Domain, record_type: RecordType, addr: &str) -> Result<RecordAction> {
        let request = self.build_request(domain, record_type, addr);
        expect_success(self.transport.send(request).await?)?;
        Ok(RecordAction::Modified)
    }
}

#[async_trait]
impl DnsProvider for Callback {
    async fn add_update_domain_records(&self, domains: &mut Domains) {
        push_domain_records(self, domains).await;
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Factory for [`Callback`] drivers
pub struct CallbackFactory {
    transport: Arc<dyn HttpTransport>,
}

impl CallbackFactory {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl DnsProviderFactory for CallbackFactory {
    fn create(&self, entry: &DnsEntry) -> Result<Box<dyn DnsProvider>> {
        if entry.dns.id.trim().is_empty() {
            return Err(Error::config("Callback URL (ID) is empty"));
        }
        Ok(Box::new(Callback::new(entry, self.transport.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::HttpResponse;

    struct NullTransport;

    #[async_trait]
    impl HttpTransport for NullTransport {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse::new(200, ""))
        }
    }

    fn callback(url: &str, body: &str) -> Callback {
        let mut entry = DnsEntry::default();
        entry.dns.id = url.to_string();
        entry.dns.secret = body.to_string();
        entry.ttl = Some(120);
        Callback::new(&entry, Arc::new(NullTransport))
    }

    #[test]
    fn test_get_when_body_empty() {
        let cb = callback("https://hook.example.test/update?host=#{domain}&ip=#{ip}", "");
        let request = cb.build_request(&Domain::new("home", "example.com"), RecordType::A, "203.0.113.5");

        assert_eq!(request.method, Method::Get);
        assert_eq!(
            request.url,
            "https://hook.example.test/update?host=home.example.com&ip=203.0.113.5"
        );
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_post_json_body() {
        let cb = callback(
            "https://hook.example.test/update",
            r##"{"name":"#{domain}","type":"#{recordType}","value":"#{ip}","ttl":#{ttl}}"##,
        );
        let request = cb.build_request(&Domain::new("", "example.com"), RecordType::Aaaa, "2001:db8::5");

        assert_eq!(request.method, Method::Post);
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
        assert_eq!(
            request.body_text(),
            r#"{"name":"example.com","type":"AAAA","value":"2001:db8::5","ttl":120}"#
        );
    }

    #[test]
    fn test_post_form_body() {
        let cb = callback("https://hook.example.test/update", "ip=#{ip}&host=#{domain}");
        let request = cb.build_request(&Domain::new("www", "example.com"), RecordType::A, "203.0.113.5");
        assert_eq!(
            request.header_value("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn test_empty_url_is_rejected() {
        let factory = CallbackFactory::new(Arc::new(NullTransport));
        assert!(matches!(factory.create(&DnsEntry::default()), Err(Error::Config(_))));
    }
}
