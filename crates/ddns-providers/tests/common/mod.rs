//! Shared test doubles for driver tests
//!
//! `MockTransport` answers from scripted routes and records every request,
//! so tests can assert on the exact wire calls a driver made.

#![allow(dead_code)]

use async_trait::async_trait;
use ddns_core::config::{AddressSource, DnsCredentials, DnsEntry, FamilyConfig};
use ddns_core::traits::{HttpRequest, HttpResponse, HttpTransport, Method};
use ddns_core::{Domains, RecordType, Result};
use std::sync::{Arc, Mutex};

/// One scripted answer
struct Route {
    method: Method,
    /// Substring the URL must contain
    url_part: String,
    status: u16,
    body: String,
}

/// A transport answering from scripted routes
///
/// Routes are matched in insertion order; the first match wins. Unmatched
/// requests get a 404.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<Vec<Route>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `method` requests whose URL contains `url_part`
    pub fn route(&self, method: Method, url_part: &str, status: u16, body: &str) -> &Self {
        self.routes.lock().unwrap().push(Route {
            method,
            url_part: url_part.to_string(),
            status,
            body: body.to_string(),
        });
        self
    }

    /// Every request sent so far
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests with a given method
    pub fn requests_with(&self, method: Method) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method)
            .collect()
    }

    /// Requests that are not GETs
    pub fn writes(&self) -> Vec<HttpRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != Method::Get)
            .collect()
    }

    pub fn as_transport(&self) -> Arc<dyn HttpTransport> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = {
            let routes = self.routes.lock().unwrap();
            routes
                .iter()
                .find(|r| r.method == request.method && request.url.contains(&r.url_part))
                .map(|r| HttpResponse::new(r.status, r.body.clone()))
                .unwrap_or_else(|| HttpResponse::new(404, "no route"))
        };
        self.requests.lock().unwrap().push(request);
        Ok(response)
    }
}

/// An entry for `provider` managing IPv4 for the given domains
pub fn ipv4_entry(provider: &str, id: &str, secret: &str, domains: &[&str]) -> DnsEntry {
    DnsEntry {
        ipv4: FamilyConfig {
            enable: true,
            get_type: AddressSource::Url,
            url: "https://ip.example.test".to_string(),
            domains: domains.iter().map(|d| d.to_string()).collect(),
            ..Default::default()
        },
        dns: DnsCredentials {
            name: provider.to_string(),
            id: id.to_string(),
            secret: secret.to_string(),
        },
        ..Default::default()
    }
}

/// The Domain Set the scheduler would hand a driver for `entry`
pub fn pending_v4(entry: &DnsEntry, addr: &str) -> Domains {
    let mut domains = Domains::from_entry(entry);
    domains.set_address(RecordType::A, addr.to_string(), true);
    domains
}

/// Update statuses in order, A first
pub fn statuses(domains: &Domains) -> Vec<ddns_core::UpdateStatus> {
    domains.iter().map(|d| d.update_status).collect()
}

/// Decode a request body as JSON
pub fn json_body(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}
