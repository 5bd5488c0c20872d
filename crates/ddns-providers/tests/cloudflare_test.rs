mod common;

use common::*;
use ddns_core::traits::{DnsProviderFactory, Method};
use ddns_core::UpdateStatus;
use ddns_providers::CloudflareFactory;

const ZONES: &str = r#"{"success":true,"errors":[],"result":[
    {"id":"zone-1","name":"example.com"}
]}"#;

fn records(content: &str) -> String {
    format!(
        r#"{{"success":true,"errors":[],"result":[
            {{"id":"rec-other","name":"www.home.example.com","type":"A","content":"198.51.100.7","proxied":false,"ttl":1}},
            {{"id":"rec-1","name":"home.example.com","type":"A","content":"{}","proxied":true,"ttl":1}}
        ]}}"#,
        content
    )
}

fn echo(content: &str) -> String {
    format!(
        r#"{{"success":true,"errors":[],"result":{{"id":"rec-1","name":"home.example.com","type":"A","content":"{}","proxied":true,"ttl":1}}}}"#,
        content
    )
}

async fn run(transport: &MockTransport, domains: &[&str], addr: &str) -> ddns_core::Domains {
    let entry = ipv4_entry("cloudflare", "", "token-123", domains);
    let driver = CloudflareFactory::new(transport.as_transport())
        .create(&entry)
        .unwrap();
    let mut set = pending_v4(&entry, addr);
    driver.add_update_domain_records(&mut set).await;
    set
}

#[tokio::test]
async fn changed_address_updates_exact_record_and_keeps_proxied() {
    let transport = MockTransport::new();
    transport
        .route(Method::Get, "/zones?", 200, ZONES)
        .route(Method::Get, "/zones/zone-1/dns_records?", 200, &records("198.51.100.1"))
        .route(Method::Put, "/zones/zone-1/dns_records/rec-1", 200, &echo("203.0.113.5"));

    let set = run(&transport, &["home.example.com"], "203.0.113.5").await;

    assert_eq!(statuses(&set), vec![UpdateStatus::Success]);
    let writes = transport.writes();
    assert_eq!(writes.len(), 1);
    let body = json_body(&writes[0]);
    assert_eq!(body["content"], "203.0.113.5");
    assert_eq!(body["proxied"], true);
    assert_eq!(
        writes[0].header_value("Authorization"),
        Some("Bearer token-123")
    );
}

#[tokio::test]
async fn zone_is_looked_up_once_per_driver() {
    let transport = MockTransport::new();
    transport
        .route(Method::Get, "/zones?", 200, ZONES)
        .route(Method::Get, "/dns_records?", 200, &records("203.0.113.5"));

    let set = run(
        &transport,
        &["home.example.com", "home.example.com"],
        "203.0.113.5",
    )
    .await;

    assert_eq!(statuses(&set), vec![UpdateStatus::Success, UpdateStatus::Success]);
    let zone_lookups = transport
        .requests()
        .iter()
        .filter(|r| r.path().unwrap().ends_with("/zones"))
        .count();
    assert_eq!(zone_lookups, 1);
    assert!(transport.writes().is_empty());
}

#[tokio::test]
async fn missing_record_is_created_with_domain_params() {
    let transport = MockTransport::new();
    transport
        .route(Method::Get, "/zones?", 200, ZONES)
        .route(
            Method::Get,
            "/dns_records?",
            200,
            r#"{"success":true,"errors":[],"result":[]}"#,
        )
        .route(Method::Post, "/zones/zone-1/dns_records", 200, &echo("203.0.113.5"));

    let set = run(&transport, &["home.example.com?proxied=true"], "203.0.113.5").await;

    assert_eq!(statuses(&set), vec![UpdateStatus::Success]);
    let body = json_body(&transport.writes()[0]);
    assert_eq!(body["name"], "home.example.com");
    assert_eq!(body["proxied"], true);
    assert_eq!(body["ttl"], 1);
}

#[tokio::test]
async fn forbidden_token_fails_every_domain() {
    let transport = MockTransport::new();
    transport.route(
        Method::Get,
        "/zones?",
        403,
        r#"{"success":false,"errors":[{"code":9109,"message":"Invalid access token"}]}"#,
    );

    let set = run(&transport, &["a.example.com", "b.example.com"], "203.0.113.5").await;

    assert_eq!(statuses(&set), vec![UpdateStatus::Failed, UpdateStatus::Failed]);
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn api_error_fails_only_that_domain() {
    let transport = MockTransport::new();
    transport
        .route(Method::Get, "/zones?", 200, ZONES)
        .route(
            Method::Get,
            "name=bad.example.com",
            400,
            r#"{"success":false,"errors":[{"code":1004,"message":"DNS Validation Error"}]}"#,
        )
        .route(Method::Get, "/dns_records?", 200, &records("203.0.113.5"));

    let set = run(&transport, &["bad.example.com", "home.example.com"], "203.0.113.5").await;

    assert_eq!(statuses(&set), vec![UpdateStatus::Failed, UpdateStatus::Success]);
}
