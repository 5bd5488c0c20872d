// # Webhook Notifier
//
// Sends the outcome of an entry to a user-defined URL after reconciliation.
//
// ## Placeholders
//
// Substituted in both the URL and the body template:
//
// - `#{ipv4Addr}` / `#{ipv6Addr}`: resolved address
// - `#{ipv4Result}` / `#{ipv6Result}`: `unchanged`, `success` or `failed`
// - `#{ipv4Domains}` / `#{ipv6Domains}`: comma-separated domains
//
// Values are percent-encoded when substituted into the URL.

use async_trait::async_trait;
use ddns_core::traits::{HttpRequest, HttpTransport, Method, Notifier, expect_success};
use ddns_core::{Config, Domains, WebhookConfig};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Notifier posting to `webhook.url`
pub struct WebhookNotifier {
    transport: Arc<dyn HttpTransport>,
}

impl WebhookNotifier {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

fn placeholders(domains: &Domains) -> [(&'static str, String); 6] {
    let join = |list: &[ddns_core::Domain]| {
        list.iter()
            .map(|d| d.fqdn())
            .collect::<Vec<_>>()
            .join(",")
    };
    [
        ("#{ipv4Addr}", domains.ipv4.addr.clone()),
        ("#{ipv4Result}", domains.ipv4.result().to_string()),
        ("#{ipv4Domains}", join(&domains.ipv4.domains)),
        ("#{ipv6Addr}", domains.ipv6.addr.clone()),
        ("#{ipv6Result}", domains.ipv6.result().to_string()),
        ("#{ipv6Domains}", join(&domains.ipv6.domains)),
    ]
}

fn render(template: &str, values: &[(&'static str, String)], encode: bool) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        if encode {
            acc.replace(key, &urlencoding::encode(value))
        } else {
            acc.replace(key, value)
        }
    })
}

/// Build the webhook request for a finished Domain Set
///
/// # Returns
///
/// `None` when no webhook is configured or nothing was attempted
pub fn build_request(webhook: &WebhookConfig, domains: &Domains) -> Option<HttpRequest> {
    if webhook.url.trim().is_empty() || !domains.has_changes() {
        return None;
    }

    let values = placeholders(domains);
    let url = render(webhook.url.trim(), &values, true);

    let mut request = if webhook.request_body.trim().is_empty() {
        HttpRequest::get(url)
    } else {
        let body = render(&webhook.request_body, &values, false);
        let content_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
            "application/json"
        } else {
            "application/x-www-form-urlencoded"
        };
        HttpRequest::new(Method::Post, url)
            .header("Content-Type", content_type)
            .body(body)
    };

    for line in &webhook.headers {
        match line.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                request.set_header(name.trim(), value.trim());
            }
            _ => warn!("Ignoring malformed webhook header '{}'", line),
        }
    }
    Some(request)
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, domains: &Domains, config: &Config) {
        let Some(request) = build_request(&config.webhook, domains) else {
            debug!("Webhook skipped: not configured or nothing changed");
            return;
        };

        let method = request.method;
        match self.transport.send(request).await.and_then(expect_success) {
            Ok(response) => info!("Webhook delivered ({} {})", method, response.status),
            Err(e) => warn!("Webhook delivery failed: {}", e),
        }
    }
}
