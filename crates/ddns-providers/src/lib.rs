// # ddns-providers
//
// DNS provider drivers for the DDNS system, plus the pieces they share:
// the reqwest transport, the request signers and the webhook notifier.
//
// ## Drivers
//
// | Name           | Signing                  | Confirmation        |
// |----------------|--------------------------|---------------------|
// | `alidns`       | ACS3-HMAC-SHA256         | RecordId returned   |
// | `dnspod`       | TC3-HMAC-SHA256          | RecordId returned   |
// | `cloudflare`   | Bearer token             | echoed content      |
// | `huaweicloud`  | SDK-HMAC-SHA256          | echoed records      |
// | `baiducloud`   | BCE v1                   | 2xx                 |
// | `porkbun`      | keys in body             | status SUCCESS      |
// | `godaddy`      | sso-key                  | 2xx                 |
// | `googledomain` | Basic auth               | good / nochg        |
// | `callback`     | none (user URL)          | 2xx                 |
//
// ## Usage
//
// ```rust,ignore
// let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
// let registry = ProviderRegistry::new();
// ddns_providers::register(&registry, transport.clone());
// let notifier = WebhookNotifier::new(transport);
// ```

pub mod alidns;
pub mod baiducloud;
pub mod callback;
pub mod cloudflare;
pub mod dnspod;
pub mod godaddy;
pub mod googledomains;
pub mod huaweicloud;
pub mod porkbun;
pub mod sign;
pub mod transport;
pub mod webhook;

mod http;
mod push;

pub use alidns::{Alidns, AlidnsFactory};
pub use baiducloud::{BaiduCloud, BaiduCloudFactory};
pub use callback::{Callback, CallbackFactory};
pub use cloudflare::{Cloudflare, CloudflareFactory};
pub use dnspod::{Dnspod, DnspodFactory};
pub use godaddy::{GoDaddy, GoDaddyFactory};
pub use googledomains::{GoogleDomains, GoogleDomainsFactory};
pub use huaweicloud::{HuaweiCloud, HuaweiCloudFactory};
pub use porkbun::{Porkbun, PorkbunFactory};
pub use transport::ReqwestTransport;
pub use webhook::WebhookNotifier;

use ddns_core::ProviderRegistry;
use ddns_core::traits::HttpTransport;
use std::sync::Arc;

/// Register every driver with the registry
///
/// # Parameters
///
/// - `registry`: The registry to register with
/// - `transport`: Transport shared by every driver
pub fn register(registry: &ProviderRegistry, transport: Arc<dyn HttpTransport>) {
    registry.register_provider("alidns", Box::new(AlidnsFactory::new(transport.clone())));
    registry.register_provider("dnspod", Box::new(DnspodFactory::new(transport.clone())));
    registry.register_provider("cloudflare", Box::new(CloudflareFactory::new(transport.clone())));
    registry.register_provider("huaweicloud", Box::new(HuaweiCloudFactory::new(transport.clone())));
    registry.register_provider("baiducloud", Box::new(BaiduCloudFactory::new(transport.clone())));
    registry.register_provider("porkbun", Box::new(PorkbunFactory::new(transport.clone())));
    registry.register_provider("godaddy", Box::new(GoDaddyFactory::new(transport.clone())));
    registry.register_provider("googledomain", Box::new(GoogleDomainsFactory::new(transport.clone())));
    registry.register_provider("callback", Box::new(CallbackFactory::new(transport)));
}
