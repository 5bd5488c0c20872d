//! Request helpers shared by the drivers

use crate::sign::RequestSigner;
use chrono::Utc;
use ddns_core::Result;
use ddns_core::traits::{HttpRequest, HttpResponse, HttpTransport};

/// Sign a request with the current time and send it
///
/// Signing failures are returned before anything reaches the network.
pub(crate) async fn send_signed(
    transport: &dyn HttpTransport,
    signer: &dyn RequestSigner,
    mut request: HttpRequest,
) -> Result<HttpResponse> {
    signer.sign(&mut request, Utc::now())?;
    transport.send(request).await
}

/// Percent-encoded query string, parameters in the given order
pub(crate) fn query_string<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    params
        .into_iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_encodes_values() {
        assert_eq!(
            query_string([("name", "home.example.com"), ("line", "默认")]),
            "name=home.example.com&line=%E9%BB%98%E8%AE%A4"
        );
        assert_eq!(query_string([("q", "a b&c")]), "q=a%20b%26c");
    }
}
