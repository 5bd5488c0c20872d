//! Address extraction
//!
//! Finds the first IPv4 or IPv6 literal in arbitrary text (an HTTP response
//! body, an interface table). Candidates are located with a regex and then
//! validated numerically, so `999.1.1.1`, `1.2.3` or `1.2.3.4.5` never match.

use regex::Regex;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

static IPV4_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)*").expect("valid IPv4 candidate pattern"));

static IPV6_CANDIDATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9A-Fa-f:]*:[0-9A-Fa-f:]*(?:\.[0-9]+)*").expect("valid IPv6 candidate pattern")
});

/// First valid IPv4 literal in `text`
///
/// # Returns
///
/// The address in canonical dotted-quad form, or `None`
pub fn extract_ipv4(text: &str) -> Option<String> {
    IPV4_CANDIDATE.find_iter(text).find_map(|m| {
        if !bounded(text, m.start(), m.end(), char::is_ascii_alphanumeric) {
            return None;
        }
        let candidate = m.as_str();
        // Reject leading zeros: "010.1.1.1" is not a dotted quad
        if candidate
            .split('.')
            .any(|octet| octet.len() > 1 && octet.starts_with('0'))
        {
            return None;
        }
        candidate.parse::<Ipv4Addr>().ok().map(|ip| ip.to_string())
    })
}

/// First valid IPv6 literal in `text`
///
/// # Returns
///
/// The address in canonical compressed form, or `None`
pub fn extract_ipv6(text: &str) -> Option<String> {
    IPV6_CANDIDATE.find_iter(text).find_map(|m| {
        // A label may end right before the colon, so only hex digits count in front
        if !bounded(text, m.start(), m.end(), char::is_ascii_hexdigit) {
            return None;
        }
        let mut candidate = m.as_str();
        // "Address:2001:db8::1" puts the label's colon in front of the address
        if candidate.starts_with(':') && !candidate.starts_with("::") {
            candidate = &candidate[1..];
        }
        if candidate.ends_with(':') && !candidate.ends_with("::") {
            candidate = &candidate[..candidate.len() - 1];
        }
        candidate.parse::<Ipv6Addr>().ok().map(|ip| ip.to_string())
    })
}

/// The match is not glued to surrounding word characters
fn bounded(text: &str, start: usize, end: usize, before_is_word: fn(&char) -> bool) -> bool {
    let before = text[..start].chars().next_back();
    let after = text[end..].chars().next();
    !before.is_some_and(|c| before_is_word(&c)) && !after.is_some_and(|c| c.is_ascii_alphanumeric())
}
