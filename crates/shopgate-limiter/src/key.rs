//! Deriving rate limit keys from requests.
//!
//! The limiter treats keys as opaque strings; these helpers are what the
//! HTTP layer uses to build them.

use http::HeaderMap;
use http::header::USER_AGENT;

const FORWARDED_FOR: &str = "x-forwarded-for";
const REAL_IP: &str = "x-real-ip";
const USER_AGENT_PREFIX_CHARS: usize = 50;

/// Best-effort client IP: first `x-forwarded-for` entry, else `x-real-ip`,
/// else `"unknown"`.
pub fn client_ip(headers: &HeaderMap) -> &str {
    let forwarded = header_str(headers, FORWARDED_FOR)
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty());

    forwarded
        .or_else(|| header_str(headers, REAL_IP).map(str::trim).filter(|ip| !ip.is_empty()))
        .unwrap_or("unknown")
}

/// Key for per-client limiting: client IP plus a truncated user agent.
///
/// The user agent separates distinct clients behind one NAT address; the
/// truncation bounds key length.
///
/// # Examples
///
/// ```rust
/// use http::HeaderMap;
/// use shopgate_limiter::client_key;
///
/// let mut headers = HeaderMap::new();
/// headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
/// headers.insert("user-agent", "curl/8.4.0".parse().unwrap());
///
/// assert_eq!(client_key(&headers), "203.0.113.7:curl/8.4.0");
/// assert_eq!(client_key(&HeaderMap::new()), "unknown:");
/// ```
pub fn client_key(headers: &HeaderMap) -> String {
    let agent: String = header_str(headers, USER_AGENT.as_str())
        .unwrap_or_default()
        .chars()
        .take(USER_AGENT_PREFIX_CHARS)
        .collect();

    format!("{}:{}", client_ip(headers), agent)
}

/// Key for per-account limiting of auth endpoints, independent of the
/// client's address.
///
/// ```rust
/// use shopgate_limiter::email_key;
///
/// assert_eq!(email_key("  Owner@Garage.example "), "email:owner@garage.example");
/// ```
pub fn email_key(email: &str) -> String {
    format!("email:{}", email.trim().to_lowercase())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}
