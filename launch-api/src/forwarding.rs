//! Reconstruction of the externally visible scheme, host, port and path
//! prefix from reverse-proxy forwarding headers.
//!
//! Every header is optional and may carry a comma-separated proxy chain;
//! only the first value is honored. Malformed values never fail a request:
//! the previously known value is kept.

use http::HeaderMap;
use http::header::HOST;

use crate::config::Listener;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";
pub const X_FORWARDED_PORT: &str = "x-forwarded-port";
pub const X_FORWARDED_PREFIX: &str = "x-forwarded-prefix";

/// The service's own view of its network location, before any forwarding
/// headers are applied.
#[derive(Clone, Debug, PartialEq)]
pub struct ObservedAddress {
    pub scheme: String,
    pub host: String,
    pub port: i32,
}

impl ObservedAddress {
    /// Derives the observed address from the Host header, falling back to
    /// the configured listener. The service itself only speaks plain HTTP;
    /// TLS terminates at a proxy in front of it.
    pub fn from_request(headers: &HeaderMap, listener: &Listener) -> Self {
        let mut host = listener.host.clone();
        let mut port = i32::from(listener.port);

        if let Some(authority) = headers.get(HOST).and_then(|value| value.to_str().ok()) {
            match split_host_port(authority) {
                Some((authority_host, parsed_port)) => {
                    host = authority_host.to_string();
                    if let Some(parsed) = parsed_port {
                        port = parsed;
                    }
                }
                None => {
                    host = authority.to_string();
                    port = 80;
                }
            }
        }

        ObservedAddress {
            scheme: "http".to_string(),
            host,
            port,
        }
    }
}

/// Resolved external location of the service: what a client outside the
/// proxy chain would put in a URL to reach it.
#[derive(Clone, Debug, PartialEq)]
pub struct ForwardingContext {
    pub scheme: String,
    pub host: String,
    pub port: i32,
    pub path_prefix: String,
}

impl ForwardingContext {
    /// Base URL without the path prefix. The default port for the scheme
    /// and non-positive ports are elided.
    pub fn base_url(&self) -> String {
        let default_port = (self.scheme.eq_ignore_ascii_case("http") && self.port == 80)
            || (self.scheme.eq_ignore_ascii_case("https") && self.port == 443);

        if default_port || self.port <= 0 {
            format!("{}://{}", self.scheme, self.host)
        } else {
            format!("{}://{}:{}", self.scheme, self.host, self.port)
        }
    }
}

pub fn resolve_forwarding_context(
    observed: ObservedAddress,
    context_path: &str,
    headers: &HeaderMap,
) -> ForwardingContext {
    let scheme = first_value(headers, X_FORWARDED_PROTO).unwrap_or(observed.scheme);

    let mut host = observed.host;
    let mut port = observed.port;

    if let Some(forwarded_host) = first_value(headers, X_FORWARDED_HOST) {
        match split_host_port(&forwarded_host) {
            Some((forwarded, parsed_port)) => {
                host = forwarded.to_string();
                if let Some(parsed) = parsed_port {
                    port = parsed;
                }
            }
            None => host = forwarded_host,
        }
    }

    // X-Forwarded-Port wins over a port embedded in X-Forwarded-Host.
    if let Some(forwarded_port) = first_value(headers, X_FORWARDED_PORT)
        && let Ok(parsed) = forwarded_port.parse::<i32>()
    {
        port = parsed;
    }

    let path_prefix = resolve_path_prefix(context_path, headers);

    ForwardingContext {
        scheme,
        host,
        port,
        path_prefix,
    }
}

// The forwarded prefix is given a leading slash if missing and stripped of
// one trailing slash; the context path follows with exactly one slash in
// between. Without the header the prefix is the context path alone.
fn resolve_path_prefix(context_path: &str, headers: &HeaderMap) -> String {
    let mut prefix = String::new();

    if let Some(forwarded_prefix) = first_value(headers, X_FORWARDED_PREFIX) {
        if !forwarded_prefix.starts_with('/') {
            prefix.push('/');
        }
        prefix.push_str(forwarded_prefix.strip_suffix('/').unwrap_or(&forwarded_prefix));
    }

    if !context_path.is_empty() && context_path != "/" {
        if !prefix.is_empty() && !context_path.starts_with('/') {
            prefix.push('/');
        }
        prefix.push_str(context_path);
    }

    prefix
}

// First comma-delimited value of a header, trimmed. Blank values count as
// absent so they fall through to the observed value.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next().unwrap_or(raw).trim();

    if first.is_empty() {
        None
    } else {
        Some(first.to_string())
    }
}

// Splits "host:port" on the last colon. Returns None when there is no
// usable colon; the port is None when it does not parse as an integer.
fn split_host_port(authority: &str) -> Option<(&str, Option<i32>)> {
    let idx = authority.rfind(':')?;
    if idx == 0 {
        return None;
    }

    let port = authority[idx + 1..].parse::<i32>().ok();
    Some((&authority[..idx], port))
}
