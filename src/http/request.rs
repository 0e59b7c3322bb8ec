//! Outbound request preparation.
//!
//! # Responsibilities
//! - Rewrite the URI onto the backend's base URL
//! - Strip hop-by-hop headers, keep everything else (including `Host`)
//! - Append `x-forwarded-for`
//!
//! `x-request-id` and the identifying header are set by router layers
//! before the request reaches the dispatcher.

use std::net::IpAddr;

use axum::http::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    request::Parts,
    uri::{InvalidUri, Uri},
    Version,
};
use url::Url;

use crate::load_balancer::Backend;

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

static HOP_BY_HOP: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Identifying header stamped on every forwarded request.
#[derive(Debug, Clone)]
pub struct ProxyHeader {
    pub name: HeaderName,
    pub value: HeaderValue,
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed {
        headers.remove(name);
    }
    for name in &HOP_BY_HOP {
        headers.remove(name);
    }
}

fn join_paths(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{}{}", base, &path[1..]),
        (false, false) => format!("{}/{}", base, path),
        _ => format!("{}{}", base, path),
    }
}

/// Map an inbound URI onto `base`: base path joined with the request path,
/// base query and request query joined with `&`.
pub fn target_uri(base: &Url, authority: &str, uri: &Uri) -> Result<Uri, InvalidUri> {
    let path = join_paths(base.path(), uri.path());
    let query = match (base.query().filter(|q| !q.is_empty()), uri.query()) {
        (Some(b), Some(r)) => Some(format!("{}&{}", b, r)),
        (Some(b), None) => Some(b.to_string()),
        (None, Some(r)) => Some(r.to_string()),
        (None, None) => None,
    };

    let target = match query {
        Some(q) => format!("{}://{}{}?{}", base.scheme(), authority, path, q),
        None => format!("{}://{}{}", base.scheme(), authority, path),
    };
    target.parse()
}

/// Rewrite request parts in place for forwarding to `backend`.
pub fn prepare(parts: &mut Parts, backend: &Backend, client_ip: Option<IpAddr>) -> Result<(), InvalidUri> {
    parts.uri = target_uri(backend.url(), backend.authority(), &parts.uri)?;
    parts.version = Version::HTTP_11;

    let headers = &mut parts.headers;
    strip_hop_by_hop(headers);

    if let Some(ip) = client_ip {
        let prior: Vec<&str> = headers
            .get_all(&X_FORWARDED_FOR)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let forwarded = if prior.is_empty() {
            ip.to_string()
        } else {
            format!("{}, {}", prior.join(", "), ip)
        };
        if let Ok(value) = HeaderValue::from_str(&forwarded) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }
    Ok(())
}
