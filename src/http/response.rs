//! Response handling and transformation.
//!
//! # Responsibilities
//! - Pass backend responses through, streaming the body
//! - Strip hop-by-hop headers on the way back
//! - Build the fixed 503 reply for "no backend" and forwarding failures

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use hyper::body::Incoming;

use crate::http::request::strip_hop_by_hop;

pub const SERVICE_UNAVAILABLE_BODY: &str = "Service Unavailable";

/// 503 with a fixed plain-text body.
pub fn service_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        SERVICE_UNAVAILABLE_BODY,
    )
        .into_response()
}

/// Convert an upstream response for the client.
pub fn from_upstream(response: hyper::Response<Incoming>) -> Response {
    let (mut parts, body) = response.into_parts();
    strip_hop_by_hop(&mut parts.headers);
    Response::from_parts(parts, Body::new(body))
}
