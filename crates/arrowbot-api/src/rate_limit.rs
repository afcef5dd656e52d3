//! Per-client rate-limit gate for the chat routes.
//!
//! The client is identified by the first `x-forwarded-for` entry, then the
//! peer address, then `"anonymous"`. Counting is delegated to
//! [`arrowbot_cache::RateLimiter`], which lets requests through when its
//! backend is unreachable.

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::ApiError;
use crate::state::AppState;

const ANONYMOUS_CLIENT: &str = "anonymous";

/// Identify the caller for rate-limit accounting.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());

    match (forwarded, peer) {
        (Some(ip), _) => ip.to_string(),
        (None, Some(addr)) => addr.ip().to_string(),
        (None, None) => ANONYMOUS_CLIENT.to_string(),
    }
}

/// Axum middleware that enforces the per-client limit.
pub async fn rate_limit_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client = client_id(req.headers(), peer);

    let decision = state.limiter.check(&client, state.rate_limit).await;
    if decision.allowed {
        next.run(req).await
    } else {
        warn!(client = %client, count = decision.count, limit = decision.limit, "Rate limit exceeded");
        ApiError::TooManyRequests("Rate limit exceeded".to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_header_wins() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        let peer: SocketAddr = "127.0.0.1:5000".parse().unwrap();
        assert_eq!(client_id(&headers, Some(peer)), "203.0.113.7");
    }

    #[test]
    fn test_peer_then_anonymous() {
        let headers = HeaderMap::new();
        let peer: SocketAddr = "192.0.2.10:40000".parse().unwrap();
        assert_eq!(client_id(&headers, Some(peer)), "192.0.2.10");
        assert_eq!(client_id(&headers, None), "anonymous");

        let mut blank = HeaderMap::new();
        blank.insert("x-forwarded-for", HeaderValue::from_static("  "));
        assert_eq!(client_id(&blank, None), "anonymous");
    }
}
