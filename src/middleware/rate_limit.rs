use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};

use crate::routes::{ApiResponse, AppState};

/// Per-IP request limiting in front of every route. Fails open: a Redis
/// error logs and admits the request, and an unconfigured limiter is a
/// no-op.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(rate_limiter) = state.rate_limiter.as_ref() else {
        return next.run(req).await;
    };

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = client_ip(req.headers(), peer);

    match rate_limiter.check_rate_limit(&ip).await {
        Ok(true) => next.run(req).await,
        Ok(false) => {
            tracing::warn!("Rate limit exceeded for IP: {}", ip);
            (
                StatusCode::TOO_MANY_REQUESTS,
                Json(ApiResponse::failed(
                    (),
                    "Too many requests",
                    "Rate limit exceeded, retry in 60 seconds",
                )),
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!("Rate limiter error: {} - allowing request", e);
            next.run(req).await
        }
    }
}

/// Client address for the rate key: proxy headers first (X-Forwarded-For
/// may carry a hop list, the first entry is the client), then the socket
/// peer when the service fronts the internet directly.
fn client_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|h| h.to_str().ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
        .or_else(|| peer.map(|ip| ip.to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
