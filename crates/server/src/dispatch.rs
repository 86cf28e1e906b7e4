// crates/server/src/dispatch.rs
//! The request dispatcher
//!
//! One parameterized handler serves every configured feed: rate limit first
//! (cheapest, touches nothing else), then cache, then the single-flight
//! upstream fetch.

use crate::config::{FeedConfig, FeedMode};
use crate::error::{AppError, AppResult, RefreshError};
use crate::state::{AppState, FeedPayload};
use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use podrelay_feed_parser::FeedParser;
use podrelay_fetcher::FeedFetcher;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Cache policy advertised on passthrough responses
const PASSTHROUGH_CACHE_CONTROL: &str = "s-maxage=600, stale-while-revalidate=59";

fn x_cache_header() -> HeaderName {
    HeaderName::from_static("x-cache")
}

enum CacheStatus {
    Hit { age: Duration },
    Miss,
}

/// `GET /feed/{name}`
pub async fn serve_feed(
    State(state): State<AppState>,
    Path(name): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
) -> AppResult<Response> {
    let feed = state
        .feeds
        .get(&name)
        .ok_or_else(|| AppError::UnknownFeed(name.clone()))?;

    let client = client_id(&headers, connect_info.map(|ConnectInfo(addr)| addr));
    feed.limiter.admit(&client)?;

    if let Some((payload, remaining)) = state.cache.get(&name) {
        let age = feed.config.ttl().saturating_sub(remaining);
        tracing::debug!(feed = %name, client = %client, "cache hit");
        return Ok(respond(payload, CacheStatus::Hit { age }));
    }

    let fetcher = state.fetcher.clone();
    let config = feed.config.clone();
    tracing::info!(feed = %name, url = %config.url, "refreshing feed");

    let payload = state
        .cache
        .get_or_fetch(&name, feed.config.ttl(), move || async move {
            refresh(&fetcher, &config).await
        })
        .await?;

    Ok(respond(payload, CacheStatus::Miss))
}

/// One upstream round-trip: fetch, then normalize or pass through
async fn refresh(fetcher: &FeedFetcher, config: &FeedConfig) -> Result<FeedPayload, RefreshError> {
    let fetched = fetcher.fetch(&config.url).await?;

    match config.mode {
        FeedMode::Passthrough => Ok(FeedPayload::Raw {
            body: fetched.body,
            content_type: fetched.content_type,
        }),
        FeedMode::Json => {
            let text = String::from_utf8_lossy(&fetched.body);
            let episodes = FeedParser::parse(&text, config.format)?;
            tracing::debug!(feed = %config.name, count = episodes.len(), "normalized feed");
            Ok(FeedPayload::Episodes(Arc::new(episodes)))
        }
    }
}

/// Serializes a payload with cache-freshness headers
fn respond(payload: FeedPayload, status: CacheStatus) -> Response {
    let mut response = match payload {
        FeedPayload::Episodes(episodes) => Json(episodes.as_ref()).into_response(),
        FeedPayload::Raw { body, content_type } => {
            let mut response = body.into_response();
            let content_type = HeaderValue::from_str(&content_type)
                .unwrap_or_else(|_| HeaderValue::from_static("application/xml"));
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(PASSTHROUGH_CACHE_CONTROL),
            );
            response
        }
    };

    match status {
        CacheStatus::Hit { age } => {
            let headers = response.headers_mut();
            headers.insert(x_cache_header(), HeaderValue::from_static("hit"));
            if let Ok(value) = HeaderValue::from_str(&age.as_secs().to_string()) {
                headers.insert(header::AGE, value);
            }
        }
        CacheStatus::Miss => {
            response
                .headers_mut()
                .insert(x_cache_header(), HeaderValue::from_static("miss"));
        }
    }

    response
}

/// Derives the rate-limit client identity: first x-forwarded-for element,
/// else the peer address
fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}
