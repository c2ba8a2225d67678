// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP front of the caching proxy, built on axum.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Request, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use beacon_core::BeaconError;

use crate::control::ClientMessage;
use crate::proxy::{CachingProxy, ProxyResponse};
use crate::upstream::{ProxyRequest, is_hop_by_hop};

/// Path of the client → proxy message endpoint.
pub const MESSAGES_PATH: &str = "/__beacon/messages";

/// Header naming what produced a proxied response.
pub const SOURCE_HEADER: &str = "x-beacon-source";

/// Largest request body forwarded upstream.
const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Proxy listener configuration (mirrors the bind fields of `ProxyConfig`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct ProxyState {
    pub proxy: Arc<CachingProxy>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
        .into_response()
}

/// Builds the router: the message endpoint plus a catch-all that proxies.
pub fn router(proxy: Arc<CachingProxy>) -> Router {
    Router::new()
        .route(MESSAGES_PATH, post(post_message))
        .fallback(proxy_request)
        .with_state(ProxyState { proxy })
        .layer(TraceLayer::new_for_http())
}

/// Serves the proxy until `shutdown` fires.
pub async fn start_server(
    config: ServerConfig,
    proxy: Arc<CachingProxy>,
    shutdown: CancellationToken,
) -> Result<(), BeaconError> {
    let app = router(proxy);
    let addr = format!("{}:{}", config.bind_address, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| BeaconError::Proxy {
            message: format!("failed to bind proxy to {addr}"),
            source: Some(Box::new(e)),
        })?;

    info!("caching proxy listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| BeaconError::Proxy {
            message: "proxy server error".to_string(),
            source: Some(Box::new(e)),
        })?;

    info!("caching proxy stopped");
    Ok(())
}

/// POST /__beacon/messages
async fn post_message(State(state): State<ProxyState>, body: Bytes) -> Response {
    let message: ClientMessage = match serde_json::from_slice(&body) {
        Ok(message) => message,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, format!("invalid message: {e}"));
        }
    };

    match state.proxy.handle_client_message(message).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(error = %e, "client message failed");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
        }
    }
}

/// Catch-all handler: every other request goes through the proxy.
async fn proxy_request(State(state): State<ProxyState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => return error_response(StatusCode::PAYLOAD_TOO_LARGE, "request body too large"),
    };

    let url = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());
    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();

    let request = ProxyRequest {
        method: parts.method.as_str().to_string(),
        url,
        headers,
        body,
    };

    match state.proxy.handle(request).await {
        Ok(response) => into_response(response),
        Err(e) => {
            warn!(error = %e, "request could not be served");
            error_response(StatusCode::BAD_GATEWAY, e.to_string())
        }
    }
}

fn into_response(response: ProxyResponse) -> Response {
    let mut out = Response::new(Body::from(response.body));
    *out.status_mut() = StatusCode::from_u16(response.status).unwrap_or(StatusCode::BAD_GATEWAY);

    let headers = out.headers_mut();
    for (name, value) in &response.headers {
        if is_hop_by_hop(name) {
            continue;
        }
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    if let Ok(source) = HeaderValue::from_str(&response.source.header_value()) {
        headers.insert(SOURCE_HEADER, source);
    }
    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::Request as HttpRequest;
    use beacon_test_utils::MemoryCacheStore;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::proxy::{Lifecycle, ProxyOptions};
    use crate::upstream::HttpUpstream;

    async fn origin() -> MockServer {
        let server = MockServer::start().await;
        for asset in ProxyOptions::default().static_assets {
            Mock::given(method("GET"))
                .and(path(asset.as_str()))
                .respond_with(ResponseTemplate::new(200).set_body_string(format!("page {asset}")))
                .mount(&server)
                .await;
        }
        server
    }

    async fn active_proxy(server: &MockServer) -> Arc<CachingProxy> {
        let upstream = HttpUpstream::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let proxy = CachingProxy::new(
            MemoryCacheStore::new(),
            Arc::new(upstream),
            ProxyOptions::default(),
        );
        assert_eq!(proxy.start().await, Lifecycle::Active);
        proxy
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn fallback_proxies_to_origin() {
        let server = origin().await;
        let app = router(active_proxy(&server).await);

        let response = app
            .oneshot(HttpRequest::get("/intake").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[SOURCE_HEADER], "network");
        assert_eq!(body_text(response).await, "page /intake");
    }

    #[tokio::test]
    async fn static_asset_is_served_from_cache() {
        let server = origin().await;
        let app = router(active_proxy(&server).await);

        let response = app
            .oneshot(
                HttpRequest::get("/icons/icon-512x512.png")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[SOURCE_HEADER],
            "cache; partition=beacon-static-v1"
        );
    }

    #[tokio::test]
    async fn unreachable_origin_yields_offline_page_or_bad_gateway() {
        let server = origin().await;
        let cache = MemoryCacheStore::new();
        let online = CachingProxy::new(
            cache.clone(),
            Arc::new(HttpUpstream::new(&server.uri(), Duration::from_secs(5)).unwrap()),
            ProxyOptions::default(),
        );
        assert_eq!(online.start().await, Lifecycle::Active);

        // Same cache, origin gone; the existing static partition skips install.
        let offline = CachingProxy::new(
            cache,
            Arc::new(HttpUpstream::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap()),
            ProxyOptions::default(),
        );
        assert_eq!(offline.start().await, Lifecycle::Active);
        let app = router(offline);

        let navigation = app
            .clone()
            .oneshot(
                HttpRequest::get("/reports/9")
                    .header("accept", "text/html")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(navigation.status(), StatusCode::OK);
        assert_eq!(navigation.headers()[SOURCE_HEADER], "offline");
        assert_eq!(body_text(navigation).await, "page /offline");

        let api = app
            .oneshot(HttpRequest::get("/api/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(api.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn message_endpoint_caches_urls() {
        let server = origin().await;
        Mock::given(method("GET"))
            .and(path("/reports/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("report one"))
            .expect(1)
            .mount(&server)
            .await;
        let app = router(active_proxy(&server).await);

        let response = app
            .clone()
            .oneshot(
                HttpRequest::post(MESSAGES_PATH)
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"type":"CACHE_URLS","urls":["/reports/1"]}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn message_endpoint_rejects_unknown_messages() {
        let server = origin().await;
        let app = router(active_proxy(&server).await);

        let response = app
            .oneshot(
                HttpRequest::post(MESSAGES_PATH)
                    .body(Body::from(r#"{"type":"RELOAD"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(response).await.contains("invalid message"));
    }
}
