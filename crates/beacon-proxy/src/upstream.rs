// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Origin the proxy forwards to.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;

use beacon_core::BeaconError;
use beacon_core::types::CachedResponse;

/// Headers that describe a single connection and are never forwarded or cached.
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
    "host",
    "content-length",
];

pub(crate) fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// A request as seen by the proxy, detached from any HTTP library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    pub method: String,
    /// Path and query relative to the upstream origin.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ProxyRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_get(&self) -> bool {
        self.method.eq_ignore_ascii_case("GET")
    }
}

/// Response returned by an upstream fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Snapshot suitable for the response cache.
    pub fn to_cached(&self) -> CachedResponse {
        CachedResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
            stored_at: Utc::now(),
        }
    }
}

/// Anything that can answer a proxied request.
///
/// `Err` means the origin could not be reached at all; an HTTP error status
/// is an `Ok` response.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<UpstreamResponse, BeaconError>;
}

/// [`Upstream`] backed by a reqwest client pointed at one origin.
pub struct HttpUpstream {
    client: Client,
    origin: String,
}

impl HttpUpstream {
    pub fn new(origin: &str, timeout: Duration) -> Result<Self, BeaconError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| BeaconError::Network {
                message: "failed to build upstream client".to_string(),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn fetch(&self, request: &ProxyRequest) -> Result<UpstreamResponse, BeaconError> {
        let url = format!("{}{}", self.origin, request.url);
        let method = reqwest::Method::from_bytes(request.method.as_bytes()).map_err(|e| {
            BeaconError::Network {
                message: format!("invalid method {}", request.method),
                source: Some(Box::new(e)),
            }
        })?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in &request.headers {
            if !is_hop_by_hop(name) {
                builder = builder.header(name.as_str(), value.as_str());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let network_err = |e: reqwest::Error| BeaconError::Network {
            message: format!("upstream fetch failed: {url}"),
            source: Some(Box::new(e)),
        };
        let response = builder.send().await.map_err(network_err)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter(|(name, _)| !is_hop_by_hop(name.as_str()))
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(network_err)?.to_vec();

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn fetch_forwards_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/reports"))
            .and(header("x-client", "intake"))
            .respond_with(
                ResponseTemplate::new(201)
                    .insert_header("content-type", "application/json")
                    .set_body_string(r#"{"ok":true}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let upstream = HttpUpstream::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let request = ProxyRequest {
            method: "POST".into(),
            url: "/api/reports".into(),
            headers: vec![
                ("x-client".into(), "intake".into()),
                ("connection".into(), "keep-alive".into()),
            ],
            body: b"{}".to_vec(),
        };
        let response = upstream.fetch(&request).await.unwrap();

        assert_eq!(response.status, 201);
        assert!(response.is_success());
        assert_eq!(response.body, br#"{"ok":true}"#);
        assert!(
            response
                .headers
                .iter()
                .any(|(k, v)| k == "content-type" && v == "application/json")
        );
    }

    #[tokio::test]
    async fn error_status_is_not_a_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let upstream = HttpUpstream::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let response = upstream.fetch(&ProxyRequest::get("/missing")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn unreachable_origin_is_a_network_error() {
        let upstream = HttpUpstream::new("http://127.0.0.1:1", Duration::from_secs(2)).unwrap();
        let err = upstream.fetch(&ProxyRequest::get("/")).await.unwrap_err();
        assert!(matches!(err, BeaconError::Network { .. }), "got {err:?}");
    }

    #[test]
    fn origin_trailing_slash_is_trimmed() {
        let upstream =
            HttpUpstream::new("http://localhost:3000/", Duration::from_secs(1)).unwrap();
        assert_eq!(upstream.origin(), "http://localhost:3000");
    }

    #[test]
    fn hop_by_hop_headers_are_recognized() {
        assert!(is_hop_by_hop("Transfer-Encoding"));
        assert!(is_hop_by_hop("host"));
        assert!(!is_hop_by_hop("content-type"));
    }
}
