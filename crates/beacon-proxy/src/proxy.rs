// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The caching proxy: lifecycle, routing strategies and cache maintenance.
//!
//! Two partitions are kept per cache version: `{app}-static-{version}` holds
//! the install manifest and cache-first assets, `{app}-dynamic-{version}`
//! holds network-first responses and URLs cached on request.

use std::sync::Arc;

use strum::Display;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use beacon_config::model::{AppConfig, ProxyConfig};
use beacon_core::types::{CachedResponse, RequestKey};
use beacon_core::{BeaconError, CacheStore};

use crate::classify::{Strategy, classify, is_navigation, path_of};
use crate::control::{ClientMessage, ControlChannel};
use crate::upstream::{ProxyRequest, Upstream, UpstreamResponse};

/// Where the proxy is in its install/activate cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Lifecycle {
    /// Constructed, install not attempted yet.
    Idle,
    /// Manifest is being fetched.
    Installing,
    /// Installed, waiting for activation.
    Waiting,
    /// Serving with caching strategies.
    Active,
    /// Install failed; traffic is forwarded without caching.
    PassThrough,
}

/// What produced a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseSource {
    Network,
    /// Served from the named partition.
    Cache(String),
    /// The cached offline page, served for a failed navigation.
    Offline,
}

impl ResponseSource {
    /// Value of the `x-beacon-source` response header.
    pub fn header_value(&self) -> String {
        match self {
            ResponseSource::Network => "network".to_string(),
            ResponseSource::Cache(partition) => format!("cache; partition={partition}"),
            ResponseSource::Offline => "offline".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl ProxyResponse {
    fn from_network(response: UpstreamResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers,
            body: response.body,
            source: ResponseSource::Network,
        }
    }

    fn from_cache(cached: CachedResponse, source: ResponseSource) -> Self {
        Self {
            status: cached.status,
            headers: cached.headers,
            body: cached.body,
            source,
        }
    }
}

/// Settings that shape routing and partition naming.
#[derive(Debug, Clone)]
pub struct ProxyOptions {
    pub app_name: String,
    pub cache_version: String,
    pub static_assets: Vec<String>,
    pub offline_path: String,
    pub api_prefix: String,
}

impl ProxyOptions {
    pub fn from_config(app: &AppConfig, proxy: &ProxyConfig) -> Self {
        Self {
            app_name: app.name.clone(),
            cache_version: proxy.cache_version.clone(),
            static_assets: proxy.static_assets.clone(),
            offline_path: proxy.offline_path.clone(),
            api_prefix: proxy.api_prefix.clone(),
        }
    }

    pub fn static_partition(&self) -> String {
        format!("{}-static-{}", self.app_name, self.cache_version)
    }

    pub fn dynamic_partition(&self) -> String {
        format!("{}-dynamic-{}", self.app_name, self.cache_version)
    }
}

impl Default for ProxyOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default(), &ProxyConfig::default())
    }
}

/// Offline-capable proxy in front of the application origin.
pub struct CachingProxy {
    cache: Arc<dyn CacheStore>,
    upstream: Arc<dyn Upstream>,
    options: ProxyOptions,
    static_partition: String,
    dynamic_partition: String,
    lifecycle: watch::Sender<Lifecycle>,
    control: ControlChannel,
}

impl CachingProxy {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        upstream: Arc<dyn Upstream>,
        options: ProxyOptions,
    ) -> Arc<Self> {
        let (lifecycle, _) = watch::channel(Lifecycle::Idle);
        Arc::new(Self {
            static_partition: options.static_partition(),
            dynamic_partition: options.dynamic_partition(),
            cache,
            upstream,
            options,
            lifecycle,
            control: ControlChannel::new(),
        })
    }

    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    pub fn watch_lifecycle(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.subscribe()
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    pub fn static_partition(&self) -> &str {
        &self.static_partition
    }

    pub fn dynamic_partition(&self) -> &str {
        &self.dynamic_partition
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        let previous = self.lifecycle.send_replace(next);
        if previous != next {
            debug!(from = %previous, to = %next, "proxy lifecycle changed");
        }
    }

    /// Installs then activates immediately. Returns the resulting lifecycle.
    ///
    /// An install failure leaves the proxy in pass-through mode; it never
    /// fails the caller.
    pub async fn start(&self) -> Lifecycle {
        if let Err(e) = self.install().await {
            warn!(error = %e, "proxy install failed, serving pass-through");
            return self.lifecycle();
        }
        if let Err(e) = self.activate().await {
            warn!(error = %e, "proxy activation failed");
        }
        self.lifecycle()
    }

    /// Seeds the static partition with the install manifest.
    ///
    /// A no-op when the current static partition already exists. Any failed
    /// fetch aborts the install without writing anything.
    pub async fn install(&self) -> Result<(), BeaconError> {
        self.set_lifecycle(Lifecycle::Installing);

        let result = self.install_manifest().await;
        match &result {
            Ok(()) => self.set_lifecycle(Lifecycle::Waiting),
            Err(_) => self.set_lifecycle(Lifecycle::PassThrough),
        }
        result
    }

    async fn install_manifest(&self) -> Result<(), BeaconError> {
        let existing = self.cache.partitions().await?;
        if existing.iter().any(|p| p == &self.static_partition) {
            debug!(partition = %self.static_partition, "static partition present, skipping install");
            return Ok(());
        }

        let records = self.fetch_all(&self.options.static_assets).await?;
        self.cache
            .store_all(&self.static_partition, &records)
            .await?;
        info!(
            partition = %self.static_partition,
            assets = records.len(),
            "proxy installed"
        );
        Ok(())
    }

    /// Retires every partition other than the two current ones and starts
    /// serving with caching strategies. Returns the number of partitions
    /// deleted.
    pub async fn activate(&self) -> Result<usize, BeaconError> {
        match self.lifecycle() {
            Lifecycle::Waiting | Lifecycle::Active => {}
            other => {
                return Err(BeaconError::Proxy {
                    message: format!("cannot activate while {other}"),
                    source: None,
                });
            }
        }

        let mut retired = 0;
        for partition in self.cache.partitions().await? {
            if partition != self.static_partition && partition != self.dynamic_partition {
                let removed = self.cache.delete_partition(&partition).await?;
                info!(partition = %partition, records = removed, "retired cache partition");
                retired += 1;
            }
        }

        self.set_lifecycle(Lifecycle::Active);
        Ok(retired)
    }

    /// Answers one request.
    ///
    /// `Err` means neither the origin nor the cache could answer.
    pub async fn handle(&self, request: ProxyRequest) -> Result<ProxyResponse, BeaconError> {
        if self.lifecycle() != Lifecycle::Active {
            let response = self.upstream.fetch(&request).await?;
            return Ok(ProxyResponse::from_network(response));
        }

        let strategy = classify(path_of(&request.url), &self.options.api_prefix);
        match strategy {
            Strategy::CacheFirst if request.is_get() => self.cache_first(request).await,
            _ => self.network_first(request).await,
        }
    }

    async fn cache_first(&self, request: ProxyRequest) -> Result<ProxyResponse, BeaconError> {
        let key = RequestKey::get(request.url.clone());
        if let Some((partition, cached)) = self
            .lookup_first(&key, [&self.static_partition, &self.dynamic_partition])
            .await
        {
            return Ok(ProxyResponse::from_cache(
                cached,
                ResponseSource::Cache(partition),
            ));
        }

        let response = self.upstream.fetch(&request).await?;
        if response.is_success() {
            self.remember(&self.static_partition, &key, &response).await;
        }
        Ok(ProxyResponse::from_network(response))
    }

    async fn network_first(&self, request: ProxyRequest) -> Result<ProxyResponse, BeaconError> {
        let key = RequestKey::get(request.url.clone());
        let err = match self.upstream.fetch(&request).await {
            Ok(response) => {
                if request.is_get() && response.is_success() {
                    self.remember(&self.dynamic_partition, &key, &response).await;
                }
                return Ok(ProxyResponse::from_network(response));
            }
            Err(err) => err,
        };

        debug!(url = %request.url, error = %err, "upstream unreachable, trying cache");
        if request.is_get() {
            if let Some((partition, cached)) = self
                .lookup_first(&key, [&self.dynamic_partition, &self.static_partition])
                .await
            {
                return Ok(ProxyResponse::from_cache(
                    cached,
                    ResponseSource::Cache(partition),
                ));
            }
        }

        if is_navigation(&request.method, &request.headers) {
            let offline = RequestKey::get(self.options.offline_path.clone());
            if let Some((_, cached)) = self
                .lookup_first(&offline, [&self.static_partition, &self.dynamic_partition])
                .await
            {
                return Ok(ProxyResponse::from_cache(cached, ResponseSource::Offline));
            }
        }

        Err(err)
    }

    /// First hit across partitions, in order. Lookup failures count as misses.
    async fn lookup_first(
        &self,
        key: &RequestKey,
        partitions: [&String; 2],
    ) -> Option<(String, CachedResponse)> {
        for partition in partitions {
            match self.cache.lookup(partition, key).await {
                Ok(Some(cached)) => return Some((partition.clone(), cached)),
                Ok(None) => {}
                Err(e) => warn!(partition = %partition, url = %key.url, error = %e, "cache lookup failed"),
            }
        }
        None
    }

    async fn remember(&self, partition: &str, key: &RequestKey, response: &UpstreamResponse) {
        if let Err(e) = self.cache.store(partition, key, &response.to_cached()).await {
            warn!(partition, url = %key.url, error = %e, "failed to cache response");
        }
    }

    /// Fetches every URL; fails on the first transport error or non-2xx status.
    async fn fetch_all(
        &self,
        urls: &[String],
    ) -> Result<Vec<(RequestKey, CachedResponse)>, BeaconError> {
        let mut records = Vec::with_capacity(urls.len());
        for url in urls {
            let response = self.upstream.fetch(&ProxyRequest::get(url.clone())).await?;
            if !response.is_success() {
                return Err(BeaconError::Proxy {
                    message: format!("{url} returned {}", response.status),
                    source: None,
                });
            }
            records.push((RequestKey::get(url.clone()), response.to_cached()));
        }
        Ok(records)
    }

    /// Fetches the URLs and stores them all in the dynamic partition, or none.
    pub async fn cache_urls(&self, urls: &[String]) -> Result<usize, BeaconError> {
        let records = self.fetch_all(urls).await?;
        self.cache
            .store_all(&self.dynamic_partition, &records)
            .await?;
        info!(count = records.len(), "cached requested urls");
        Ok(records.len())
    }

    /// Applies a message sent by a client.
    pub async fn handle_client_message(&self, message: ClientMessage) -> Result<(), BeaconError> {
        match message {
            ClientMessage::SkipWaiting => self.activate().await.map(|_| ()),
            ClientMessage::CacheUrls { urls } => self.cache_urls(&urls).await.map(|_| ()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use beacon_test_utils::MemoryCacheStore;

    use super::*;

    /// Upstream answering from a fixed table; `offline` makes every fetch fail.
    #[derive(Default)]
    struct ScriptedUpstream {
        routes: Mutex<HashMap<String, (u16, &'static str)>>,
        offline: Mutex<bool>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedUpstream {
        fn with_manifest() -> Arc<Self> {
            let upstream = Self::default();
            for path in ProxyOptions::default().static_assets {
                upstream.route(&path, 200, "asset");
            }
            upstream.route("/offline", 200, "offline page");
            Arc::new(upstream)
        }

        fn route(&self, path: &str, status: u16, body: &'static str) {
            self.routes
                .lock()
                .unwrap()
                .insert(path.to_string(), (status, body));
        }

        fn go_offline(&self) {
            *self.offline.lock().unwrap() = true;
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn reset_calls(&self) {
            self.calls.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Upstream for ScriptedUpstream {
        async fn fetch(&self, request: &ProxyRequest) -> Result<UpstreamResponse, BeaconError> {
            self.calls.lock().unwrap().push(request.url.clone());
            if *self.offline.lock().unwrap() {
                return Err(BeaconError::Network {
                    message: "connection refused".into(),
                    source: None,
                });
            }
            let (status, body) = self
                .routes
                .lock()
                .unwrap()
                .get(&request.url)
                .copied()
                .unwrap_or((404, "not found"));
            Ok(UpstreamResponse {
                status,
                headers: vec![("content-type".into(), "text/plain".into())],
                body: body.as_bytes().to_vec(),
            })
        }
    }

    async fn active_proxy() -> (Arc<CachingProxy>, Arc<ScriptedUpstream>, Arc<MemoryCacheStore>) {
        let upstream = ScriptedUpstream::with_manifest();
        let cache = MemoryCacheStore::new();
        let proxy = CachingProxy::new(cache.clone(), upstream.clone(), ProxyOptions::default());
        assert_eq!(proxy.start().await, Lifecycle::Active);
        upstream.reset_calls();
        (proxy, upstream, cache)
    }

    fn navigation(url: &str) -> ProxyRequest {
        ProxyRequest::get(url).with_header("sec-fetch-dest", "document")
    }

    #[test]
    fn partition_names_carry_app_and_version() {
        let options = ProxyOptions::default();
        assert_eq!(options.static_partition(), "beacon-static-v1");
        assert_eq!(options.dynamic_partition(), "beacon-dynamic-v1");
    }

    #[test]
    fn lifecycle_labels() {
        assert_eq!(Lifecycle::PassThrough.to_string(), "pass-through");
        assert_eq!(Lifecycle::Active.to_string(), "active");
    }

    #[tokio::test]
    async fn install_seeds_static_partition() {
        let (proxy, _, cache) = active_proxy().await;
        let keys = cache.keys(proxy.static_partition()).await;
        assert_eq!(keys.len(), ProxyOptions::default().static_assets.len());
        assert!(keys.contains(&RequestKey::get("/offline")));
    }

    #[tokio::test]
    async fn install_is_skipped_when_static_partition_exists() {
        let (proxy, upstream, _) = active_proxy().await;
        proxy.install().await.unwrap();
        assert!(upstream.calls().is_empty());
        assert_eq!(proxy.lifecycle(), Lifecycle::Waiting);
    }

    #[tokio::test]
    async fn failed_install_leaves_old_partitions_and_passes_through() {
        let upstream = ScriptedUpstream::with_manifest();
        upstream.route("/dashboard", 500, "boom");
        let cache = MemoryCacheStore::new();
        let old = RequestKey::get("/");
        cache
            .store(
                "beacon-static-v0",
                &old,
                &UpstreamResponse {
                    status: 200,
                    headers: vec![],
                    body: b"old".to_vec(),
                }
                .to_cached(),
            )
            .await
            .unwrap();

        let proxy = CachingProxy::new(cache.clone(), upstream.clone(), ProxyOptions::default());
        assert_eq!(proxy.start().await, Lifecycle::PassThrough);
        assert_eq!(cache.partitions().await.unwrap(), vec!["beacon-static-v0"]);

        upstream.route("/app.js", 200, "js");
        let response = proxy.handle(ProxyRequest::get("/app.js")).await.unwrap();
        assert_eq!(response.source, ResponseSource::Network);
        assert!(cache.keys("beacon-static-v1").await.is_empty());
        assert!(proxy.activate().await.is_err());
    }

    #[tokio::test]
    async fn activate_retires_stale_partitions() {
        let upstream = ScriptedUpstream::with_manifest();
        let cache = MemoryCacheStore::new();
        let snapshot = UpstreamResponse {
            status: 200,
            headers: vec![],
            body: vec![],
        }
        .to_cached();
        for partition in ["beacon-static-v0", "beacon-dynamic-v0", "beacon-dynamic-v1"] {
            cache
                .store(partition, &RequestKey::get("/"), &snapshot)
                .await
                .unwrap();
        }

        let proxy = CachingProxy::new(cache.clone(), upstream, ProxyOptions::default());
        proxy.install().await.unwrap();
        assert_eq!(proxy.lifecycle(), Lifecycle::Waiting);
        assert_eq!(proxy.activate().await.unwrap(), 2);
        assert_eq!(
            cache.partitions().await.unwrap(),
            vec!["beacon-dynamic-v1", "beacon-static-v1"]
        );
    }

    #[tokio::test]
    async fn skip_waiting_activates_installed_proxy() {
        let upstream = ScriptedUpstream::with_manifest();
        let proxy = CachingProxy::new(MemoryCacheStore::new(), upstream, ProxyOptions::default());
        let mut lifecycle = proxy.watch_lifecycle();

        proxy.install().await.unwrap();
        proxy
            .handle_client_message(ClientMessage::SkipWaiting)
            .await
            .unwrap();

        lifecycle.changed().await.unwrap();
        assert_eq!(*lifecycle.borrow_and_update(), Lifecycle::Active);
    }

    #[tokio::test]
    async fn cache_first_hit_skips_network() {
        let (proxy, upstream, _) = active_proxy().await;
        let response = proxy
            .handle(ProxyRequest::get("/icons/icon-192x192.png"))
            .await
            .unwrap();
        assert_eq!(
            response.source,
            ResponseSource::Cache("beacon-static-v1".into())
        );
        assert!(upstream.calls().is_empty());
    }

    #[tokio::test]
    async fn cache_first_miss_fetches_and_stores_static() {
        let (proxy, upstream, cache) = active_proxy().await;
        upstream.route("/_next/app.js", 200, "bundle");

        let first = proxy.handle(ProxyRequest::get("/_next/app.js")).await.unwrap();
        assert_eq!(first.source, ResponseSource::Network);
        assert_eq!(first.body, b"bundle");
        assert!(
            cache
                .keys("beacon-static-v1")
                .await
                .contains(&RequestKey::get("/_next/app.js"))
        );

        let second = proxy.handle(ProxyRequest::get("/_next/app.js")).await.unwrap();
        assert!(matches!(second.source, ResponseSource::Cache(_)));
        assert_eq!(upstream.calls(), vec!["/_next/app.js"]);
    }

    #[tokio::test]
    async fn cache_first_does_not_store_error_status() {
        let (proxy, _, cache) = active_proxy().await;
        let response = proxy.handle(ProxyRequest::get("/missing.css")).await.unwrap();
        assert_eq!(response.status, 404);
        assert!(
            !cache
                .keys("beacon-static-v1")
                .await
                .contains(&RequestKey::get("/missing.css"))
        );
    }

    #[tokio::test]
    async fn cache_first_miss_while_offline_fails() {
        let (proxy, upstream, _) = active_proxy().await;
        upstream.go_offline();
        let err = proxy.handle(ProxyRequest::get("/late.js")).await.unwrap_err();
        assert!(matches!(err, BeaconError::Network { .. }));
    }

    #[tokio::test]
    async fn network_first_always_hits_network_and_caches_dynamic() {
        let (proxy, upstream, cache) = active_proxy().await;
        upstream.route("/api/reports?page=2", 200, "[]");

        for _ in 0..2 {
            let response = proxy
                .handle(ProxyRequest::get("/api/reports?page=2"))
                .await
                .unwrap();
            assert_eq!(response.source, ResponseSource::Network);
        }
        assert_eq!(upstream.calls().len(), 2);
        assert_eq!(
            cache.keys("beacon-dynamic-v1").await,
            vec![RequestKey::get("/api/reports?page=2")]
        );
    }

    #[tokio::test]
    async fn network_first_never_caches_non_get() {
        let (proxy, upstream, cache) = active_proxy().await;
        upstream.route("/api/reports", 200, "ok");
        let request = ProxyRequest {
            method: "POST".into(),
            ..ProxyRequest::get("/api/reports")
        };
        proxy.handle(request).await.unwrap();
        assert!(cache.keys("beacon-dynamic-v1").await.is_empty());
    }

    #[tokio::test]
    async fn network_first_falls_back_to_dynamic_then_static() {
        let (proxy, upstream, _) = active_proxy().await;
        upstream.route("/dashboard", 200, "fresh dashboard");
        proxy.handle(ProxyRequest::get("/dashboard")).await.unwrap();

        upstream.go_offline();
        let dashboard = proxy.handle(ProxyRequest::get("/dashboard")).await.unwrap();
        assert_eq!(
            dashboard.source,
            ResponseSource::Cache("beacon-dynamic-v1".into())
        );
        assert_eq!(dashboard.body, b"fresh dashboard");

        let intake = proxy.handle(ProxyRequest::get("/intake")).await.unwrap();
        assert_eq!(
            intake.source,
            ResponseSource::Cache("beacon-static-v1".into())
        );
    }

    #[tokio::test]
    async fn offline_navigation_gets_offline_page() {
        let (proxy, upstream, _) = active_proxy().await;
        upstream.go_offline();

        let response = proxy.handle(navigation("/reports/123")).await.unwrap();
        assert_eq!(response.source, ResponseSource::Offline);
        assert_eq!(response.body, b"offline page");
    }

    #[tokio::test]
    async fn offline_subresource_miss_propagates_failure() {
        let (proxy, upstream, _) = active_proxy().await;
        upstream.go_offline();
        let err = proxy
            .handle(ProxyRequest::get("/api/reports/123"))
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::Network { .. }));
    }

    #[tokio::test]
    async fn cache_write_failure_does_not_fail_request() {
        let (proxy, upstream, cache) = active_proxy().await;
        upstream.route("/api/status", 200, "ok");
        cache.fail_writes(true);
        let response = proxy.handle(ProxyRequest::get("/api/status")).await.unwrap();
        assert_eq!(response.status, 200);
    }

    #[tokio::test]
    async fn cache_urls_is_all_or_nothing() {
        let (proxy, upstream, cache) = active_proxy().await;
        upstream.route("/reports/1", 200, "one");
        upstream.route("/reports/2", 200, "two");

        let stored = proxy
            .cache_urls(&["/reports/1".into(), "/reports/2".into()])
            .await
            .unwrap();
        assert_eq!(stored, 2);
        assert_eq!(cache.keys("beacon-dynamic-v1").await.len(), 2);

        let err = proxy
            .handle_client_message(ClientMessage::CacheUrls {
                urls: vec!["/reports/3".into(), "/reports/1".into()],
            })
            .await;
        assert!(err.is_err());
        assert_eq!(cache.keys("beacon-dynamic-v1").await.len(), 2);
    }
}
