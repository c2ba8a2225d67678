// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the remote report collector.

use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use reqwest::multipart::{Form, Part};
use tracing::debug;

use beacon_config::model::CollectorConfig;
use beacon_core::{AdapterType, BeaconError, Collector, HealthStatus, PluginAdapter, QueueEntry};

/// Posts queue entries to the collector as `multipart/form-data`.
pub struct HttpCollector {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpCollector {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, BeaconError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BeaconError::Delivery {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn from_config(config: &CollectorConfig) -> Result<Self, BeaconError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// Build the collector form: `type`, `transcript`, `lang`, `lat`, `lng`,
/// `createdAt`, then one `files` part per attachment.
pub fn build_form(entry: &QueueEntry) -> Form {
    let (lat, lng) = entry
        .location
        .map(|p| (p.lat.to_string(), p.lng.to_string()))
        .unwrap_or_default();

    let mut form = Form::new()
        .text("type", entry.kind().wire_type())
        .text(
            "transcript",
            entry.payload.transcript().unwrap_or_default().to_string(),
        )
        .text("lang", entry.lang_or_default().to_string())
        .text("lat", lat)
        .text("lng", lng)
        .text(
            "createdAt",
            entry
                .created_at
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        );

    for attachment in entry.payload.attachments() {
        let bare = || Part::bytes(attachment.data.clone()).file_name(attachment.file_name.clone());
        let part = bare()
            .mime_str(&attachment.content_type)
            .unwrap_or_else(|_| bare());
        form = form.part("files", part);
    }
    form
}

#[async_trait]
impl PluginAdapter for HttpCollector {
    fn name(&self) -> &str {
        "http-collector"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Collector
    }

    async fn health_check(&self) -> Result<HealthStatus, BeaconError> {
        match self.client.head(&self.endpoint).send().await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("collector unreachable: {e}"))),
        }
    }

    async fn shutdown(&self) -> Result<(), BeaconError> {
        Ok(())
    }
}

#[async_trait]
impl Collector for HttpCollector {
    async fn deliver(&self, entry: &QueueEntry) -> Result<(), BeaconError> {
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(build_form(entry))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BeaconError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    BeaconError::Delivery {
                        message: format!("request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(BeaconError::Delivery {
                message: format!("collector returned {status}"),
                source: None,
            });
        }
        debug!(id = %entry.id, %status, "collector accepted submission");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::{Attachment, NewSubmission, Payload};
    use wiremock::matchers::{header_regex, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn collector(server: &MockServer, timeout: Duration) -> HttpCollector {
        HttpCollector::new(format!("{}/api/reports", server.uri()), timeout).unwrap()
    }

    fn voice_entry() -> QueueEntry {
        let payload = Payload::Audio {
            clips: vec![Attachment::new("clip-0.webm", "audio/webm", b"OPUS".to_vec())],
            transcript: None,
        };
        QueueEntry::from_submission(NewSubmission::new(payload).with_location(37.5, 127.25), 3)
    }

    #[tokio::test]
    async fn posts_multipart_form() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/reports"))
            .and(header_regex("content-type", "^multipart/form-data; boundary="))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let entry = voice_entry();
        collector(&server, Duration::from_secs(5))
            .deliver(&entry)
            .await
            .expect("2xx is success");

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"type\"\r\n\r\nvoice\r\n"));
        assert!(body.contains("name=\"transcript\"\r\n\r\n\r\n"));
        assert!(body.contains("name=\"lang\"\r\n\r\nko\r\n"));
        assert!(body.contains("name=\"lat\"\r\n\r\n37.5\r\n"));
        assert!(body.contains("name=\"lng\"\r\n\r\n127.25\r\n"));
        assert!(body.contains("name=\"createdAt\""));
        assert!(body.contains("name=\"files\"; filename=\"clip-0.webm\""));
        assert!(body.contains("OPUS"));
    }

    #[tokio::test]
    async fn missing_location_sends_empty_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let entry = QueueEntry::from_submission(NewSubmission::text("smoke").with_lang("en"), 3);
        collector(&server, Duration::from_secs(5))
            .deliver(&entry)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"type\"\r\n\r\ntext\r\n"));
        assert!(body.contains("name=\"lat\"\r\n\r\n\r\n"));
        assert!(body.contains("name=\"lang\"\r\n\r\nen\r\n"));
        assert!(!body.contains("name=\"files\""));
    }

    #[tokio::test]
    async fn non_success_status_is_delivery_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = collector(&server, Duration::from_secs(5))
            .deliver(&voice_entry())
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::Delivery { .. }));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn slow_collector_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let err = collector(&server, Duration::from_millis(100))
            .deliver(&voice_entry())
            .await
            .unwrap_err();
        assert!(matches!(err, BeaconError::Timeout { .. }));
    }

    #[tokio::test]
    async fn unreachable_collector_is_delivery_error() {
        let collector =
            HttpCollector::new("http://127.0.0.1:9/api/reports".into(), Duration::from_secs(2))
                .unwrap();
        let err = collector.deliver(&voice_entry()).await.unwrap_err();
        assert!(matches!(err, BeaconError::Delivery { .. }));
    }
}
