// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Beacon pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default retry budget assigned to every new queue entry.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Language tag sent to the collector when a submission carries none.
pub const DEFAULT_LANG: &str = "ko";

/// Diagnostic stored on an entry once its retry budget is spent.
pub const MAX_RETRIES_EXCEEDED: &str = "Max retries exceeded";

/// Diagnostic returned by a sync call that performed no work.
pub const SYNC_REJECTED: &str = "sync already in progress or offline";

/// Unique identifier for a queue entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub String);

impl EntryId {
    /// Generates a fresh random identifier.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Which kind of incident report an entry carries.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SubmissionKind {
    Audio,
    Text,
    Image,
    Video,
}

impl SubmissionKind {
    /// The `type` field value expected by the collector.
    pub fn wire_type(&self) -> &'static str {
        match self {
            SubmissionKind::Audio => "voice",
            SubmissionKind::Text => "text",
            SubmissionKind::Image => "image",
            SubmissionKind::Video => "video",
        }
    }
}

/// Lifecycle status of a queue entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Waiting for a drain pass (initial state, and re-entered after a retryable failure).
    Pending,
    /// Claimed by the active drain pass.
    Processing,
    /// Delivered; the entry is deleted right after reaching this state.
    Completed,
    /// Retry budget exhausted; retained until explicitly cleared.
    Failed,
}

impl EntryStatus {
    /// Terminal states see no further automatic transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EntryStatus::Completed | EntryStatus::Failed)
    }
}

/// A binary blob attached to a submission (recording, photo, clip).
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// A WGS84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

/// Submission content, carrying only the fields relevant to its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Audio {
        clips: Vec<Attachment>,
        transcript: Option<String>,
    },
    Text {
        transcript: String,
    },
    Image {
        images: Vec<Attachment>,
        caption: Option<String>,
    },
    Video {
        clips: Vec<Attachment>,
        caption: Option<String>,
    },
}

impl Payload {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            Payload::Audio { .. } => SubmissionKind::Audio,
            Payload::Text { .. } => SubmissionKind::Text,
            Payload::Image { .. } => SubmissionKind::Image,
            Payload::Video { .. } => SubmissionKind::Video,
        }
    }

    /// Free text sent as the collector's `transcript` field.
    pub fn transcript(&self) -> Option<&str> {
        match self {
            Payload::Audio { transcript, .. } => transcript.as_deref(),
            Payload::Text { transcript } => Some(transcript.as_str()),
            Payload::Image { caption, .. } | Payload::Video { caption, .. } => caption.as_deref(),
        }
    }

    /// Attached blobs in submission order.
    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Payload::Audio { clips, .. } | Payload::Video { clips, .. } => clips,
            Payload::Image { images, .. } => images,
            Payload::Text { .. } => &[],
        }
    }

    /// Rebuilds a payload from its flattened storage form.
    ///
    /// Attachments on a text payload are dropped; a text payload with no
    /// transcript becomes an empty one.
    pub fn from_parts(
        kind: SubmissionKind,
        transcript: Option<String>,
        attachments: Vec<Attachment>,
    ) -> Self {
        match kind {
            SubmissionKind::Audio => Payload::Audio {
                clips: attachments,
                transcript,
            },
            SubmissionKind::Text => Payload::Text {
                transcript: transcript.unwrap_or_default(),
            },
            SubmissionKind::Image => Payload::Image {
                images: attachments,
                caption: transcript,
            },
            SubmissionKind::Video => Payload::Video {
                clips: attachments,
                caption: transcript,
            },
        }
    }
}

/// Caller-supplied part of a queue entry; lifecycle fields are assigned by the queue.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub payload: Payload,
    pub lang: Option<String>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
}

impl NewSubmission {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            lang: None,
            location: None,
            created_at: Utc::now(),
        }
    }

    /// Shorthand for a text-only report.
    pub fn text(transcript: impl Into<String>) -> Self {
        Self::new(Payload::Text {
            transcript: transcript.into(),
        })
    }

    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    pub fn with_location(mut self, lat: f64, lng: f64) -> Self {
        self.location = Some(GeoPoint { lat, lng });
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// One pending or historical submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueEntry {
    pub id: EntryId,
    pub payload: Payload,
    pub lang: Option<String>,
    pub location: Option<GeoPoint>,
    pub created_at: DateTime<Utc>,
    pub status: EntryStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub error_message: Option<String>,
}

impl QueueEntry {
    /// Creates a pending entry with a fresh id and an untouched retry budget.
    pub fn from_submission(submission: NewSubmission, max_retries: u32) -> Self {
        Self {
            id: EntryId::generate(),
            payload: submission.payload,
            lang: submission.lang,
            location: submission.location,
            created_at: submission.created_at,
            status: EntryStatus::Pending,
            retry_count: 0,
            max_retries,
            error_message: None,
        }
    }

    pub fn kind(&self) -> SubmissionKind {
        self.payload.kind()
    }

    /// Language tag with the collector default applied.
    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or(DEFAULT_LANG)
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Counts of entries per status, computed on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub total: usize,
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl QueueStatus {
    /// Tallies a full entry set.
    pub fn tally<'a>(entries: impl IntoIterator<Item = &'a QueueEntry>) -> Self {
        let mut status = QueueStatus::default();
        for entry in entries {
            status.total += 1;
            match entry.status {
                EntryStatus::Pending => status.pending += 1,
                EntryStatus::Processing => status.processing += 1,
                EntryStatus::Completed => status.completed += 1,
                EntryStatus::Failed => status.failed += 1,
            }
        }
        status
    }
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResult {
    /// True iff `failed == 0`. A delivered entry the store could not retire
    /// shows up in `errors` only.
    pub success: bool,
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

impl SyncResult {
    /// Result for a call that was refused without touching the queue.
    pub fn rejected() -> Self {
        Self {
            success: false,
            processed: 0,
            failed: 0,
            errors: vec![SYNC_REJECTED.to_string()],
        }
    }

    /// Returns true if this result came from a refused call.
    pub fn was_rejected(&self) -> bool {
        !self.success
            && self.processed == 0
            && self.failed == 0
            && self.errors.iter().any(|e| e == SYNC_REJECTED)
    }
}

/// Secondary-index lookups supported by a queue store.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IndexQuery {
    /// `by-status`: every entry currently in the given status.
    Status(EntryStatus),
    /// `by-created`: every entry created strictly before the given instant.
    CreatedBefore(DateTime<Utc>),
}

/// Request identity used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    /// Path and query, relative to the upstream origin.
    pub url: String,
}

impl RequestKey {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }
}

/// A stored response snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub stored_at: DateTime<Utc>,
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Collector,
    Cache,
}
