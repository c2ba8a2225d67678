// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ready-made submissions.

use chrono::{DateTime, Utc};

use beacon_core::{Attachment, NewSubmission, Payload};

pub fn text(transcript: &str) -> NewSubmission {
    NewSubmission::text(transcript)
}

pub fn text_at(transcript: &str, created_at: DateTime<Utc>) -> NewSubmission {
    NewSubmission::text(transcript).with_created_at(created_at)
}

/// A two-clip voice report with a transcript and a location.
pub fn voice() -> NewSubmission {
    NewSubmission::new(Payload::Audio {
        clips: vec![
            Attachment::new("clip-0.webm", "audio/webm", vec![0x1a, 0x45, 0xdf, 0xa3]),
            Attachment::new("clip-1.webm", "audio/webm", vec![0x1a, 0x45]),
        ],
        transcript: Some("water rising near the station".to_string()),
    })
    .with_location(37.5547, 126.9707)
}

pub fn photo() -> NewSubmission {
    NewSubmission::new(Payload::Image {
        images: vec![Attachment::new(
            "scene.jpg",
            "image/jpeg",
            vec![0xff, 0xd8, 0xff, 0xe0],
        )],
        caption: None,
    })
    .with_lang("en")
}
