// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon submit` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;

use beacon_config::BeaconConfig;
use beacon_core::{Attachment, BeaconError, NewSubmission, Payload, SubmissionKind};
use beacon_net::Connectivity;

use crate::app::Pipeline;

/// Arguments of `beacon submit`.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Report kind: audio, text, image or video.
    #[arg(long, default_value = "text")]
    pub kind: SubmissionKind,

    /// Transcript or caption.
    #[arg(long)]
    pub transcript: Option<String>,

    /// Attachment to include; repeat for several files.
    #[arg(long = "file")]
    pub files: Vec<PathBuf>,

    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub lng: Option<f64>,

    /// Language tag sent with the report (collector default: ko).
    #[arg(long)]
    pub lang: Option<String>,
}

/// Run the `beacon submit` command.
///
/// The entry is queued and left for `beacon serve` or `beacon sync` to
/// deliver; no network call is made here.
pub async fn run_submit(config: &BeaconConfig, args: SubmitArgs) -> Result<(), BeaconError> {
    let mut attachments = Vec::with_capacity(args.files.len());
    for path in &args.files {
        attachments.push(read_attachment(args.kind, path).await?);
    }
    let submission = build_submission(&args, attachments)?;

    let pipeline = Pipeline::open(config, Connectivity::Offline).await?;
    let id = pipeline.queue().enqueue(submission).await?;
    pipeline.close().await?;

    println!("{id}");
    Ok(())
}

fn build_submission(
    args: &SubmitArgs,
    attachments: Vec<Attachment>,
) -> Result<NewSubmission, BeaconError> {
    // A text payload has no attachment slot. Empty reports are left for the
    // collector to judge.
    if args.kind == SubmissionKind::Text && !attachments.is_empty() {
        return Err(BeaconError::Config(
            "text reports cannot carry files; use --kind image, audio or video".to_string(),
        ));
    }

    let payload = Payload::from_parts(args.kind, args.transcript.clone(), attachments);
    let mut submission = NewSubmission::new(payload);
    if let Some(lang) = &args.lang {
        submission = submission.with_lang(lang.clone());
    }
    if let (Some(lat), Some(lng)) = (args.lat, args.lng) {
        submission = submission.with_location(lat, lng);
    }
    Ok(submission)
}

async fn read_attachment(kind: SubmissionKind, path: &Path) -> Result<Attachment, BeaconError> {
    let data = tokio::fs::read(path).await.map_err(|e| {
        BeaconError::Config(format!("cannot read attachment {}: {e}", path.display()))
    })?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "attachment".to_string());
    Ok(Attachment::new(file_name, content_type_for(kind, path), data))
}

/// MIME type from the file extension; `webm` follows the report kind.
fn content_type_for(kind: SubmissionKind, path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "heic" => "image/heic",
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" if kind == SubmissionKind::Audio => "audio/webm",
        "webm" => "video/webm",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(kind: SubmissionKind) -> SubmitArgs {
        SubmitArgs {
            kind,
            transcript: None,
            files: Vec::new(),
            lat: None,
            lng: None,
            lang: None,
        }
    }

    #[test]
    fn content_types_follow_extension_and_kind() {
        assert_eq!(
            content_type_for(SubmissionKind::Image, Path::new("a/scene.JPG")),
            "image/jpeg"
        );
        assert_eq!(
            content_type_for(SubmissionKind::Audio, Path::new("clip.webm")),
            "audio/webm"
        );
        assert_eq!(
            content_type_for(SubmissionKind::Video, Path::new("clip.webm")),
            "video/webm"
        );
        assert_eq!(
            content_type_for(SubmissionKind::Video, Path::new("blob")),
            "application/octet-stream"
        );
    }

    #[test]
    fn text_report_with_files_is_rejected() {
        let attachment = Attachment::new("x.png", "image/png", vec![1]);
        let err = build_submission(&args(SubmissionKind::Text), vec![attachment]).unwrap_err();
        assert!(err.to_string().contains("cannot carry files"));
    }

    #[test]
    fn empty_reports_are_queued_as_is() {
        let empty = build_submission(&args(SubmissionKind::Audio), vec![]).unwrap();
        assert_eq!(
            empty.payload,
            Payload::Audio {
                clips: vec![],
                transcript: None
            }
        );

        let text = build_submission(&args(SubmissionKind::Text), vec![]).unwrap();
        assert_eq!(text.payload.transcript(), Some(""));
    }

    #[test]
    fn location_and_lang_are_carried() {
        let mut a = args(SubmissionKind::Text);
        a.transcript = Some("road blocked".into());
        a.lat = Some(37.5);
        a.lng = Some(-122.25);
        a.lang = Some("en".into());

        let submission = build_submission(&a, vec![]).unwrap();
        assert_eq!(submission.lang.as_deref(), Some("en"));
        let location = submission.location.unwrap();
        assert_eq!((location.lat, location.lng), (37.5, -122.25));
        assert_eq!(submission.payload.transcript(), Some("road blocked"));
    }

    #[tokio::test]
    async fn attachments_are_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.wav");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let attachment = read_attachment(SubmissionKind::Audio, &path).await.unwrap();
        assert_eq!(attachment.file_name, "note.wav");
        assert_eq!(attachment.content_type, "audio/wav");
        assert_eq!(attachment.data, vec![1, 2, 3]);

        let missing = read_attachment(SubmissionKind::Audio, &dir.path().join("gone.wav")).await;
        assert!(missing.is_err());
    }
}
