// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon status` and `beacon list` command implementations.
//!
//! Both read the queue database directly; they work whether or not
//! `beacon serve` is running.

use std::io::IsTerminal;

use chrono::SecondsFormat;
use serde::Serialize;

use beacon_config::BeaconConfig;
use beacon_core::{BeaconError, EntryStatus, QueueEntry, QueueStatus};
use beacon_net::Connectivity;

use crate::app::Pipeline;

/// One queue entry as printed by `beacon list --json`.
#[derive(Debug, Serialize)]
pub struct EntryView {
    pub id: String,
    pub kind: String,
    pub status: EntryStatus,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: String,
    pub attachments: usize,
    pub transcript: Option<String>,
    pub error_message: Option<String>,
}

impl From<&QueueEntry> for EntryView {
    fn from(entry: &QueueEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            kind: entry.kind().to_string(),
            status: entry.status,
            retry_count: entry.retry_count,
            max_retries: entry.max_retries,
            created_at: entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            attachments: entry.payload.attachments().len(),
            transcript: entry.payload.transcript().map(str::to_string),
            error_message: entry.error_message.clone(),
        }
    }
}

fn use_color(plain: bool) -> bool {
    !plain && std::io::stdout().is_terminal()
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    );
}

/// Run the `beacon status` command.
pub async fn run_status(config: &BeaconConfig, json: bool, plain: bool) -> Result<(), BeaconError> {
    let pipeline = Pipeline::open(config, Connectivity::Offline).await?;
    let status = pipeline.queue().status().await?;
    pipeline.close().await?;

    if json {
        print_json(&status);
    } else {
        print_status(&status, &config.storage.database_path, use_color(plain));
    }
    Ok(())
}

fn print_status(status: &QueueStatus, database: &str, use_color: bool) {
    println!();
    println!("  beacon queue");
    println!("  {}", "-".repeat(35));

    if use_color {
        use colored::Colorize;
        println!("    Pending:    {}", status.pending.to_string().yellow());
        println!("    Processing: {}", status.processing.to_string().cyan());
        println!("    Completed:  {}", status.completed.to_string().green());
        println!("    Failed:     {}", status.failed.to_string().red());
    } else {
        println!("    Pending:    {}", status.pending);
        println!("    Processing: {}", status.processing);
        println!("    Completed:  {}", status.completed);
        println!("    Failed:     {}", status.failed);
    }
    println!("    Total:      {}", status.total);
    println!("    Database:   {database}");
    println!();
}

/// Run the `beacon list` command.
pub async fn run_list(config: &BeaconConfig, json: bool, plain: bool) -> Result<(), BeaconError> {
    let pipeline = Pipeline::open(config, Connectivity::Offline).await?;
    let entries = pipeline.queue().items().await?;
    pipeline.close().await?;

    let views: Vec<EntryView> = entries.iter().map(EntryView::from).collect();
    if json {
        print_json(&views);
        return Ok(());
    }

    if views.is_empty() {
        println!("queue is empty");
        return Ok(());
    }
    let color = use_color(plain);
    for view in &views {
        println!("{}", format_row(view, color));
    }
    Ok(())
}

fn format_row(view: &EntryView, use_color: bool) -> String {
    let status = format!("{:<10}", view.status.to_string());
    let status = if use_color {
        use colored::Colorize;
        match view.status {
            EntryStatus::Pending => status.yellow().to_string(),
            EntryStatus::Processing => status.cyan().to_string(),
            EntryStatus::Completed => status.green().to_string(),
            EntryStatus::Failed => status.red().to_string(),
        }
    } else {
        status
    };

    let mut row = format!(
        "{}  {}  {:<5}  {}/{}  {}",
        view.id, status, view.kind, view.retry_count, view.max_retries, view.created_at
    );
    if let Some(error) = &view.error_message {
        row.push_str(&format!("  ({error})"));
    }
    row
}

#[cfg(test)]
mod tests {
    use beacon_core::NewSubmission;

    use super::*;

    fn failed_entry() -> QueueEntry {
        let mut entry = QueueEntry::from_submission(NewSubmission::text("bridge out"), 3);
        entry.status = EntryStatus::Failed;
        entry.retry_count = 3;
        entry.error_message = Some("Max retries exceeded".into());
        entry
    }

    #[test]
    fn entry_view_serializes_lowercase_status() {
        let view = EntryView::from(&failed_entry());
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "text");
        assert_eq!(json["retry_count"], 3);
        assert_eq!(json["transcript"], "bridge out");
        assert_eq!(json["error_message"], "Max retries exceeded");
    }

    #[test]
    fn plain_row_includes_error() {
        let view = EntryView::from(&failed_entry());
        let row = format_row(&view, false);
        assert!(row.starts_with(&view.id));
        assert!(row.contains("failed"));
        assert!(row.contains("3/3"));
        assert!(row.ends_with("(Max retries exceeded)"));
    }

    #[test]
    fn status_serializes_every_count() {
        let json = serde_json::to_value(QueueStatus {
            total: 3,
            pending: 1,
            processing: 0,
            completed: 0,
            failed: 2,
        })
        .unwrap();
        assert_eq!(json["total"], 3);
        assert_eq!(json["failed"], 2);
    }
}
