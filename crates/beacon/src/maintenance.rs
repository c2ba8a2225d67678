// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `beacon sync` and `beacon clear` command implementations.

use beacon_config::BeaconConfig;
use beacon_core::{BeaconError, SyncResult};
use tracing::info;

use crate::app::{self, Pipeline};

/// Run the `beacon sync` command: probe once, then run a single drain pass.
///
/// Failed entries keep their incremented retry count; their backoff is
/// forgotten when the process exits, so the next pass may retry them at once.
pub async fn run_sync(config: &BeaconConfig, json: bool) -> Result<(), BeaconError> {
    let connectivity = app::probe(config)?.check().await;
    info!(%connectivity, "collector reachability checked");

    let pipeline = Pipeline::open(config, connectivity).await?;
    pipeline.queue().recover_interrupted().await?;
    let result = pipeline.engine.sync().await;
    pipeline.close().await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&result).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        println!("{}", summarize(&result));
    }
    Ok(())
}

fn summarize(result: &SyncResult) -> String {
    if result.was_rejected() {
        return "sync skipped: collector unreachable".to_string();
    }
    let mut line = format!(
        "delivered {}, failed {}",
        result.processed, result.failed
    );
    for error in &result.errors {
        line.push_str(&format!("\n  {error}"));
    }
    line
}

/// Run the `beacon clear` command.
pub async fn run_clear(
    config: &BeaconConfig,
    completed: bool,
    failed: bool,
) -> Result<(), BeaconError> {
    let pipeline = Pipeline::open(config, beacon_net::Connectivity::Offline).await?;
    let queue = pipeline.queue();
    if completed {
        println!("cleared {} completed", queue.clear_completed().await?);
    }
    if failed {
        println!("cleared {} failed", queue.clear_failed().await?);
    }
    pipeline.close().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_pass_is_reported_as_skipped() {
        assert_eq!(
            summarize(&SyncResult::rejected()),
            "sync skipped: collector unreachable"
        );
    }

    #[test]
    fn summary_lists_errors() {
        let result = SyncResult {
            success: false,
            processed: 2,
            failed: 1,
            errors: vec!["collector returned 503".into()],
        };
        assert_eq!(
            summarize(&result),
            "delivered 2, failed 1\n  collector returned 503"
        );
    }
}
