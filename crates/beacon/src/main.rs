// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Beacon - offline-first incident submission pipeline.
//!
//! This is the binary entry point: it loads configuration, initializes
//! logging, and dispatches to a subcommand.

mod app;
mod maintenance;
mod serve;
mod shutdown;
mod status;
mod submit;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use beacon_config::BeaconConfig;

/// Beacon - offline-first incident submission pipeline.
#[derive(Parser, Debug)]
#[command(name = "beacon", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync engine and the caching proxy until interrupted.
    Serve,
    /// Queue a report for delivery.
    Submit(submit::SubmitArgs),
    /// Show per-status queue counts.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// List every queued entry, oldest first.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Run one drain pass now.
    Sync {
        /// Print the pass result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete completed and/or failed entries.
    #[command(group(ArgGroup::new("which").required(true).multiple(true)))]
    Clear {
        #[arg(long, group = "which")]
        completed: bool,
        #[arg(long, group = "which")]
        failed: bool,
    },
}

fn load_config(path: Option<&PathBuf>) -> BeaconConfig {
    let loaded = match path {
        Some(path) => beacon_config::load_and_validate_path(path),
        None => beacon_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            beacon_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("beacon={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());
    init_tracing(&config.app.log_level);

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Submit(args)) => submit::run_submit(&config, args).await,
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain).await,
        Some(Commands::List { json, plain }) => status::run_list(&config, json, plain).await,
        Some(Commands::Sync { json }) => maintenance::run_sync(&config, json).await,
        Some(Commands::Clear { completed, failed }) => {
            maintenance::run_clear(&config, completed, failed).await
        }
        None => {
            println!("beacon: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use beacon_core::SubmissionKind;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = beacon_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.app.name, "beacon");
    }

    #[test]
    fn submit_parses_media_report() {
        let cli = Cli::try_parse_from([
            "beacon", "submit", "--kind", "audio", "--file", "a.webm", "--file", "b.webm",
            "--lat", "37.55", "--lng", "-126.97",
        ])
        .unwrap();
        let Some(Commands::Submit(args)) = cli.command else {
            panic!("expected submit");
        };
        assert_eq!(args.kind, SubmissionKind::Audio);
        assert_eq!(args.files.len(), 2);
        assert_eq!(args.lng, Some(-126.97));
    }

    #[test]
    fn submit_rejects_unknown_kind_and_lone_coordinate() {
        assert!(Cli::try_parse_from(["beacon", "submit", "--kind", "multimodal"]).is_err());
        assert!(Cli::try_parse_from(["beacon", "submit", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn clear_requires_a_target() {
        assert!(Cli::try_parse_from(["beacon", "clear"]).is_err());
        let cli = Cli::try_parse_from(["beacon", "clear", "--completed", "--failed"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Clear {
                completed: true,
                failed: true
            })
        ));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["beacon", "status", "--config", "/tmp/b.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/b.toml")));
    }
}
