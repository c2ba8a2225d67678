// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded schema migrations, applied on every open.

use beacon_core::BeaconError;

mod embedded {
    use refinery::embed_migrations;
    embed_migrations!("migrations");
}

/// Apply pending migrations. Refinery records applied versions in
/// `refinery_schema_history`, so reruns are no-ops.
pub fn run_migrations(conn: &mut rusqlite::Connection) -> Result<(), BeaconError> {
    let report = embedded::migrations::runner()
        .run(conn)
        .map_err(BeaconError::storage)?;
    for migration in report.applied_migrations() {
        tracing::debug!(version = migration.version(), name = migration.name(), "migration applied");
    }
    Ok(())
}
