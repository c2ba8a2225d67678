// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue entry persistence.
//!
//! Payload text and location live in the `queue` row; attachments live in
//! `queue_attachments` and are written once, when the row is created.

use beacon_core::{
    Attachment, BeaconError, EntryId, EntryStatus, GeoPoint, IndexQuery, Payload, QueueEntry,
    SubmissionKind,
};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{decode_time, encode_time};
use crate::database::{Database, map_tr_err};

const SELECT_ENTRY: &str = "SELECT id, kind, transcript, lang, lat, lng, created_at, status,
        retry_count, max_retries, error_message
     FROM queue";

/// A `queue` row before its attachments are joined in.
struct StoredRow {
    id: String,
    kind: SubmissionKind,
    transcript: Option<String>,
    lang: Option<String>,
    location: Option<GeoPoint>,
    created_at: DateTime<Utc>,
    status: EntryStatus,
    retry_count: u32,
    max_retries: u32,
    error_message: Option<String>,
}

fn parse_enum<T>(idx: usize, raw: String) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<StoredRow> {
    let lat: Option<f64> = row.get(4)?;
    let lng: Option<f64> = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(StoredRow {
        id: row.get(0)?,
        kind: parse_enum(1, row.get(1)?)?,
        transcript: row.get(2)?,
        lang: row.get(3)?,
        location: lat.zip(lng).map(|(lat, lng)| GeoPoint { lat, lng }),
        created_at: decode_time(6, &created_at)?,
        status: parse_enum(7, row.get(7)?)?,
        retry_count: row.get(8)?,
        max_retries: row.get(9)?,
        error_message: row.get(10)?,
    })
}

fn load_attachments(conn: &Connection, id: &str) -> rusqlite::Result<Vec<Attachment>> {
    let mut stmt = conn.prepare_cached(
        "SELECT file_name, content_type, data FROM queue_attachments
         WHERE entry_id = ?1 ORDER BY position ASC",
    )?;
    stmt.query_map(params![id], |row| {
        Ok(Attachment {
            file_name: row.get(0)?,
            content_type: row.get(1)?,
            data: row.get(2)?,
        })
    })?
    .collect()
}

fn hydrate(conn: &Connection, row: StoredRow) -> rusqlite::Result<QueueEntry> {
    let attachments = load_attachments(conn, &row.id)?;
    Ok(QueueEntry {
        payload: Payload::from_parts(row.kind, row.transcript, attachments),
        id: EntryId(row.id),
        lang: row.lang,
        location: row.location,
        created_at: row.created_at,
        status: row.status,
        retry_count: row.retry_count,
        max_retries: row.max_retries,
        error_message: row.error_message,
    })
}

fn select_entries(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<QueueEntry>> {
    let rows = {
        let mut stmt = conn.prepare(sql)?;
        stmt.query_map(params, read_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
    };
    rows.into_iter().map(|row| hydrate(conn, row)).collect()
}

fn insert_row(
    conn: &Connection,
    entry: &QueueEntry,
    ignore_existing: bool,
) -> rusqlite::Result<bool> {
    let verb = if ignore_existing {
        "INSERT OR IGNORE"
    } else {
        "INSERT"
    };
    let inserted = conn.execute(
        &format!(
            "{verb} INTO queue (id, kind, transcript, lang, lat, lng, created_at, status,
                retry_count, max_retries, error_message)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            entry.id.as_str(),
            entry.kind().to_string(),
            entry.payload.transcript(),
            entry.lang,
            entry.location.map(|l| l.lat),
            entry.location.map(|l| l.lng),
            encode_time(&entry.created_at),
            entry.status.to_string(),
            entry.retry_count,
            entry.max_retries,
            entry.error_message,
        ],
    )?;
    if inserted == 0 {
        return Ok(false);
    }

    let mut stmt = conn.prepare_cached(
        "INSERT INTO queue_attachments (entry_id, position, file_name, content_type, data)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for (position, attachment) in entry.payload.attachments().iter().enumerate() {
        stmt.execute(params![
            entry.id.as_str(),
            position as i64,
            attachment.file_name,
            attachment.content_type,
            attachment.data,
        ])?;
    }
    Ok(true)
}

/// Insert a new entry. Fails with [`BeaconError::DuplicateEntry`] if the id exists.
pub async fn add_entry(db: &Database, entry: &QueueEntry) -> Result<(), BeaconError> {
    let entry = entry.clone();
    let id = entry.id.to_string();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let inserted = insert_row(&tx, &entry, true)?;
            tx.commit()?;
            Ok(inserted)
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(BeaconError::DuplicateEntry { id })
    }
}

/// Insert or replace an entry.
///
/// Only lifecycle fields are rewritten on an existing row; payload and
/// attachments are immutable once stored.
pub async fn put_entry(db: &Database, entry: &QueueEntry) -> Result<(), BeaconError> {
    let entry = entry.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            let exists = tx
                .query_row(
                    "SELECT 1 FROM queue WHERE id = ?1",
                    params![entry.id.as_str()],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if exists {
                tx.execute(
                    "UPDATE queue SET status = ?1, retry_count = ?2, max_retries = ?3,
                        error_message = ?4
                     WHERE id = ?5",
                    params![
                        entry.status.to_string(),
                        entry.retry_count,
                        entry.max_retries,
                        entry.error_message,
                        entry.id.as_str(),
                    ],
                )?;
            } else {
                insert_row(&tx, &entry, false)?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_entry(db: &Database, id: &EntryId) -> Result<Option<QueueEntry>, BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<QueueEntry>, rusqlite::Error> {
            let row = conn
                .query_row(&format!("{SELECT_ENTRY} WHERE id = ?1"), params![id], read_row)
                .optional()?;
            row.map(|row| hydrate(conn, row)).transpose()
        })
        .await
        .map_err(map_tr_err)
}

/// Every entry, oldest first.
pub async fn list_entries(db: &Database) -> Result<Vec<QueueEntry>, BeaconError> {
    db.connection()
        .call(|conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            select_entries(
                conn,
                &format!("{SELECT_ENTRY} ORDER BY created_at ASC, id ASC"),
                params![],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Entries matching a secondary-index query, oldest first.
pub async fn list_by_index(
    db: &Database,
    query: IndexQuery,
) -> Result<Vec<QueueEntry>, BeaconError> {
    db.connection()
        .call(move |conn| -> Result<Vec<QueueEntry>, rusqlite::Error> {
            match query {
                IndexQuery::Status(status) => select_entries(
                    conn,
                    &format!("{SELECT_ENTRY} WHERE status = ?1 ORDER BY created_at ASC, id ASC"),
                    params![status.to_string()],
                ),
                IndexQuery::CreatedBefore(cutoff) => select_entries(
                    conn,
                    &format!(
                        "{SELECT_ENTRY} WHERE created_at < ?1 ORDER BY created_at ASC, id ASC"
                    ),
                    params![encode_time(&cutoff)],
                ),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Delete an entry and its attachments. Missing ids are ignored.
pub async fn delete_entry(db: &Database, id: &EntryId) -> Result<(), BeaconError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute("DELETE FROM queue WHERE id = ?1", params![id])?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
