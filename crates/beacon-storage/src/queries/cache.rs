// SPDX-FileCopyrightText: 2026 Beacon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response snapshot persistence for the caching proxy.

use beacon_core::BeaconError;
use beacon_core::types::{CachedResponse, RequestKey};
use rusqlite::{Connection, OptionalExtension, params};

use super::{decode_time, encode_time};
use crate::database::{Database, map_tr_err};

fn upsert(
    conn: &Connection,
    partition: &str,
    key: &RequestKey,
    response: &CachedResponse,
) -> rusqlite::Result<()> {
    let headers = serde_json::to_string(&response.headers)
        .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
    conn.prepare_cached(
        "INSERT INTO cache_records (partition, method, url, status, headers, body, stored_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (partition, method, url) DO UPDATE SET
            status = excluded.status,
            headers = excluded.headers,
            body = excluded.body,
            stored_at = excluded.stored_at",
    )?
    .execute(params![
        partition,
        key.method,
        key.url,
        response.status,
        headers,
        response.body,
        encode_time(&response.stored_at),
    ])?;
    Ok(())
}

pub async fn lookup(
    db: &Database,
    partition: &str,
    key: &RequestKey,
) -> Result<Option<CachedResponse>, BeaconError> {
    let partition = partition.to_string();
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<Option<CachedResponse>, rusqlite::Error> {
            conn.query_row(
                "SELECT status, headers, body, stored_at FROM cache_records
                 WHERE partition = ?1 AND method = ?2 AND url = ?3",
                params![partition, key.method, key.url],
                |row| {
                    let headers: String = row.get(1)?;
                    let stored_at: String = row.get(3)?;
                    Ok(CachedResponse {
                        status: row.get(0)?,
                        headers: serde_json::from_str(&headers).map_err(|e| {
                            rusqlite::Error::FromSqlConversionFailure(
                                1,
                                rusqlite::types::Type::Text,
                                Box::new(e),
                            )
                        })?,
                        body: row.get(2)?,
                        stored_at: decode_time(3, &stored_at)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn store(
    db: &Database,
    partition: &str,
    key: &RequestKey,
    response: &CachedResponse,
) -> Result<(), BeaconError> {
    let partition = partition.to_string();
    let key = key.clone();
    let response = response.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            upsert(conn, &partition, &key, &response)
        })
        .await
        .map_err(map_tr_err)
}

/// Write a batch in one transaction. A failing record rolls back the batch.
pub async fn store_all(
    db: &Database,
    partition: &str,
    records: &[(RequestKey, CachedResponse)],
) -> Result<(), BeaconError> {
    let partition = partition.to_string();
    let records = records.to_vec();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let tx = conn.transaction()?;
            for (key, response) in &records {
                upsert(&tx, &partition, key, response)?;
            }
            tx.commit()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn partitions(db: &Database) -> Result<Vec<String>, BeaconError> {
    db.connection()
        .call(|conn| -> Result<Vec<String>, rusqlite::Error> {
            let mut stmt =
                conn.prepare("SELECT DISTINCT partition FROM cache_records ORDER BY partition")?;
            let names = stmt
                .query_map(params![], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(names)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn delete_partition(db: &Database, partition: &str) -> Result<usize, BeaconError> {
    let partition = partition.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM cache_records WHERE partition = ?1",
                params![partition],
            )
        })
        .await
        .map_err(map_tr_err)
}
