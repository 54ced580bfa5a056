//! Entry CRUD operations.
//!
//! Entries are upserted (last write wins per key) and enumerated in
//! insertion order, like the Cache API's `keys()`.

use super::connection::CacheDb;
use crate::Error;
use crate::request::EntryKey;
use crate::response::{CachedResponse, now_ms};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// An entry as read back from a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub key: EntryKey,
    pub response: CachedResponse,
    pub written_at_ms: i64,
}

type EntryRow = (String, String, String, u16, String, String, Vec<u8>, i64);

fn decode_row(row: EntryRow) -> Result<StoredEntry, Error> {
    let (hash, method, url, status, status_text, headers_json, body, written_at_ms) = row;
    let headers: Vec<(String, String)> = serde_json::from_str(&headers_json)?;
    Ok(StoredEntry {
        key: EntryKey { hash, method, url },
        response: CachedResponse { status, status_text, headers, body },
        written_at_ms,
    })
}

impl CacheDb {
    /// Insert or overwrite an entry, creating the bucket if needed.
    ///
    /// The response is stored as given; callers that want the entry subject
    /// to aging stamp it first with [`CachedResponse::stamped`].
    pub async fn put_entry(&self, bucket: &str, key: &EntryKey, response: &CachedResponse) -> Result<(), Error> {
        let bucket = bucket.to_string();
        let key = key.clone();
        let headers_json = serde_json::to_string(&response.headers)?;
        let status = response.status;
        let status_text = response.status_text.clone();
        let body = response.body.clone();
        let stamped_at = response.cache_date();
        let written_at_ms = now_ms();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO buckets (name, created_at) VALUES (?1, ?2)",
                    params![bucket, chrono::Utc::now().to_rfc3339()],
                )?;
                tx.execute(
                    "INSERT INTO entries (
                        bucket, key_hash, method, url, status, status_text,
                        headers_json, body, written_at_ms, stamped_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                    ON CONFLICT(bucket, key_hash) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        written_at_ms = excluded.written_at_ms,
                        stamped_at = excluded.stamped_at",
                    params![
                        bucket,
                        key.hash,
                        key.method,
                        key.url,
                        status,
                        status_text,
                        headers_json,
                        body,
                        written_at_ms,
                        stamped_at,
                    ],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry. Returns None on a miss or a missing bucket.
    pub async fn match_entry(&self, bucket: &str, key: &EntryKey) -> Result<Option<CachedResponse>, Error> {
        Ok(self.read_entry(bucket, key).await?.map(|entry| entry.response))
    }

    /// Look up an entry with its store metadata.
    pub async fn read_entry(&self, bucket: &str, key: &EntryKey) -> Result<Option<StoredEntry>, Error> {
        let bucket = bucket.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let result: rusqlite::Result<EntryRow> = conn.query_row(
                    "SELECT key_hash, method, url, status, status_text, headers_json, body, written_at_ms
                    FROM entries WHERE bucket = ?1 AND key_hash = ?2",
                    params![bucket, hash],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                            row.get(6)?,
                            row.get(7)?,
                        ))
                    },
                );

                match result {
                    Ok(row) => decode_row(row).map(Some),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Keys of every entry in a bucket, in insertion order.
    pub async fn entry_keys(&self, bucket: &str) -> Result<Vec<EntryKey>, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<EntryKey>, Error> {
                let mut stmt = conn.prepare("SELECT key_hash, method, url FROM entries WHERE bucket = ?1 ORDER BY rowid")?;
                let keys = stmt
                    .query_map(params![bucket], |row| {
                        Ok(EntryKey { hash: row.get(0)?, method: row.get(1)?, url: row.get(2)? })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(keys)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn entry_count(&self, bucket: &str) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry. Returns false if it was already gone.
    pub async fn delete_entry(&self, bucket: &str, key: &EntryKey) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted =
                    conn.execute("DELETE FROM entries WHERE bucket = ?1 AND key_hash = ?2", params![bucket, hash])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete an entry only if it still carries the write stamp `stamped_at`.
    ///
    /// An entry overwritten since the caller read it keeps its newer stamp
    /// and survives. Returns whether a row was deleted.
    pub async fn delete_entry_if_stamped(&self, bucket: &str, key: &EntryKey, stamped_at: i64) -> Result<bool, Error> {
        let bucket = bucket.to_string();
        let hash = key.hash.clone();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE bucket = ?1 AND key_hash = ?2 AND stamped_at = ?3",
                    params![bucket, hash, stamped_at],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the oldest-written entries until at most `max_entries` remain.
    ///
    /// Returns the number of deleted entries.
    pub async fn trim_bucket(&self, bucket: &str, max_entries: usize) -> Result<u64, Error> {
        let bucket = bucket.to_string();
        let max = max_entries as i64;
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE bucket = ?1", params![bucket], |row| row.get(0))?;
                if count <= max {
                    return Ok(0);
                }

                let to_delete = count - max;
                let deleted = conn.execute(
                    "DELETE FROM entries WHERE bucket = ?1 AND key_hash IN (
                        SELECT key_hash FROM entries WHERE bucket = ?1
                        ORDER BY written_at_ms ASC, rowid ASC LIMIT ?2
                    )",
                    params![bucket, to_delete],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}
