//! Record CRUD operations.

use super::connection::RecordStore;
use crate::Error;
use crate::record::{ListEntry, Record};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Result of an insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted,
    /// A record for the same URL already exists; nothing was written.
    Conflict,
}

impl RecordStore {
    /// Insert a record unless its URL is already present.
    ///
    /// Existing rows are never overwritten: a duplicate URL yields
    /// [`InsertOutcome::Conflict`] and leaves the stored row untouched.
    pub async fn insert(&self, record: &Record) -> Result<InsertOutcome, Error> {
        let record = record.clone();
        self.conn
            .call(move |conn| -> Result<InsertOutcome, Error> {
                let inserted = conn.execute(
                    "INSERT INTO cache (url, status_code, content_type, content, retrieved_at)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    ON CONFLICT(url) DO NOTHING",
                    params![
                        &record.url,
                        record.status_code,
                        &record.content_type,
                        &record.content,
                        &record.retrieved_at,
                    ],
                )?;
                Ok(if inserted == 0 { InsertOutcome::Conflict } else { InsertOutcome::Inserted })
            })
            .await
            .map_err(Error::from)
    }

    /// Get a record by URL.
    ///
    /// Returns None if the URL has never been stored.
    pub async fn lookup(&self, url: &str) -> Result<Option<Record>, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<Option<Record>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT url, status_code, content_type, content, retrieved_at
                    FROM cache WHERE url = ?1 LIMIT 1",
                )?;

                let result = stmt.query_row(params![url], |row| {
                    Ok(Record {
                        url: row.get(0)?,
                        status_code: row.get(1)?,
                        content_type: row.get(2)?,
                        content: row.get(3)?,
                        retrieved_at: row.get(4)?,
                    })
                });

                match result {
                    Ok(r) => Ok(Some(r)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete the record for `url`. Absent URLs are not an error.
    ///
    /// Returns the number of deleted rows.
    pub async fn remove(&self, url: &str) -> Result<u64, Error> {
        let url = url.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache WHERE url = ?1", params![url])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every record.
    ///
    /// Returns the number of deleted rows.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// List every record without its content.
    pub async fn list(&self) -> Result<Vec<ListEntry>, Error> {
        self.conn
            .call(move |conn| -> Result<Vec<ListEntry>, Error> {
                let mut stmt = conn.prepare("SELECT url, status_code, content_type, retrieved_at FROM cache ORDER BY id")?;
                let rows = stmt.query_map([], |row| {
                    Ok(ListEntry {
                        url: row.get(0)?,
                        status_code: row.get(1)?,
                        content_type: row.get(2)?,
                        retrieved_at: row.get(3)?,
                    })
                })?;

                rows.collect::<Result<Vec<_>, _>>().map_err(Error::from)
            })
            .await
            .map_err(Error::from)
    }
}
