//! Postgres source cursor.
//!
//! The fetch runs in a spawned task that streams decoded rows into a bounded
//! channel, so the cursor holds no borrow on the pool and backpressure keeps at
//! most `fetch_buffer` rows in memory.

use super::{RecordCursor, SourceReadError};
use crate::models::{FieldValue, Record, SourceRecord};
use async_trait::async_trait;
use futures::StreamExt;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const DEFAULT_SOURCE_QUERY: &str = "SELECT * FROM student";
pub const DEFAULT_FETCH_BUFFER: usize = 256;

type RowResult = Result<SourceRecord, SourceReadError>;

/// Receiving end of a spawned fetch. A closed channel is only end of data if
/// the fetch task itself finished cleanly.
struct OpenStream {
    rows: mpsc::Receiver<RowResult>,
    fetcher: Option<JoinHandle<()>>,
}

impl OpenStream {
    fn new(rows: mpsc::Receiver<RowResult>, fetcher: JoinHandle<()>) -> Self {
        Self {
            rows,
            fetcher: Some(fetcher),
        }
    }

    async fn next_row(&mut self) -> Result<Option<SourceRecord>, SourceReadError> {
        if let Some(item) = self.rows.recv().await {
            return item.map(Some);
        }
        match self.fetcher.take() {
            Some(fetcher) => match fetcher.await {
                Ok(()) => Ok(None),
                Err(e) if e.is_cancelled() => Err(SourceReadError::Connection(
                    "source fetch was cancelled before the result set was exhausted".to_string(),
                )),
                Err(e) => Err(SourceReadError::Connection(format!("source fetch failed: {e}"))),
            },
            None => Ok(None),
        }
    }

    fn abort(self) {
        drop(self.rows);
        if let Some(fetcher) = self.fetcher {
            fetcher.abort();
        }
    }
}

/// Forward-only cursor over a fixed query against a Postgres source
pub struct PgRecordCursor {
    name: String,
    pool: PgPool,
    query: String,
    fetch_buffer: usize,
    stream: Option<OpenStream>,
}

impl PgRecordCursor {
    pub fn new(pool: PgPool) -> Self {
        Self {
            name: "postgres_cursor".to_string(),
            pool,
            query: DEFAULT_SOURCE_QUERY.to_string(),
            fetch_buffer: DEFAULT_FETCH_BUFFER,
            stream: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = query.into();
        self
    }

    pub fn with_fetch_buffer(mut self, rows: usize) -> Self {
        self.fetch_buffer = rows.max(1);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    fn shutdown_stream(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.abort();
        }
    }
}

#[async_trait]
impl RecordCursor for PgRecordCursor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), SourceReadError> {
        self.shutdown_stream();

        // fail fast on connectivity before handing out a stream
        drop(self.pool.acquire().await?);

        let (tx, rx) = mpsc::channel(self.fetch_buffer);
        let pool = self.pool.clone();
        let query = self.query.clone();

        let fetcher = tokio::spawn(async move {
            let mut rows = sqlx::query(&query).fetch(&pool);
            let mut offset: u64 = 0;
            while let Some(row) = rows.next().await {
                let item = match row {
                    Ok(row) => decode_row(&row, offset),
                    Err(e) => Err(SourceReadError::from(e)),
                };
                let failed = item.is_err();
                if tx.send(item).await.is_err() || failed {
                    break;
                }
                offset += 1;
            }
        });

        debug!(cursor = %self.name, query = %self.query, "cursor opened");
        self.stream = Some(OpenStream::new(rx, fetcher));
        Ok(())
    }

    async fn next(&mut self) -> Result<Option<SourceRecord>, SourceReadError> {
        self.stream
            .as_mut()
            .ok_or(SourceReadError::NotOpen)?
            .next_row()
            .await
    }

    async fn close(&mut self) -> Result<(), SourceReadError> {
        if self.stream.is_some() {
            debug!(cursor = %self.name, "cursor closed");
        }
        self.shutdown_stream();
        Ok(())
    }
}

impl Drop for PgRecordCursor {
    fn drop(&mut self) {
        if self.stream.is_some() {
            warn!(cursor = %self.name, "cursor dropped while open; aborting fetch");
            self.shutdown_stream();
        }
    }
}

/// Decode a row into a source record by column type
pub fn decode_row(row: &PgRow, offset: u64) -> Result<SourceRecord, SourceReadError> {
    let mut record = Record::new();

    for column in row.columns() {
        let idx = column.ordinal();
        let malformed = |reason: String| SourceReadError::MalformedRow { offset, reason };

        let value: FieldValue = match column.type_info().name() {
            "INT2" => row
                .try_get::<Option<i16>, _>(idx)
                .map(|v| FieldValue::from(v.map(i64::from))),
            "INT4" => row
                .try_get::<Option<i32>, _>(idx)
                .map(|v| FieldValue::from(v.map(i64::from))),
            "INT8" => row.try_get::<Option<i64>, _>(idx).map(FieldValue::from),
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                row.try_get::<Option<String>, _>(idx).map(FieldValue::from)
            }
            "BOOL" => row.try_get::<Option<bool>, _>(idx).map(FieldValue::from),
            other => {
                return Err(malformed(format!(
                    "unsupported type {other} for column {}",
                    column.name()
                )))
            }
        }
        .map_err(|e| malformed(format!("column {}: {e}", column.name())))?;

        record.set(column.name(), value);
    }

    Ok(SourceRecord(record))
}
