use super::{to_params, ChunkWriter, InsertStatement, WriteError};
use crate::models::{Chunk, FieldValue};
use async_trait::async_trait;
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool};
use sqlx::query::Query;
use tracing::{debug, warn};

/// MySQL destination writer: one transaction per chunk, one bound insert per record
pub struct MySqlChunkWriter {
    name: String,
    pool: MySqlPool,
    statement: InsertStatement,
    sql: String,
}

impl MySqlChunkWriter {
    pub fn new(pool: MySqlPool, statement: InsertStatement) -> Self {
        let sql = statement.sql();
        Self {
            name: format!("mysql:{}", statement.table()),
            pool,
            statement,
            sql,
        }
    }

    pub fn statement(&self) -> &InsertStatement {
        &self.statement
    }
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: Vec<FieldValue>,
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            FieldValue::Int(v) => query.bind(v),
            FieldValue::Text(v) => query.bind(v),
            FieldValue::Bool(v) => query.bind(v),
            FieldValue::Null => query.bind(None::<String>),
        };
    }
    query
}

#[async_trait]
impl ChunkWriter for MySqlChunkWriter {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&self, chunk: &Chunk) -> Result<(), WriteError> {
        if chunk.is_empty() {
            return Ok(());
        }

        // transaction is acquired only now and released before returning
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| WriteError::transaction(chunk, e.to_string()))?;

        for (index, record) in chunk.records().iter().enumerate() {
            let outcome = match to_params(record, self.statement.columns()) {
                Ok(params) => bind_params(sqlx::query(&self.sql), params)
                    .execute(&mut *tx)
                    .await
                    .map(|_| ())
                    .map_err(|e| e.to_string()),
                Err(e) => Err(e.to_string()),
            };

            if let Err(reason) = outcome {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(
                        writer = %self.name,
                        chunk_offset = chunk.offset(),
                        error = %rollback_err,
                        "rollback failed; connection discarded"
                    );
                }
                return Err(WriteError::statement(chunk, index, reason));
            }
        }

        tx.commit()
            .await
            .map_err(|e| WriteError::transaction(chunk, e.to_string()))?;

        debug!(
            writer = %self.name,
            chunk_offset = chunk.offset(),
            records = chunk.len(),
            "chunk committed"
        );
        Ok(())
    }
}
