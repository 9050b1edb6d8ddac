//! Embedded LanceDB backend.
//!
//! Each collection is a LanceDB table whose Arrow schema carries the field
//! types and descriptions (see [`crate::schema`]). Submissions are accepted
//! without a round trip; values are type-checked when a batch is converted
//! for the commit.

use async_trait::async_trait;
use lancedb::Connection;
use shelfdb_core::{RecordSchema, TargetRecord};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::schema::{build_arrow_schema, record_schema_from_arrow};
use crate::store::VectorStore;
use crate::table::{append_batch, create_empty_table, open_db, table_exists};
use crate::writer::records_to_record_batch;

fn map_lance_error(e: lancedb::Error) -> StoreError {
    match &e {
        lancedb::Error::TableNotFound { .. } => StoreError::NotFound(e.to_string()),
        lancedb::Error::TableAlreadyExists { .. } => StoreError::Conflict(e.to_string()),
        _ => StoreError::Rejected(e.to_string()),
    }
}

pub struct LanceStore {
    db: Connection,
    uri: String,
}

impl LanceStore {
    pub async fn connect(uri: &str) -> StoreResult<Self> {
        let db = open_db(uri).await.map_err(|e| StoreError::Connection(format!("{uri}: {e}")))?;
        debug!(uri, "opened lancedb");
        Ok(Self { db, uri: uri.to_string() })
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn connection(&self) -> &Connection {
        &self.db
    }
}

#[async_trait]
impl VectorStore for LanceStore {
    fn backend(&self) -> &'static str {
        "lancedb"
    }

    async fn list_collections(&self) -> StoreResult<Vec<RecordSchema>> {
        let names = self.db.table_names().execute().await.map_err(map_lance_error)?;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let table = self.db.open_table(&name).execute().await.map_err(map_lance_error)?;
            let schema = table.schema().await.map_err(map_lance_error)?;
            out.push(record_schema_from_arrow(&name, &schema));
        }
        Ok(out)
    }

    async fn delete_collection(&self, name: &str) -> StoreResult<()> {
        if !table_exists(&self.db, name).await.map_err(map_lance_error)? {
            return Err(StoreError::NotFound(name.to_string()));
        }
        self.db.drop_table(name, &[]).await.map_err(map_lance_error)
    }

    async fn create_collection(&self, schema: &RecordSchema) -> StoreResult<()> {
        if table_exists(&self.db, &schema.name).await.map_err(map_lance_error)? {
            return Err(StoreError::Conflict(format!("table '{}' already exists", schema.name)));
        }
        create_empty_table(&self.db, &schema.name, build_arrow_schema(schema)).await.map_err(map_lance_error)
    }

    async fn commit_batch(&self, collection: &str, records: &[TargetRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let table = self.db.open_table(collection).execute().await.map_err(map_lance_error)?;
        let schema = table.schema().await.map_err(map_lance_error)?;
        let batch = records_to_record_batch(schema, records)?;
        append_batch(&table, batch).await.map_err(map_lance_error)
    }
}
