use async_trait::async_trait;
use shelfdb_core::{RecordSchema, TargetRecord};

use crate::error::StoreResult;

/// Collection management and batch writes against a vector store.
///
/// Calls are awaited one at a time by the pipeline; implementations need not
/// support overlapping writes to the same collection.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Backend label used in logs.
    fn backend(&self) -> &'static str;

    // ===== Collection Management =====

    /// Every collection definition currently in the store.
    async fn list_collections(&self) -> StoreResult<Vec<RecordSchema>>;

    async fn delete_collection(&self, name: &str) -> StoreResult<()>;

    async fn create_collection(&self, schema: &RecordSchema) -> StoreResult<()>;

    // ===== Record Writes =====

    /// Admission check for a single record before it is buffered.
    async fn submit(&self, _collection: &str, _record: &TargetRecord) -> StoreResult<()> {
        Ok(())
    }

    /// Persist `records` in order as one request.
    async fn commit_batch(&self, collection: &str, records: &[TargetRecord]) -> StoreResult<()>;
}

#[async_trait]
impl<T: VectorStore + ?Sized> VectorStore for Box<T> {
    fn backend(&self) -> &'static str {
        (**self).backend()
    }

    async fn list_collections(&self) -> StoreResult<Vec<RecordSchema>> {
        (**self).list_collections().await
    }

    async fn delete_collection(&self, name: &str) -> StoreResult<()> {
        (**self).delete_collection(name).await
    }

    async fn create_collection(&self, schema: &RecordSchema) -> StoreResult<()> {
        (**self).create_collection(schema).await
    }

    async fn submit(&self, collection: &str, record: &TargetRecord) -> StoreResult<()> {
        (**self).submit(collection, record).await
    }

    async fn commit_batch(&self, collection: &str, records: &[TargetRecord]) -> StoreResult<()> {
        (**self).commit_batch(collection, records).await
    }
}
