//! Replace-on-start schema reconciliation.

use shelfdb_core::RecordSchema;
use shelfdb_vector::{StoreError, VectorStore};
use tracing::{info, warn};

use crate::error::SchemaError;

fn store_failure(collection: &str, e: StoreError) -> SchemaError {
    match e {
        StoreError::Connection(_) => SchemaError::Connection(e),
        source => SchemaError::Conflict { collection: collection.to_string(), source },
    }
}

/// Make the store hold exactly one collection named `desired.name`, defined by `desired`.
///
/// An existing collection with that name is dropped together with its data,
/// whatever its definition. Running this twice leaves the same single
/// collection behind.
pub async fn reconcile<S: VectorStore + ?Sized>(store: &S, desired: &RecordSchema) -> Result<(), SchemaError> {
    desired.validate().map_err(|e| match e {
        shelfdb_core::Error::InvalidSchema(msg) => SchemaError::Invalid(msg),
        other => SchemaError::Invalid(other.to_string()),
    })?;
    let name = desired.name.as_str();

    // Any failure to read the current definitions means we cannot talk to the store.
    let existing = store.list_collections().await.map_err(SchemaError::Connection)?;

    if existing.iter().any(|c| c.name == name) {
        warn!(collection = name, backend = store.backend(), "dropping existing collection");
        store.delete_collection(name).await.map_err(|e| store_failure(name, e))?;
    }

    store.create_collection(desired).await.map_err(|e| store_failure(name, e))?;
    info!(collection = name, fields = desired.fields.len(), backend = store.backend(), "collection ready");
    Ok(())
}
