//! Vector store clients for shelfdb.
//!
//! [`VectorStore`] is the seam the ingestion pipeline writes through. The
//! embedded LanceDB backend is the default; Weaviate is reached over REST and
//! [`MemoryStore`] keeps everything in process.

pub mod error;
pub mod lance;
pub mod memory;
pub mod retry;
pub mod schema;
pub mod store;
pub mod table;
pub mod weaviate;
pub mod writer;

pub use error::{StoreError, StoreResult};
pub use lance::LanceStore;
pub use memory::{CommitCall, MemoryStore};
pub use retry::{RetryPolicy, Retrying};
pub use store::VectorStore;
pub use weaviate::{WeaviateConfig, WeaviateStore};

use shelfdb_core::config::{Backend, StoreSettings};
use tracing::info;

/// Open the configured backend, wrapped in the configured retry policy.
pub async fn connect(settings: &StoreSettings) -> StoreResult<Retrying<Box<dyn VectorStore>>> {
    let store: Box<dyn VectorStore> = match settings.backend {
        Backend::Lance => Box::new(LanceStore::connect(&settings.uri).await?),
        Backend::Weaviate => Box::new(WeaviateStore::new(WeaviateConfig::from(settings))?),
        Backend::Memory => Box::new(MemoryStore::new()),
    };
    info!(backend = store.backend(), retries = settings.retries, "vector store ready");
    Ok(Retrying::new(store, RetryPolicy::from(settings)))
}
