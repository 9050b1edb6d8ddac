//! Schema reconciliation and bounded-batch ingestion into a [`VectorStore`].
//!
//! [`VectorStore`]: shelfdb_vector::VectorStore

pub mod batch;
pub mod error;
pub mod ingest;
pub mod pipeline;
pub mod reconcile;
pub mod sizing;

pub use batch::IngestState;
pub use error::{IngestError, PipelineError, SchemaError};
pub use ingest::{ingest, IngestReport, Ingestor};
pub use pipeline::Pipeline;
pub use reconcile::reconcile;
pub use sizing::{BatchSizer, BatchSizing, SizingStrategy};
