use shelfdb_vector::StoreError;
use thiserror::Error;

/// Failure to bring the destination collection in line with a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("invalid schema: {0}")]
    Invalid(String),

    #[error("vector store unreachable: {0}")]
    Connection(StoreError),

    #[error("could not replace collection '{collection}': {source}")]
    Conflict { collection: String, source: StoreError },
}

/// The store error that halted an ingest run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IngestError {
    #[error("row {index}: submission failed: {source}")]
    RecordSubmission { index: usize, source: StoreError },

    #[error("row {index}: commit of {records} records failed: {source}")]
    BatchCommit { index: usize, records: usize, source: StoreError },
}

impl IngestError {
    /// Row at which ingestion halted.
    pub fn index(&self) -> usize {
        match self {
            Self::RecordSubmission { index, .. } | Self::BatchCommit { index, .. } => *index,
        }
    }

    pub fn store_error(&self) -> &StoreError {
        match self {
            Self::RecordSubmission { source, .. } | Self::BatchCommit { source, .. } => source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
