//! Reconcile-then-ingest composition used by the loader binary.

use indicatif::ProgressBar;
use shelfdb_core::{RecordSchema, SourceRow};
use shelfdb_vector::VectorStore;

use crate::error::PipelineError;
use crate::ingest::{IngestReport, Ingestor};
use crate::reconcile::reconcile;
use crate::sizing::BatchSizing;

pub struct Pipeline<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    schema: &'a RecordSchema,
    sizing: BatchSizing,
    progress: Option<ProgressBar>,
}

impl<'a, S: VectorStore + ?Sized> Pipeline<'a, S> {
    pub fn new(store: &'a S, schema: &'a RecordSchema) -> Self {
        Self { store, schema, sizing: BatchSizing::default(), progress: None }
    }

    pub fn sizing(mut self, sizing: BatchSizing) -> Self {
        self.sizing = sizing;
        self
    }

    pub fn progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    /// Replace the destination collection, then load `rows` into it.
    ///
    /// A schema failure is returned as an error; an ingest halt is reported
    /// in the returned [`IngestReport`].
    pub async fn run(self, rows: &[SourceRow]) -> Result<IngestReport, PipelineError> {
        reconcile(self.store, self.schema).await?;
        let mut ingestor = Ingestor::new(self.store, self.schema, self.sizing);
        if let Some(bar) = self.progress {
            ingestor = ingestor.with_progress(bar);
        }
        Ok(ingestor.run(rows).await)
    }
}
