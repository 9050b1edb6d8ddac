//! Sequential bounded-batch ingestion.
//!
//! Rows are normalized, submitted and buffered one at a time. A full buffer
//! is committed before the next row is read. The first store error halts the
//! run: nothing further is submitted and the partial buffer is dropped.

use indicatif::ProgressBar;
use shelfdb_core::{RecordSchema, SourceRow};
use shelfdb_vector::{StoreResult, VectorStore};
use std::time::Instant;
use tracing::{debug, error, info};

use crate::batch::{BatchState, IngestState};
use crate::error::IngestError;
use crate::sizing::{BatchSizer, BatchSizing};

/// Outcome of one ingest run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Rows fully submitted, including any commit they triggered.
    pub rows_submitted: usize,
    pub rows_committed: usize,
    pub batches_committed: usize,
    pub halted_at_index: Option<usize>,
    pub error: Option<IngestError>,
}

impl IngestReport {
    pub fn is_halted(&self) -> bool {
        self.halted_at_index.is_some()
    }

    pub fn state(&self) -> IngestState {
        if self.is_halted() { IngestState::Halted } else { IngestState::Completed }
    }
}

pub struct Ingestor<'a, S: VectorStore + ?Sized> {
    store: &'a S,
    schema: &'a RecordSchema,
    sizer: BatchSizer,
    progress: Option<ProgressBar>,
}

impl<'a, S: VectorStore + ?Sized> Ingestor<'a, S> {
    pub fn new(store: &'a S, schema: &'a RecordSchema, sizing: BatchSizing) -> Self {
        Self { store, schema, sizer: BatchSizer::new(sizing), progress: None }
    }

    /// Advance `bar` once per submitted row.
    pub fn with_progress(mut self, bar: ProgressBar) -> Self {
        self.progress = Some(bar);
        self
    }

    async fn commit(&mut self, state: &mut BatchState) -> StoreResult<()> {
        let started = Instant::now();
        self.store.commit_batch(&self.schema.name, &state.pending).await?;
        let elapsed = started.elapsed();
        debug!(
            collection = %self.schema.name,
            records = state.pending.len(),
            ?elapsed,
            "committed batch"
        );
        state.mark_committed();
        self.sizer.observe(elapsed);
        Ok(())
    }

    fn halt(&self, mut state: BatchState, err: IngestError) -> IngestReport {
        state.halt();
        error!(
            collection = %self.schema.name,
            index = err.index(),
            submitted = state.submitted,
            committed = state.committed,
            dropped = state.pending.len(),
            error = %err,
            "ingest halted"
        );
        if let Some(bar) = &self.progress {
            bar.abandon_with_message(format!("halted at row {}", err.index()));
        }
        state.into_report(Some(err))
    }

    pub async fn run(mut self, rows: &[SourceRow]) -> IngestReport {
        let mut state = BatchState::new(self.sizer.capacity());
        info!(collection = %self.schema.name, rows = rows.len(), capacity = self.sizer.capacity(), "ingest started");

        for (index, row) in rows.iter().enumerate() {
            let record = self.schema.normalize(row);
            if let Err(source) = self.store.submit(&self.schema.name, &record).await {
                return self.halt(state, IngestError::RecordSubmission { index, source });
            }
            state.pending.push(record);
            if state.pending.len() >= self.sizer.capacity() {
                if let Err(source) = self.commit(&mut state).await {
                    let records = state.pending.len();
                    return self.halt(state, IngestError::BatchCommit { index, records, source });
                }
            }
            state.submitted += 1;
            if let Some(bar) = &self.progress {
                bar.inc(1);
            }
        }

        if !state.pending.is_empty() {
            if let Err(source) = self.commit(&mut state).await {
                let records = state.pending.len();
                return self.halt(state, IngestError::BatchCommit { index: rows.len(), records, source });
            }
        }

        state.complete();
        info!(
            collection = %self.schema.name,
            submitted = state.submitted,
            batches = state.batches,
            "ingest completed"
        );
        if let Some(bar) = &self.progress {
            bar.finish_with_message("done");
        }
        state.into_report(None)
    }
}

/// Submit every row of `rows` into `schema.name`, committing in bounded batches.
pub async fn ingest<S: VectorStore + ?Sized>(
    store: &S,
    rows: &[SourceRow],
    schema: &RecordSchema,
    sizing: BatchSizing,
) -> IngestReport {
    Ingestor::new(store, schema, sizing).run(rows).await
}
