use shelfdb_core::TargetRecord;

use crate::error::IngestError;
use crate::ingest::IngestReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestState {
    Running,
    /// Terminal: a store error stopped the run.
    Halted,
    Completed,
}

/// Records waiting for the next commit, plus the run's counters.
#[derive(Debug)]
pub(crate) struct BatchState {
    pub pending: Vec<TargetRecord>,
    pub submitted: usize,
    pub committed: usize,
    pub batches: usize,
    pub state: IngestState,
}

impl BatchState {
    pub fn new(capacity: usize) -> Self {
        Self { pending: Vec::with_capacity(capacity), submitted: 0, committed: 0, batches: 0, state: IngestState::Running }
    }

    /// Account for a committed buffer and clear it.
    pub fn mark_committed(&mut self) {
        self.committed += self.pending.len();
        self.batches += 1;
        self.pending.clear();
    }

    pub fn halt(&mut self) {
        self.state = IngestState::Halted;
    }

    pub fn complete(&mut self) {
        self.state = IngestState::Completed;
    }

    pub fn into_report(self, error: Option<IngestError>) -> IngestReport {
        let halted_at_index = match self.state {
            IngestState::Halted => error.as_ref().map(IngestError::index),
            IngestState::Running | IngestState::Completed => None,
        };
        IngestReport {
            rows_submitted: self.submitted,
            rows_committed: self.committed,
            batches_committed: self.batches,
            halted_at_index,
            error,
        }
    }
}
