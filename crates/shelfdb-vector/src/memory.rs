//! In-process store that records every call.
//!
//! Used for dry runs and as the test double for the ingestion pipeline:
//! faults can be injected per submission or per commit, the whole store can
//! be made unreachable, and names can be reserved so creation conflicts.

use async_trait::async_trait;
use shelfdb_core::{RecordSchema, TargetRecord};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{StoreError, StoreResult};
use crate::store::VectorStore;

/// One successful `commit_batch` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitCall {
    pub collection: String,
    pub records: Vec<TargetRecord>,
}

#[derive(Debug, Default)]
struct Faults {
    unreachable: bool,
    reserved: HashSet<String>,
    /// Keyed by 0-based submission attempt.
    submissions: HashMap<usize, StoreError>,
    /// Keyed by 0-based commit attempt.
    commits: HashMap<usize, StoreError>,
    /// The next N calls of any kind fail with a transient error.
    transient: usize,
}

#[derive(Debug, Default)]
struct State {
    collections: Vec<RecordSchema>,
    records: HashMap<String, Vec<TargetRecord>>,
    commits: Vec<CommitCall>,
    submit_attempts: usize,
    commit_attempts: usize,
    faults: Faults,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seed an existing collection (and optionally records) without going through the trait.
    pub fn with_collection(self, schema: RecordSchema, records: Vec<TargetRecord>) -> Self {
        {
            let mut state = self.lock();
            state.records.insert(schema.name.clone(), records);
            state.collections.push(schema);
        }
        self
    }

    // ===== Fault injection =====

    /// Every call fails with [`StoreError::Connection`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.lock().faults.unreachable = unreachable;
    }

    /// `create_collection` for `name` fails with a conflict even after deletion.
    pub fn reserve_name(&self, name: &str) {
        self.lock().faults.reserved.insert(name.to_string());
    }

    pub fn fail_submission(&self, attempt: usize, error: StoreError) {
        self.lock().faults.submissions.insert(attempt, error);
    }

    pub fn fail_commit(&self, attempt: usize, error: StoreError) {
        self.lock().faults.commits.insert(attempt, error);
    }

    pub fn fail_transiently(&self, calls: usize) {
        self.lock().faults.transient = calls;
    }

    // ===== Inspection =====

    pub fn collections(&self) -> Vec<RecordSchema> {
        self.lock().collections.clone()
    }

    pub fn records(&self, collection: &str) -> Vec<TargetRecord> {
        self.lock().records.get(collection).cloned().unwrap_or_default()
    }

    pub fn commits(&self) -> Vec<CommitCall> {
        self.lock().commits.clone()
    }

    pub fn commit_sizes(&self) -> Vec<usize> {
        self.lock().commits.iter().map(|c| c.records.len()).collect()
    }

    pub fn submit_attempts(&self) -> usize {
        self.lock().submit_attempts
    }
}

impl State {
    fn check_reachable(&mut self) -> StoreResult<()> {
        if self.faults.unreachable {
            return Err(StoreError::Connection("memory store marked unreachable".to_string()));
        }
        if self.faults.transient > 0 {
            self.faults.transient -= 1;
            return Err(StoreError::Transient("injected transient failure".to_string()));
        }
        Ok(())
    }

    fn has_collection(&self, name: &str) -> bool {
        self.collections.iter().any(|c| c.name == name)
    }
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn list_collections(&self) -> StoreResult<Vec<RecordSchema>> {
        let mut state = self.lock();
        state.check_reachable()?;
        Ok(state.collections.clone())
    }

    async fn delete_collection(&self, name: &str) -> StoreResult<()> {
        let mut state = self.lock();
        state.check_reachable()?;
        if !state.has_collection(name) {
            return Err(StoreError::NotFound(name.to_string()));
        }
        state.collections.retain(|c| c.name != name);
        state.records.remove(name);
        Ok(())
    }

    async fn create_collection(&self, schema: &RecordSchema) -> StoreResult<()> {
        let mut state = self.lock();
        state.check_reachable()?;
        if state.faults.reserved.contains(&schema.name) {
            return Err(StoreError::Conflict(format!("name '{}' is reserved", schema.name)));
        }
        if state.has_collection(&schema.name) {
            return Err(StoreError::Conflict(format!("collection '{}' already exists", schema.name)));
        }
        state.collections.push(schema.clone());
        state.records.insert(schema.name.clone(), Vec::new());
        Ok(())
    }

    async fn submit(&self, collection: &str, _record: &TargetRecord) -> StoreResult<()> {
        let mut state = self.lock();
        state.check_reachable()?;
        let attempt = state.submit_attempts;
        state.submit_attempts += 1;
        if let Some(err) = state.faults.submissions.remove(&attempt) {
            return Err(err);
        }
        if !state.has_collection(collection) {
            return Err(StoreError::NotFound(collection.to_string()));
        }
        Ok(())
    }

    async fn commit_batch(&self, collection: &str, records: &[TargetRecord]) -> StoreResult<()> {
        let mut state = self.lock();
        state.check_reachable()?;
        let attempt = state.commit_attempts;
        state.commit_attempts += 1;
        if let Some(err) = state.faults.commits.remove(&attempt) {
            return Err(err);
        }
        let Some(stored) = state.records.get_mut(collection) else {
            return Err(StoreError::NotFound(collection.to_string()));
        };
        stored.extend_from_slice(records);
        state.commits.push(CommitCall { collection: collection.to_string(), records: records.to_vec() });
        Ok(())
    }
}
