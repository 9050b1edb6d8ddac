use std::num::NonZeroUsize;
use std::time::Duration;

use shelfdb_core::books::{book_dataset_options, book_schema};
use shelfdb_core::dataset::DatasetLoader;
use shelfdb_core::{DataType, RecordSchema, SourceRow};
use shelfdb_ingest::{
    ingest, reconcile, BatchSizing, IngestError, IngestState, Pipeline, PipelineError, SchemaError,
};
use shelfdb_vector::{MemoryStore, RetryPolicy, Retrying, StoreError, VectorStore};

fn nz(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).expect("non-zero")
}

fn title_schema() -> RecordSchema {
    RecordSchema::new("Book", "titles")
        .with_field("book_title", DataType::Text, "")
        .with_field("book_author", DataType::Text, "")
}

fn rows(n: usize) -> Vec<SourceRow> {
    (0..n)
        .map(|i| SourceRow::new().with("book_title", format!("Title {i}")).with("book_author", format!("Author {i}")))
        .collect()
}

async fn ready_store(schema: &RecordSchema) -> MemoryStore {
    let store = MemoryStore::new();
    reconcile(&store, schema).await.expect("reconcile");
    store
}

#[tokio::test]
async fn reconcile_twice_leaves_one_collection() {
    let store = MemoryStore::new();
    reconcile(&store, &book_schema()).await.expect("first");
    reconcile(&store, &book_schema()).await.expect("second");
    assert_eq!(store.collections(), vec![book_schema()]);
}

#[tokio::test]
async fn reconcile_drops_previous_records() {
    let schema = title_schema();
    let seeded = vec![schema.normalize(&SourceRow::new().with("book_title", "Old"))];
    let store = MemoryStore::new().with_collection(schema.clone(), seeded);
    reconcile(&store, &schema).await.expect("reconcile");
    assert!(store.records("Book").is_empty());
}

#[tokio::test]
async fn reconcile_reports_unreachable_store() {
    let store = MemoryStore::new();
    store.set_unreachable(true);
    let err = reconcile(&store, &book_schema()).await.expect_err("unreachable");
    assert!(matches!(err, SchemaError::Connection(StoreError::Connection(_))));
}

#[tokio::test]
async fn reconcile_reports_reserved_name_as_conflict() {
    let store = MemoryStore::new();
    store.reserve_name("Book");
    let err = reconcile(&store, &book_schema()).await.expect_err("reserved");
    assert!(matches!(err, SchemaError::Conflict { ref collection, .. } if collection == "Book"));
}

#[tokio::test]
async fn twenty_five_rows_commit_as_ten_ten_five() {
    let schema = title_schema();
    let store = ready_store(&schema).await;
    let report = ingest(&store, &rows(25), &schema, BatchSizing::fixed(nz(10))).await;

    assert_eq!(report.state(), IngestState::Completed);
    assert_eq!(report.rows_submitted, 25);
    assert_eq!(report.rows_committed, 25);
    assert_eq!(report.batches_committed, 3);
    assert_eq!(store.commit_sizes(), vec![10, 10, 5]);

    let stored = store.records("Book");
    assert_eq!(stored[24].get("book_title"), Some("title 24"));
    assert!(stored.iter().flat_map(|r| r.iter()).all(|(_, v)| v == v.to_lowercase()));
}

#[tokio::test]
async fn batch_boundaries() {
    let schema = title_schema();
    for (n, k, expected) in [(0, 10, vec![]), (20, 10, vec![10, 10]), (7, 3, vec![3, 3, 1]), (1, 1, vec![1])] {
        let store = ready_store(&schema).await;
        let report = ingest(&store, &rows(n), &schema, BatchSizing::fixed(nz(k))).await;
        assert_eq!(report.rows_submitted, n);
        assert_eq!(store.commit_sizes(), expected, "n={n} k={k}");
    }
}

#[tokio::test]
async fn dune_scenario() {
    let schema = title_schema();
    let store = ready_store(&schema).await;
    let row = SourceRow::new().with("book_title", "Dune").with("book_author", "Herbert");
    let report = ingest(&store, &[row], &schema, BatchSizing::default()).await;

    assert_eq!(report.rows_submitted, 1);
    let commits = store.commits();
    assert_eq!(commits.len(), 1);
    let record = &commits[0].records[0];
    assert_eq!(record.iter().collect::<Vec<_>>(), vec![("book_title", "dune"), ("book_author", "herbert")]);
}

#[tokio::test]
async fn missing_field_becomes_nan() {
    let store = ready_store(&book_schema()).await;
    let row = SourceRow::new().with("book_title", "Emma");
    ingest(&store, &[row], &book_schema(), BatchSizing::default()).await;
    let stored = store.records("Book");
    assert_eq!(stored[0].get("publisher"), Some("nan"));
    assert_eq!(stored[0].len(), 4);
}

#[tokio::test]
async fn submission_error_halts_at_row() {
    let schema = title_schema();
    let store = ready_store(&schema).await;
    store.fail_submission(13, StoreError::Rejected("bad object".into()));
    let report = ingest(&store, &rows(25), &schema, BatchSizing::fixed(nz(10))).await;

    assert_eq!(report.state(), IngestState::Halted);
    assert_eq!(report.halted_at_index, Some(13));
    assert_eq!(report.rows_submitted, 13);
    assert_eq!(report.rows_committed, 10);
    assert!(matches!(report.error, Some(IngestError::RecordSubmission { index: 13, .. })));
    assert_eq!(store.commit_sizes(), vec![10], "partial buffer is not flushed");
    assert_eq!(store.submit_attempts(), 14, "no submission after the halt");
}

#[tokio::test]
async fn commit_error_halts_at_triggering_row() {
    let schema = title_schema();
    let store = ready_store(&schema).await;
    store.fail_commit(1, StoreError::Rejected("batch refused".into()));
    let report = ingest(&store, &rows(25), &schema, BatchSizing::fixed(nz(10))).await;

    assert_eq!(report.halted_at_index, Some(19));
    assert_eq!(report.rows_submitted, 19);
    assert_eq!(report.batches_committed, 1);
    assert_eq!(
        report.error,
        Some(IngestError::BatchCommit { index: 19, records: 10, source: StoreError::Rejected("batch refused".into()) })
    );
    assert_eq!(store.submit_attempts(), 20);
    assert_eq!(store.commit_sizes(), vec![10]);
}

#[tokio::test]
async fn failed_final_flush_halts_past_last_row() {
    let schema = title_schema();
    let store = ready_store(&schema).await;
    store.fail_commit(2, StoreError::Rejected("flush refused".into()));
    let report = ingest(&store, &rows(25), &schema, BatchSizing::fixed(nz(10))).await;

    assert_eq!(report.halted_at_index, Some(25));
    assert_eq!(report.rows_submitted, 25);
    assert_eq!(report.rows_committed, 20);
    assert!(matches!(report.error, Some(IngestError::BatchCommit { index: 25, records: 5, .. })));
}

#[tokio::test]
async fn transient_failures_within_bound_are_invisible() {
    let schema = title_schema();
    let store = Retrying::new(MemoryStore::new(), RetryPolicy::immediate(3));
    reconcile(&store, &schema).await.expect("reconcile");
    store.inner().fail_transiently(3);

    let report = ingest(&store, &rows(5), &schema, BatchSizing::fixed(nz(10))).await;
    assert_eq!(report.state(), IngestState::Completed);
    assert_eq!(report.rows_submitted, 5);
    assert_eq!(store.inner().commit_sizes(), vec![5]);
}

#[tokio::test]
async fn transient_failures_beyond_bound_halt() {
    let schema = title_schema();
    let store = Retrying::new(MemoryStore::new(), RetryPolicy::immediate(3));
    reconcile(&store, &schema).await.expect("reconcile");
    store.inner().fail_transiently(4);

    let report = ingest(&store, &rows(5), &schema, BatchSizing::fixed(nz(10))).await;
    assert_eq!(report.halted_at_index, Some(0));
    assert_eq!(report.rows_submitted, 0);
    assert!(report.error.as_ref().is_some_and(|e| e.store_error().is_transient()));
    assert!(store.inner().commits().is_empty());
}

#[tokio::test]
async fn adaptive_capacity_grows_to_cap() {
    let schema = title_schema();
    let store = ready_store(&schema).await;
    let sizing = BatchSizing::adaptive(nz(2), nz(5), Duration::from_secs(3600), 1);
    let report = ingest(&store, &rows(20), &schema, sizing).await;

    assert_eq!(report.rows_submitted, 20);
    assert_eq!(store.commit_sizes(), vec![2, 4, 5, 5, 4]);
}

#[tokio::test]
async fn pipeline_reconciles_then_ingests() {
    let schema = title_schema();
    let store = MemoryStore::new().with_collection(schema.clone(), vec![schema.normalize(&SourceRow::new())]);
    let report = Pipeline::new(&store, &schema)
        .sizing(BatchSizing::fixed(nz(4)))
        .run(&rows(6))
        .await
        .expect("pipeline");

    assert!(!report.is_halted());
    assert_eq!(store.records("Book").len(), 6);
    assert_eq!(store.commit_sizes(), vec![4, 2]);
}

#[tokio::test]
async fn pipeline_stops_on_schema_conflict() {
    let store = MemoryStore::new();
    store.reserve_name("Book");
    let result = Pipeline::new(&store, &book_schema()).run(&rows(3)).await;
    assert!(matches!(result, Err(PipelineError::Schema(SchemaError::Conflict { .. }))));
    assert_eq!(store.submit_attempts(), 0);
}

#[tokio::test]
async fn book_export_loads_end_to_end() {
    let csv = "\"ISBN\";\"Book-Title\";\"Book-Author\";\"Year-Of-Publication\";\"Publisher\";\"Image-URL-S\";\"Image-URL-M\";\"Image-URL-L\"\n\
               \"0441172717\";\"Dune\";\"Frank Herbert\";\"1965\";\"Ace\";\"s\";\"m\";\"l\"\n\
               \"0141439513\";\"Emma\";\"Jane Austen\";\"\";\"Penguin\";\"s\";\"m\";\"l\"\n";
    let dataset = DatasetLoader::new(book_dataset_options()).load_reader(csv.as_bytes()).expect("load");
    let store = MemoryStore::new();
    let report = Pipeline::new(&store, &book_schema()).run(&dataset.rows).await.expect("pipeline");

    assert_eq!(report.rows_submitted, 2);
    let stored = store.records("Book");
    assert_eq!(stored[0].get("book_author"), Some("frank herbert"));
    assert_eq!(stored[0].get("year_of_publication"), Some("1965.0"));
    assert_eq!(stored[1].get("year_of_publication"), Some("nan"));
    assert!(store.list_collections().await.expect("list").iter().any(|c| c.name == "Book"));
}
