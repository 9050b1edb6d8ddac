use std::env;
use std::process::ExitCode;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use shelfdb_core::books::book_schema;
use shelfdb_core::config::{resolve_with_base, Config};
use shelfdb_core::dataset::DatasetLoader;
use shelfdb_ingest::{BatchSizing, IngestReport, Pipeline};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

async fn run() -> anyhow::Result<IngestReport> {
    let config = Config::load().context("loading configuration")?;
    let settings = config.settings().context("reading settings")?;

    // Optional positional dataset path overrides dataset.path
    let dataset_arg = env::args().skip(1).find(|a| !a.starts_with('-'));
    let dataset_path = resolve_with_base(config.base_dir(), dataset_arg.as_deref().unwrap_or(&settings.dataset.path));

    let loader = DatasetLoader::new(settings.dataset.options()?);
    let dataset = loader.load_path(&dataset_path)?;
    info!(path = %dataset_path.display(), rows = dataset.rows.len(), skipped = dataset.skipped, "dataset loaded");

    let schema = settings.schema.clone().unwrap_or_else(book_schema);
    let missing = dataset.missing_columns(&schema);
    if !missing.is_empty() {
        warn!(collection = %schema.name, ?missing, "dataset lacks schema fields; they will be stored as nan");
    }

    let mut store_settings = settings.store.clone();
    store_settings.uri = resolve_with_base(config.base_dir(), &store_settings.uri).to_string_lossy().into_owned();
    let store = shelfdb_vector::connect(&store_settings).await?;
    let sizing = BatchSizing::from_settings(&settings.batch).context("batch.capacity must be positive")?;

    let bar = ProgressBar::new(dataset.rows.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} rows ({percent}%) {msg}")?
            .progress_chars("#>-"),
    );

    let report = Pipeline::new(&store, &schema).sizing(sizing).progress(bar).run(&dataset.rows).await?;
    Ok(report)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    init_tracing();
    match run().await {
        Ok(report) if report.is_halted() => {
            error!(
                halted_at = ?report.halted_at_index,
                submitted = report.rows_submitted,
                committed = report.rows_committed,
                "import halted"
            );
            ExitCode::from(2)
        }
        Ok(report) => {
            info!(
                submitted = report.rows_submitted,
                committed = report.rows_committed,
                batches = report.batches_committed,
                "import completed"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
