//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_BATCH__CAPACITY=50`). Provides
//! helpers to expand `~` and `${VAR}` and to resolve relative paths against
//! the directory the config was loaded from.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::books::{book_dataset_options, BOOK_MAX_ROWS};
use crate::dataset::{DatasetOptions, Encoding};
use crate::error::{Error, Result};
use crate::types::RecordSchema;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    /// Load from the current working directory.
    pub fn load() -> Result<Self> {
        let cwd = env::current_dir()?;
        Self::load_from(&cwd)
    }

    pub fn load_from(dir: &Path) -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment, base_dir: dir.to_path_buf() })
    }

    /// Build from an explicit figment, e.g. an inline TOML string in tests.
    pub fn from_figment(figment: Figment, base_dir: &Path) -> Self {
        Self { figment, base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Typed settings, validated.
    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub dataset: DatasetSettings,
    pub store: StoreSettings,
    pub batch: BatchSettings,
    /// Overrides the built-in book schema when present.
    pub schema: Option<RecordSchema>,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.batch.capacity == 0 {
            return Err(Error::InvalidConfig("batch.capacity must be at least 1".to_string()));
        }
        if self.batch.dynamic && self.batch.max_capacity < self.batch.capacity {
            return Err(Error::InvalidConfig(format!(
                "batch.max_capacity ({}) is below batch.capacity ({})",
                self.batch.max_capacity, self.batch.capacity
            )));
        }
        if !self.dataset.delimiter.is_ascii() {
            return Err(Error::InvalidConfig(format!("dataset.delimiter '{}' is not ASCII", self.dataset.delimiter)));
        }
        if let Some(schema) = &self.schema {
            schema.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetSettings {
    pub path: String,
    pub delimiter: char,
    pub encoding: Encoding,
    /// Zero disables truncation.
    pub max_rows: usize,
    pub drop_columns: Vec<String>,
    pub rename: BTreeMap<String, String>,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        let books = book_dataset_options();
        Self {
            path: "books.csv".to_string(),
            delimiter: char::from(books.delimiter),
            encoding: books.encoding,
            max_rows: BOOK_MAX_ROWS,
            drop_columns: books.drop_columns,
            rename: books.renames.into_iter().collect(),
        }
    }
}

impl DatasetSettings {
    pub fn options(&self) -> Result<DatasetOptions> {
        let delimiter = u8::try_from(self.delimiter)
            .map_err(|_| Error::InvalidConfig(format!("dataset.delimiter '{}' is not a single byte", self.delimiter)))?;
        Ok(DatasetOptions {
            delimiter,
            encoding: self.encoding,
            renames: self.rename.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            drop_columns: self.drop_columns.clone(),
            max_rows: (self.max_rows > 0).then_some(self.max_rows),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Lance,
    Weaviate,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: Backend,
    /// LanceDB directory or URI.
    pub uri: String,
    /// Weaviate base URL.
    pub url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Transient-failure retries before an error reaches the ingestor.
    pub retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: Backend::Lance,
            uri: "data/lancedb".to_string(),
            url: "http://localhost:8080".to_string(),
            api_key: None,
            timeout_secs: 30,
            retries: 3,
            retry_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    pub capacity: usize,
    /// Grow the capacity on sustained fast commits.
    pub dynamic: bool,
    pub max_capacity: usize,
    pub fast_commit_ms: u64,
    pub fast_streak: u32,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self { capacity: 10, dynamic: true, max_capacity: 1000, fast_commit_ms: 250, fast_streak: 3 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    // Expand env vars first
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    // Expand ~ at start
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
