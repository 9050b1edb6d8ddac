//! Weaviate backend over its REST API.
//!
//! Collections map to Weaviate classes and records to objects. A commit is one
//! `POST /v1/batch/objects` request; per-object errors in the response fail
//! the whole commit.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shelfdb_core::{DataType, FieldDef, RecordSchema, TargetRecord};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::store::VectorStore;
use crate::writer::{parse_bool, parse_int, parse_number};

/// Weaviate connection configuration
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl WeaviateConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), api_key: None, timeout: Duration::from_secs(30) }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl From<&shelfdb_core::config::StoreSettings> for WeaviateConfig {
    fn from(settings: &shelfdb_core::config::StoreSettings) -> Self {
        Self {
            url: settings.url.clone(),
            api_key: settings.api_key.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct PropertyDef {
    name: String,
    #[serde(rename = "dataType")]
    data_type: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ClassDef {
    class: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    properties: Vec<PropertyDef>,
}

#[derive(Debug, Deserialize)]
struct SchemaResponse {
    #[serde(default)]
    classes: Option<Vec<ClassDef>>,
}

#[derive(Debug, Serialize)]
struct BatchObject<'a> {
    class: &'a str,
    properties: Map<String, Value>,
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    objects: Vec<BatchObject<'a>>,
}

#[derive(Debug, Deserialize)]
struct BatchItem {
    #[serde(default)]
    result: Option<BatchResult>,
}

#[derive(Debug, Deserialize)]
struct BatchResult {
    #[serde(default)]
    errors: Option<BatchErrors>,
}

#[derive(Debug, Deserialize)]
struct BatchErrors {
    #[serde(default)]
    error: Vec<BatchErrorMessage>,
}

#[derive(Debug, Deserialize)]
struct BatchErrorMessage {
    message: String,
}

fn data_type_of(names: &[String]) -> DataType {
    match names.first().map(String::as_str) {
        Some("int") => DataType::Int,
        Some("number") => DataType::Number,
        Some("boolean") => DataType::Boolean,
        _ => DataType::Text,
    }
}

impl From<&RecordSchema> for ClassDef {
    fn from(schema: &RecordSchema) -> Self {
        Self {
            class: schema.name.clone(),
            description: schema.description.clone(),
            properties: schema
                .fields
                .iter()
                .map(|f| PropertyDef {
                    name: f.name.clone(),
                    data_type: vec![f.data_type.as_str().to_string()],
                    description: f.description.clone(),
                })
                .collect(),
        }
    }
}

impl From<ClassDef> for RecordSchema {
    fn from(class: ClassDef) -> Self {
        Self {
            name: class.class,
            description: class.description,
            fields: class
                .properties
                .into_iter()
                .map(|p| FieldDef { data_type: data_type_of(&p.data_type), name: p.name, description: p.description })
                .collect(),
        }
    }
}

/// Classify a non-success HTTP status.
fn status_error(status: StatusCode, body: &str) -> StoreError {
    let msg = format!("{status}: {body}");
    match status {
        StatusCode::NOT_FOUND => StoreError::NotFound(msg),
        StatusCode::CONFLICT => StoreError::Conflict(msg),
        StatusCode::UNPROCESSABLE_ENTITY if body.contains("already") => StoreError::Conflict(msg),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::REQUEST_TIMEOUT => StoreError::Transient(msg),
        s if s.is_server_error() => StoreError::Transient(msg),
        _ => StoreError::Rejected(msg),
    }
}

fn transport_error(e: &reqwest::Error) -> StoreError {
    if e.is_connect() {
        StoreError::Connection(e.to_string())
    } else if e.is_timeout() || e.is_request() {
        StoreError::Transient(e.to_string())
    } else {
        StoreError::Rejected(e.to_string())
    }
}

/// Typed JSON value for one normalized field. Missing values become `null`
/// for non-text properties.
fn property_value(field: &FieldDef, raw: &str) -> StoreResult<Value> {
    Ok(match field.data_type {
        DataType::Text => Value::String(raw.to_string()),
        DataType::Int => parse_int(&field.name, raw)?.map_or(Value::Null, Value::from),
        DataType::Number => parse_number(&field.name, raw)?
            .and_then(serde_json::Number::from_f64)
            .map_or(Value::Null, Value::Number),
        DataType::Boolean => parse_bool(&field.name, raw)?.map_or(Value::Null, Value::Bool),
    })
}

/// Per-object error messages from a `/v1/batch/objects` response.
fn batch_errors(items: Vec<BatchItem>) -> Vec<String> {
    items
        .into_iter()
        .filter_map(|item| item.result.and_then(|r| r.errors))
        .flat_map(|e| e.error.into_iter().map(|m| m.message))
        .collect()
}

fn object_properties(schema: &RecordSchema, record: &TargetRecord) -> StoreResult<Map<String, Value>> {
    let mut props = Map::new();
    for field in &schema.fields {
        if let Some(raw) = record.get(&field.name) {
            props.insert(field.name.clone(), property_value(field, raw)?);
        }
    }
    Ok(props)
}

pub struct WeaviateStore {
    client: Client,
    config: WeaviateConfig,
    /// Class definitions seen by this client, used to type object properties.
    classes: Mutex<HashMap<String, RecordSchema>>,
}

impl WeaviateStore {
    pub fn new(config: WeaviateConfig) -> StoreResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { client, config, classes: Mutex::new(HashMap::new()) })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.endpoint(path));
        match &self.config.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> StoreResult<Response> {
        let response = builder.send().await.map_err(|e| transport_error(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }

    fn cached_class(&self, name: &str) -> Option<RecordSchema> {
        self.classes.lock().unwrap_or_else(PoisonError::into_inner).get(name).cloned()
    }

    fn remember(&self, schema: RecordSchema) {
        self.classes.lock().unwrap_or_else(PoisonError::into_inner).insert(schema.name.clone(), schema);
    }

    async fn class_schema(&self, name: &str) -> StoreResult<RecordSchema> {
        if let Some(schema) = self.cached_class(name) {
            return Ok(schema);
        }
        let response = self.send(self.request(reqwest::Method::GET, &format!("schema/{name}"))).await?;
        let class: ClassDef = response.json().await.map_err(|e| transport_error(&e))?;
        let schema = RecordSchema::from(class);
        self.remember(schema.clone());
        Ok(schema)
    }
}

#[async_trait]
impl VectorStore for WeaviateStore {
    fn backend(&self) -> &'static str {
        "weaviate"
    }

    async fn list_collections(&self) -> StoreResult<Vec<RecordSchema>> {
        let response = self.send(self.request(reqwest::Method::GET, "schema")).await?;
        let schema: SchemaResponse = response.json().await.map_err(|e| transport_error(&e))?;
        Ok(schema.classes.unwrap_or_default().into_iter().map(RecordSchema::from).collect())
    }

    async fn delete_collection(&self, name: &str) -> StoreResult<()> {
        self.send(self.request(reqwest::Method::DELETE, &format!("schema/{name}"))).await?;
        self.classes.lock().unwrap_or_else(PoisonError::into_inner).remove(name);
        Ok(())
    }

    async fn create_collection(&self, schema: &RecordSchema) -> StoreResult<()> {
        let class = ClassDef::from(schema);
        self.send(self.request(reqwest::Method::POST, "schema").json(&class)).await?;
        debug!(class = %schema.name, properties = schema.fields.len(), "created weaviate class");
        self.remember(schema.clone());
        Ok(())
    }

    async fn commit_batch(&self, collection: &str, records: &[TargetRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return Ok(());
        }
        let schema = self.class_schema(collection).await?;
        let objects = records
            .iter()
            .map(|r| Ok(BatchObject { class: collection, properties: object_properties(&schema, r)? }))
            .collect::<StoreResult<Vec<_>>>()?;
        let response = self
            .send(self.request(reqwest::Method::POST, "batch/objects").json(&BatchRequest { objects }))
            .await?;
        let items: Vec<BatchItem> = response.json().await.map_err(|e| transport_error(&e))?;
        let errors = batch_errors(items);
        if let Some(first) = errors.first() {
            return Err(StoreError::Rejected(format!("{} of {} objects failed: {first}", errors.len(), records.len())));
        }
        Ok(())
    }
}
