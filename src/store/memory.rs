//! In-memory content store
//!
//! Holds raw documents (as found in a dataset export) and answers the two
//! post queries with the same projection and filtering rules as the HTTP
//! API. Useful for offline previews from an NDJSON export.

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use super::{ContentStore, StoreError};
use crate::content::{Post, SlugDoc};

/// Document store kept in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<Vec<Value>>,
    queries: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_documents(documents: Vec<Value>) -> Self {
        Self {
            documents: RwLock::new(documents),
            queries: AtomicUsize::new(0),
        }
    }

    /// Parse a dataset export with one JSON document per line
    pub fn from_ndjson(content: &str) -> Result<Self, StoreError> {
        let mut documents = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let doc: Value = serde_json::from_str(line).map_err(|e| StoreError::Export {
                line: idx + 1,
                message: e.to_string(),
            })?;
            documents.push(doc);
        }
        Ok(Self::from_documents(documents))
    }

    /// Load an NDJSON dataset export from disk
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let content = fs::read_to_string(path.as_ref())?;
        let store = Self::from_ndjson(&content)?;
        tracing::info!(
            "Loaded {} documents from {:?}",
            store.len(),
            path.as_ref()
        );
        Ok(store)
    }

    /// Insert a document, replacing any existing document with the same `_id`
    pub fn upsert(&self, document: Value) {
        let mut docs = self.documents.write().unwrap_or_else(|e| e.into_inner());
        let id = document.get("_id").cloned();
        match docs.iter_mut().find(|d| id.is_some() && d.get("_id") == id.as_ref()) {
            Some(existing) => *existing = document,
            None => docs.push(document),
        }
    }

    /// Remove a document by id
    pub fn remove(&self, id: &str) {
        let mut docs = self.documents.write().unwrap_or_else(|e| e.into_inner());
        docs.retain(|d| str_field(d, "_id") != Some(id));
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of queries answered so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn published_posts(docs: &[Value]) -> impl Iterator<Item = &Value> {
        docs.iter()
            .filter(|d| str_field(d, "_type") == Some("post"))
            .filter(|d| !str_field(d, "_id").unwrap_or_default().starts_with("drafts."))
    }

    fn project_post(docs: &[Value], post: &Value) -> Value {
        let id = str_field(post, "_id").unwrap_or_default();

        let author = post
            .pointer("/author/_ref")
            .and_then(Value::as_str)
            .and_then(|author_id| docs.iter().find(|d| str_field(d, "_id") == Some(author_id)))
            .map(|author| {
                json!({
                    "name": author.get("name").cloned().unwrap_or(Value::Null),
                    "image": author.get("image").cloned().unwrap_or(Value::Null),
                })
            })
            .unwrap_or(Value::Null);

        let comments: Vec<Value> = docs
            .iter()
            .filter(|d| str_field(d, "_type") == Some("comment"))
            .filter(|d| d.pointer("/post/_ref").and_then(Value::as_str) == Some(id))
            .filter(|d| d.get("approved") == Some(&Value::Bool(true)))
            .cloned()
            .collect();

        let mut projected = Map::new();
        for field in ["_id", "_createdAt", "title", "description", "mainImage", "slug", "body"] {
            projected.insert(
                field.to_string(),
                post.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        projected.insert("author".to_string(), author);
        projected.insert("comments".to_string(), Value::Array(comments));
        Value::Object(projected)
    }
}

fn str_field<'a>(doc: &'a Value, field: &str) -> Option<&'a str> {
    doc.get(field).and_then(Value::as_str)
}

/// Null fields are treated as absent so serde defaults apply
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn post_slugs(&self) -> Result<Vec<SlugDoc>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let docs = self.documents.read().unwrap_or_else(|e| e.into_inner());

        Self::published_posts(&docs)
            .map(|d| {
                serde_json::from_value(strip_nulls(json!({
                    "_id": d.get("_id").cloned().unwrap_or(Value::Null),
                    "slug": d.pointer("/slug/current").map(|c| json!({ "current": c })),
                })))
                .map_err(StoreError::from)
            })
            .collect()
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, StoreError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let docs = self.documents.read().unwrap_or_else(|e| e.into_inner());

        let Some(post) = Self::published_posts(&docs)
            .find(|d| d.pointer("/slug/current").and_then(Value::as_str) == Some(slug))
        else {
            return Ok(None);
        };

        let projected = strip_nulls(Self::project_post(&docs, post));
        Ok(Some(serde_json::from_value(projected)?))
    }
}
