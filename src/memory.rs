// In-memory document store module
// Keeps JSON documents keyed by `id` and exposes them as service operations

use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{ServiceError, ServiceResult};
use crate::methods::ServiceMethods;
use crate::pk::PkConfig;
use crate::request::Query;

/// Field holding a document's identifier
pub const ID_FIELD: &str = "id";

/// A named collection of JSON objects
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    documents: RwLock<BTreeMap<String, Map<String, Value>>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Documents whose fields equal every query filter
    pub async fn find(&self, query: &Query) -> Vec<Value> {
        let documents = self.documents.read().await;
        documents
            .values()
            .filter(|doc| matches_query(doc, query))
            .cloned()
            .map(Value::Object)
            .collect()
    }

    /// Insert a document, generating an `id` when the body has none
    pub async fn create(&self, body: Value) -> ServiceResult<Value> {
        let mut doc = into_object(body)?;
        let id = match doc.get(ID_FIELD).map(stringify) {
            Some(id) if !id.is_empty() => id,
            _ => uuid::Uuid::new_v4().to_string(),
        };
        doc.insert(ID_FIELD.to_string(), Value::String(id.clone()));

        let mut documents = self.documents.write().await;
        if documents.contains_key(&id) {
            return Err(ServiceError::bad_request(format!(
                "Document '{id}' already exists"
            )));
        }
        documents.insert(id, doc.clone());
        Ok(Value::Object(doc))
    }

    /// The document with `id`, or `None`
    pub async fn get(&self, id: &str) -> Option<Value> {
        self.documents
            .read()
            .await
            .get(id)
            .cloned()
            .map(Value::Object)
    }

    /// Replace the document with `id`; the `id` field is preserved
    pub async fn update(&self, id: &str, body: Value) -> ServiceResult<Value> {
        let mut doc = into_object(body)?;
        doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));

        let mut documents = self.documents.write().await;
        let slot = documents.get_mut(id).ok_or(ServiceError::NotFound)?;
        *slot = doc.clone();
        Ok(Value::Object(doc))
    }

    /// Merge the top-level fields of `body` into the document with `id`
    pub async fn patch(&self, id: &str, body: Value) -> ServiceResult<Value> {
        let changes = into_object(body)?;

        let mut documents = self.documents.write().await;
        let doc = documents.get_mut(id).ok_or(ServiceError::NotFound)?;
        for (key, value) in changes {
            if key != ID_FIELD {
                doc.insert(key, value);
            }
        }
        Ok(Value::Object(doc.clone()))
    }

    /// Delete the document with `id`
    pub async fn remove(&self, id: &str) -> ServiceResult<Value> {
        let removed = self
            .documents
            .write()
            .await
            .remove(id)
            .ok_or(ServiceError::NotFound)?;
        Ok(json!({ "success": true, "data": removed }))
    }

    /// All six operations bound to this store, keyed by `id`/`pk`
    pub fn methods(self: &Arc<Self>) -> ServiceMethods {
        self.methods_with_pk(&PkConfig::default())
    }

    /// All six operations bound to this store
    ///
    /// The query keys that carry the primary key under `pk` are never used as
    /// `find` filters.
    pub fn methods_with_pk(self: &Arc<Self>, pk: &PkConfig) -> ServiceMethods {
        let pk_keys: Arc<[String]> = pk.keys().into_iter().map(String::from).collect();
        let find = Arc::clone(self);
        let create = Arc::clone(self);
        let get = Arc::clone(self);
        let update = Arc::clone(self);
        let patch = Arc::clone(self);
        let remove = Arc::clone(self);

        ServiceMethods::new()
            .find(move |mut query: Query| {
                let store = Arc::clone(&find);
                for key in pk_keys.iter() {
                    query.remove(key);
                }
                async move { ServiceResult::Ok(store.find(&query).await) }
            })
            .create(move |body| {
                let store = Arc::clone(&create);
                async move { store.create(body).await }
            })
            .get(move |id, _| {
                let store = Arc::clone(&get);
                async move { ServiceResult::Ok(store.get(&id).await) }
            })
            .update(move |id, body, _| {
                let store = Arc::clone(&update);
                async move { store.update(&id, body).await }
            })
            .patch(move |id, body, _| {
                let store = Arc::clone(&patch);
                async move { store.patch(&id, body).await }
            })
            .remove(move |id| {
                let store = Arc::clone(&remove);
                async move { store.remove(&id).await }
            })
    }
}

fn into_object(body: Value) -> ServiceResult<Map<String, Value>> {
    match body {
        Value::Object(map) => Ok(map),
        _ => Err(ServiceError::bad_request("Document must be a JSON object")),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Empty filter values match every document
fn matches_query(doc: &Map<String, Value>, query: &Query) -> bool {
    query.iter().all(|(key, expected)| {
        let Some(expected) = expected.first().filter(|v| !v.is_empty()) else {
            return true;
        };
        doc.get(key).is_some_and(|actual| stringify(actual) == expected)
    })
}
