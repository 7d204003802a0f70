//! Document store holding orders, employees and the model artifact.
//!
//! Documents are schemaless JSON objects grouped into named collections and
//! addressed by id. Typed views over the order and employee collections live
//! in [`records`].

pub mod json_file;
pub mod memory;
pub mod records;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;
pub use records::{
    fetch_employees, fetch_orders, write_assignment, EmployeePatch, EmployeeRecord, OrderPatch,
    OrderRecord, EMPLOYEES_COLLECTION, ORDERS_COLLECTION,
};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("store file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("document {collection}/{id} is malformed: {reason}")]
    InvalidDocument {
        collection: String,
        id: String,
        reason: String,
    },

    #[error("write rejected: {0}")]
    WriteRejected(String),

    #[error("store lock poisoned")]
    Poisoned,
}

pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, ordered by id.
    fn list_documents(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Creates or replaces a whole document.
    fn put_document(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError>;

    /// Creates or replaces many documents of one collection as a single write.
    fn put_documents(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
    ) -> Result<(), StoreError>;

    /// Sets one top-level field on an existing document, leaving the rest as is.
    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError>;
}

/// In-memory layout shared by the store implementations:
/// collection -> id -> document.
pub type Collections = BTreeMap<String, BTreeMap<String, Value>>;

fn list_in(collections: &Collections, collection: &str) -> Vec<(String, Value)> {
    collections
        .get(collection)
        .map(|docs| docs.iter().map(|(id, doc)| (id.clone(), doc.clone())).collect())
        .unwrap_or_default()
}

fn get_in(collections: &Collections, collection: &str, id: &str) -> Option<Value> {
    collections.get(collection).and_then(|docs| docs.get(id)).cloned()
}

fn put_in(collections: &mut Collections, collection: &str, id: &str, doc: Value) {
    collections
        .entry(collection.to_string())
        .or_default()
        .insert(id.to_string(), doc);
}

fn update_in(
    collections: &mut Collections,
    collection: &str,
    id: &str,
    field: &str,
    value: Value,
) -> Result<(), StoreError> {
    let doc = collections
        .get_mut(collection)
        .and_then(|docs| docs.get_mut(id))
        .ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;

    match doc.as_object_mut() {
        Some(fields) => {
            fields.insert(field.to_string(), value);
            Ok(())
        }
        None => Err(StoreError::InvalidDocument {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: "document is not an object".to_string(),
        }),
    }
}
