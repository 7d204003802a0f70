use std::sync::Mutex;

use serde_json::Value;

use super::{get_in, list_in, put_in, update_in, Collections, DocumentStore, StoreError};

#[derive(Default)]
struct Inner {
    collections: Collections,
    writes: usize,
    fail_writes_after: Option<usize>,
}

/// Non-persistent store, mostly for tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every field update after `n` successful ones.
    pub fn fail_writes_after(&self, n: usize) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.fail_writes_after = Some(n);
        }
    }
}

impl DocumentStore for MemoryStore {
    fn list_documents(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(list_in(&inner.collections, collection))
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(get_in(&inner.collections, collection, id))
    }

    fn put_document(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        put_in(&mut inner.collections, collection, id, doc);
        Ok(())
    }

    fn put_documents(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        for (id, doc) in docs {
            put_in(&mut inner.collections, collection, &id, doc);
        }
        Ok(())
    }

    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::Poisoned)?;
        if let Some(limit) = inner.fail_writes_after {
            if inner.writes >= limit {
                return Err(StoreError::WriteRejected(format!("{collection}/{id}")));
            }
        }
        update_in(&mut inner.collections, collection, id, field, value)?;
        inner.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn update_merges_into_existing_document() {
        let store = MemoryStore::new();
        store.put_document("orders", "O1", json!({ "quantity": 4 })).unwrap();
        store
            .update_field("orders", "O1", "assignedEmployees", json!(["E1"]))
            .unwrap();

        let doc = store.get_document("orders", "O1").unwrap().unwrap();
        assert_eq!(doc, json!({ "quantity": 4, "assignedEmployees": ["E1"] }));
    }

    #[test]
    fn update_of_missing_document_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_field("orders", "nope", "assignedEmployees", json!([]))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn listing_is_ordered_by_id() {
        let store = MemoryStore::new();
        store.put_document("employees", "b", json!({})).unwrap();
        store.put_document("employees", "a", json!({})).unwrap();
        let ids: Vec<String> = store
            .list_documents("employees")
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(store.list_documents("missing").unwrap().is_empty());
    }

    #[test]
    fn injected_write_failure() {
        let store = MemoryStore::new();
        store.put_document("orders", "O1", json!({})).unwrap();
        store.put_document("orders", "O2", json!({})).unwrap();
        store.fail_writes_after(1);

        store.update_field("orders", "O1", "x", json!(1)).unwrap();
        let err = store.update_field("orders", "O2", "x", json!(1)).unwrap_err();
        assert!(matches!(err, StoreError::WriteRejected(_)));
    }
}
