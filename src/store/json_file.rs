use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_json::Value;
use tracing::{debug, info};

use super::{get_in, list_in, put_in, update_in, Collections, DocumentStore, StoreError};

/// Store backed by a single JSON file of the form
/// `{ "<collection>": { "<id>": { ...document... } } }`.
///
/// The whole file is loaded on open and rewritten after every change
/// (temp file + rename).
pub struct JsonFileStore {
    path: PathBuf,
    collections: Mutex<Collections>,
}

impl JsonFileStore {
    /// Opens the store. A missing file is treated as an empty store and is
    /// created on the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let collections = if path.exists() {
            let text = fs::read_to_string(&path)?;
            if text.trim().is_empty() {
                Collections::new()
            } else {
                serde_json::from_str(&text)?
            }
        } else {
            Collections::new()
        };

        info!(
            path = %path.display(),
            collections = collections.len(),
            "document store opened"
        );
        Ok(Self {
            path,
            collections: Mutex::new(collections),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, collections: &Collections) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(collections)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "document store written");
        Ok(())
    }
}

impl DocumentStore for JsonFileStore {
    fn list_documents(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(list_in(&collections, collection))
    }

    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(get_in(&collections, collection, id))
    }

    fn put_document(&self, collection: &str, id: &str, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        put_in(&mut collections, collection, id, doc);
        self.persist(&collections)
    }

    fn put_documents(
        &self,
        collection: &str,
        docs: Vec<(String, Value)>,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        let count = docs.len();
        for (id, doc) in docs {
            put_in(&mut collections, collection, &id, doc);
        }
        debug!(collection, count, "bulk put");
        self.persist(&collections)
    }

    fn update_field(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().map_err(|_| StoreError::Poisoned)?;
        update_in(&mut collections, collection, id, field, value)?;
        self.persist(&collections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("store.json")).unwrap();
        assert!(store.list_documents("orders").unwrap().is_empty());
    }

    #[test]
    fn writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        store
            .put_document("orders", "O1", json!({ "quantity": 3 }))
            .unwrap();
        store
            .update_field("orders", "O1", "assignedEmployees", json!(["E1", "E2"]))
            .unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        let doc = reopened.get_document("orders", "O1").unwrap().unwrap();
        assert_eq!(doc["assignedEmployees"], json!(["E1", "E2"]));
        assert_eq!(doc["quantity"], json!(3));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Json(_))));
    }

    #[test]
    fn bulk_put_is_one_durable_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = JsonFileStore::open(&path).unwrap();
        let docs = (1..=3)
            .map(|n| (format!("O{n}"), json!({ "quantity": n })))
            .collect();
        store.put_documents("orders", docs).unwrap();
        drop(store);

        assert!(!path.with_extension("json.tmp").exists());
        let reopened = JsonFileStore::open(&path).unwrap();
        let ids: Vec<String> = reopened
            .list_documents("orders")
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["O1", "O2", "O3"]);
    }
}
