//! CSV import of orders and employees into the document store.
//!
//! Imported cells are merged into existing documents; fields the CSV does not
//! carry (`assignedEmployees`, anything owned by other systems) are kept. Blank
//! cells leave the stored value alone. All rows of a file go to the store in
//! one bulk write.
//!
//! Columns are located by header name, case-insensitively, so exports with
//! extra columns or a different column order load fine:
//!
//! - orders: `id`/`order_id`, `delivery_date`/`deliveryDate`, `quantity`, `workforce`
//! - employees: `id`/`employee_id`, `name`, `rating`/`ratings`

use std::collections::BTreeMap;
use std::path::Path;

use csv::{Reader, StringRecord};
use thiserror::Error;
use tracing::{info, warn};

use serde_json::Value;

use crate::store::{
    DocumentStore, EmployeePatch, OrderPatch, StoreError, EMPLOYEES_COLLECTION,
    ORDERS_COLLECTION,
};

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column {0:?}")]
    MissingColumn(&'static str),

    #[error("line {line}: {column} must be a number, got {value:?}")]
    InvalidNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    /// Rows without an id.
    pub skipped: usize,
}

fn find_column(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_lowercase();
        names.iter().any(|n| h == *n)
    })
}

fn field<'a>(record: &'a StringRecord, col: Option<usize>) -> &'a str {
    col.and_then(|c| record.get(c)).unwrap_or("").trim()
}

fn line_of(record: &StringRecord) -> u64 {
    record.position().map(|p| p.line()).unwrap_or(0)
}

fn parse_number<T: std::str::FromStr>(
    record: &StringRecord,
    col: Option<usize>,
    column: &'static str,
) -> Result<Option<T>, ImportError> {
    let raw = field(record, col);
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|_| ImportError::InvalidNumber {
        line: line_of(record),
        column,
        value: raw.to_string(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Documents merged so far, keyed by id. A repeated id merges over the
/// earlier row rather than the stored document.
struct PendingWrites<'a> {
    store: &'a dyn DocumentStore,
    collection: &'static str,
    docs: BTreeMap<String, Value>,
}

impl<'a> PendingWrites<'a> {
    fn new(store: &'a dyn DocumentStore, collection: &'static str) -> Self {
        Self {
            store,
            collection,
            docs: BTreeMap::new(),
        }
    }

    fn merge(
        &mut self,
        id: &str,
        apply: impl FnOnce(Option<Value>) -> Value,
    ) -> Result<(), StoreError> {
        let existing = match self.docs.remove(id) {
            Some(doc) => Some(doc),
            None => self.store.get_document(self.collection, id)?,
        };
        self.docs.insert(id.to_string(), apply(existing));
        Ok(())
    }

    fn flush(self) -> Result<(), StoreError> {
        if self.docs.is_empty() {
            return Ok(());
        }
        self.store
            .put_documents(self.collection, self.docs.into_iter().collect())
    }
}

/// Loads orders from a CSV file and merges them into the store.
pub fn import_orders<P: AsRef<Path>>(
    store: &dyn DocumentStore,
    csv_path: P,
) -> Result<ImportSummary, ImportError> {
    let mut reader = Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let id_col = find_column(&headers, &["id", "order_id", "orderid"])
        .ok_or(ImportError::MissingColumn("id"))?;
    let date_col = find_column(&headers, &["delivery_date", "deliverydate"]);
    let quantity_col = find_column(&headers, &["quantity"]);
    let workforce_col = find_column(&headers, &["workforce"]);

    let mut pending = PendingWrites::new(store, ORDERS_COLLECTION);
    let mut summary = ImportSummary::default();
    for result in reader.records() {
        let record = result?;
        let id = field(&record, Some(id_col));
        if id.is_empty() {
            warn!(line = line_of(&record), "skipping order row without id");
            summary.skipped += 1;
            continue;
        }

        let patch = OrderPatch {
            delivery_date: non_empty(field(&record, date_col)),
            quantity: parse_number(&record, quantity_col, "quantity")?,
            workforce: parse_number(&record, workforce_col, "workforce")?,
        };
        pending.merge(id, |existing| patch.apply(existing))?;
        summary.imported += 1;
    }
    pending.flush()?;

    info!(imported = summary.imported, skipped = summary.skipped, "orders imported");
    Ok(summary)
}

/// Loads employees from a CSV file and merges them into the store.
pub fn import_employees<P: AsRef<Path>>(
    store: &dyn DocumentStore,
    csv_path: P,
) -> Result<ImportSummary, ImportError> {
    let mut reader = Reader::from_path(csv_path)?;
    let headers = reader.headers()?.clone();

    let id_col = find_column(&headers, &["id", "employee_id", "employeeid"])
        .ok_or(ImportError::MissingColumn("id"))?;
    let name_col = find_column(&headers, &["name"]);
    let rating_col = find_column(&headers, &["rating", "ratings"]);

    let mut pending = PendingWrites::new(store, EMPLOYEES_COLLECTION);
    let mut summary = ImportSummary::default();
    for result in reader.records() {
        let record = result?;
        let id = field(&record, Some(id_col));
        if id.is_empty() {
            warn!(line = line_of(&record), "skipping employee row without id");
            summary.skipped += 1;
            continue;
        }

        let patch = EmployeePatch {
            name: non_empty(field(&record, name_col)),
            rating: parse_number(&record, rating_col, "rating")?,
        };
        pending.merge(id, |existing| patch.apply(existing))?;
        summary.imported += 1;
    }
    pending.flush()?;

    info!(imported = summary.imported, skipped = summary.skipped, "employees imported");
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{
        fetch_employees, fetch_orders, write_assignment, MemoryStore, OrderRecord,
    };
    use serde_json::json;
    use std::fs;

    #[test]
    fn orders_with_defaults_and_blank_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(
            &path,
            "Order_ID,Quantity,Delivery_Date,Workforce,notes\n\
             O1,5,2026-10-19,2,rush\n\
             O2,,,3,\n\
             ,4,2026-10-20,1,no id\n",
        )
        .unwrap();

        let store = MemoryStore::new();
        let summary = import_orders(&store, &path).unwrap();
        assert_eq!(summary, ImportSummary { imported: 2, skipped: 1 });

        let orders = fetch_orders(&store).unwrap();
        assert_eq!(orders[0], OrderRecord::new("O1", Some("2026-10-19"), 5, 2));
        assert_eq!(orders[1], OrderRecord::new("O2", None, 1, 3));
    }

    #[test]
    fn bad_number_reports_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "id,quantity\nO1,many\n").unwrap();

        let err = import_orders(&MemoryStore::new(), &path).unwrap_err();
        match err {
            ImportError::InvalidNumber { line, column, .. } => {
                assert_eq!(line, 2);
                assert_eq!(column, "quantity");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn employees_sorted_after_import() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("employees.csv");
        fs::write(&path, "id,name,ratings\nE1,Ada,4.5\nE2,Bo,\nE3,Cy,8\n").unwrap();

        let store = MemoryStore::new();
        import_employees(&store, &path).unwrap();

        let roster = fetch_employees(&store).unwrap();
        let ids: Vec<&str> = roster.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["E3", "E1", "E2"]);
        assert_eq!(roster[2].rating, 0.0);
        assert_eq!(roster[1].name, "Ada");
    }

    #[test]
    fn id_column_is_required() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("employees.csv");
        fs::write(&path, "name,rating\nAda,3\n").unwrap();
        assert!(matches!(
            import_employees(&MemoryStore::new(), &path),
            Err(ImportError::MissingColumn("id"))
        ));
    }

    #[test]
    fn reimport_keeps_assignment_and_foreign_fields() {
        let store = MemoryStore::new();
        store
            .put_document(
                ORDERS_COLLECTION,
                "O1",
                json!({
                    "customerDetails": { "deliveryDate": "2026-10-01", "name": "ACME" },
                    "status": "open",
                    "quantity": 2,
                }),
            )
            .unwrap();
        write_assignment(&store, "O1", &["E1".to_string()]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "id,delivery_date,quantity,workforce\nO1,2026-10-19,5,\n").unwrap();
        import_orders(&store, &path).unwrap();

        let doc = store.get_document(ORDERS_COLLECTION, "O1").unwrap().unwrap();
        assert_eq!(
            doc,
            json!({
                "customerDetails": { "deliveryDate": "2026-10-19", "name": "ACME" },
                "status": "open",
                "quantity": 5,
                "assignedEmployees": ["E1"],
            })
        );
    }

    #[test]
    fn repeated_id_merges_rows_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("employees.csv");
        fs::write(&path, "id,name,rating\nE1,Ada,3\nE1,,6\n").unwrap();

        let store = MemoryStore::new();
        let summary = import_employees(&store, &path).unwrap();
        assert_eq!(summary.imported, 2);

        let doc = store.get_document(EMPLOYEES_COLLECTION, "E1").unwrap().unwrap();
        assert_eq!(doc, json!({ "name": "Ada", "ratings": 6.0 }));
    }

    #[test]
    fn bad_row_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("orders.csv");
        fs::write(&path, "id,quantity\nO1,3\nO2,many\n").unwrap();

        let store = MemoryStore::new();
        assert!(import_orders(&store, &path).is_err());
        assert!(store.list_documents(ORDERS_COLLECTION).unwrap().is_empty());
    }
}
