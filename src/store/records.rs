use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::{DocumentStore, StoreError};

pub const ORDERS_COLLECTION: &str = "orders";
pub const EMPLOYEES_COLLECTION: &str = "employees";
pub const ASSIGNED_EMPLOYEES_FIELD: &str = "assignedEmployees";

pub const DEFAULT_QUANTITY: i64 = 1;
pub const DEFAULT_WORKFORCE: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
}

/// Order document fields read by the scheduler. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    customer_details: Option<CustomerDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quantity: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    workforce: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRecord {
    pub id: String,
    /// Raw `customerDetails.deliveryDate`; parsed by the feature builder.
    pub delivery_date: Option<String>,
    pub quantity: i64,
    pub workforce: i64,
}

impl OrderRecord {
    pub fn new(
        id: impl Into<String>,
        delivery_date: Option<&str>,
        quantity: i64,
        workforce: i64,
    ) -> Self {
        Self {
            id: id.into(),
            delivery_date: delivery_date.map(str::to_string),
            quantity,
            workforce,
        }
    }

    pub fn from_document(id: &str, doc: &Value) -> Result<Self, StoreError> {
        let parsed: OrderDocument =
            serde_json::from_value(doc.clone()).map_err(|e| StoreError::InvalidDocument {
                collection: ORDERS_COLLECTION.to_string(),
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id: id.to_string(),
            delivery_date: parsed
                .customer_details
                .and_then(|c| c.delivery_date)
                .filter(|d| !d.trim().is_empty()),
            quantity: parsed.quantity.unwrap_or(DEFAULT_QUANTITY),
            workforce: parsed.workforce.unwrap_or(DEFAULT_WORKFORCE),
        })
    }

    pub fn to_document(&self) -> Value {
        let doc = OrderDocument {
            customer_details: Some(CustomerDetails {
                delivery_date: self.delivery_date.clone(),
            }),
            quantity: Some(self.quantity),
            workforce: Some(self.workforce),
        };
        serde_json::to_value(doc).unwrap_or_else(|_| json!({}))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct EmployeeDocument {
    #[serde(default)]
    name: String,
    #[serde(default)]
    ratings: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeRecord {
    pub id: String,
    pub name: String,
    pub rating: f64,
}

impl EmployeeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, rating: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            rating,
        }
    }

    pub fn from_document(id: &str, doc: &Value) -> Result<Self, StoreError> {
        let parsed: EmployeeDocument =
            serde_json::from_value(doc.clone()).map_err(|e| StoreError::InvalidDocument {
                collection: EMPLOYEES_COLLECTION.to_string(),
                id: id.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            id: id.to_string(),
            name: parsed.name,
            rating: parsed.ratings,
        })
    }

    pub fn to_document(&self) -> Value {
        json!({ "name": self.name, "ratings": self.rating })
    }
}

fn into_fields(existing: Option<Value>) -> Map<String, Value> {
    match existing {
        Some(Value::Object(fields)) => fields,
        _ => Map::new(),
    }
}

/// Order fields set by an import. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderPatch {
    pub delivery_date: Option<String>,
    pub quantity: Option<i64>,
    pub workforce: Option<i64>,
}

impl OrderPatch {
    /// Overlays the patch onto an existing order document. Fields the patch
    /// does not name, `assignedEmployees` and other `customerDetails` keys
    /// included, are kept.
    pub fn apply(&self, existing: Option<Value>) -> Value {
        let mut fields = into_fields(existing);
        if let Some(date) = &self.delivery_date {
            let details = fields
                .entry("customerDetails")
                .or_insert_with(|| json!({}));
            if !details.is_object() {
                *details = json!({});
            }
            if let Some(details) = details.as_object_mut() {
                details.insert("deliveryDate".to_string(), json!(date));
            }
        }
        if let Some(quantity) = self.quantity {
            fields.insert("quantity".to_string(), json!(quantity));
        }
        if let Some(workforce) = self.workforce {
            fields.insert("workforce".to_string(), json!(workforce));
        }
        Value::Object(fields)
    }
}

/// Employee fields set by an import. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmployeePatch {
    pub name: Option<String>,
    pub rating: Option<f64>,
}

impl EmployeePatch {
    pub fn apply(&self, existing: Option<Value>) -> Value {
        let mut fields = into_fields(existing);
        if let Some(name) = &self.name {
            fields.insert("name".to_string(), json!(name));
        }
        if let Some(rating) = self.rating {
            fields.insert("ratings".to_string(), json!(rating));
        }
        Value::Object(fields)
    }
}

/// All orders, in store order.
pub fn fetch_orders(store: &dyn DocumentStore) -> Result<Vec<OrderRecord>, StoreError> {
    store
        .list_documents(ORDERS_COLLECTION)?
        .iter()
        .map(|(id, doc)| OrderRecord::from_document(id, doc))
        .collect()
}

/// The roster: all employees sorted by rating, highest first. Equal ratings
/// keep store order.
pub fn fetch_employees(store: &dyn DocumentStore) -> Result<Vec<EmployeeRecord>, StoreError> {
    let mut employees = store
        .list_documents(EMPLOYEES_COLLECTION)?
        .iter()
        .map(|(id, doc)| EmployeeRecord::from_document(id, doc))
        .collect::<Result<Vec<_>, _>>()?;
    employees.sort_by(|a, b| b.rating.total_cmp(&a.rating));
    Ok(employees)
}

/// Writes the assigned employee ids onto the order document.
pub fn write_assignment(
    store: &dyn DocumentStore,
    order_id: &str,
    employee_ids: &[String],
) -> Result<(), StoreError> {
    store.update_field(
        ORDERS_COLLECTION,
        order_id,
        ASSIGNED_EMPLOYEES_FIELD,
        json!(employee_ids),
    )
}
