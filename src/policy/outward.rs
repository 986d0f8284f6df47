use crate::error::AppError;
use crate::store::{EntityId, Fields};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Externally visible form of a record, after policy enforcement.
/// Serializes as `{"id": .., <field>: <value>, ..}`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OutwardRecord {
    pub id: EntityId,
    #[serde(flatten)]
    fields: Fields,
    #[serde(skip)]
    created_at: DateTime<Utc>,
    #[serde(skip)]
    updated_at: DateTime<Utc>,
}

impl OutwardRecord {
    pub(crate) fn new(
        id: EntityId,
        fields: Fields,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            fields,
            created_at,
            updated_at,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn contains_key(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn to_json(&self) -> Value {
        let mut map = Fields::new();
        map.insert("id".into(), Value::Number(self.id.get().into()));
        for (k, v) in &self.fields {
            map.insert(k.clone(), v.clone());
        }
        Value::Object(map)
    }

    /// Decode into a typed value. Hidden fields are absent, so the target type
    /// needs `#[serde(default)]` on them.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        serde_json::from_value(self.to_json())
            .map_err(|e| AppError::BadRequest(format!("decode outward record: {}", e)))
    }
}
