use super::RecordValue;
use crate::core::{FieldType, RecordError, Result, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::ops::{Deref, DerefMut};
use tracing::{Level, event};
use uuid::Uuid;

fn mismatch<T: RecordValue>(value: &Value) -> RecordError {
    RecordError::cannot_cast(value, T::field_type().to_string())
}

impl RecordValue for i64 {
    fn field_type() -> FieldType {
        FieldType::Long
    }

    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => Ok(i),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for i32 {
    fn field_type() -> FieldType {
        FieldType::Integer
    }

    fn to_value(&self) -> Value {
        Value::Integer(i64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Integer(i) => i32::try_from(i).map_err(|_| mismatch::<Self>(&value)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for f64 {
    fn field_type() -> FieldType {
        FieldType::Double
    }

    fn to_value(&self) -> Value {
        Value::Float(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Integer(i) => Ok(i as f64),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for f32 {
    fn field_type() -> FieldType {
        FieldType::Float
    }

    fn to_value(&self) -> Value {
        Value::Float(f64::from(*self))
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(f) => Ok(f as f32),
            Value::Integer(i) => Ok(i as f32),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for bool {
    fn field_type() -> FieldType {
        FieldType::Boolean
    }

    fn to_value(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for String {
    fn field_type() -> FieldType {
        FieldType::Text
    }

    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for DateTime<Utc> {
    fn field_type() -> FieldType {
        FieldType::Timestamp
    }

    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Timestamp(t) => Ok(t),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for NaiveDateTime {
    fn field_type() -> FieldType {
        FieldType::DateTime
    }

    fn to_value(&self) -> Value {
        Value::DateTime(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(t) => Ok(t),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for NaiveDate {
    fn field_type() -> FieldType {
        FieldType::Date
    }

    fn to_value(&self) -> Value {
        Value::Date(*self)
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Date(d) => Ok(d),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl RecordValue for Uuid {
    fn field_type() -> FieldType {
        FieldType::Other("Uuid")
    }

    fn to_value(&self) -> Value {
        Value::Text(self.to_string())
    }

    fn from_value(value: Value) -> Result<Self> {
        match &value {
            Value::Text(s) => Uuid::parse_str(s).map_err(|_| mismatch::<Self>(&value)),
            other => Err(mismatch::<Self>(other)),
        }
    }
}

impl<T: RecordValue> RecordValue for Option<T> {
    fn field_type() -> FieldType {
        T::field_type()
    }

    fn nullable() -> bool {
        true
    }

    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// JSON-backed member for nested serde-compatible data, stored as text.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for Json<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T: Serialize + DeserializeOwned> RecordValue for Json<T> {
    fn field_type() -> FieldType {
        FieldType::Other("Json")
    }

    fn to_value(&self) -> Value {
        match serde_json::to_string(&self.0) {
            Ok(text) => Value::Text(text),
            Err(err) => {
                event!(Level::WARN, error = %err, "json member could not be serialized");
                Value::Null
            }
        }
    }

    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(text) => serde_json::from_str(&text).map(Json).map_err(|err| {
                RecordError::CannotCast {
                    value: text,
                    target: format!("Json ({})", err),
                }
            }),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}
