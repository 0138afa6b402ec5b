use crate::core::{FieldType, RecordError, Result, Value};
use chrono::{NaiveTime, TimeZone, Utc};

/// Per-type numeric conversion used before any other coercion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberCast {
    Integer,
    Long,
    Float,
    Double,
}

impl NumberCast {
    pub fn for_type(field_type: FieldType) -> Option<Self> {
        match field_type {
            FieldType::Integer => Some(Self::Integer),
            FieldType::Long => Some(Self::Long),
            FieldType::Float => Some(Self::Float),
            FieldType::Double => Some(Self::Double),
            _ => None,
        }
    }

    fn target(&self) -> &'static str {
        match self {
            Self::Integer => "i32",
            Self::Long => "i64",
            Self::Float => "f32",
            Self::Double => "f64",
        }
    }

    fn fail(&self, value: &Value, reason: impl Into<String>) -> RecordError {
        RecordError::NumberCast {
            value: value.to_string(),
            target: self.target().to_string(),
            reason: reason.into(),
        }
    }

    pub fn cast(&self, value: Value) -> Result<Value> {
        match self {
            Self::Integer | Self::Long => self.cast_integral(value),
            Self::Float | Self::Double => self.cast_floating(value),
        }
    }

    fn cast_integral(&self, value: Value) -> Result<Value> {
        let wide = match &value {
            Value::Integer(i) => *i,
            Value::Float(f) => {
                if !f.is_finite() || *f < i64::MIN as f64 || *f > i64::MAX as f64 {
                    return Err(self.fail(&value, "out of range"));
                }
                f.trunc() as i64
            }
            Value::Text(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|err| self.fail(&value, err.to_string()))?,
            other => return Err(RecordError::cannot_cast(other, self.target())),
        };

        if *self == Self::Integer && i32::try_from(wide).is_err() {
            return Err(self.fail(&value, "out of range for i32"));
        }
        Ok(Value::Integer(wide))
    }

    fn cast_floating(&self, value: Value) -> Result<Value> {
        let wide = match &value {
            Value::Float(f) => *f,
            Value::Integer(i) => *i as f64,
            Value::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|err| self.fail(&value, err.to_string()))?,
            other => return Err(RecordError::cannot_cast(other, self.target())),
        };

        if *self == Self::Float && wide.is_finite() && (wide as f32).is_infinite() {
            return Err(self.fail(&value, "out of range for f32"));
        }
        Ok(Value::Float(wide))
    }
}

/// Converts a finer-grained temporal value into the target representation.
fn cast_temporal(value: Value, target: FieldType) -> Result<Value> {
    let converted = match (&value, target) {
        (Value::Timestamp(t), FieldType::DateTime) => Value::DateTime(t.naive_utc()),
        (Value::Timestamp(t), FieldType::Date) => Value::Date(t.date_naive()),
        (Value::DateTime(t), FieldType::Date) => Value::Date(t.date()),
        (Value::DateTime(t), FieldType::Timestamp) => Value::Timestamp(Utc.from_utc_datetime(t)),
        (Value::Date(d), FieldType::DateTime) => Value::DateTime(d.and_time(NaiveTime::MIN)),
        (Value::Date(d), FieldType::Timestamp) => {
            Value::Timestamp(Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
        }
        _ if target.is_compatible(&value) => value,
        _ => return Err(RecordError::cannot_cast(&value, target.to_string())),
    };
    Ok(converted)
}

/// Coerces `value` to `target` using the mapping rules, in priority order:
/// null passthrough, number casters, temporal conversion, text rendering,
/// then a direct type check.
pub fn coerce(value: Value, target: FieldType) -> Result<Value> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    if let Some(caster) = NumberCast::for_type(target) {
        return caster.cast(value);
    }

    if target.is_temporal() && value.is_temporal() {
        return cast_temporal(value, target);
    }

    if target.is_textual() {
        return Ok(match value {
            Value::Text(s) => Value::Text(s),
            other => Value::Text(other.to_string()),
        });
    }

    if target.is_compatible(&value) {
        Ok(value)
    } else {
        Err(RecordError::cannot_cast(&value, target.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_null_stays_null() {
        assert_eq!(coerce(Value::Null, FieldType::Long).unwrap(), Value::Null);
    }

    #[test]
    fn test_numeric_text_is_parsed() {
        assert_eq!(coerce(Value::Text(" 42 ".into()), FieldType::Long).unwrap(), Value::Integer(42));
        assert_eq!(coerce(Value::Text("2.5".into()), FieldType::Double).unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_float_truncates_into_integer() {
        assert_eq!(coerce(Value::Float(7.9), FieldType::Integer).unwrap(), Value::Integer(7));
        assert_eq!(coerce(Value::Float(-7.9), FieldType::Long).unwrap(), Value::Integer(-7));
    }

    #[test]
    fn test_integer_overflow_is_a_cast_error() {
        let err = coerce(Value::Integer(i64::MAX), FieldType::Integer).unwrap_err();
        assert!(matches!(err, RecordError::NumberCast { .. }));
        let err = coerce(Value::Text("12abc".into()), FieldType::Long).unwrap_err();
        assert!(matches!(err, RecordError::NumberCast { .. }));
    }

    #[test]
    fn test_temporal_narrowing_preserves_instant() {
        let dt = NaiveDate::from_ymd_opt(2023, 9, 14).unwrap().and_hms_opt(22, 15, 0).unwrap();
        let instant = Utc.from_utc_datetime(&dt);
        assert_eq!(
            coerce(Value::Timestamp(instant), FieldType::Date).unwrap(),
            Value::Date(dt.date())
        );
        assert_eq!(
            coerce(Value::Timestamp(instant), FieldType::DateTime).unwrap(),
            Value::DateTime(dt)
        );
    }

    #[test]
    fn test_text_target_renders_any_value() {
        assert_eq!(coerce(Value::Integer(5), FieldType::Text).unwrap(), Value::Text("5".into()));
        assert_eq!(coerce(Value::Boolean(true), FieldType::Text).unwrap(), Value::Text("true".into()));
    }

    #[test]
    fn test_incompatible_value_fails() {
        let err = coerce(Value::Text("yes".into()), FieldType::Boolean).unwrap_err();
        assert!(matches!(err, RecordError::CannotCast { .. }));
        let err = coerce(Value::Integer(1), FieldType::Date).unwrap_err();
        assert!(matches!(err, RecordError::CannotCast { .. }));
    }
}
