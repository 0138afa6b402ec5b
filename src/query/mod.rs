//! Criteria queries built from record descriptors.

use crate::core::{FieldType, Result, Value, column_value};
use crate::mapper::coerce;
use crate::record::{Record, RecordDescriptor, descriptor_of};
use tracing::{Level, event};

/// A field reference resolved against a record descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldRef {
    name: &'static str,
    field_type: FieldType,
}

impl FieldRef {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    All,
    Equal { field: String, value: Value },
    And(Vec<Predicate>),
}

impl Predicate {
    /// Conjunction; an empty list matches everything.
    pub fn and(mut predicates: Vec<Predicate>) -> Self {
        match predicates.len() {
            0 => Self::All,
            1 => predicates.remove(0),
            _ => Self::And(predicates),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Evaluates the predicate against a name-tagged row.
    ///
    /// Missing columns read as `Null`, which equals nothing but `Null`.
    pub fn matches(&self, row: &[(String, Value)]) -> bool {
        match self {
            Self::All => true,
            Self::Equal { field, value } => {
                column_value(row, field).unwrap_or(&Value::Null) == value
            }
            Self::And(predicates) => predicates.iter().all(|p| p.matches(row)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaQuery {
    pub table: String,
    pub predicate: Predicate,
}

impl CriteriaQuery {
    pub fn all(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            predicate: Predicate::All,
        }
    }
}

/// Builds predicates over the fields of one record type.
pub struct CriteriaBuilder<'a> {
    descriptor: &'a RecordDescriptor,
}

impl<'a> CriteriaBuilder<'a> {
    pub fn new(descriptor: &'a RecordDescriptor) -> Self {
        Self { descriptor }
    }

    /// Resolves a field by its exact declared name.
    pub fn field(&self, name: &str) -> Option<FieldRef> {
        self.descriptor.find_field(name).map(|field| FieldRef {
            name: field.name,
            field_type: field.field_type,
        })
    }

    /// Equality predicate; the value is coerced to the field's type first.
    pub fn equal(&self, field: FieldRef, value: Value) -> Result<Predicate> {
        Ok(Predicate::Equal {
            field: field.name.to_string(),
            value: coerce(value, field.field_type)?,
        })
    }

    pub fn and(&self, predicates: Vec<Predicate>) -> Predicate {
        Predicate::and(predicates)
    }
}

pub struct FilteredQueryBuilder;

impl FilteredQueryBuilder {
    /// Equality conjunction over `filters`.
    ///
    /// Entries naming unknown fields are dropped; with nothing left the query
    /// matches every row. A value that cannot be coerced to its field type
    /// fails the whole build, so a filter never widens the result.
    pub fn build<T, K, I>(filters: I) -> Result<CriteriaQuery>
    where
        T: Record,
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let descriptor = descriptor_of::<T>()?;
        let criteria = CriteriaBuilder::new(&descriptor);

        let mut predicates = Vec::new();
        for (name, value) in filters {
            let name = name.as_ref();
            let Some(field) = criteria.field(name) else {
                event!(Level::WARN, record = descriptor.type_name, field = name, "dropping filter on unknown field");
                continue;
            };
            predicates.push(criteria.equal(field, value).inspect_err(|err| {
                event!(Level::DEBUG, record = descriptor.type_name, field = name, error = %err, "filter value does not fit field type");
            })?);
        }

        Ok(CriteriaQuery {
            table: descriptor.table_name.clone(),
            predicate: criteria.and(predicates),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{RecordError, Value};
    use crate::record::FieldDescriptor;

    #[derive(Default)]
    struct Tag;

    impl Record for Tag {
        fn descriptor() -> RecordDescriptor {
            RecordDescriptor::new("Tag", "tag")
                .field(FieldDescriptor::new("id", FieldType::Long).identity())
                .field(FieldDescriptor::new("label", FieldType::Text))
                .field(FieldDescriptor::new("active", FieldType::Boolean))
        }

        fn get(&self, field: &str) -> Result<Value> {
            Err(RecordError::NotFound(field.into()))
        }

        fn set(&mut self, field: &str, _: Value) -> Result<()> {
            Err(RecordError::NotFound(field.into()))
        }

        fn construct(_: usize, _: Vec<Value>) -> Result<Self> {
            Ok(Tag)
        }
    }

    #[test]
    fn test_unknown_field_yields_match_all() {
        let query = FilteredQueryBuilder::build::<Tag, _, _>(vec![("nonexistentField", Value::Integer(1))]).unwrap();
        assert_eq!(query.table, "tag");
        assert!(query.predicate.is_all());
    }

    #[test]
    fn test_known_fields_are_conjoined_and_coerced() {
        let query = FilteredQueryBuilder::build::<Tag, _, _>(vec![
            ("id", Value::Text("3".into())),
            ("label", Value::Text("red".into())),
            ("bogus", Value::Null),
        ])
        .unwrap();
        assert_eq!(
            query.predicate,
            Predicate::And(vec![
                Predicate::Equal {
                    field: "id".into(),
                    value: Value::Integer(3)
                },
                Predicate::Equal {
                    field: "label".into(),
                    value: Value::Text("red".into())
                },
            ])
        );
    }

    #[test]
    fn test_incompatible_value_is_an_error() {
        let err = FilteredQueryBuilder::build::<Tag, _, _>(vec![
            ("label", Value::Text("red".into())),
            ("active", Value::Text("maybe".into())),
        ])
        .unwrap_err();
        assert!(matches!(err, RecordError::CannotCast { .. }));

        let err = FilteredQueryBuilder::build::<Tag, _, _>(vec![("id", Value::Text("abc".into()))]).unwrap_err();
        assert!(matches!(err, RecordError::NumberCast { .. }));
    }

    #[test]
    fn test_predicate_matches_rows() {
        let row = vec![
            ("id".to_string(), Value::Integer(1)),
            ("label".to_string(), Value::Text("red".into())),
        ];
        let red = Predicate::Equal {
            field: "label".into(),
            value: Value::Text("red".into()),
        };
        let two = Predicate::Equal {
            field: "id".into(),
            value: Value::Integer(2),
        };
        assert!(red.matches(&row));
        assert!(!Predicate::and(vec![red, two]).matches(&row));
        assert!(Predicate::All.matches(&row));
    }
}
