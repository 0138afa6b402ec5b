//! In-memory reference backend.
//!
//! Tables live in persistent `im` collections, so beginning a transaction is
//! a cheap clone of the whole table map and rollback swaps it back.

use super::{EntityRow, PersistenceBackend, Projection, parse_select};
use crate::core::{ColumnValues, FieldType, RecordError, Result, Value};
use crate::query::{CriteriaQuery, Predicate};
use crate::result::QueryResult;
use crate::transaction::TransactionHandle;
use parking_lot::{Mutex, RwLock};
use tracing::{Level, event};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Table {
    columns: im::Vector<String>,
    rows: im::OrdMap<u64, ColumnValues>,
    keys: im::HashMap<Value, u64>,
    next_row: u64,
    next_key: i64,
}

impl Table {
    fn generate_key(&mut self, key_type: Option<FieldType>) -> Result<Value> {
        match key_type {
            Some(FieldType::Integer | FieldType::Long) => loop {
                self.next_key += 1;
                let candidate = Value::Integer(self.next_key);
                if !self.keys.contains_key(&candidate) {
                    return Ok(candidate);
                }
            },
            Some(FieldType::Text | FieldType::Other("Uuid")) => Ok(Value::Text(Uuid::new_v4().to_string())),
            other => Err(RecordError::Backend(format!(
                "Cannot generate a key of type {}",
                other.map(|t| t.to_string()).unwrap_or_else(|| "<accessor>".to_string())
            ))),
        }
    }

    fn track_columns(&mut self, row: &ColumnValues) {
        for (column, _) in row {
            if !self.columns.iter().any(|known| known == column) {
                self.columns.push_back(column.clone());
            }
        }
    }

    fn write(&mut self, key: Value, row: ColumnValues) {
        self.track_columns(&row);
        let slot = match self.keys.get(&key) {
            Some(slot) => *slot,
            None => {
                self.next_row += 1;
                self.keys.insert(key, self.next_row);
                self.next_row
            }
        };
        self.rows.insert(slot, row);
    }

    fn resolve_column(&self, name: &str) -> Option<&String> {
        self.columns
            .iter()
            .find(|column| column.as_str() == name)
            .or_else(|| self.columns.iter().find(|column| column.eq_ignore_ascii_case(name)))
    }

    fn project(&self, row: &ColumnValues, columns: &[String]) -> Vec<Value> {
        columns
            .iter()
            .map(|column| {
                row.iter()
                    .find(|(name, _)| name == column)
                    .map(|(_, value)| value.clone())
                    .unwrap_or(Value::Null)
            })
            .collect()
    }
}

fn with_key(mut columns: ColumnValues, key_column: Option<&str>, key: &Value) -> ColumnValues {
    if let Some(key_column) = key_column {
        match columns.iter_mut().find(|(name, _)| name == key_column) {
            Some((_, value)) => *value = key.clone(),
            None => columns.push((key_column.to_string(), key.clone())),
        }
    }
    columns
}

type Tables = im::HashMap<String, Table>;

fn table_mut<'a>(tables: &'a mut Tables, name: &str) -> &'a mut Table {
    tables.entry(name.to_string()).or_insert_with(Table::default)
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    snapshot: Mutex<Option<Tables>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map(|t| t.rows.len()).unwrap_or(0)
    }

    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn scan(&self, table: &str, predicate: &Predicate, columns: Option<Vec<String>>) -> QueryResult {
        let tables = self.tables.read();
        let Some(table) = tables.get(table) else {
            return QueryResult::new(columns.unwrap_or_default(), Vec::new());
        };

        let columns = columns.unwrap_or_else(|| table.columns.iter().cloned().collect());
        let rows = table
            .rows
            .values()
            .filter(|row| predicate.matches(row))
            .map(|row| table.project(row, &columns))
            .collect();
        QueryResult::new(columns, rows)
    }
}

impl PersistenceBackend for MemoryBackend {
    fn find_by_key(&self, table: &str, key: &Value) -> Result<Option<ColumnValues>> {
        let tables = self.tables.read();
        Ok(tables
            .get(table)
            .and_then(|t| t.keys.get(key).and_then(|slot| t.rows.get(slot)))
            .cloned())
    }

    fn persist(&self, row: EntityRow) -> Result<Value> {
        let mut tables = self.tables.write();
        let table = table_mut(&mut tables, &row.table);

        let key = if row.key.is_null() {
            table.generate_key(row.key_type)?
        } else {
            row.key.clone()
        };
        if table.keys.contains_key(&key) {
            return Err(RecordError::Backend(format!(
                "Duplicate key {} in table '{}'",
                key, row.table
            )));
        }

        let columns = with_key(row.columns, row.key_column.as_deref(), &key);
        table.write(key.clone(), columns);
        event!(Level::TRACE, table = %row.table, key = %key, "row inserted");
        Ok(key)
    }

    fn merge(&self, row: EntityRow) -> Result<ColumnValues> {
        if row.key.is_null() {
            return Err(RecordError::Backend(format!(
                "Cannot merge a row without key into '{}'",
                row.table
            )));
        }

        let mut tables = self.tables.write();
        let table = table_mut(&mut tables, &row.table);
        let columns = with_key(row.columns, row.key_column.as_deref(), &row.key);
        table.write(row.key.clone(), columns.clone());
        Ok(columns)
    }

    fn remove(&self, table: &str, key: &Value) -> Result<bool> {
        let mut tables = self.tables.write();
        let Some(table) = tables.get_mut(table) else {
            return Ok(false);
        };
        match table.keys.remove(key) {
            Some(slot) => {
                table.rows.remove(&slot);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn run_query(&self, query: &str) -> Result<QueryResult> {
        let select = parse_select(query)?;

        let (predicate, columns, labels) = {
            let tables = self.tables.read();
            let table = tables.get(&select.table);
            let resolve = |name: &str| -> Result<String> {
                match table {
                    Some(table) => table.resolve_column(name).cloned().ok_or_else(|| {
                        RecordError::Backend(format!(
                            "Column '{}' not found in table '{}'",
                            name, select.table
                        ))
                    }),
                    None => Ok(name.to_string()),
                }
            };

            let mut predicates = Vec::with_capacity(select.filters.len());
            for (column, value) in &select.filters {
                predicates.push(Predicate::Equal {
                    field: resolve(column)?,
                    value: value.clone(),
                });
            }

            match &select.projection {
                Projection::All => (Predicate::and(predicates), None, None),
                Projection::Columns(items) => {
                    let mut columns = Vec::with_capacity(items.len());
                    let mut labels = Vec::with_capacity(items.len());
                    for (column, label) in items {
                        columns.push(resolve(column)?);
                        labels.push(label.clone());
                    }
                    (Predicate::and(predicates), Some(columns), Some(labels))
                }
            }
        };

        let mut result = self.scan(&select.table, &predicate, columns);
        if let Some(labels) = labels {
            result.columns = labels;
        }
        Ok(result)
    }

    fn select(&self, query: &CriteriaQuery) -> Result<QueryResult> {
        Ok(self.scan(&query.table, &query.predicate, None))
    }

    fn transaction(&self) -> &dyn TransactionHandle {
        self
    }
}

impl TransactionHandle for MemoryBackend {
    fn is_active(&self) -> bool {
        self.snapshot.lock().is_some()
    }

    fn begin(&self) -> Result<()> {
        let mut snapshot = self.snapshot.lock();
        if snapshot.is_some() {
            return Err(RecordError::Transaction("Transaction already active".into()));
        }
        *snapshot = Some(self.tables.read().clone());
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.snapshot
            .lock()
            .take()
            .map(|_| ())
            .ok_or_else(|| RecordError::Transaction("No active transaction".into()))
    }

    fn rollback(&self) -> Result<()> {
        let snapshot = self
            .snapshot
            .lock()
            .take()
            .ok_or_else(|| RecordError::Transaction("No active transaction".into()))?;
        *self.tables.write() = snapshot;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: Value, name: &str) -> EntityRow {
        EntityRow {
            table: "users".into(),
            key_column: Some("id".into()),
            key_type: Some(FieldType::Long),
            key: key.clone(),
            columns: vec![
                ("id".into(), key),
                ("name".into(), Value::Text(name.into())),
            ],
        }
    }

    #[test]
    fn test_persist_generates_sequential_keys() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.persist(row(Value::Null, "a")).unwrap(), Value::Integer(1));
        assert_eq!(backend.persist(row(Value::Null, "b")).unwrap(), Value::Integer(2));

        let stored = backend.find_by_key("users", &Value::Integer(2)).unwrap().unwrap();
        assert_eq!(stored[0], ("id".to_string(), Value::Integer(2)));
    }

    #[test]
    fn test_generated_keys_skip_explicit_ones() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(1), "a")).unwrap();
        assert_eq!(backend.persist(row(Value::Null, "b")).unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(9), "a")).unwrap();
        assert!(backend.persist(row(Value::Integer(9), "b")).is_err());
    }

    #[test]
    fn test_text_keys_are_uuids() {
        let backend = MemoryBackend::new();
        let mut entity = row(Value::Null, "a");
        entity.key_type = Some(FieldType::Text);
        let key = backend.persist(entity).unwrap();
        assert!(Uuid::parse_str(key.as_str().unwrap()).is_ok());
    }

    #[test]
    fn test_merge_replaces_in_place() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(1), "a")).unwrap();
        backend.persist(row(Value::Integer(2), "b")).unwrap();
        backend.merge(row(Value::Integer(1), "z")).unwrap();

        let result = backend.run_query("SELECT name FROM users").unwrap();
        assert_eq!(
            result.rows,
            vec![vec![Value::Text("z".into())], vec![Value::Text("b".into())]]
        );
    }

    #[test]
    fn test_remove() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(1), "a")).unwrap();
        assert!(backend.remove("users", &Value::Integer(1)).unwrap());
        assert!(!backend.remove("users", &Value::Integer(1)).unwrap());
        assert!(!backend.remove("missing", &Value::Integer(1)).unwrap());
        assert_eq!(backend.row_count("users"), 0);
    }

    #[test]
    fn test_rollback_restores_snapshot() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(1), "a")).unwrap();

        backend.begin().unwrap();
        assert!(backend.is_active());
        backend.persist(row(Value::Integer(2), "b")).unwrap();
        backend.remove("users", &Value::Integer(1)).unwrap();
        backend.rollback().unwrap();

        assert!(!backend.is_active());
        assert_eq!(backend.row_count("users"), 1);
        assert!(backend.find_by_key("users", &Value::Integer(1)).unwrap().is_some());
    }

    #[test]
    fn test_transaction_state_errors() {
        let backend = MemoryBackend::new();
        assert!(backend.commit().is_err());
        assert!(backend.rollback().is_err());
        backend.begin().unwrap();
        assert!(backend.begin().is_err());
        backend.commit().unwrap();
    }

    #[test]
    fn test_run_query_filters_and_labels() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(1), "a")).unwrap();
        backend.persist(row(Value::Integer(2), "b")).unwrap();

        let result = backend
            .run_query("SELECT ID AS user_id, name FROM users WHERE name = 'b'")
            .unwrap();
        assert_eq!(result.columns, vec!["user_id".to_string(), "name".to_string()]);
        assert_eq!(result.rows, vec![vec![Value::Integer(2), Value::Text("b".into())]]);

        assert!(backend.run_query("SELECT nope FROM users").is_err());
        assert!(backend.run_query("SELECT * FROM nothing").unwrap().is_empty());
    }

    #[test]
    fn test_select_with_criteria() {
        let backend = MemoryBackend::new();
        backend.persist(row(Value::Integer(1), "a")).unwrap();
        backend.persist(row(Value::Integer(2), "b")).unwrap();

        let query = CriteriaQuery {
            table: "users".into(),
            predicate: Predicate::Equal {
                field: "name".into(),
                value: Value::Text("a".into()),
            },
        };
        let result = backend.select(&query).unwrap();
        assert_eq!(result.row_count(), 1);
        assert_eq!(backend.select(&CriteriaQuery::all("users")).unwrap().row_count(), 2);
    }
}
