//! Persistence backend contract.
//!
//! The active-record layer never stores anything itself. Everything below
//! [`RecordContext`](crate::active::RecordContext) goes through a
//! [`PersistenceBackend`]: primary-key lookups, inserts, merges, removals,
//! native queries, criteria queries, and transaction bookkeeping.

pub mod memory;
mod sql;

pub use memory::MemoryBackend;
pub use sql::{Projection, SelectQuery, parse_select};

use crate::core::{ColumnValues, FieldType, Result, Value};
use crate::identity::{IdentityMember, RecordMeta};
use crate::query::CriteriaQuery;
use crate::record::{Record, to_columns};
use crate::result::QueryResult;
use crate::transaction::TransactionHandle;

/// A record flattened for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRow {
    pub table: String,
    /// Column that holds the key, when the identity is a stored field.
    pub key_column: Option<String>,
    /// Declared type of the key column; drives key generation.
    pub key_type: Option<FieldType>,
    /// `Null` asks the backend to assign a key.
    pub key: Value,
    pub columns: ColumnValues,
}

impl EntityRow {
    pub fn from_record<T: Record>(record: &T, meta: &RecordMeta) -> Result<Self> {
        let key_column = match meta.identity {
            Some(IdentityMember::Field(name)) => Some(name.to_string()),
            _ => None,
        };

        Ok(Self {
            table: meta.table_name().to_string(),
            key_column,
            key_type: meta.identity_type(),
            key: meta.identity_value(record)?,
            columns: to_columns(record, &meta.descriptor)?,
        })
    }
}

pub trait PersistenceBackend: Send + Sync {
    fn find_by_key(&self, table: &str, key: &Value) -> Result<Option<ColumnValues>>;

    /// Inserts a new row and returns its key, generated when `row.key` is null.
    fn persist(&self, row: EntityRow) -> Result<Value>;

    /// Writes `row` over the stored row with the same key and returns the stored result.
    fn merge(&self, row: EntityRow) -> Result<ColumnValues>;

    /// Removes the row with `key`; returns whether one existed.
    fn remove(&self, table: &str, key: &Value) -> Result<bool>;

    /// Executes a native query.
    fn run_query(&self, query: &str) -> Result<QueryResult>;

    fn select(&self, query: &CriteriaQuery) -> Result<QueryResult>;

    fn transaction(&self) -> &dyn TransactionHandle;
}
