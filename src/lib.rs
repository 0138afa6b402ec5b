// ============================================================================
// recordgate
// ============================================================================
//
// Active-record convenience layer over a pluggable persistence backend:
// typed result mapping, field-level encryption on write, and transaction
// scoping that joins a caller's transaction instead of fighting it.
//
// ============================================================================

extern crate self as recordgate;

pub mod active;
pub mod backend;
pub mod config;
pub mod core;
pub mod crypto;
pub mod identity;
pub mod mapper;
pub mod prelude;
pub mod query;
pub mod record;
pub mod result;
pub mod transaction;

// Re-export main types for convenience
pub use active::{ActiveRecord, RecordContext};
pub use backend::{EntityRow, MemoryBackend, PersistenceBackend};
pub use config::RecordConfig;
pub use core::{ErrorKind, FieldType, RawBatch, RawResult, RecordError, Result, Value};
pub use crypto::{CryptoGate, OneWayHasher, TwoWayCipher};
pub use identity::{AuditKind, IdentityMember, IdentityResolver, RecordMeta};
pub use mapper::ResultMapper;
pub use query::{CriteriaBuilder, CriteriaQuery, FilteredQueryBuilder, Predicate};
pub use record::{
    AccessorDescriptor, ConstructorDescriptor, CryptMode, FieldDescriptor, Json, ParamDescriptor,
    Record, RecordDescriptor, RecordValue,
};
pub use result::QueryResult;
pub use transaction::{ScopeState, TransactionHandle, TransactionScope};

pub use recordgate_derive::Record;
