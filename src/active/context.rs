use crate::backend::{EntityRow, MemoryBackend, PersistenceBackend};
use crate::config::RecordConfig;
use crate::core::{RecordError, Result, Value};
use crate::crypto::CryptoGate;
use crate::identity::{AuditKind, IdentityResolver, RecordMeta};
use crate::mapper::{ResultMapper, coerce};
use crate::query::{CriteriaQuery, FilteredQueryBuilder};
use crate::record::{Record, RecordValue};
use crate::transaction::TransactionScope;
use chrono::Utc;
use parking_lot::ReentrantMutex;
use std::sync::Arc;
use tracing::{Level, event};

/// Persistence context shared by every active-record operation.
///
/// Owns the backend handle, the crypto gate and the lock that serializes
/// transaction boundaries. Create it once at startup and share it behind an
/// `Arc`; it is `Send + Sync`.
///
/// # Examples
///
/// ```
/// use recordgate::{ActiveRecord, Record, RecordConfig, RecordContext};
///
/// #[derive(Debug, Default, Record)]
/// struct Note {
///     #[record(id)]
///     id: Option<i64>,
///     body: String,
/// }
///
/// # fn main() -> recordgate::Result<()> {
/// let config = RecordConfig::new("secret", "salt").bcrypt_cost(4).pbkdf2_iterations(1000);
/// let ctx = RecordContext::in_memory(&config)?;
///
/// let note = Note { id: None, body: "hello".into() }.save(&ctx)?;
/// assert!(note.id.is_some());
/// assert_eq!(Note::find_all(&ctx)?.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct RecordContext {
    backend: Arc<dyn PersistenceBackend>,
    crypto: CryptoGate,
    tx_lock: ReentrantMutex<()>,
}

impl RecordContext {
    pub fn new(backend: Arc<dyn PersistenceBackend>, crypto: CryptoGate) -> Self {
        Self {
            backend,
            crypto,
            tx_lock: ReentrantMutex::new(()),
        }
    }

    pub fn open(backend: Arc<dyn PersistenceBackend>, config: &RecordConfig) -> Result<Self> {
        Ok(Self::new(backend, CryptoGate::from_config(config)?))
    }

    /// Context over a fresh [`MemoryBackend`].
    pub fn in_memory(config: &RecordConfig) -> Result<Self> {
        Self::open(Arc::new(MemoryBackend::new()), config)
    }

    pub fn backend(&self) -> &Arc<dyn PersistenceBackend> {
        &self.backend
    }

    pub fn crypto(&self) -> &CryptoGate {
        &self.crypto
    }

    /// Opens a scope on the backend transaction; joins one that is already active.
    pub fn transaction_scope(&self) -> Result<TransactionScope<'_>> {
        TransactionScope::begin(self.backend.transaction(), &self.tx_lock)
    }

    /// Runs `work` inside one transaction. Active-record calls made by `work`
    /// join it instead of opening their own.
    pub fn with_transaction<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        TransactionScope::run(self.backend.transaction(), &self.tx_lock, || work(self))
    }

    pub fn exists<T: Record>(&self, record: &T) -> Result<bool> {
        let meta = IdentityResolver::meta::<T>()?;
        self.exists_with(&meta, record)
    }

    fn exists_with<T: Record>(&self, meta: &RecordMeta, record: &T) -> Result<bool> {
        let key = meta.identity_value(record)?;
        if key.is_null() {
            return Ok(false);
        }
        Ok(self.backend.find_by_key(meta.table_name(), &key)?.is_some())
    }

    /// Inserts `record`, or updates it when a row with its identity exists.
    pub fn save<T: Record + Default>(&self, mut record: T) -> Result<T> {
        let meta = IdentityResolver::meta::<T>()?;
        if self.exists_with(&meta, &record)? {
            return self.update(record);
        }

        TransactionScope::run(self.backend.transaction(), &self.tx_lock, || {
            IdentityResolver::stamp(&mut record, &meta, AuditKind::Created, Utc::now())?;
            self.crypto.prepare_for_write(&mut record, &meta, None)?;

            let key = self.backend.persist(EntityRow::from_record(&record, &meta)?)?;
            IdentityResolver::assign_identity(&mut record, &meta, key)?;
            Ok(())
        })?;

        event!(Level::DEBUG, record = meta.type_name(), "record saved");
        Ok(record)
    }

    /// Merges `record` over its stored row, or inserts it when none exists.
    ///
    /// Returns the instance rebuilt from the merged row.
    pub fn update<T: Record + Default>(&self, mut record: T) -> Result<T> {
        let meta = IdentityResolver::meta::<T>()?;
        if !self.exists_with(&meta, &record)? {
            return self.save(record);
        }
        let key = meta.identity_value(&record)?;

        let merged = TransactionScope::run(self.backend.transaction(), &self.tx_lock, || {
            IdentityResolver::stamp(&mut record, &meta, AuditKind::Updated, Utc::now())?;

            let previous = self.load::<T>(&meta, &key)?;
            self.crypto.prepare_for_write(&mut record, &meta, previous.as_ref())?;

            let merged = self.backend.merge(EntityRow::from_record(&record, &meta)?)?;
            ResultMapper::map_association::<T>(merged)
        })?;

        event!(Level::DEBUG, record = meta.type_name(), key = %key, "record updated");
        Ok(merged)
    }

    pub fn update_if_exists<T: Record + Default>(&self, record: T) -> Result<T> {
        let meta = IdentityResolver::meta::<T>()?;
        if !self.exists_with(&meta, &record)? {
            return Err(RecordError::NotFound(meta.type_name().to_string()));
        }
        self.update(record)
    }

    /// Removes the stored row. The in-memory value is left as it was.
    pub fn delete<T: Record>(&self, record: &T) -> Result<()> {
        let meta = IdentityResolver::meta::<T>()?;
        if !self.exists_with(&meta, record)? {
            return Err(RecordError::NotFound(meta.type_name().to_string()));
        }
        let key = meta.identity_value(record)?;

        TransactionScope::run(self.backend.transaction(), &self.tx_lock, || {
            self.backend.remove(meta.table_name(), &key).map(|_| ())
        })?;

        event!(Level::DEBUG, record = meta.type_name(), key = %key, "record deleted");
        Ok(())
    }

    /// Looks a record up by key. The key is coerced to the identity field's
    /// type first, so `"1"` and `1.0` find the row stored under `1`.
    pub fn find<T: Record + Default>(&self, id: impl Into<Value>) -> Result<Option<T>> {
        let meta = IdentityResolver::meta::<T>()?;
        let key = match meta.identity_type() {
            Some(field_type) => coerce(id.into(), field_type)?,
            None => id.into(),
        };
        self.load(&meta, &key)
    }

    fn load<T: Record + Default>(&self, meta: &RecordMeta, key: &Value) -> Result<Option<T>> {
        if key.is_null() {
            return Ok(None);
        }
        self.backend
            .find_by_key(meta.table_name(), key)?
            .map(ResultMapper::map_association::<T>)
            .transpose()
    }

    pub fn find_all<T: Record + Default>(&self) -> Result<Vec<T>> {
        let meta = IdentityResolver::meta::<T>()?;
        self.select(&CriteriaQuery::all(meta.table_name()))
    }

    /// Rows whose fields equal the given values. Unknown field names are ignored.
    pub fn find_where<T, K, I>(&self, filters: I) -> Result<Vec<T>>
    where
        T: Record + Default,
        K: AsRef<str>,
        I: IntoIterator<Item = (K, Value)>,
    {
        IdentityResolver::meta::<T>()?;
        self.select(&FilteredQueryBuilder::build::<T, K, I>(filters)?)
    }

    pub fn select<T: Record + Default>(&self, query: &CriteriaQuery) -> Result<Vec<T>> {
        let result = self.backend.select(query)?;
        ResultMapper::map_sequence(result.into_associations())
    }

    /// Native query mapped positionally through `T`'s constructors.
    pub fn query_as<T: Record + Default>(&self, query: &str) -> Result<Vec<T>> {
        let result = self.backend.run_query(query)?;
        ResultMapper::map_sequence(result.into_tuples())
    }

    /// Native query mapped by column name onto `T`'s fields.
    pub fn query_columns_as<T: Record + Default>(&self, query: &str) -> Result<Vec<T>> {
        let result = self.backend.run_query(query)?;
        ResultMapper::map_sequence(result.into_associations())
    }

    pub fn query_scalars<V: RecordValue>(&self, query: &str) -> Result<Vec<V>> {
        let result = self.backend.run_query(query)?;
        ResultMapper::map_scalars(result.into_tuples())
    }

    /// Exactly one row mapped positionally.
    pub fn query_single<T: Record + Default>(&self, query: &str) -> Result<T> {
        self.query_optional(query)?.ok_or(RecordError::NoResult)
    }

    /// At most one row mapped positionally.
    pub fn query_optional<T: Record + Default>(&self, query: &str) -> Result<Option<T>> {
        let mut rows = self.backend.run_query(query)?.into_tuples();
        match rows.len() {
            0 => Ok(None),
            1 => ResultMapper::map_raw(rows.remove(0)).map(Some),
            n => Err(RecordError::NonUniqueResult(n)),
        }
    }

    /// Decrypts the two-way fields of a loaded record in place.
    pub fn reveal<T: Record>(&self, record: &mut T) -> Result<usize> {
        let meta = IdentityResolver::meta::<T>()?;
        self.crypto.reveal(record, &meta)
    }

    /// Rolls back a transaction left open on the backend.
    pub fn close(self) -> Result<()> {
        let _guard = self.tx_lock.lock();
        let handle = self.backend.transaction();
        if handle.is_active() {
            event!(Level::WARN, "closing context with an open transaction, rolling back");
            handle.rollback()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for RecordContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordContext")
            .field("in_transaction", &self.backend.transaction().is_active())
            .finish_non_exhaustive()
    }
}
