#![allow(dead_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use parking_lot::Mutex;
use recordgate::backend::EntityRow;
use recordgate::core::ColumnValues;
use recordgate::crypto::{Aes256Cipher, BcryptHasher};
use recordgate::{
    CriteriaQuery, CryptoGate, MemoryBackend, OneWayHasher, PersistenceBackend, QueryResult,
    Record, RecordConfig, RecordContext, RecordError, Result, TransactionHandle, TwoWayCipher,
    Value,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

// ============================================================================
// Models
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "users", constructor(id, user_name, is_active))]
pub struct User {
    #[record(id)]
    pub id: Option<i64>,
    pub user_name: String,
    pub is_active: bool,
    #[record(crypt)]
    pub password: Option<String>,
    #[record(crypt = "two_way")]
    pub card_number: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<NaiveDateTime>,
}

impl User {
    pub fn named(user_name: &str) -> Self {
        Self {
            user_name: user_name.to_string(),
            is_active: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Person {
    #[record(id)]
    pub id: i64,
    pub name: String,
    pub active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
#[record(table = "api_keys", id_accessor = "key")]
pub struct ApiKey {
    pub prefix: String,
    pub suffix: String,
    pub scope: String,
}

impl ApiKey {
    pub fn key(&self) -> String {
        format!("{}-{}", self.prefix, self.suffix)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Record)]
pub struct Ticket {
    #[record(id)]
    pub code: Option<String>,
    pub title: String,
    pub created_at: Option<NaiveDate>,
    #[record(skip)]
    pub dirty: bool,
}

#[derive(Debug, Default, Record)]
pub struct Orphan {
    pub label: String,
}

#[derive(Debug, Default, Record)]
pub struct BadAudit {
    #[record(id)]
    pub id: Option<i64>,
    pub created_at: String,
}

/// Hand-written because the derive refuses two `#[record(id)]` fields.
#[derive(Debug, Default)]
pub struct TwoIds {
    pub first: Option<i64>,
    pub second: Option<i64>,
}

impl Record for TwoIds {
    fn descriptor() -> recordgate::RecordDescriptor {
        recordgate::RecordDescriptor::new("TwoIds", "two_ids")
            .field(recordgate::FieldDescriptor::new("first", recordgate::FieldType::Long).nullable(true).identity())
            .field(recordgate::FieldDescriptor::new("second", recordgate::FieldType::Long).nullable(true).identity())
    }

    fn get(&self, field: &str) -> Result<Value> {
        match field {
            "first" => Ok(self.first.into()),
            "second" => Ok(self.second.into()),
            other => Err(RecordError::UnknownMember {
                type_name: "TwoIds".into(),
                member: other.into(),
            }),
        }
    }

    fn set(&mut self, _field: &str, _value: Value) -> Result<()> {
        Ok(())
    }

    fn construct(_constructor: usize, _args: Vec<Value>) -> Result<Self> {
        Ok(Self::default())
    }
}

// ============================================================================
// Counting collaborators
// ============================================================================

/// Memory backend that records every call made against it.
#[derive(Default)]
pub struct CountingBackend {
    inner: MemoryBackend,
    calls: Mutex<Vec<&'static str>>,
    fail_persist: AtomicBool,
}

impl CountingBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| **c == call).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    pub fn fail_next_persist(&self) {
        self.fail_persist.store(true, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryBackend {
        &self.inner
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }
}

impl PersistenceBackend for CountingBackend {
    fn find_by_key(&self, table: &str, key: &Value) -> Result<Option<ColumnValues>> {
        self.record("find_by_key");
        self.inner.find_by_key(table, key)
    }

    fn persist(&self, row: EntityRow) -> Result<Value> {
        self.record("persist");
        if self.fail_persist.swap(false, Ordering::SeqCst) {
            return Err(RecordError::Backend("injected persist failure".into()));
        }
        self.inner.persist(row)
    }

    fn merge(&self, row: EntityRow) -> Result<ColumnValues> {
        self.record("merge");
        self.inner.merge(row)
    }

    fn remove(&self, table: &str, key: &Value) -> Result<bool> {
        self.record("remove");
        self.inner.remove(table, key)
    }

    fn run_query(&self, query: &str) -> Result<QueryResult> {
        self.record("run_query");
        self.inner.run_query(query)
    }

    fn select(&self, query: &CriteriaQuery) -> Result<QueryResult> {
        self.record("select");
        self.inner.select(query)
    }

    fn transaction(&self) -> &dyn TransactionHandle {
        self
    }
}

impl TransactionHandle for CountingBackend {
    fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    fn begin(&self) -> Result<()> {
        self.record("begin");
        self.inner.begin()
    }

    fn commit(&self) -> Result<()> {
        self.record("commit");
        self.inner.commit()
    }

    fn rollback(&self) -> Result<()> {
        self.record("rollback");
        self.inner.rollback()
    }
}

pub struct CountingCipher {
    inner: Aes256Cipher,
    pub encrypts: AtomicUsize,
    pub decrypts: AtomicUsize,
}

impl TwoWayCipher for CountingCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        self.inner.decrypt(ciphertext)
    }
}

pub struct CountingHasher {
    inner: BcryptHasher,
    pub hashes: AtomicUsize,
}

impl OneWayHasher for CountingHasher {
    fn hash(&self, plaintext: &str) -> Result<String> {
        self.hashes.fetch_add(1, Ordering::SeqCst);
        self.inner.hash(plaintext)
    }

    fn verify(&self, plaintext: &str, digest: &str) -> bool {
        self.inner.verify(plaintext, digest)
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Cheap settings so bcrypt and PBKDF2 stay fast under test.
pub fn config() -> RecordConfig {
    RecordConfig::new("test-secret", "test-salt")
        .bcrypt_cost(4)
        .pbkdf2_iterations(1_000)
}

pub struct Harness {
    pub ctx: RecordContext,
    pub backend: Arc<CountingBackend>,
    pub hasher: Arc<CountingHasher>,
    pub cipher: Arc<CountingCipher>,
}

impl Harness {
    pub fn encrypts(&self) -> usize {
        self.cipher.encrypts.load(Ordering::SeqCst)
    }

    pub fn hashes(&self) -> usize {
        self.hasher.hashes.load(Ordering::SeqCst)
    }
}

pub fn harness() -> Harness {
    let config = config();
    let backend = CountingBackend::new();
    let hasher = Arc::new(CountingHasher {
        inner: BcryptHasher::new(config.bcrypt_cost),
        hashes: AtomicUsize::new(0),
    });
    let cipher = Arc::new(CountingCipher {
        inner: Aes256Cipher::new(&config.aes_secret_key, &config.aes_salt, config.pbkdf2_iterations)
            .expect("cipher"),
        encrypts: AtomicUsize::new(0),
        decrypts: AtomicUsize::new(0),
    });

    let crypto = CryptoGate::new(hasher.clone(), cipher.clone());
    let ctx = RecordContext::new(backend.clone(), crypto);

    Harness {
        ctx,
        backend,
        hasher,
        cipher,
    }
}
