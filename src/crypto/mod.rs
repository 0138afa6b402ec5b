//! Field-level encryption applied on write.

mod aes_cipher;
mod bcrypt_hasher;

pub use aes_cipher::Aes256Cipher;
pub use bcrypt_hasher::BcryptHasher;

use crate::config::RecordConfig;
use crate::core::{RecordError, Result, Value};
use crate::identity::RecordMeta;
use crate::record::{CryptMode, Record};
use std::sync::Arc;
use tracing::{Level, event};

pub trait OneWayHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String>;

    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

pub trait TwoWayCipher: Send + Sync {
    fn encrypt(&self, plaintext: &str) -> Result<String>;

    fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

impl CryptMode {
    /// Transforms `text` with the primitive this mode selects.
    pub fn apply(&self, text: &str, gate: &CryptoGate) -> Result<String> {
        match self {
            Self::OneWay => gate.hash(text),
            Self::TwoWay => gate.encrypt(text),
        }
    }
}

/// Outcome of comparing a field against the last persisted snapshot.
#[derive(Debug, PartialEq)]
enum FieldChange {
    Changed,
    /// Still holds the stored representation.
    Unchanged,
    /// Plaintext matches the decrypted stored ciphertext; carries that ciphertext.
    SamePlaintext(Value),
}

#[derive(Clone)]
pub struct CryptoGate {
    hasher: Arc<dyn OneWayHasher>,
    cipher: Arc<dyn TwoWayCipher>,
}

impl CryptoGate {
    pub fn new(hasher: Arc<dyn OneWayHasher>, cipher: Arc<dyn TwoWayCipher>) -> Self {
        Self { hasher, cipher }
    }

    pub fn from_config(config: &RecordConfig) -> Result<Self> {
        config.validate()?;
        let hasher = BcryptHasher::new(config.bcrypt_cost);
        let cipher = Aes256Cipher::new(
            &config.aes_secret_key,
            &config.aes_salt,
            config.pbkdf2_iterations,
        )?;
        Ok(Self::new(Arc::new(hasher), Arc::new(cipher)))
    }

    pub fn hash(&self, plaintext: &str) -> Result<String> {
        self.hasher.hash(plaintext)
    }

    pub fn verify(&self, plaintext: &str, digest: &str) -> bool {
        self.hasher.verify(plaintext, digest)
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        self.cipher.encrypt(plaintext)
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        self.cipher.decrypt(ciphertext)
    }

    /// Encrypts every marked field of `record` whose value changed relative to
    /// `previous`, in place. Without a snapshot every marked field is
    /// transformed. Returns the number of fields transformed.
    pub fn prepare_for_write<T: Record>(
        &self,
        record: &mut T,
        meta: &RecordMeta,
        previous: Option<&T>,
    ) -> Result<usize> {
        let mut transformed = 0;

        for field in &meta.encrypted {
            let current = record.get(field.field)?;
            let plaintext = match &current {
                Value::Null => continue,
                Value::Text(text) => text.as_str(),
                other => return Err(RecordError::cannot_cast(other, "String")),
            };

            let change = match previous {
                None => FieldChange::Changed,
                Some(snapshot) => self.compare(snapshot, field.field, field.mode, &current, plaintext),
            };

            match change {
                FieldChange::Unchanged => {}
                FieldChange::SamePlaintext(stored) => record.set(field.field, stored)?,
                FieldChange::Changed => {
                    let sealed = field.mode.apply(plaintext, self)?;
                    record.set(field.field, Value::Text(sealed))?;
                    transformed += 1;
                }
            }
        }

        if transformed > 0 {
            event!(Level::DEBUG, record = meta.type_name(), transformed, "encrypted changed fields");
        }
        Ok(transformed)
    }

    fn compare<T: Record>(
        &self,
        snapshot: &T,
        field: &str,
        mode: CryptMode,
        current: &Value,
        plaintext: &str,
    ) -> FieldChange {
        let stored = match snapshot.get(field) {
            Ok(stored) => stored,
            Err(err) => {
                event!(Level::WARN, field, error = %err, "snapshot field unreadable, treating as changed");
                return FieldChange::Changed;
            }
        };

        if &stored == current {
            return FieldChange::Unchanged;
        }

        if mode == CryptMode::TwoWay
            && let Value::Text(sealed) = &stored
        {
            match self.decrypt(sealed) {
                Ok(previous) if previous == plaintext => return FieldChange::SamePlaintext(stored),
                Ok(_) => {}
                Err(err) => {
                    event!(Level::WARN, field, error = %err, "stored ciphertext unreadable, treating as changed");
                }
            }
        }

        FieldChange::Changed
    }

    /// Decrypts every two-way field of `record` in place.
    pub fn reveal<T: Record>(&self, record: &mut T, meta: &RecordMeta) -> Result<usize> {
        let mut revealed = 0;
        for field in meta.encrypted.iter().filter(|f| f.mode == CryptMode::TwoWay) {
            if let Value::Text(sealed) = record.get(field.field)? {
                let plaintext = self.decrypt(&sealed)?;
                record.set(field.field, Value::Text(plaintext))?;
                revealed += 1;
            }
        }
        Ok(revealed)
    }
}

impl std::fmt::Debug for CryptoGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoGate").finish_non_exhaustive()
    }
}
