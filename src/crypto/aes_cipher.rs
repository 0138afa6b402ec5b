//! AES-256-CBC with PKCS#7 padding.
//!
//! The key is derived once from the configured secret and salt with
//! PBKDF2-HMAC-SHA256. Every encryption draws a fresh IV, so the same
//! plaintext yields a different ciphertext each time.
//!
//! Output format: `base64(iv (16 bytes) || ciphertext)`.

use super::TwoWayCipher;
use crate::core::{RecordError, Result};
use aes::Aes256;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// Size of the CBC initialization vector in bytes.
pub const IV_SIZE: usize = 16;

#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

pub struct Aes256Cipher {
    key: DerivedKey,
}

impl Aes256Cipher {
    pub fn new(secret: &str, salt: &str, iterations: u32) -> Result<Self> {
        if secret.is_empty() || salt.is_empty() {
            return Err(RecordError::Config(
                "AES secret and salt must not be empty".to_string(),
            ));
        }
        if iterations == 0 {
            return Err(RecordError::Config("PBKDF2 iterations must be positive".to_string()));
        }

        let mut bytes = [0u8; KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), iterations, &mut bytes);
        Ok(Self {
            key: DerivedKey { bytes },
        })
    }
}

impl std::fmt::Debug for Aes256Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256Cipher").field("key", &"[REDACTED]").finish()
    }
}

impl TwoWayCipher for Aes256Cipher {
    fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut iv = [0u8; IV_SIZE];
        rand::thread_rng().fill_bytes(&mut iv);

        let ciphertext = Aes256CbcEnc::new(&self.key.bytes.into(), &iv.into())
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext.as_bytes());

        let mut out = Vec::with_capacity(IV_SIZE + ciphertext.len());
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let raw = STANDARD
            .decode(ciphertext)
            .map_err(|e| RecordError::Decryption(e.to_string()))?;
        if raw.len() < IV_SIZE * 2 || raw.len() % IV_SIZE != 0 {
            return Err(RecordError::Decryption(format!(
                "ciphertext has invalid length {}",
                raw.len()
            )));
        }

        let (iv, body) = raw.split_at(IV_SIZE);
        let iv: [u8; IV_SIZE] = iv
            .try_into()
            .map_err(|_| RecordError::Decryption("invalid IV".to_string()))?;

        let plaintext = Aes256CbcDec::new(&self.key.bytes.into(), &iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(body)
            .map_err(|e| RecordError::Decryption(e.to_string()))?;

        String::from_utf8(plaintext).map_err(|e| RecordError::Decryption(e.to_string()))
    }
}
