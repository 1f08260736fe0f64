//! Encrypted-column crypto: AES-256-GCM for ciphertext columns, keyed
//! PBKDF2-SHA256 key derivation, and a deterministic HMAC-SHA256
//! lookup hash for equality search over the encrypted columns.

use aes_gcm::aead::{Aead, KeyInit, OsRng, rand_core::RngCore};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

const NONCE_SIZE: usize = 12;
const KEY_SIZE: usize = 32;
const PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("ciphertext too short to contain a nonce")]
    Truncated,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed: ciphertext corrupted or key mismatch")]
    Decrypt,
}

impl From<CryptoError> for application::BridgeError {
    fn from(err: CryptoError) -> Self {
        Self::Fatal(err.to_string())
    }
}

fn derive_key(secret: &str, salt: &str) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2_hmac::<Sha256>(secret.as_bytes(), salt.as_bytes(), PBKDF2_ITERATIONS, &mut key);
    key
}

/// Encrypts/decrypts message-mapping identifier columns with
/// AES-256-GCM under a key derived via PBKDF2-SHA256(secret, salt,
/// 100 000, 32).
pub struct ColumnCipher {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for ColumnCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColumnCipher").field("cipher", &"[Aes256Gcm]").finish()
    }
}

impl ColumnCipher {
    #[must_use]
    pub fn new(secret: &SecretString, salt: &SecretString) -> Self {
        let key_bytes = derive_key(secret.expose_secret(), salt.expose_secret());
        let key = Key::<Aes256Gcm>::from_slice(&key_bytes);
        Self { cipher: Aes256Gcm::new(key) }
    }

    /// Encrypt `plaintext`, returning `nonce || ciphertext`.
    pub fn encrypt(&self, plaintext: &str) -> Result<Vec<u8>, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CryptoError::Encrypt)?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    /// Decrypt a `nonce || ciphertext` blob produced by `encrypt`.
    pub fn decrypt(&self, blob: &[u8]) -> Result<String, CryptoError> {
        if blob.len() < NONCE_SIZE {
            return Err(CryptoError::Truncated);
        }
        let (nonce_bytes, ciphertext) = blob.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self.cipher.decrypt(nonce, ciphertext).map_err(|_| CryptoError::Decrypt)?;
        String::from_utf8(plaintext).map_err(|_| CryptoError::Decrypt)
    }
}

type HmacSha256 = Hmac<Sha256>;

/// Deterministic keyed hash used for equality search over encrypted
/// columns, keyed on a lookup salt distinct from the encryption key.
pub struct LookupHasher {
    key: Vec<u8>,
}

impl std::fmt::Debug for LookupHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LookupHasher").field("key", &"[REDACTED]").finish()
    }
}

impl LookupHasher {
    #[must_use]
    pub fn new(lookup_salt: &SecretString) -> Self {
        Self { key: lookup_salt.expose_secret().as_bytes().to_vec() }
    }

    #[must_use]
    pub fn hash(&self, value: &str) -> String {
        let mut mac =
            <HmacSha256 as Mac>::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}
