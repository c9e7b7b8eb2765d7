//! Key material management and password sealing.
//!
//! The database password is stored encrypted at rest. A 32-byte key is
//! derived once from a fixed passphrase and a random 16-byte salt using
//! scrypt (log_n=14, r=8, p=1, deliberately slow), and persisted next to the
//! configuration file as `key.key` / `salt.key`. Sealed passwords are
//! self-contained tokens: base64(nonce || ciphertext || tag) under
//! AES-256-GCM, so a token carries everything needed for decryption except
//! the key itself.

use std::fs;
use std::path::Path;

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use scrypt::Params;
use zeroize::Zeroize;

use crate::errors::CryptoError;

pub const KEY_FILE: &str = "key.key";
pub const SALT_FILE: &str = "salt.key";

const DERIVED_KEY_LEN: usize = 32;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

const SCRYPT_LOG_N: u8 = 14;
const SCRYPT_R: u32 = 8;
const SCRYPT_P: u32 = 1;

// Derivation passphrase is fixed; secrecy comes from the on-disk key file,
// the salt only makes the derived key installation-specific.
const KDF_PASSPHRASE: &[u8] = b"printhistory-config";

/// A derived symmetric key and the salt it was derived with.
///
/// The pair is atomic: if either file is missing on disk, both are
/// regenerated together, which invalidates tokens sealed under the old key.
pub struct KeyMaterial {
    key: [u8; DERIVED_KEY_LEN],
    salt: [u8; SALT_LEN],
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

impl KeyMaterial {
    /// Load the key/salt pair from `dir`, generating and persisting a fresh
    /// pair if either file is absent.
    pub fn load_or_generate(dir: &Path) -> Result<Self, CryptoError> {
        let key_path = dir.join(KEY_FILE);
        let salt_path = dir.join(SALT_FILE);

        if key_path.exists() && salt_path.exists() {
            let key_bytes = fs::read(&key_path)
                .map_err(|e| CryptoError::KeyUnavailable(format!("reading {KEY_FILE}: {e}")))?;
            let salt_bytes = fs::read(&salt_path)
                .map_err(|e| CryptoError::KeyUnavailable(format!("reading {SALT_FILE}: {e}")))?;
            return Self::from_bytes(&key_bytes, &salt_bytes);
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(&salt)?;

        fs::write(&key_path, key)
            .map_err(|e| CryptoError::KeyUnavailable(format!("writing {KEY_FILE}: {e}")))?;
        fs::write(&salt_path, salt)
            .map_err(|e| CryptoError::KeyUnavailable(format!("writing {SALT_FILE}: {e}")))?;
        tracing::info!("generated and saved new encryption key and salt");

        Ok(Self { key, salt })
    }

    fn from_bytes(key_bytes: &[u8], salt_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != DERIVED_KEY_LEN {
            return Err(CryptoError::KeyUnavailable(format!(
                "key file holds {} bytes, expected {DERIVED_KEY_LEN}",
                key_bytes.len()
            )));
        }
        if salt_bytes.len() != SALT_LEN {
            return Err(CryptoError::KeyUnavailable(format!(
                "salt file holds {} bytes, expected {SALT_LEN}",
                salt_bytes.len()
            )));
        }
        let mut key = [0u8; DERIVED_KEY_LEN];
        key.copy_from_slice(key_bytes);
        let mut salt = [0u8; SALT_LEN];
        salt.copy_from_slice(salt_bytes);
        Ok(Self { key, salt })
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }
}

fn derive_key(salt: &[u8]) -> Result<[u8; DERIVED_KEY_LEN], CryptoError> {
    let params = Params::new(SCRYPT_LOG_N, SCRYPT_R, SCRYPT_P, DERIVED_KEY_LEN)
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    let mut key = [0u8; DERIVED_KEY_LEN];
    scrypt::scrypt(KDF_PASSPHRASE, salt, &params, &mut key)
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    Ok(key)
}

/// Authenticated sealing of small secrets under the derived key.
pub struct SecretBox {
    material: KeyMaterial,
}

impl SecretBox {
    pub fn new(material: KeyMaterial) -> Self {
        Self { material }
    }

    /// Seal a plaintext into a self-contained base64 token.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CryptoError> {
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.material.key));
        let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);
        let ciphertext = cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

        let mut token = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        token.extend_from_slice(nonce.as_slice());
        token.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(token))
    }

    /// Open a token produced by [`SecretBox::encrypt`].
    ///
    /// Fails on malformed base64, truncated input, or tag mismatch. Callers
    /// are expected to treat a failure as "no password available" rather
    /// than propagate it to the host.
    pub fn decrypt(&self, token: &str) -> Result<String, CryptoError> {
        let data = STANDARD
            .decode(token)
            .map_err(|e| CryptoError::MalformedToken(e.to_string()))?;
        if data.len() <= NONCE_LEN {
            return Err(CryptoError::MalformedToken(format!(
                "token holds {} bytes, too short for a nonce and tag",
                data.len()
            )));
        }

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.material.key));
        let nonce = Nonce::from_slice(&data[..NONCE_LEN]);
        let plaintext = cipher
            .decrypt(nonce, &data[NONCE_LEN..])
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?;
        String::from_utf8(plaintext).map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
    }
}
