use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use triage_core::Observation;
use zeroize::Zeroizing;

use crate::{KeyValueStore, Pbkdf2AesGcm, StoreError, VaultCipher, NONCE_LEN, SALT_LEN};

pub const MIN_PASSPHRASE_LEN: usize = 6;
const BLOB_VERSION: u32 = 1;
const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    #[error("weak passphrase: use at least {min} characters")]
    WeakPassphrase { min: usize },
    /// Wrong passphrase and tampered or unreadable blobs all map here.
    #[error("decryption failed")]
    Decryption,
    #[error("encryption failed: {0}")]
    Encryption(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("crypto task aborted: {0}")]
    Task(String),
}

/// Persisted record: `{v, salt, iv, cipher}` with base64 byte fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EncryptedBlob {
    pub v: u32,
    pub salt: String,
    pub iv: String,
    pub cipher: String,
}

/// Plaintext sealed inside the blob.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FormSnapshot {
    pub v: u32,
    #[serde(rename = "savedAt")]
    pub saved_at: DateTime<Utc>,
    pub form: Observation,
}

/// Passphrase-protected single-slot snapshot of the whole form.
///
/// Each save overwrites the slot. Concurrent saves to one slot are last-write-wins;
/// callers serialize them.
pub struct Vault<S, C = Pbkdf2AesGcm> {
    storage: S,
    slot: String,
    cipher: Arc<C>,
}

impl<S: KeyValueStore> Vault<S> {
    pub fn new(storage: S, slot: impl Into<String>) -> Self {
        Self::with_cipher(storage, slot, Pbkdf2AesGcm)
    }
}

impl<S, C> Vault<S, C>
where
    S: KeyValueStore,
    C: VaultCipher + 'static,
{
    pub fn with_cipher(storage: S, slot: impl Into<String>, cipher: C) -> Self {
        Self {
            storage,
            slot: slot.into(),
            cipher: Arc::new(cipher),
        }
    }

    /// Encrypts `form` under a key derived from `passphrase` with a fresh salt and nonce.
    pub async fn save(&self, passphrase: &str, form: &Observation) -> Result<(), VaultError> {
        check_passphrase(passphrase)?;

        let snapshot = FormSnapshot {
            v: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            form: form.clone(),
        };
        let plaintext = Zeroizing::new(
            serde_json::to_vec(&snapshot).map_err(|e| VaultError::Encryption(e.to_string()))?,
        );

        let mut salt = [0u8; SALT_LEN];
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut nonce);

        let cipher = Arc::clone(&self.cipher);
        let passphrase = Zeroizing::new(passphrase.to_string());
        let sealed = tokio::task::spawn_blocking(move || {
            let key = cipher.derive_key(&passphrase, &salt)?;
            cipher.encrypt(&key, &nonce, &plaintext)
        })
        .await
        .map_err(|e| VaultError::Task(e.to_string()))??;

        let blob = EncryptedBlob {
            v: BLOB_VERSION,
            salt: STANDARD.encode(salt),
            iv: STANDARD.encode(nonce),
            cipher: STANDARD.encode(sealed),
        };
        let record = serde_json::to_string(&blob).map_err(StoreError::from)?;
        self.storage.set(&self.slot, &record)?;
        tracing::info!(slot = %self.slot, version = BLOB_VERSION, "encrypted form saved");
        Ok(())
    }

    /// Decrypts the slot. `Ok(None)` when nothing was ever saved (or it was cleared).
    pub async fn load(&self, passphrase: &str) -> Result<Option<Observation>, VaultError> {
        check_passphrase(passphrase)?;

        let Some(raw) = self.storage.get(&self.slot)? else {
            return Ok(None);
        };
        let (salt, nonce, sealed) = decode_blob(&raw).ok_or_else(|| {
            tracing::warn!(slot = %self.slot, "encrypted form unreadable");
            VaultError::Decryption
        })?;

        let cipher = Arc::clone(&self.cipher);
        let passphrase = Zeroizing::new(passphrase.to_string());
        let plaintext = tokio::task::spawn_blocking(move || {
            let key = cipher.derive_key(&passphrase, &salt)?;
            cipher.decrypt(&key, &nonce, &sealed).map(Zeroizing::new)
        })
        .await
        .map_err(|e| VaultError::Task(e.to_string()))??;

        let snapshot: FormSnapshot =
            serde_json::from_slice(&plaintext).map_err(|_| VaultError::Decryption)?;
        tracing::info!(slot = %self.slot, "encrypted form loaded");
        Ok(Some(snapshot.form))
    }

    /// Removes the blob; a later load reports no data.
    pub fn clear(&self) -> Result<(), VaultError> {
        self.storage.remove(&self.slot)?;
        tracing::info!(slot = %self.slot, "encrypted form cleared");
        Ok(())
    }

    pub fn has_data(&self) -> Result<bool, VaultError> {
        Ok(self.storage.get(&self.slot)?.is_some())
    }
}

/// Length is counted in UTF-16 code units, as the browser form counts it.
fn check_passphrase(passphrase: &str) -> Result<(), VaultError> {
    if passphrase.encode_utf16().count() < MIN_PASSPHRASE_LEN {
        return Err(VaultError::WeakPassphrase {
            min: MIN_PASSPHRASE_LEN,
        });
    }
    Ok(())
}

fn decode_blob(raw: &str) -> Option<(Vec<u8>, Vec<u8>, Vec<u8>)> {
    let blob: EncryptedBlob = serde_json::from_str(raw).ok()?;
    if blob.v != BLOB_VERSION {
        return None;
    }
    let salt = STANDARD.decode(blob.salt).ok()?;
    let nonce = STANDARD.decode(blob.iv).ok()?;
    let sealed = STANDARD.decode(blob.cipher).ok()?;
    (salt.len() == SALT_LEN && nonce.len() == NONCE_LEN).then_some((salt, nonce, sealed))
}
