//! Local persistence for the triage helper: the bounded timeline and the
//! passphrase-encrypted form snapshot, both on top of a small key-value port.

use std::path::PathBuf;

mod cipher;
mod kv;
mod timeline;
mod vault;

pub use cipher::{DerivedKey, Pbkdf2AesGcm, VaultCipher, KDF_ROUNDS, NONCE_LEN, SALT_LEN};
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use timeline::{TimelineExport, TimelineStore, EXPORT_VERSION};
pub use vault::{EncryptedBlob, FormSnapshot, Vault, VaultError, MIN_PASSPHRASE_LEN};

/// Where and under which keys the stores persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub timeline_key: String,
    pub vault_key: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".triage"),
            timeline_key: "kt_timeline_v1".to_string(),
            vault_key: "kt_form_enc_v1".to_string(),
        }
    }
}

/// Storage and timeline failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot serialize stored data: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid storage key {0:?}")]
    InvalidKey(String),
    #[error("storage lock poisoned")]
    Poisoned,
    #[error("no timeline point at position {index} (have {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("import rejected: {0}")]
    Import(String),
}
