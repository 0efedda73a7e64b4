//! Password-based key derivation and authenticated encryption behind one trait.
//!
//! - PBKDF2-HMAC-SHA256, [`KDF_ROUNDS`] rounds, 256-bit output
//! - AES-256-GCM with a 96-bit nonce; the 16-byte tag is appended to the ciphertext

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::VaultError;

pub const KDF_ROUNDS: u32 = 150_000;
pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

/// 256-bit symmetric key, wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKey(..)")
    }
}

/// Crypto capability used by the vault. Implementations must be deterministic
/// in `derive_key` and must fail `decrypt` on any tag mismatch.
pub trait VaultCipher: Send + Sync {
    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<DerivedKey, VaultError>;
    fn encrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, VaultError>;
    fn decrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, VaultError>;
}

/// Default capability: PBKDF2-SHA256 + AES-256-GCM.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pbkdf2AesGcm;

impl VaultCipher for Pbkdf2AesGcm {
    fn derive_key(&self, passphrase: &str, salt: &[u8]) -> Result<DerivedKey, VaultError> {
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, KDF_ROUNDS, &mut key);
        let derived = DerivedKey::from_bytes(key);
        key.zeroize();
        Ok(derived)
    }

    fn encrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        plaintext: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::Encryption(format!(
                "nonce must be {NONCE_LEN} bytes, got {}",
                nonce.len()
            )));
        }
        let cipher = Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| VaultError::Encryption(e.to_string()))?;
        cipher
            .encrypt(Nonce::from_slice(nonce), plaintext)
            .map_err(|e| VaultError::Encryption(e.to_string()))
    }

    fn decrypt(
        &self,
        key: &DerivedKey,
        nonce: &[u8],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, VaultError> {
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::Decryption);
        }
        let cipher =
            Aes256Gcm::new_from_slice(key.as_bytes()).map_err(|_| VaultError::Decryption)?;
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::Decryption)
    }
}
