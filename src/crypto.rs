//! Passphrase sealing for the on-device store.
//!
//! Sealed layout:
//! `magic (4) || version (1) || m_cost (4) || t_cost (4) || p_cost (4) || salt (16) || nonce (12) || ciphertext`.
//! The header is bound to the ciphertext as associated data, so a tampered
//! cost or salt fails authentication like a wrong passphrase does.

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

const MAGIC: &[u8; 4] = b"CYKF";
const FORMAT_VERSION: u8 = 1;
const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const COST_OFFSET: usize = MAGIC.len() + 1;
const SALT_OFFSET: usize = COST_OFFSET + 12;
const NONCE_OFFSET: usize = SALT_OFFSET + SALT_LEN;
const HEADER_LEN: usize = NONCE_OFFSET + NONCE_LEN;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,
    #[error("encryption failed")]
    Encryption,
    #[error("decryption failed: wrong passphrase or corrupted data")]
    Decryption,
    #[error("invalid data format")]
    InvalidFormat,
    #[error("unsupported format version {0}")]
    UnsupportedVersion(u8),
}

/// Argon2id cost parameters. Stored in the header so files stay readable
/// after the default changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfCost {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for KdfCost {
    fn default() -> Self {
        Self {
            memory_kib: 65536,
            iterations: 3,
            parallelism: 1,
        }
    }
}

/// Largest cost `open` will honour. The header is read before it is
/// authenticated, so anything above this is treated as a corrupt file.
pub const MAX_KDF_COST: KdfCost = KdfCost {
    memory_kib: 4 * 65536,
    iterations: 4 * 3,
    parallelism: 4,
};

impl KdfCost {
    pub fn within_limits(&self) -> bool {
        (1..=MAX_KDF_COST.memory_kib).contains(&self.memory_kib)
            && (1..=MAX_KDF_COST.iterations).contains(&self.iterations)
            && (1..=MAX_KDF_COST.parallelism).contains(&self.parallelism)
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct SealingKey([u8; KEY_LEN]);

impl SealingKey {
    fn derive(passphrase: &str, salt: &[u8], cost: KdfCost) -> Result<Self, CryptoError> {
        let params = Params::new(
            cost.memory_kib,
            cost.iterations,
            cost.parallelism,
            Some(KEY_LEN),
        )
        .map_err(|_| CryptoError::KeyDerivation)?;

        let mut key = SealingKey([0u8; KEY_LEN]);
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password_into(passphrase.as_bytes(), salt, &mut key.0)
            .map_err(|_| CryptoError::KeyDerivation)?;
        Ok(key)
    }

    fn cipher(&self) -> Result<Aes256Gcm, CryptoError> {
        Aes256Gcm::new_from_slice(&self.0).map_err(|_| CryptoError::KeyDerivation)
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Result<u32, CryptoError> {
    bytes
        .get(offset..offset + 4)
        .and_then(|b| b.try_into().ok())
        .map(u32::from_le_bytes)
        .ok_or(CryptoError::InvalidFormat)
}

/// Seal `plaintext` under a key derived from `passphrase`.
pub fn seal(passphrase: &str, plaintext: &[u8], cost: KdfCost) -> Result<Vec<u8>, CryptoError> {
    if !cost.within_limits() {
        return Err(CryptoError::KeyDerivation);
    }
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.push(FORMAT_VERSION);
    for value in [cost.memory_kib, cost.iterations, cost.parallelism] {
        header.extend_from_slice(&value.to_le_bytes());
    }
    let mut salt_and_nonce = [0u8; SALT_LEN + NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt_and_nonce);
    header.extend_from_slice(&salt_and_nonce);

    let key = SealingKey::derive(passphrase, &header[SALT_OFFSET..NONCE_OFFSET], cost)?;
    let ciphertext = key
        .cipher()?
        .encrypt(
            Nonce::from_slice(&header[NONCE_OFFSET..HEADER_LEN]),
            Payload {
                msg: plaintext,
                aad: &header,
            },
        )
        .map_err(|_| CryptoError::Encryption)?;

    let mut sealed = header;
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Open data produced by [`seal`]. The caller should zeroize the result when done.
pub fn open(passphrase: &str, sealed: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if sealed.len() < HEADER_LEN || &sealed[..MAGIC.len()] != MAGIC {
        return Err(CryptoError::InvalidFormat);
    }
    let version = sealed[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(CryptoError::UnsupportedVersion(version));
    }

    let cost = KdfCost {
        memory_kib: read_u32(sealed, COST_OFFSET)?,
        iterations: read_u32(sealed, COST_OFFSET + 4)?,
        parallelism: read_u32(sealed, COST_OFFSET + 8)?,
    };
    if !cost.within_limits() {
        return Err(CryptoError::InvalidFormat);
    }
    let (header, ciphertext) = sealed.split_at(HEADER_LEN);

    let key = SealingKey::derive(passphrase, &header[SALT_OFFSET..NONCE_OFFSET], cost)?;
    key.cipher()?
        .decrypt(
            Nonce::from_slice(&header[NONCE_OFFSET..]),
            Payload {
                msg: ciphertext,
                aad: header,
            },
        )
        .map_err(|_| CryptoError::Decryption)
}

#[cfg(test)]
pub(crate) const TEST_COST: KdfCost = KdfCost {
    memory_kib: 1024,
    iterations: 1,
    parallelism: 1,
};
