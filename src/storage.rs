use std::fs;
use std::path::{Path, PathBuf};

use zeroize::{Zeroize, Zeroizing};

use crate::crypto::{self, KdfCost};
use crate::models::{CycleRecord, StoredPrediction, UserData, UserId};
use crate::service::{CycleSource, PredictionSink};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("crypto error: {0}")]
    Crypto(#[from] crypto::CryptoError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("data directory not found")]
    NoDataDir,
}

/// One sealed JSON file per user, all under the same passphrase.
pub struct EncryptedStore {
    root: PathBuf,
    passphrase: Zeroizing<String>,
    cost: KdfCost,
}

impl EncryptedStore {
    /// Store rooted in the platform's local data directory.
    pub fn open_default(passphrase: impl Into<String>) -> Result<Self, StorageError> {
        let root = dirs::data_local_dir()
            .ok_or(StorageError::NoDataDir)?
            .join("cykel");
        Ok(Self::at(root, passphrase))
    }

    pub fn at(root: impl Into<PathBuf>, passphrase: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            passphrase: Zeroizing::new(passphrase.into()),
            cost: KdfCost::default(),
        }
    }

    pub fn with_kdf_cost(mut self, cost: KdfCost) -> Self {
        self.cost = cost;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn user_file(&self, user: UserId) -> PathBuf {
        self.root.join(format!("{user}.cykel"))
    }

    pub fn exists(&self, user: UserId) -> bool {
        self.user_file(user).exists()
    }

    /// Load a user's data; a user with no file yet has empty data.
    pub fn load(&self, user: UserId) -> Result<UserData, StorageError> {
        let path = self.user_file(user);
        if !path.exists() {
            return Ok(UserData::default());
        }
        let sealed = fs::read(path)?;
        let mut json = crypto::open(&self.passphrase, &sealed)?;
        let parsed: Result<UserData, _> = serde_json::from_slice(&json);
        json.zeroize();
        Ok(parsed?)
    }

    pub fn save(&self, user: UserId, data: &UserData) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        let mut json = serde_json::to_vec(data)?;
        let sealed = crypto::seal(&self.passphrase, &json, self.cost);
        json.zeroize();
        fs::write(self.user_file(user), sealed?)?;
        Ok(())
    }

    pub fn save_cycles(&self, user: UserId, cycles: Vec<CycleRecord>) -> Result<(), StorageError> {
        let mut data = self.load(user)?;
        data.cycles = cycles;
        self.save(user, &data)
    }

    /// Delete a user's data permanently.
    pub fn wipe(&self, user: UserId) -> Result<(), StorageError> {
        let path = self.user_file(user);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

impl CycleSource for EncryptedStore {
    type Error = StorageError;

    fn load_cycles(&self, user: UserId) -> Result<Vec<CycleRecord>, StorageError> {
        Ok(self.load(user)?.cycles)
    }
}

impl PredictionSink for EncryptedStore {
    type Error = StorageError;

    fn store_prediction(&self, user: UserId, prediction: &StoredPrediction) -> Result<(), StorageError> {
        let mut data = self.load(user)?;
        data.latest_prediction = Some(prediction.clone());
        self.save(user, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::TEST_COST;
    use chrono::NaiveDate;

    fn store(dir: &Path, passphrase: &str) -> EncryptedStore {
        EncryptedStore::at(dir, passphrase).with_kdf_cost(TEST_COST)
    }

    fn cycles() -> Vec<CycleRecord> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        vec![CycleRecord::new(start, Some(28)).with_period_length(5)]
    }

    #[test]
    fn missing_user_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), "pass");
        let user = UserId::new();
        assert!(!store.exists(user));
        assert_eq!(store.load(user).unwrap(), UserData::default());
    }

    #[test]
    fn cycles_roundtrip_per_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), "pass");
        let alice = UserId::new();
        let bob = UserId::new();

        store.save_cycles(alice, cycles()).unwrap();
        assert_eq!(store.load_cycles(alice).unwrap(), cycles());
        assert!(store.load_cycles(bob).unwrap().is_empty());
    }

    #[test]
    fn wrong_passphrase_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let user = UserId::new();
        store(dir.path(), "right").save_cycles(user, cycles()).unwrap();

        let err = store(dir.path(), "wrong").load(user).unwrap_err();
        assert!(matches!(err, StorageError::Crypto(_)));
    }

    #[test]
    fn file_is_not_plaintext() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), "pass");
        let user = UserId::new();
        store.save_cycles(user, cycles()).unwrap();

        let raw = fs::read(dir.path().join(format!("{user}.cykel"))).unwrap();
        let needle = b"startDate";
        assert!(!raw.windows(needle.len()).any(|w| w == needle));
    }

    #[test]
    fn wipe_removes_user_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), "pass");
        let user = UserId::new();
        store.save_cycles(user, cycles()).unwrap();
        assert!(store.exists(user));

        store.wipe(user).unwrap();
        assert!(!store.exists(user));
        store.wipe(user).unwrap();
    }
}
