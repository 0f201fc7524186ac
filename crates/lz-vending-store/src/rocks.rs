//! `RocksDB` inventory implementation.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, MultiThreaded, Options};
use tokio::sync::Mutex;

use lz_vending_core::AccountRecord;

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::InventoryStore;

/// RocksDB-backed inventory.
pub struct RocksInventory {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes check-then-put so the conditional write is atomic.
    write_lock: Mutex<()>,
}

impl RocksInventory {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn read(&self, account_name: &str) -> Result<Option<AccountRecord>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        self.db
            .get_cf(&cf, keys::account_key(account_name))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }
}

#[async_trait]
impl InventoryStore for RocksInventory {
    async fn put_if_absent(&self, record: &AccountRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        if self.read(&record.account_name)?.is_some() {
            return Err(StoreError::AlreadyExists {
                account_name: record.account_name.clone(),
            });
        }

        let cf = self.cf(cf::ACCOUNTS)?;
        let value = Self::serialize(record)?;
        self.db
            .put_cf(&cf, keys::account_key(&record.account_name), value)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!(account_name = %record.account_name, "Inventory record written");
        Ok(())
    }

    async fn get(&self, account_name: &str) -> Result<Option<AccountRecord>> {
        self.read(account_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> AccountRecord {
        AccountRecord {
            account_id: id.parse().unwrap(),
            account_name: "team-a".into(),
            account_email: "team-a@x.test".into(),
            ou_name: "Sandbox".into(),
        }
    }

    #[tokio::test]
    async fn conditional_put_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksInventory::open(dir.path()).unwrap();
            store.put_if_absent(&record("111111111111")).await.unwrap();
        }

        let store = RocksInventory::open(dir.path()).unwrap();
        let err = store.put_if_absent(&record("222222222222")).await.unwrap_err();

        assert!(err.is_already_exists());
        let kept = store.get("team-a").await.unwrap().unwrap();
        assert_eq!(kept, record("111111111111"));
    }
}
