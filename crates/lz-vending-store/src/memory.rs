//! In-memory inventory.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use lz_vending_core::AccountRecord;

use crate::error::{Result, StoreError};
use crate::InventoryStore;

/// Process-local inventory backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryInventory {
    records: RwLock<HashMap<String, AccountRecord>>,
}

impl MemoryInventory {
    /// Create an empty inventory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether no account is registered.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventory {
    async fn put_if_absent(&self, record: &AccountRecord) -> Result<()> {
        let mut records = self.records.write().await;
        match records.entry(record.account_name.clone()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                account_name: record.account_name.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn get(&self, account_name: &str) -> Result<Option<AccountRecord>> {
        Ok(self.records.read().await.get(account_name).cloned())
    }
}
