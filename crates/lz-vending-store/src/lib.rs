//! Account inventory storage for lz-vending.
//!
//! The inventory holds one [`AccountRecord`] per `account_name`. Records are
//! written once through a conditional put and never updated or deleted here;
//! the condition is what makes registration safe to repeat on saga retry.
//!
//! # Backends
//!
//! - [`MemoryInventory`]: process-local, for tests and dry runs
//! - `RocksInventory`: embedded `RocksDB`, behind the `rocksdb-backend` feature
//!
//! A DynamoDB-backed implementation lives in `lz-vending-aws`.
//!
//! # Example
//!
//! ```
//! use lz_vending_core::AccountRecord;
//! use lz_vending_store::{InventoryStore, MemoryInventory};
//!
//! # async fn example() -> lz_vending_store::Result<()> {
//! let store = MemoryInventory::new();
//! let record = AccountRecord {
//!     account_id: "111111111111".parse().unwrap(),
//!     account_name: "team-a".into(),
//!     account_email: "team-a@x.test".into(),
//!     ou_name: "Sandbox".into(),
//! };
//! store.put_if_absent(&record).await?;
//! assert!(store.put_if_absent(&record).await.unwrap_err().is_already_exists());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryInventory;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksInventory;

use async_trait::async_trait;
use lz_vending_core::AccountRecord;

/// The inventory store.
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Insert `record` unless a record with the same `account_name` exists.
    ///
    /// # Errors
    ///
    /// - `StoreError::AlreadyExists` if the name is taken; the stored record is untouched.
    /// - `StoreError::Database` / `StoreError::Serialization` on backend failure.
    async fn put_if_absent(&self, record: &AccountRecord) -> Result<()>;

    /// Look up a record by account name.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    async fn get(&self, account_name: &str) -> Result<Option<AccountRecord>>;
}
