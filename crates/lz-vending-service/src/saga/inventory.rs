//! Inventory registration.

use tracing::{error, info, instrument, warn};

use lz_vending_core::{AccountRecord, ProvisionError, Result};
use lz_vending_store::{InventoryStore, StoreError};

/// Outcome of a registration that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// The record was written by this call.
    Created,
    /// An identical registration already existed.
    AlreadyRegistered,
}

/// Write `record` keyed by its `account_name`, failing if the name is taken.
///
/// # Errors
///
/// `StoreError::AlreadyExists` when the name is registered; other store errors as-is.
pub async fn register(
    store: &dyn InventoryStore,
    record: &AccountRecord,
) -> std::result::Result<(), StoreError> {
    store.put_if_absent(record).await
}

/// Register `record`, treating a repeat registration of the same account as done.
///
/// # Errors
///
/// `InventoryConflict` when the name belongs to another account id; `Inventory`
/// on any other store failure.
#[instrument(skip_all, fields(account_name = %record.account_name, account_id = %record.account_id))]
pub async fn ensure_registered(
    store: &dyn InventoryStore,
    record: &AccountRecord,
) -> Result<Registration> {
    match register(store, record).await {
        Ok(()) => {
            info!(ou_name = %record.ou_name, "Account registered in inventory");
            Ok(Registration::Created)
        }
        Err(err) if err.is_already_exists() => {
            let existing = store
                .get(&record.account_name)
                .await
                .map_err(|e| ProvisionError::Inventory(e.to_string()))?;
            match existing {
                Some(existing) if existing.account_id == record.account_id => {
                    info!("Account already registered");
                    Ok(Registration::AlreadyRegistered)
                }
                Some(existing) => {
                    error!(existing_id = %existing.account_id, "Account name registered to another account");
                    Err(ProvisionError::InventoryConflict {
                        account_name: record.account_name.clone(),
                        existing_id: existing.account_id.to_string(),
                        account_id: record.account_id.to_string(),
                    })
                }
                None => {
                    warn!("Inventory reported a duplicate it cannot return");
                    Err(ProvisionError::Inventory(err.to_string()))
                }
            }
        }
        Err(err) => {
            error!(error = %err, "Inventory write failed");
            Err(ProvisionError::Inventory(err.to_string()))
        }
    }
}
