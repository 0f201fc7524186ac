//! DynamoDB inventory adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::operation::put_item::PutItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnConsumedCapacity};
use aws_sdk_dynamodb::Client;
use aws_smithy_types::error::display::DisplayErrorContext;
use tracing::debug;

use lz_vending_core::AccountRecord;
use lz_vending_store::{InventoryStore, Result, StoreError};

/// Default inventory table name.
pub const DEFAULT_INVENTORY_TABLE: &str = "lz_account_inventory";

/// [`InventoryStore`] backed by a DynamoDB table keyed by `account_name`.
#[derive(Debug, Clone)]
pub struct DynamoInventory {
    client: Client,
    table: String,
}

impl DynamoInventory {
    /// Create an adapter for `table`.
    #[must_use]
    pub fn new(config: &SdkConfig, table: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            table: table.into(),
        }
    }
}

fn string_attr(item: &HashMap<String, AttributeValue>, name: &str) -> Result<String> {
    item.get(name)
        .and_then(|v| v.as_s().ok())
        .cloned()
        .ok_or_else(|| StoreError::Serialization(format!("inventory item missing {name}")))
}

fn record_from_item(item: &HashMap<String, AttributeValue>) -> Result<AccountRecord> {
    Ok(AccountRecord {
        account_id: string_attr(item, "account_id")?
            .parse()
            .map_err(|e: lz_vending_core::IdError| StoreError::Serialization(e.to_string()))?,
        account_name: string_attr(item, "account_name")?,
        account_email: string_attr(item, "account_email")?,
        ou_name: string_attr(item, "ou_name")?,
    })
}

#[async_trait]
impl InventoryStore for DynamoInventory {
    async fn put_if_absent(&self, record: &AccountRecord) -> Result<()> {
        let result = self
            .client
            .put_item()
            .table_name(&self.table)
            .item("account_name", AttributeValue::S(record.account_name.clone()))
            .item("account_id", AttributeValue::S(record.account_id.to_string()))
            .item("account_email", AttributeValue::S(record.account_email.clone()))
            .item("ou_name", AttributeValue::S(record.ou_name.clone()))
            .condition_expression("attribute_not_exists(account_name)")
            .return_consumed_capacity(ReturnConsumedCapacity::Total)
            .send()
            .await;

        match result {
            Ok(output) => {
                debug!(
                    table = %self.table,
                    account_name = %record.account_name,
                    consumed = ?output.consumed_capacity(),
                    "Inventory item written"
                );
                Ok(())
            }
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(PutItemError::is_conditional_check_failed_exception) =>
            {
                Err(StoreError::AlreadyExists {
                    account_name: record.account_name.clone(),
                })
            }
            Err(err) => Err(StoreError::Database(DisplayErrorContext(&err).to_string())),
        }
    }

    async fn get(&self, account_name: &str) -> Result<Option<AccountRecord>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key("account_name", AttributeValue::S(account_name.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::Database(DisplayErrorContext(&e).to_string()))?;

        output.item().map(record_from_item).transpose()
    }
}
