//! lz-vending service - HTTP step surface for account vending.
//!
//! This is the main entry point for the lz-vending service.

use std::sync::Arc;

use aws_config::SdkConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lz_vending_aws::{
    load_shared_config, AwsOrganizations, CloudFormationStacks, DynamoInventory, IamAliases,
    S3BlobStore, S3PolicyStore, StsBroker,
};
use lz_vending_service::{
    cancellation, create_router, AppState, CancelHandle, Collaborators, Provisioner, ServiceConfig,
};
use lz_vending_store::InventoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,lz_vending=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting lz-vending service");

    // Load configuration from environment
    let config = ServiceConfig::from_env()?;
    let provisioning = &config.provisioning;

    tracing::info!(
        listen_addr = %config.listen_addr,
        aws_region = ?config.aws_region,
        partition = %provisioning.partition,
        account_role = %provisioning.account_role,
        trust_policy_bucket = %provisioning.trust_policy.bucket,
        template = %provisioning.bootstrap.template_location(),
        stack_name = %provisioning.bootstrap.stack_name,
        stack_region = %provisioning.bootstrap.stack_region,
        "Service configuration loaded"
    );

    let shared = load_shared_config(config.aws_region.as_deref()).await;

    let collaborators = Collaborators {
        organization: Arc::new(AwsOrganizations::new(&shared)),
        inventory: inventory_backend(&config, &shared)?,
        policies: Arc::new(S3PolicyStore::new(&shared)),
        identity: Arc::new(StsBroker::new(&shared)),
        blobs: Arc::new(S3BlobStore::new(&shared)),
        stacks: Arc::new(CloudFormationStacks::new(&shared)),
        aliases: Arc::new(IamAliases::new(&shared)),
    };
    let provisioner = Provisioner::new(collaborators, config.provisioning.clone());

    let (cancel_handle, cancel) = cancellation();
    let state = AppState::new(provisioner, config.clone(), cancel);

    // Create the router
    let app = create_router(state);
    tracing::info!("Router configured with all API endpoints");

    // Start HTTP server
    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel_handle))
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn inventory_backend(
    config: &ServiceConfig,
    shared: &SdkConfig,
) -> Result<Arc<dyn InventoryStore>, Box<dyn std::error::Error>> {
    if let Some(dir) = &config.data_dir {
        tracing::info!(path = %dir, "Opening RocksDB inventory");
        return Ok(Arc::new(lz_vending_store::RocksInventory::open(dir)?));
    }
    Ok(dynamo_inventory(config, shared))
}

#[cfg(not(feature = "rocksdb-backend"))]
#[allow(clippy::unnecessary_wraps)]
fn inventory_backend(
    config: &ServiceConfig,
    shared: &SdkConfig,
) -> Result<Arc<dyn InventoryStore>, Box<dyn std::error::Error>> {
    if config.data_dir.is_some() {
        tracing::warn!("DATA_DIR is set but the rocksdb-backend feature is disabled");
    }
    Ok(dynamo_inventory(config, shared))
}

fn dynamo_inventory(config: &ServiceConfig, shared: &SdkConfig) -> Arc<dyn InventoryStore> {
    tracing::info!(table = %config.inventory_table, "Using DynamoDB inventory");
    Arc::new(DynamoInventory::new(shared, &config.inventory_table))
}

/// Wait for Ctrl-C, then cancel every in-flight step.
async fn shutdown_signal(cancel: CancelHandle) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Cannot listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested, cancelling in-flight steps");
    cancel.cancel();
}
