use crate::{
    error::MigrationError,
    execution::factory::{self, TaskStores},
};
use engine_config::settings::task::TaskConfig;
use engine_core::progress::ProgressStatus;
use engine_processing::{
    control::{ClearScope, TaskControl},
    engine::{MigrationEngine, SyncReport},
};
use tracing::info;

/// Runs the task to completion against its configured backend.
pub async fn sync(config: &TaskConfig) -> Result<SyncReport, MigrationError> {
    let stores = factory::open_stores(&config.state).await?;
    sync_with(config, stores).await
}

pub async fn sync_with(
    config: &TaskConfig,
    stores: TaskStores,
) -> Result<SyncReport, MigrationError> {
    let keys = config.keys();
    info!(
        task = %keys.task,
        reader = %config.reader,
        limit = config.sync.limit,
        scale = config.sync.scale,
        block = config.sync.block,
        "Running sync"
    );

    let source = factory::create_source(config).await?;
    let mut engine = MigrationEngine::new(
        source,
        stores.checkpoints,
        stores.queue,
        keys,
        factory::sync_options(&config.sync),
        factory::transformer(config)?,
    )?;
    Ok(engine.sync().await?)
}

/// Progress snapshot. Never opens the source, so it is cheap to poll.
pub async fn status(config: &TaskConfig) -> Result<ProgressStatus, MigrationError> {
    let stores = factory::open_stores(&config.state).await?;
    status_with(config, stores).await
}

pub async fn status_with(
    config: &TaskConfig,
    stores: TaskStores,
) -> Result<ProgressStatus, MigrationError> {
    let control = TaskControl::new(stores.checkpoints, stores.queue, config.keys());
    Ok(control
        .status(config.cursor_field(), config.identifiers())
        .await?)
}

pub async fn clear(config: &TaskConfig, scope: ClearScope) -> Result<(), MigrationError> {
    let stores = factory::open_stores(&config.state).await?;
    clear_with(config, stores, scope).await
}

pub async fn clear_with(
    config: &TaskConfig,
    stores: TaskStores,
    scope: ClearScope,
) -> Result<(), MigrationError> {
    info!(task = %config.state.key, %scope, "Clearing task state");
    let control = TaskControl::new(stores.checkpoints, stores.queue, config.keys());
    Ok(control.clear(scope).await?)
}
