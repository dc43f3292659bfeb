use crate::config::AppConfig;
use crate::store::{MemoryStore, PgStore, RecordStore};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

// Open the configured store and execute any migrations
pub async fn setup_store(config: &AppConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    if config.uses_memory_store() {
        warn!("using the in-memory store; nothing will survive a restart");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let pool = PgPool::connect(&config.database_url).await?;

    if config.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("migrations executed");
    }

    Ok(Arc::new(PgStore::new(pool)))
}
