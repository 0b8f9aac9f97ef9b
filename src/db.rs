use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::MySqlPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{AttendanceStore, memory::MemoryStore, mysql::MySqlStore};

pub async fn init_db(database_url: &str) -> Result<MySqlPool> {
    MySqlPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// MySQL when `DATABASE_URL` is set, otherwise a process-local store.
pub async fn init_store(config: &Config) -> Result<Arc<dyn AttendanceStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = init_db(url).await?;
            info!("Database connected successfully");
            Ok(Arc::new(MySqlStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set, attendance data is kept in memory only");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
