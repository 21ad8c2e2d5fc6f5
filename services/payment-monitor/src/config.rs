// Configuration for Payment Monitor service

use anyhow::{Context, Result};
use payment_reconciler::ReconcilerConfig;
use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: String,
    pub max_db_connections: u32,
    /// Cron expression (with seconds) for reconciliation passes
    pub schedule: String,
    pub reconciler: ReconcilerConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let server_port = env::var("PAYMENT_MONITOR_PORT")
            .unwrap_or_else(|_| "8091".to_string())
            .parse()
            .context("PAYMENT_MONITOR_PORT must be a valid port number")?;

        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

        let max_db_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "5".to_string())
            .parse()
            .context("DATABASE_MAX_CONNECTIONS must be a number")?;

        // Every 30 seconds by default
        let schedule =
            env::var("RECONCILE_SCHEDULE").unwrap_or_else(|_| "*/30 * * * * *".to_string());

        let reconciler = match env::var("RECONCILER_CONFIG_FILE") {
            Ok(path) => ReconcilerConfig::from_file(&path)
                .with_context(|| format!("Failed to load reconciler config from {}", path))?,
            Err(_) => ReconcilerConfig::from_env().context("Invalid RECONCILER_* settings")?,
        };

        Ok(Self {
            server_port,
            database_url,
            max_db_connections,
            schedule,
            reconciler,
        })
    }
}
